/*
 * date.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Mailfetch, a POP3 mail retrieval engine.
 *
 * Mailfetch is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Mailfetch is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Mailfetch.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Tolerant RFC 822 style date parsing, normalised to UTC.
//!
//! Only the layout `Weekday, Day Month Year HH:MM:SS +ZZZZ [(Zone)]` is
//! accepted. Anything else yields the current time: a message is never
//! rejected over its Date header.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MAX_ZONE_MINUTES: i32 = 12 * 60;

/// Parse a date header, falling back to now.
pub fn parse_date(value: &str) -> DateTime<Utc> {
    parse_date_strict(value).unwrap_or_else(Utc::now)
}

/// Timestamp of a `Received` header: the date after its last `;`. Falls back to now.
pub fn parse_received(value: &str) -> DateTime<Utc> {
    let date = value.rsplit(';').next().unwrap_or(value);
    parse_date(date)
}

/// Parse a date header. None on any structural or range failure.
pub fn parse_date_strict(value: &str) -> Option<DateTime<Utc>> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if tokens.len() != 6 && tokens.len() != 7 {
        return None;
    }
    if !tokens[0].ends_with(',') {
        return None;
    }
    let day: u32 = tokens[1].parse().ok()?;
    let month = MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(tokens[2]))? as u32
        + 1;
    let year: i32 = tokens[3].parse().ok()?;
    if !(1..=31).contains(&day) || !(2000..=3000).contains(&year) {
        return None;
    }

    let mut hms = tokens[4].split(':');
    let hour: u32 = hms.next()?.parse().ok()?;
    let minute: u32 = hms.next()?.parse().ok()?;
    let second: u32 = hms.next()?.parse().ok()?;
    if hms.next().is_some() || hour > 23 || minute > 59 || second > 59 {
        return None;
    }

    let offset_minutes = parse_zone(tokens[5])?;
    if tokens.len() == 7 && !(tokens[6].starts_with('(') && tokens[6].ends_with(')')) {
        return None;
    }

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let offset = FixedOffset::east_opt(offset_minutes * 60)?;
    let local = offset.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc))
}

/// `+HHMM` / `-HHMM` to signed minutes east of UTC.
fn parse_zone(zone: &str) -> Option<i32> {
    let bytes = zone.as_bytes();
    if bytes.len() != 5 || !bytes[1..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = zone[1..3].parse().ok()?;
    let minutes: i32 = zone[3..5].parse().ok()?;
    if minutes > 59 {
        return None;
    }
    let total = hours * 60 + minutes;
    if total > MAX_ZONE_MINUTES {
        return None;
    }
    Some(sign * total)
}
