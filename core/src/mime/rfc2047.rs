/*
 * rfc2047.rs
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

//! RFC 2047 encoded-word decoding (e.g. =?charset?q?text?=) for header values.
//!
//! Words that do not parse, or whose charset is unknown, stay as literal text.

use crate::mime::base64;
use crate::mime::charset::{encode_legacy, try_resolve_charset};
use crate::mime::quoted_printable;

/// Expand every encoded word in `s`. Whitespace between two adjacent encoded
/// words is dropped (RFC 2047 section 6.2).
pub fn decode_encoded_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let literal = &rest[..start];
        match decode_one_encoded_word(&rest[start..]) {
            Some((decoded, used)) => {
                if !(after_word && literal.chars().all(char::is_whitespace)) {
                    out.push_str(literal);
                }
                out.push_str(&decoded);
                rest = &rest[start + used..];
                after_word = true;
            }
            None => {
                out.push_str(literal);
                out.push_str("=?");
                rest = &rest[start + 2..];
                after_word = false;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the encoded word at the start of `s`.
/// Returns the decoded text and the number of bytes of `s` it spans.
fn decode_one_encoded_word(s: &str) -> Option<(String, usize)> {
    let body = s.strip_prefix("=?")?;
    let qmark = body.find('?')?;
    let charset = &body[..qmark];
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }
    let after_charset = &body[qmark + 1..];
    let marker = after_charset.as_bytes();
    if marker.len() < 2 || marker[1] != b'?' {
        return None;
    }
    let encoding = marker[0].to_ascii_uppercase();
    let payload_region = &after_charset[2..];
    let payload_len = payload_region.find("?=")?;
    let payload = &payload_region[..payload_len];
    if payload.contains(char::is_whitespace) {
        return None;
    }

    let raw = encode_legacy(payload);
    let decoded = match encoding {
        b'B' => base64::decode(&raw).ok()?,
        b'Q' => decode_q(&raw),
        _ => return None,
    };
    let charset = try_resolve_charset(charset)?;
    let text = charset.decode_without_bom_handling(&decoded).0.into_owned();
    let used = 2 + qmark + 1 + 2 + payload_len + 2;
    Some((text, used))
}

/// Q encoding: `_` is space, `=XX` is a hex escape. Unlike body
/// quoted-printable, trailing spaces and a trailing `=` are kept.
fn decode_q(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len());
    let mut pos = 0;
    while pos < payload.len() {
        match payload[pos] {
            b'_' => out.push(b' '),
            b'=' => {
                if let Some(v) = payload
                    .get(pos + 1..pos + 3)
                    .and_then(|hex| quoted_printable::decode_hex_pair(hex[0], hex[1]))
                {
                    out.push(v);
                    pos += 3;
                    continue;
                }
                out.push(b'=');
            }
            b => out.push(b),
        }
        pos += 1;
    }
    out
}
