/*
 * header.rs
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

//! Message header block: continuation folding, `key: value` splitting and the
//! handful of headers the retrieval engine cares about.

use super::content_type::{parse_content_type, ContentType};

/// Content-Transfer-Encoding of a body or part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7bit, 8bit, binary, or anything unrecognised: lines are taken as they are.
    #[default]
    Identity,
    QuotedPrintable,
    Base64,
}

impl TransferEncoding {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("quoted-printable") {
            TransferEncoding::QuotedPrintable
        } else if value.eq_ignore_ascii_case("base64") {
            TransferEncoding::Base64
        } else {
            TransferEncoding::Identity
        }
    }
}

/// Recognised headers of one entity. Later occurrences replace earlier ones,
/// except `Received`, where only the first (most recent hop) is kept.
#[derive(Debug, Clone, Default)]
pub struct MimeHeaders {
    pub from: Option<String>,
    pub subject: Option<String>,
    pub received: Option<String>,
    pub date: Option<String>,
    pub content_type: Option<String>,
    pub content_transfer_encoding: Option<String>,
}

impl MimeHeaders {
    /// Parse the header block at the start of `lines`.
    /// Returns the headers and the index of the first body line.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> (Self, usize) {
        let (fields, body_start) = fold_header_lines(lines);
        let mut headers = MimeHeaders::default();
        for field in &fields {
            if let Some((key, value)) = split_field(field) {
                headers.set(&key, value);
            }
        }
        (headers, body_start)
    }

    fn set(&mut self, key: &str, value: String) {
        match key {
            "from" => self.from = Some(value),
            "subject" => self.subject = Some(value),
            "received" => {
                if self.received.is_none() {
                    self.received = Some(value);
                }
            }
            "date" => self.date = Some(value),
            "content-type" => self.content_type = Some(value),
            "content-transfer-encoding" => self.content_transfer_encoding = Some(value),
            _ => {}
        }
    }

    /// Parsed Content-Type, defaulting to `text/plain` when absent or unparseable.
    pub fn content_type(&self) -> ContentType {
        self.content_type
            .as_deref()
            .and_then(parse_content_type)
            .unwrap_or_else(ContentType::text_plain)
    }

    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.content_transfer_encoding
            .as_deref()
            .map(TransferEncoding::parse)
            .unwrap_or_default()
    }
}

/// Join continuation lines onto the header they continue, stopping at the
/// first empty line. Returns the unfolded fields and the index just past the
/// blank separator (or `lines.len()` when there is no body).
pub fn fold_header_lines<S: AsRef<str>>(lines: &[S]) -> (Vec<String>, usize) {
    let mut fields: Vec<String> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if line.is_empty() {
            return (fields, i + 1);
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = fields.last_mut() {
                last.push(' ');
                last.push_str(line.trim_start());
                continue;
            }
        }
        fields.push(line.to_string());
    }
    (fields, lines.len())
}

/// Split `Key: value` on the first colon; the key is lower-cased.
fn split_field(field: &str) -> Option<(String, String)> {
    let colon = field.find(':')?;
    let key = field[..colon].trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_ascii_lowercase(), field[colon + 1..].trim().to_string()))
}

/// Best-effort sender address: drop quoted display names, take the last
/// whitespace-separated token, strip angle brackets, lower-case.
/// Not an RFC 5322 address parser.
pub fn extract_email(from: &str) -> String {
    let mut unquoted = String::with_capacity(from.len());
    let mut in_quotes = false;
    for c in from.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            unquoted.push(c);
        }
    }
    let token = unquoted
        .trim()
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("");
    token
        .trim_matches(|c| c == '<' || c == '>')
        .to_lowercase()
}
