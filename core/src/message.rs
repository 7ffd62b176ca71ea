/*
 * message.rs
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

//! Retrieved message value handed to the per-message callback.

use chrono::{DateTime, Utc};
use log::warn;

use crate::mime::{
    decode_encoded_words, extract_email, parse_date, parse_received, MimeError, MimeHeaders,
};
use crate::render::render_body;

/// Attachment decoded from a base64 MIME part (filename, MIME type, content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub raw_bytes: Vec<u8>,
}

/// A decoded message. `html_body` is always balanced, allow-listed HTML.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    /// From header as received.
    pub from_raw: String,
    /// Best-effort address from `from_raw`, lower-cased. May be empty.
    pub from_email: String,
    pub subject: String,
    /// From the Date header, or the time of parsing.
    pub created_at: DateTime<Utc>,
    /// From the first Received header, or the time of parsing.
    pub received_at: DateTime<Utc>,
    pub html_body: String,
    pub attachments: Vec<Attachment>,
    /// Non-fatal problem decoding this message.
    pub parse_error: Option<String>,
}

impl ParsedMessage {
    /// Decode a full message from its (dot-unstuffed) lines.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let (headers, body_start) = MimeHeaders::parse(lines);
        let rendered = render_body(&headers, &lines[body_start..]);
        let mut message = Self::from_headers(&headers);
        message.html_body = rendered.html;
        message.attachments = rendered.attachments;
        if let Some(error) = rendered.error {
            warn!("message {:?} from {}: {}", message.subject, message.from_email, error);
            message.parse_error = Some(error.to_string());
        }
        message
    }

    /// Decode only the headers of a message whose body was not (fully) retrieved.
    pub fn parse_headers_only<S: AsRef<str>>(lines: &[S], error: MimeError) -> Self {
        let (headers, _) = MimeHeaders::parse(lines);
        let mut message = Self::from_headers(&headers);
        warn!("message {:?} from {}: {}", message.subject, message.from_email, error);
        message.parse_error = Some(error.to_string());
        message
    }

    fn from_headers(headers: &MimeHeaders) -> Self {
        let from_raw = headers.from.clone().unwrap_or_default();
        let from_email = extract_email(&from_raw);
        Self {
            from_email,
            from_raw,
            subject: headers
                .subject
                .as_deref()
                .map(decode_encoded_words)
                .unwrap_or_default(),
            created_at: headers.date.as_deref().map(parse_date).unwrap_or_else(Utc::now),
            received_at: headers
                .received
                .as_deref()
                .map(parse_received)
                .unwrap_or_else(Utc::now),
            html_body: String::new(),
            attachments: Vec::new(),
            parse_error: None,
        }
    }
}
