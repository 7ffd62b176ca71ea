/*
 * content_type.rs
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

//! Content-Type header (RFC 2045) and the rendering route it selects.

use std::collections::HashMap;

use super::header::TransferEncoding;

/// Top-level media types whose base64 parts carrying a `name` are attachments.
const ATTACHMENT_TYPES: &[&str] = &["text", "image", "audio", "video", "application"];

#[derive(Debug, Clone)]
pub struct ContentType {
    primary_type: String,
    sub_type: String,
    parameter_map: HashMap<String, String>,
}

impl ContentType {
    pub fn new(primary_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            primary_type: primary_type.into().to_ascii_lowercase(),
            sub_type: sub_type.into().to_ascii_lowercase(),
            parameter_map: HashMap::new(),
        }
    }

    /// The RFC 2045 default for entities without a Content-Type.
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    /// `type/subtype`, lower-cased.
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.primary_type, self.sub_type)
    }

    pub fn is_primary_type(&self, t: &str) -> bool {
        self.primary_type.eq_ignore_ascii_case(t)
    }

    pub fn is_mime_type(&self, primary: &str, sub: &str) -> bool {
        self.is_primary_type(primary) && self.sub_type.eq_ignore_ascii_case(sub)
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameter_map.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary").filter(|b| !b.is_empty())
    }

    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }
}

/// Parse a Content-Type header value. None if there is no `type/subtype`.
pub fn parse_content_type(value: &str) -> Option<ContentType> {
    let value = value.trim();
    let (type_part, params_part) = match value.find(';') {
        Some(i) => (value[..i].trim(), &value[i + 1..]),
        None => (value, ""),
    };
    let (primary, sub) = type_part.split_once('/')?;
    let (primary, sub) = (primary.trim(), sub.trim());
    if primary.is_empty() || sub.is_empty() || primary.contains(char::is_whitespace) {
        return None;
    }
    let mut content_type = ContentType::new(primary, sub);
    for (name, value) in parse_parameter_list(params_part) {
        content_type.parameter_map.insert(name, value);
    }
    Some(content_type)
}

/// Parse `; name=value; name="quoted value"`. Names are lower-cased; quoted
/// values are unwrapped (backslash escapes honoured). Pieces without `=` are skipped.
pub fn parse_parameter_list(params: &str) -> Vec<(String, String)> {
    let bytes = params.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    let mut pos = 0;

    while pos < len {
        while pos < len && (bytes[pos] == b';' || bytes[pos].is_ascii_whitespace()) {
            pos += 1;
        }
        if pos >= len {
            break;
        }
        let piece_end = params[pos..].find(';').map(|i| pos + i).unwrap_or(len);
        let eq = match params[pos..piece_end].find('=') {
            Some(i) => pos + i,
            None => {
                pos = piece_end;
                continue;
            }
        };
        let name = params[pos..eq].trim().to_ascii_lowercase();
        pos = eq + 1;
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let value = if pos < len && bytes[pos] == b'"' {
            pos += 1;
            let mut v = String::new();
            let mut chars = params[pos..].char_indices();
            let mut consumed = params.len() - pos;
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            v.push(escaped);
                        }
                    }
                    '"' => {
                        consumed = i + 1;
                        break;
                    }
                    _ => v.push(c),
                }
            }
            pos += consumed;
            v
        } else {
            let end = params[pos..].find(';').map(|i| pos + i).unwrap_or(len);
            let v = params[pos..end].trim().to_string();
            pos = end;
            v
        };
        if !name.is_empty() {
            out.push((name, value));
        }
    }
    out
}

/// How an entity's body is handled, resolved once from its headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyKind {
    PlainText,
    Html,
    Multipart { boundary: String, alternative: bool },
    Attachment { name: String },
    /// Carries the offending `type/subtype` (or a multipart missing its boundary).
    Unknown(String),
}

impl BodyKind {
    pub fn classify(content_type: &ContentType, encoding: TransferEncoding) -> Self {
        if content_type.is_primary_type("multipart") {
            return match content_type.boundary() {
                Some(boundary) => BodyKind::Multipart {
                    boundary: boundary.to_string(),
                    alternative: content_type.sub_type == "alternative",
                },
                None => BodyKind::Unknown(content_type.mime_type()),
            };
        }
        if encoding == TransferEncoding::Base64
            && ATTACHMENT_TYPES.contains(&content_type.primary_type())
        {
            if let Some(name) = content_type.parameter("name").filter(|n| !n.is_empty()) {
                return BodyKind::Attachment {
                    name: name.to_string(),
                };
            }
        }
        if content_type.is_mime_type("text", "plain") {
            BodyKind::PlainText
        } else if content_type.is_mime_type("text", "html") {
            BodyKind::Html
        } else {
            BodyKind::Unknown(content_type.mime_type())
        }
    }

    /// Whether this part produces displayable body text.
    pub fn is_renderable(&self) -> bool {
        matches!(
            self,
            BodyKind::PlainText | BodyKind::Html | BodyKind::Multipart { .. }
        )
    }
}
