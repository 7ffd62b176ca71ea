/*
 * error.rs
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

//! Per-message decoding errors. These never end a session; they are reported
//! on the delivered message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MimeError {
    #[error("unsupported content type {0}")]
    UnsupportedContentType(String),
    #[error("invalid base64 content: {0}")]
    Base64(#[from] super::base64::DecodeError),
    #[error("multipart nesting deeper than {0} levels")]
    TooDeep(usize),
    #[error("message size {size} exceeds limit of {limit} bytes; only headers were retrieved")]
    SizeLimit { size: u64, limit: u64 },
}
