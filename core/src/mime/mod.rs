/*
 * mod.rs
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

//! MIME decoding: header folding, RFC 2047 words, transfer encodings,
//! charsets, Content-Type routing and dates.

pub mod base64;
pub mod charset;
pub mod content_type;
pub mod date;
mod error;
pub mod header;
pub mod quoted_printable;
pub mod rfc2047;

pub use charset::{decode_legacy, decode_with_charset, encode_legacy, try_resolve_charset};
pub use content_type::{parse_content_type, BodyKind, ContentType};
pub use date::{parse_date, parse_received};
pub use error::MimeError;
pub use header::{extract_email, MimeHeaders, TransferEncoding};
pub use rfc2047::decode_encoded_words;
