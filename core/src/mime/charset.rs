/*
 * charset.rs
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

//! Charset handling: the legacy single-byte code page used for raw header and
//! body text, and label lookup for declared charsets.

use encoding_rs::{Encoding, WINDOWS_1252};

/// Code page raw protocol lines are decoded with before any MIME decoding.
pub static LEGACY_CODEPAGE: &Encoding = WINDOWS_1252;

/// Decode raw line bytes with the legacy code page. Every byte maps to a char.
pub fn decode_legacy(bytes: &[u8]) -> String {
    let (text, _) = LEGACY_CODEPAGE.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Recover the original bytes of text produced by [`decode_legacy`].
pub fn encode_legacy(text: &str) -> Vec<u8> {
    let (bytes, _, _) = LEGACY_CODEPAGE.encode(text);
    bytes.into_owned()
}

/// Resolve a charset label (e.g. `UTF-8`, `"iso-8859-1"`, `koi8-r`). None if unknown.
pub fn try_resolve_charset(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().trim_matches('"');
    // RFC 2231 language suffix: us-ascii*en
    let label = label.split('*').next().unwrap_or(label);
    Encoding::for_label(label.as_bytes())
}

/// Decode bytes with the declared charset, falling back to the legacy code page.
pub fn decode_with_charset(bytes: &[u8], charset: Option<&str>) -> String {
    match charset.and_then(try_resolve_charset) {
        Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
        None => decode_legacy(bytes),
    }
}
