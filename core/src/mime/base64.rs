/*
 * base64.rs
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

//! Base64 decoder for Content-Transfer-Encoding (RFC 2045) and RFC 2047 B words.
//!
//! Line breaks and other whitespace are skipped; missing or excess padding
//! is tolerated because mailers get it wrong often enough.

use ::base64::alphabet;
use ::base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use ::base64::engine::DecodePaddingMode;
use ::base64::Engine;

pub use ::base64::DecodeError;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode base64 text, ignoring whitespace.
pub fn decode(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let compact: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT.decode(compact)
}

/// Decode the concatenated content of body lines.
pub fn decode_lines<I, L>(lines: I) -> Result<Vec<u8>, DecodeError>
where
    I: IntoIterator<Item = L>,
    L: AsRef<[u8]>,
{
    let mut joined = Vec::new();
    for line in lines {
        joined.extend_from_slice(line.as_ref());
    }
    decode(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_across_lines() {
        let out = decode_lines(["SGVs", "bG8g", "V29y", "bGQ="]).unwrap();
        assert_eq!(out, b"Hello World");
    }

    #[test]
    fn missing_padding_tolerated() {
        assert_eq!(decode(b"SGVsbG8").unwrap(), b"Hello");
    }

    #[test]
    fn garbage_is_error() {
        assert!(decode(b"not*base64!").is_err());
    }
}
