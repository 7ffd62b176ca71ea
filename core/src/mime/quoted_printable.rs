/*
 * quoted_printable.rs
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

//! Quoted-Printable decoder for Content-Transfer-Encoding (RFC 2045), plus the
//! hex-digit decoder shared with RFC 2047 Q encoding.

const HEX_DECODE: [i8; 256] = {
    let mut t = [-1i8; 256];
    let mut i = 0u8;
    while i < 10 {
        t[(b'0' + i) as usize] = i as i8;
        i = i.wrapping_add(1);
    }
    let mut i = 0u8;
    while i < 6 {
        t[(b'A' + i) as usize] = (10 + i) as i8;
        t[(b'a' + i) as usize] = (10 + i) as i8;
        i = i.wrapping_add(1);
    }
    t
};

/// Value of one hex digit.
#[inline]
pub fn hex_value(b: u8) -> Option<u8> {
    let v = HEX_DECODE[b as usize];
    if v >= 0 {
        Some(v as u8)
    } else {
        None
    }
}

/// Decode the byte written as two hex digits.
#[inline]
pub fn decode_hex_pair(hi: u8, lo: u8) -> Option<u8> {
    Some((hex_value(hi)? << 4) | hex_value(lo)?)
}

/// Decode one line (without its terminator) into `out`.
/// Returns true when the line ends in a soft break (trailing `=`).
/// An `=` not followed by two hex digits is copied literally.
pub fn decode_line(line: &[u8], out: &mut Vec<u8>) -> bool {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b' ' || line[end - 1] == b'\t') {
        end -= 1;
    }
    let line = &line[..end];
    let soft_break = line.last() == Some(&b'=');
    let line = if soft_break { &line[..line.len() - 1] } else { line };

    let mut pos = 0;
    while pos < line.len() {
        let b = line[pos];
        if b == b'=' {
            if let Some(v) = line
                .get(pos + 1..pos + 3)
                .and_then(|hex| decode_hex_pair(hex[0], hex[1]))
            {
                out.push(v);
                pos += 3;
                continue;
            }
        }
        out.push(b);
        pos += 1;
    }
    soft_break
}

/// Decode a sequence of lines. Hard breaks become CRLF; soft breaks join lines.
pub fn decode_lines<I, L>(lines: I) -> Vec<u8>
where
    I: IntoIterator<Item = L>,
    L: AsRef<[u8]>,
{
    let mut out = Vec::new();
    let mut pending_break = false;
    for line in lines {
        if pending_break {
            out.extend_from_slice(b"\r\n");
        }
        pending_break = !decode_line(line.as_ref(), &mut out);
    }
    out
}
