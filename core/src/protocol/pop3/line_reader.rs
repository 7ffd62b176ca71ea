/*
 * line_reader.rs
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

//! POP3 answer framing over the connection buffer.
//!
//! Lines end in CRLF, or LFCR for servers that get it backwards. Line text is
//! decoded with the legacy code page. Multiline answers end with a lone `.`
//! and have one leading dot removed from every other line starting with `.`.

use crate::mime::decode_legacy;

/// Positive status indicator.
pub const OK: &str = "+OK";
/// Negative status indicator.
pub const ERR: &str = "-ERR";

/// Extract the line starting at `offset`. A single NUL byte at `offset` is
/// skipped. Returns the text and the offset just past its terminator, or
/// None when no terminator has arrived yet.
pub fn read_line(buf: &[u8], offset: usize) -> Option<(String, usize)> {
    let mut start = offset;
    if buf.get(start) == Some(&0) {
        start += 1;
    }
    let rest = buf.get(start..)?;
    let end = rest
        .windows(2)
        .position(|w| w == b"\r\n" || w == b"\n\r")?;
    Some((decode_legacy(&rest[..end]), start + end + 2))
}

/// One complete server answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// First line, including the `+OK` / `-ERR` indicator.
    pub status: String,
    /// Body lines of a multiline answer, dot-unstuffed, terminator excluded.
    pub lines: Vec<String>,
}

impl Answer {
    pub fn is_positive(&self) -> bool {
        self.status.starts_with(OK)
    }

    pub fn is_negative(&self) -> bool {
        self.status.starts_with(ERR)
    }
}

/// Incremental reader for one answer. Lines already scanned are kept, so
/// each poll only looks at bytes that arrived since the last one.
#[derive(Debug)]
pub struct AnswerReader {
    multiline: bool,
    offset: usize,
    status: Option<String>,
    lines: Vec<String>,
}

impl AnswerReader {
    pub fn new(multiline: bool) -> Self {
        Self {
            multiline,
            offset: 0,
            status: None,
            lines: Vec::new(),
        }
    }

    /// Try to complete the answer from `buf`, which must hold the same bytes
    /// as on the previous poll plus any new ones. On success returns the
    /// answer and the number of bytes it occupied; the reader is reset.
    /// A negative status ends a multiline answer immediately.
    pub fn poll(&mut self, buf: &[u8]) -> Option<(Answer, usize)> {
        loop {
            let (line, next) = read_line(buf, self.offset)?;
            self.offset = next;
            if self.status.is_none() {
                let positive = line.starts_with(OK);
                self.status = Some(line);
                if !self.multiline || !positive {
                    return Some(self.finish());
                }
                continue;
            }
            if line == "." {
                return Some(self.finish());
            }
            let content = match line.strip_prefix('.') {
                Some(unstuffed) => unstuffed.to_string(),
                None => line,
            };
            self.lines.push(content);
        }
    }

    fn finish(&mut self) -> (Answer, usize) {
        let consumed = std::mem::take(&mut self.offset);
        let answer = Answer {
            status: self.status.take().unwrap_or_default(),
            lines: std::mem::take(&mut self.lines),
        };
        (answer, consumed)
    }
}
