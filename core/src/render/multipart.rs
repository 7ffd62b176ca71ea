/*
 * multipart.rs
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

//! Multipart bodies (RFC 2046): boundary splitting and per-part dispatch.

use log::debug;

use super::{render_entity, RenderOutput};
use crate::mime::{BodyKind, MimeHeaders};

/// Split body lines on `--boundary`, stopping at `--boundary--`.
/// The preamble and epilogue are dropped; an unterminated last part is kept.
pub fn split_parts<'a, S: AsRef<str>>(lines: &'a [S], boundary: &str) -> Vec<&'a [S]> {
    let separator = format!("--{}", boundary);
    let terminator = format!("--{}--", boundary);
    let mut parts = Vec::new();
    let mut start: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref().trim_end();
        if line == terminator {
            if let Some(s) = start {
                parts.push(&lines[s..i]);
            }
            return parts;
        }
        if line == separator {
            if let Some(s) = start {
                parts.push(&lines[s..i]);
            }
            start = Some(i + 1);
        }
    }
    if let Some(s) = start {
        parts.push(&lines[s..]);
    }
    parts
}

/// Render every part in order; for `multipart/alternative` only the last
/// renderable alternative (the richest, by RFC 2046 ordering) is rendered.
pub(super) fn render_multipart<S: AsRef<str>>(
    body: &[S],
    boundary: &str,
    alternative: bool,
    out: &mut RenderOutput,
    depth: usize,
) {
    let parts: Vec<(MimeHeaders, &[S])> = split_parts(body, boundary)
        .into_iter()
        .map(|part| {
            let (headers, body_start) = MimeHeaders::parse(part);
            (headers, &part[body_start..])
        })
        .collect();
    debug!("multipart boundary {:?}: {} parts", boundary, parts.len());

    if alternative {
        let chosen = parts.iter().rev().find(|(headers, _)| {
            BodyKind::classify(&headers.content_type(), headers.transfer_encoding()).is_renderable()
        });
        if let Some((headers, part_body)) = chosen {
            render_entity(headers, *part_body, out, depth + 1);
        }
        return;
    }
    for (headers, part_body) in &parts {
        render_entity(headers, *part_body, out, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_parts_between_separators() {
        let lines = [
            "preamble",
            "--XYZ",
            "Content-Type: text/plain",
            "",
            "first",
            "--XYZ",
            "Content-Type: text/html",
            "",
            "<b>second</b>",
            "--XYZ--",
            "epilogue",
        ];
        let parts = split_parts(&lines, "XYZ");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], &lines[2..5]);
        assert_eq!(parts[1], &lines[6..9]);
        let (headers, start) = MimeHeaders::parse(parts[1]);
        assert!(headers.content_type().is_mime_type("text", "html"));
        assert_eq!(parts[1][start], "<b>second</b>");
    }

    #[test]
    fn missing_terminator_keeps_last_part() {
        let lines = ["--b", "", "one", "--b", "", "two"];
        let parts = split_parts(&lines, "b");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], &lines[4..]);
    }

    #[test]
    fn no_separator_no_parts() {
        let lines = ["just text"];
        assert!(split_parts(&lines, "b").is_empty());
    }
}
