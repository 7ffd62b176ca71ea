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

//! Body renderers: plain text and HTML to sanitised HTML, multipart
//! recursion, attachment collection.

pub mod html;
pub mod multipart;
pub mod plain;

use log::debug;

pub use html::render_html;
pub use multipart::split_parts;
pub use plain::render_plain;

use crate::message::Attachment;
use crate::mime::{
    base64, decode_encoded_words, decode_with_charset, encode_legacy, quoted_printable, BodyKind,
    MimeError, MimeHeaders, TransferEncoding,
};

/// Nesting limit for multipart inside multipart.
pub const MAX_DEPTH: usize = 16;

/// Accumulated result of rendering one message body.
#[derive(Debug, Default)]
pub struct RenderOutput {
    pub html: String,
    pub attachments: Vec<Attachment>,
    /// First decoding failure, if any. Rendering carries on past it.
    pub error: Option<MimeError>,
}

impl RenderOutput {
    fn fail(&mut self, error: MimeError) {
        debug!("body decoding failed: {}", error);
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

/// Render a message body described by its top-level headers.
pub fn render_body<S: AsRef<str>>(headers: &MimeHeaders, body: &[S]) -> RenderOutput {
    let mut out = RenderOutput::default();
    render_entity(headers, body, &mut out, 0);
    out
}

fn render_entity<S: AsRef<str>>(
    headers: &MimeHeaders,
    body: &[S],
    out: &mut RenderOutput,
    depth: usize,
) {
    if depth > MAX_DEPTH {
        out.fail(MimeError::TooDeep(MAX_DEPTH));
        return;
    }
    let content_type = headers.content_type();
    let encoding = headers.transfer_encoding();
    match BodyKind::classify(&content_type, encoding) {
        BodyKind::PlainText => match decode_text(body, encoding, content_type.charset()) {
            Ok(text) => render_plain(text.lines(), &mut out.html),
            Err(e) => out.fail(e),
        },
        BodyKind::Html => match decode_text(body, encoding, content_type.charset()) {
            Ok(text) => render_html(&text, &mut out.html),
            Err(e) => out.fail(e),
        },
        BodyKind::Multipart {
            boundary,
            alternative,
        } => multipart::render_multipart(body, &boundary, alternative, out, depth),
        BodyKind::Attachment { name } => {
            match base64::decode_lines(body.iter().map(|l| l.as_ref().as_bytes())) {
                Ok(raw_bytes) => out.attachments.push(Attachment {
                    file_name: decode_encoded_words(&name),
                    content_type: content_type.mime_type(),
                    raw_bytes,
                }),
                Err(e) => out.fail(e.into()),
            }
        }
        BodyKind::Unknown(mime_type) => {
            debug!("skipping {} part at depth {}", mime_type, depth);
            out.fail(MimeError::UnsupportedContentType(mime_type));
        }
    }
}

/// Undo the transfer encoding and decode under the declared charset.
/// Identity-encoded lines are legacy code page text, so they are mapped back
/// to bytes first.
fn decode_text<S: AsRef<str>>(
    body: &[S],
    encoding: TransferEncoding,
    charset: Option<&str>,
) -> Result<String, MimeError> {
    let bytes = match encoding {
        TransferEncoding::Identity => {
            let joined: Vec<&str> = body.iter().map(|l| l.as_ref()).collect();
            encode_legacy(&joined.join("\n"))
        }
        TransferEncoding::QuotedPrintable => {
            quoted_printable::decode_lines(body.iter().map(|l| encode_legacy(l.as_ref())))
        }
        TransferEncoding::Base64 => base64::decode_lines(body.iter().map(|l| l.as_ref().as_bytes()))?,
    };
    Ok(decode_with_charset(&bytes, charset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(lines: &[&str]) -> RenderOutput {
        let (headers, start) = MimeHeaders::parse(lines);
        render_body(&headers, &lines[start..])
    }

    #[test]
    fn plain_body_without_content_type() {
        let out = render(&["Subject: x", "", "line <1>", "line 2"]);
        assert_eq!(out.html, "<p>line &lt;1&gt;</p><p>line 2</p>");
        assert!(out.error.is_none());
    }

    #[test]
    fn quoted_printable_utf8_html() {
        let out = render(&[
            "Content-Type: text/html; charset=utf-8",
            "Content-Transfer-Encoding: quoted-printable",
            "",
            "<p>Caf=C3=A9 =",
            "cr=C3=A8me</p>",
        ]);
        assert_eq!(out.html, "<p>Café crème</p>");
    }

    #[test]
    fn eight_bit_utf8_from_legacy_lines() {
        // What the line reader produces for the UTF-8 bytes of "é".
        let line = crate::mime::decode_legacy("é".as_bytes());
        let lines = ["Content-Type: text/plain; charset=UTF-8", "", line.as_str()];
        let out = render(&lines);
        assert_eq!(out.html, "<p>é</p>");
    }

    #[test]
    fn mixed_with_attachment() {
        let out = render(&[
            "Content-Type: multipart/mixed; boundary=\"XYZ\"",
            "",
            "--XYZ",
            "Content-Type: text/plain",
            "",
            "see attached",
            "--XYZ",
            "Content-Type: application/octet-stream; name=\"=?UTF-8?Q?r=C3=A9sum=C3=A9.txt?=\"",
            "Content-Transfer-Encoding: base64",
            "",
            "SGVs",
            "bG8=",
            "--XYZ--",
        ]);
        assert_eq!(out.html, "<p>see attached</p>");
        assert_eq!(out.attachments.len(), 1);
        assert_eq!(out.attachments[0].file_name, "résumé.txt");
        assert_eq!(out.attachments[0].content_type, "application/octet-stream");
        assert_eq!(out.attachments[0].raw_bytes, b"Hello");
        assert!(out.error.is_none());
    }

    #[test]
    fn alternative_prefers_html() {
        let out = render(&[
            "Content-Type: multipart/alternative; boundary=alt",
            "",
            "--alt",
            "Content-Type: text/plain",
            "",
            "plain",
            "--alt",
            "Content-Type: text/html",
            "",
            "<b>rich</b>",
            "--alt--",
        ]);
        assert_eq!(out.html, "<b>rich</b>");
    }

    #[test]
    fn nested_multipart() {
        let out = render(&[
            "Content-Type: multipart/mixed; boundary=outer",
            "",
            "--outer",
            "Content-Type: multipart/alternative; boundary=inner",
            "",
            "--inner",
            "Content-Type: text/plain",
            "",
            "hi",
            "--inner--",
            "--outer",
            "Content-Type: image/png",
            "Content-Transfer-Encoding: base64",
            "",
            "iVBORw0K",
            "--outer--",
        ]);
        assert_eq!(out.html, "<p>hi</p>");
        assert!(out.attachments.is_empty());
        assert!(matches!(out.error, Some(MimeError::UnsupportedContentType(ref t)) if t == "image/png"));
    }

    #[test]
    fn nested_unknown_part_reported_after_rendering_the_rest() {
        let out = render(&[
            "Content-Type: multipart/mixed; boundary=b",
            "",
            "--b",
            "Content-Type: application/x-custom",
            "",
            "opaque",
            "--b",
            "Content-Type: text/plain",
            "",
            "still shown",
            "--b--",
        ]);
        assert_eq!(out.html, "<p>still shown</p>");
        assert!(matches!(out.error, Some(MimeError::UnsupportedContentType(ref t)) if t == "application/x-custom"));
    }

    #[test]
    fn unsupported_top_level_type_is_error() {
        let out = render(&["Content-Type: application/pdf", "", "%PDF"]);
        assert!(out.html.is_empty());
        assert!(matches!(out.error, Some(MimeError::UnsupportedContentType(ref t)) if t == "application/pdf"));
    }

    #[test]
    fn bad_base64_is_error() {
        let out = render(&[
            "Content-Type: text/plain",
            "Content-Transfer-Encoding: base64",
            "",
            "***",
        ]);
        assert!(matches!(out.error, Some(MimeError::Base64(_))));
    }
}
