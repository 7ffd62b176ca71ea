/*
 * html.rs
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

//! Permissive HTML subset filter.
//!
//! Single pass over the input: text is copied, tags are parsed loosely and
//! only an allow-list survives (attributes stripped). Open allowed tags are
//! tracked on a stack so the output is always balanced. Never fails.

const ALLOWED: &[&str] = &[
    "p", "div", "span", "b", "i", "u", "blockquote", "ul", "ol", "li", "table", "tr", "td",
    "header", "hr", "h3",
];

/// Elements whose text content is dropped along with the tags, provided
/// their close tag follows. An unclosed one only loses the tag itself.
const SKIP_CONTENT: &[&str] = &["script", "style", "title"];

/// Marker of the quoted history block Gmail appends to replies.
const GMAIL_QUOTE: &str = "gmail_quote";

/// A loosely parsed tag: `raw` is everything between `<` and `>`.
struct Tag<'a> {
    raw: &'a str,
    closing: bool,
    name: String,
}

impl<'a> Tag<'a> {
    /// The name starts right after `<` or `</` and ends at the first
    /// non-alphanumeric character, so `< b>` has an empty name.
    fn parse(raw: &'a str) -> Self {
        let (closing, rest) = match raw.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let name: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Self { raw, closing, name }
    }

    /// Allow-listed name, with every heading level collapsed to `h3`.
    fn allowed_name(&self) -> Option<&'static str> {
        let name = match self.name.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "h3",
            other => other,
        };
        ALLOWED.iter().copied().find(|&a| a == name)
    }
}

/// Filter `input` and append the sanitised markup to `out`.
pub fn render_html(input: &str, out: &mut String) {
    let mut open: Vec<&'static str> = Vec::new();
    let mut skipping: Option<String> = None;
    let mut rest = input;

    loop {
        let Some(lt) = rest.find('<') else {
            if skipping.is_none() {
                out.push_str(rest);
            }
            break;
        };
        if skipping.is_none() {
            out.push_str(&rest[..lt]);
        }
        let after = &rest[lt + 1..];
        // An unterminated tag swallows the rest of the input.
        let Some(gt) = after.find('>') else {
            break;
        };
        let raw = &after[..gt];
        rest = &after[gt + 1..];
        let tag = Tag::parse(raw);

        if let Some(skipped) = &skipping {
            if tag.closing && tag.name == *skipped {
                skipping = None;
            }
            continue;
        }
        if !tag.closing && SKIP_CONTENT.contains(&tag.name.as_str()) {
            if !raw.ends_with('/') && has_close_tag(rest, &tag.name) {
                skipping = Some(tag.name.clone());
            }
            continue;
        }
        // Quoted reply history: drop the rest of this part.
        if tag.closing && tag.name == "blockquote" {
            break;
        }
        if !tag.closing && tag.name == "div" && tag.raw.contains(GMAIL_QUOTE) {
            break;
        }

        let Some(name) = tag.allowed_name() else {
            continue;
        };
        if tag.closing {
            if open.contains(&name) {
                close_through(&mut open, name, out);
            }
            continue;
        }
        if name == "hr" {
            out.push_str("<hr>");
            continue;
        }
        if name == "p" && open.contains(&"p") {
            close_through(&mut open, "p", out);
        }
        out.push('<');
        out.push_str(name);
        out.push('>');
        open.push(name);
    }

    while let Some(name) = open.pop() {
        push_close(name, out);
    }
}

/// Whether `</name` occurs in `rest`, ignoring ASCII case.
fn has_close_tag(rest: &str, name: &str) -> bool {
    let needle = format!("</{}", name);
    rest.as_bytes()
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Pop and close tags down to and including the innermost `name`.
fn close_through(open: &mut Vec<&'static str>, name: &str, out: &mut String) {
    while let Some(top) = open.pop() {
        push_close(top, out);
        if top == name {
            break;
        }
    }
}

fn push_close(name: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}
