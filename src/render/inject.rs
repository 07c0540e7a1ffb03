//! Head-tag injection into the document template.
//!
//! A pure function over strings: the template is never modified, each call
//! returns either the template itself or a fresh copy with the tags placed
//! right before the single `</head>`.

use std::borrow::Cow;

const HEAD_CLOSE: &[u8] = b"</head>";

/// Where the head closes in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadAnchor {
    /// Exactly one `</head>` at this byte offset.
    Single(usize),
    Missing,
    Duplicated,
}

/// Locate `</head>` (ASCII case-insensitive).
pub fn locate_head_anchor(html: &str) -> HeadAnchor {
    let mut found = None;
    for (offset, window) in html.as_bytes().windows(HEAD_CLOSE.len()).enumerate() {
        if window.eq_ignore_ascii_case(HEAD_CLOSE) {
            if found.is_some() {
                return HeadAnchor::Duplicated;
            }
            found = Some(offset);
        }
    }
    match found {
        Some(offset) => HeadAnchor::Single(offset),
        None => HeadAnchor::Missing,
    }
}

/// Insert `tags` before the template's `</head>`.
///
/// Missing or duplicated anchors leave the template untouched.
pub fn inject_head<'a>(html: &'a str, tags: &str) -> Cow<'a, str> {
    match locate_head_anchor(html) {
        HeadAnchor::Single(offset) => {
            let mut out = String::with_capacity(html.len() + tags.len());
            out.push_str(&html[..offset]);
            out.push_str(tags);
            out.push_str(&html[offset..]);
            Cow::Owned(out)
        }
        HeadAnchor::Missing | HeadAnchor::Duplicated => Cow::Borrowed(html),
    }
}
