//! Escaping and normalisation of untrusted CMS text.

use std::borrow::Cow;

use scraper::{Html, Node};

/// Escape text for use in HTML content and double- or single-quoted attributes.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Make serialized JSON safe inside `<script type="application/ld+json">`.
///
/// `<`, `>` and `&` only occur inside JSON strings, where their `\u` forms
/// are equivalent, so the document stays valid JSON and cannot close the
/// script element.
pub fn escape_json_for_script(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

/// Elements whose boundaries separate words in the extracted text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

fn is_block(node: Option<&Node>) -> bool {
    node.and_then(Node::as_element)
        .is_some_and(|element| BLOCK_ELEMENTS.contains(&element.name()))
}

/// Plain text of an HTML fragment: tags dropped, entities decoded,
/// whitespace collapsed. The result is unescaped text.
pub fn strip_markup(input: &str) -> String {
    let fragment = Html::parse_fragment(input);
    let mut text = String::with_capacity(input.len());
    for node in fragment.tree.root().descendants() {
        match node.value() {
            Node::Text(chunk) => {
                if is_block(node.prev_sibling().map(|n| n.value())) {
                    text.push(' ');
                }
                text.push_str(chunk);
            }
            Node::Element(_) if is_block(Some(node.value())) => text.push(' '),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` characters, appending `…` when cut.
pub fn truncate_chars(input: &str, max: usize) -> Cow<'_, str> {
    match input.char_indices().nth(max) {
        None => Cow::Borrowed(input),
        Some((idx, _)) => {
            let cut = input[..idx].trim_end();
            let cut = match cut.rfind(' ') {
                Some(space) if space > idx / 2 => &cut[..space],
                _ => cut,
            };
            Cow::Owned(format!("{}…", cut.trim_end()))
        }
    }
}
