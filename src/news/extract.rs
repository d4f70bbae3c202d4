//! Readable text from article HTML.
//!
//! Keeps `<p>` paragraphs with enough words to be prose, drops scripts,
//! styles and markup, decodes common entities.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Paragraphs shorter than this are usually bylines, captions or nav crumbs.
const MIN_PARAGRAPH_WORDS: usize = 6;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

fn noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<(script|style|noscript|figure|aside)\b.*?</(script|style|noscript|figure|aside)\s*>")
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<p(?:\s[^>]*)?>(.*?)</p\s*>")
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<title[^>]*>(.*?)</title\s*>")
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<[^>]*>")
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);")
}

/// Article body as paragraphs separated by blank lines, or `None` if the
/// page has no prose.
pub fn article_text(html: &str) -> Option<String> {
    let html = noise_re().replace_all(html, " ");
    let paragraphs: Vec<String> = paragraph_re()
        .captures_iter(&html)
        .map(|c| clean(&c[1]))
        .filter(|p| p.split_whitespace().count() >= MIN_PARAGRAPH_WORDS)
        .collect();

    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}

pub fn page_title(html: &str) -> Option<String> {
    title_re()
        .captures(html)
        .map(|c| clean(&c[1]))
        .filter(|t| !t.is_empty())
}

/// Strip tags, decode entities, collapse whitespace.
fn clean(fragment: &str) -> String {
    let text = tag_re().replace_all(fragment, " ");
    let text = decode_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    entity_re()
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "mdash" => Some('—'),
                    "ndash" => Some('–'),
                    "rsquo" => Some('’'),
                    "lsquo" => Some('‘'),
                    "rdquo" => Some('”'),
                    "ldquo" => Some('“'),
                    "hellip" => Some('…'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Frogs &amp; Friends | Daily News</title>
        <script>var p = "<p>not prose at all but long enough to count</p>";</script>
        <style>p { color: red }</style></head>
        <body>
          <p class="byline">By Staff</p>
          <p>Scientists have found a <a href="/frog">tiny frog</a> that glows in the dark.</p>
          <figure><p>Photo caption that is also fairly long text</p></figure>
          <p>The frog lives in the rainforest &mdash; and it is &#8220;very shy&#8221;.</p>
          <pre>not a paragraph</pre>
        </body></html>"#;

    #[test]
    fn test_extracts_prose_paragraphs() {
        let text = article_text(PAGE).unwrap();
        assert_eq!(
            text,
            "Scientists have found a tiny frog that glows in the dark.\n\n\
             The frog lives in the rainforest — and it is “very shy”."
        );
    }

    #[test]
    fn test_page_without_prose() {
        assert_eq!(article_text("<html><body><p>Subscribe</p></body></html>"), None);
    }

    #[test]
    fn test_title() {
        assert_eq!(page_title(PAGE).as_deref(), Some("Frogs & Friends | Daily News"));
        assert_eq!(page_title("<html></html>"), None);
    }

    #[test]
    fn test_unknown_entities_survive() {
        assert_eq!(decode_entities("a &bogus; b &#x41;"), "a &bogus; b A");
    }
}
