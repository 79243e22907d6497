//! URL detection in free text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^\s<>"']+"#).unwrap());

/// Characters that prose tends to glue onto the end of a URL
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '>', ']', '}'];

/// Strip trailing punctuation picked up from the surrounding sentence.
pub fn clean_url(raw: &str) -> &str {
    raw.trim_end_matches(TRAILING_PUNCTUATION)
}

/// First URL in `text`, cleaned.
pub fn first_url(text: &str) -> Option<&str> {
    URL.find(text).map(|m| clean_url(m.as_str()))
}

/// Every distinct URL in `text`, cleaned, in order of first appearance.
pub fn extract_urls(text: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    URL.find_iter(text)
        .map(|m| clean_url(m.as_str()))
        .filter(|url| seen.insert(*url))
        .collect()
}

/// A piece of text split around its URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Link { url: &'a str, trailing: &'a str },
}

/// Split `text` into plain and link segments.
///
/// Punctuation stripped from a URL stays in the output as `trailing`, so
/// concatenating every segment gives back the input.
pub fn linkify(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for m in URL.find_iter(text) {
        if m.start() > last {
            segments.push(Segment::Text(&text[last..m.start()]));
        }
        let raw = m.as_str();
        let url = clean_url(raw);
        segments.push(Segment::Link {
            url,
            trailing: &raw[url.len()..],
        });
        last = m.end();
    }
    if last < text.len() {
        segments.push(Segment::Text(&text[last..]));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_url_strips_trailing_punctuation() {
        assert_eq!(clean_url("https://a.example/x)."), "https://a.example/x");
        assert_eq!(clean_url("https://a.example/x?q=1"), "https://a.example/x?q=1");
        assert_eq!(clean_url("https://a.example/}]>"), "https://a.example/");
    }

    #[test]
    fn test_first_url_stops_at_quote_and_whitespace() {
        assert_eq!(first_url(r#"link "https://a.example/p" here"#), Some("https://a.example/p"));
        assert_eq!(first_url("see https://a.example/p, then"), Some("https://a.example/p"));
        assert_eq!(first_url("no links"), None);
    }

    #[test]
    fn test_first_url_ignores_non_http_schemes() {
        assert_eq!(first_url("ftp://a.example then http://b.example"), Some("http://b.example"));
    }

    #[test]
    fn test_extract_urls_unique_in_order() {
        let text = "https://b.example. and https://a.example, again https://b.example";
        assert_eq!(extract_urls(text), vec!["https://b.example", "https://a.example"]);
    }

    #[test]
    fn test_linkify_round_trips_text() {
        let text = "Read (https://a.example/x). Then stop.";
        let segments = linkify(text);
        assert_eq!(
            segments,
            vec![
                Segment::Text("Read ("),
                Segment::Link {
                    url: "https://a.example/x",
                    trailing: ")."
                },
                Segment::Text(" Then stop."),
            ]
        );

        let rebuilt: String = segments
            .iter()
            .map(|s| match s {
                Segment::Text(t) => t.to_string(),
                Segment::Link { url, trailing } => format!("{}{}", url, trailing),
            })
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_linkify_plain_text() {
        assert_eq!(linkify("plain"), vec![Segment::Text("plain")]);
        assert!(linkify("").is_empty());
    }
}
