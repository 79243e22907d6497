//! Grouped-list format: bold `**List X: ...**` headers with one source per line.

use std::sync::LazyLock;

use regex::Regex;

use super::text::{split_before, truncate_chars};
use super::{Candidate, Detector};

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*List\s+[A-Z]").unwrap());

static LIST_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*\*List\s+[A-Z]").unwrap());

static GROUP_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*([^\n]+?)\*\*\s*\n?((?s:.*))$").unwrap());

/// Maximum characters of the line kept in a grouped-list label
const LINE_PREVIEW_CHARS: usize = 80;

pub struct GroupedListDetector;

impl Detector for GroupedListDetector {
    fn name(&self) -> &'static str {
        "grouped-list"
    }

    fn detect(&self, text: &str) -> Option<Vec<Candidate>> {
        if !LIST_MARKER.is_match(text) {
            return None;
        }

        let mut candidates = Vec::new();
        for section in split_before(text, &LIST_LINE) {
            let section = section.trim();
            let Some(caps) = GROUP_HEADER.captures(section) else {
                continue;
            };
            let group_title = caps[1].trim();
            let body = caps[2].trim();

            for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
                candidates.push(Candidate::new(
                    format!("{}: {}", group_title, truncate_chars(line, LINE_PREVIEW_CHARS)),
                    line,
                ));
            }
        }
        Some(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LISTS: &str = "Here are the sources.\n\
**List A: Local outlets**\n\
https://news.example/a\n\
\n\
https://news.example/b\n\
**List B: Officials**\n\
@mayor on the budget vote\n";

    #[test]
    fn test_no_list_header_is_no_match() {
        assert!(GroupedListDetector.detect("just prose").is_none());
    }

    #[test]
    fn test_one_candidate_per_non_blank_line() {
        let candidates = GroupedListDetector.detect(TWO_LISTS).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].label, "List A: Local outlets: https://news.example/a");
        assert_eq!(candidates[0].body, "https://news.example/a");
        assert_eq!(candidates[1].body, "https://news.example/b");
        assert_eq!(candidates[2].label, "List B: Officials: @mayor on the budget vote");
    }

    #[test]
    fn test_preamble_without_header_is_skipped() {
        let candidates = GroupedListDetector.detect(TWO_LISTS).unwrap();
        assert!(candidates.iter().all(|c| !c.body.contains("Here are the sources")));
    }

    #[test]
    fn test_long_line_label_is_cut_without_ellipsis() {
        let line = "x".repeat(120);
        let text = format!("**List A: Long**\n{}", line);
        let candidates = GroupedListDetector.detect(&text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].label, format!("List A: Long: {}", "x".repeat(80)));
        assert_eq!(candidates[0].body, line);
    }

    #[test]
    fn test_header_without_items_yields_nothing() {
        let candidates = GroupedListDetector.detect("**List A: Empty**\n\n").unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_header_on_same_line_as_item() {
        let candidates = GroupedListDetector
            .detect("**List C: Inline** https://a.example\nhttps://b.example")
            .unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].body, "https://a.example");
    }
}
