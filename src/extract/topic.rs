//! Topic/post format: `###`/`####` numbered topic headers, each holding
//! numbered posts with labeled fields (`**Author**:`, `**Post**:`, `**Link**:`,
//! `**Engagement**:`).

use std::sync::LazyLock;

use regex::Regex;

use super::text::{split_before, truncate_with_ellipsis};
use super::{Candidate, Detector};

static TOPIC_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#{3,4}\s+(?:Topic\s+)?[0-9]").unwrap());

static TOPIC_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{3,4}\s+(?:Topic\s+)?[0-9]").unwrap());

static TOPIC_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#{3,4}\s+(?:Topic\s+)?([0-9]+)[.:]\s*([^\n]+?)\s*\n((?s:.*))$").unwrap()
});

static POST_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[0-9]+\.\s+\*\*").unwrap());

static POST_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+\.\s+\*\*").unwrap());

static AUTHOR_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Author\*\*:\s*([^\n]+?)(?:\n|$)").unwrap());

static CONTENT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)\*\*Post(?:\s+Content)?\*\*:\s*["“”]?(.*?)["“”]?\s*(?:\*\*Link\*\*:|\*\*Engagement\*\*:|$)"#,
    )
    .unwrap()
});

static LEADING_RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^---\s*\n?").unwrap());

/// Maximum characters of post content kept in a label
const CONTENT_PREVIEW_CHARS: usize = 80;

pub struct TopicPostDetector;

impl Detector for TopicPostDetector {
    fn name(&self) -> &'static str {
        "topic-post"
    }

    fn detect(&self, text: &str) -> Option<Vec<Candidate>> {
        if !TOPIC_MARKER.is_match(text) {
            return None;
        }

        let mut candidates = Vec::new();
        for section in split_before(text, &TOPIC_LINE) {
            let section = section.trim();
            let Some(caps) = TOPIC_HEADER.captures(section) else {
                continue;
            };
            let number = &caps[1];
            let title = caps[2].trim_matches('*').trim();
            let topic_body = caps.get(3).map_or("", |m| m.as_str());

            let before = candidates.len();
            for part in split_before(topic_body, &POST_LINE) {
                let part = part.trim();
                if part.is_empty() || !POST_START.is_match(part) {
                    continue;
                }
                candidates.push(Candidate::new(post_label(title, part), part));
            }

            if candidates.len() == before {
                let body = LEADING_RULE.replace(topic_body, "");
                candidates.push(Candidate::new(format!("{}. {}", number, title), body.trim()));
            }
        }
        Some(candidates)
    }
}

/// Build `"<topic> — <author>: <content preview>"` for one post.
fn post_label(title: &str, post: &str) -> String {
    let author = AUTHOR_FIELD
        .captures(post)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();

    if author.is_empty() {
        return format!("{} — Post", title);
    }

    match post_content(post) {
        Some(content) => format!(
            "{} — {}: {}",
            title,
            author,
            truncate_with_ellipsis(&content, CONTENT_PREVIEW_CHARS)
        ),
        None => format!("{} — {}", title, author),
    }
}

/// Post text with surrounding quotes (straight or curly) removed.
fn post_content(post: &str) -> Option<String> {
    let caps = CONTENT_FIELD.captures(post)?;
    let content: String = caps[1]
        .chars()
        .filter(|c| !matches!(c, '"' | '“' | '”'))
        .collect();
    let content = content.trim();
    (!content.is_empty()).then(|| content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TOPICS: &str = r#"Search results for this week.

### Topic 1: **Water main break**
1. **Author**: Jane Doe (@janedoe)
**Post**: "Crews are on site at 5th and Main"
**Link**: https://x.com/janedoe/status/1
**Engagement**: 40 likes

2. **Author**: City Water (@citywater)
**Post Content**: “Repairs expected by Friday”
**Link**: https://x.com/citywater/status/2

#### 2. School board vote
1. **Author**: Reporter (@rep)
**Post**: Budget approved 5-2
"#;

    #[test]
    fn test_no_topic_header_is_no_match() {
        assert!(TopicPostDetector.detect("plain text\nwith lines").is_none());
    }

    #[test]
    fn test_one_candidate_per_post() {
        let candidates = TopicPostDetector.detect(TWO_TOPICS).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(
            candidates[0].label,
            "Water main break — Jane Doe (@janedoe): Crews are on site at 5th and Main"
        );
        assert!(candidates[0].body.starts_with("1. **Author**: Jane Doe"));
        assert!(candidates[0].body.contains("**Engagement**: 40 likes"));
    }

    #[test]
    fn test_curly_quotes_stripped_from_content() {
        let candidates = TopicPostDetector.detect(TWO_TOPICS).unwrap();
        assert_eq!(
            candidates[1].label,
            "Water main break — City Water (@citywater): Repairs expected by Friday"
        );
    }

    #[test]
    fn test_topic_number_must_be_ascii() {
        let text = "### Topic \u{0661}: Arabic-Indic numbering\n1. **Author**: A\n**Post**: hi\n";
        assert!(TopicPostDetector.detect(text).is_none());
        let text = "### Topic 1: Titled\n\u{0662}. **Author**: B\n**Post**: hi\n";
        let candidates = TopicPostDetector.detect(text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].label, "1. Titled");
    }

    #[test]
    fn test_unquoted_content_and_plain_title() {
        let candidates = TopicPostDetector.detect(TWO_TOPICS).unwrap();
        assert_eq!(candidates[2].label, "School board vote — Reporter (@rep): Budget approved 5-2");
    }

    #[test]
    fn test_long_content_preview_gets_ellipsis() {
        let content = "word ".repeat(30);
        let text = format!("### 1. Topic\n1. **Author**: A\n**Post**: {}\n", content);
        let candidates = TopicPostDetector.detect(&text).unwrap();
        let expected_preview = &content.trim()[..80];
        assert_eq!(candidates[0].label, format!("Topic — A: {}...", expected_preview));
    }

    #[test]
    fn test_post_without_author_uses_generic_label() {
        let text = "### 1. Flooding\n1. **Source**: county alert\n";
        let candidates = TopicPostDetector.detect(text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].label, "Flooding — Post");
    }

    #[test]
    fn test_author_without_content() {
        let text = "### 1. Flooding\n1. **Author**: Sam\n**Link**: https://a.example\n";
        let candidates = TopicPostDetector.detect(text).unwrap();
        assert_eq!(candidates[0].label, "Flooding — Sam");
    }

    #[test]
    fn test_section_without_posts_becomes_one_candidate() {
        let text = "### Topic 3: Road closures\n---\nI-94 closed overnight near exit 12.\n";
        let candidates = TopicPostDetector.detect(text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].label, "3. Road closures");
        assert_eq!(candidates[0].body, "I-94 closed overnight near exit 12.");
    }

    #[test]
    fn test_mixed_sections() {
        let text = "### 1. With posts\n1. **Author**: A\n**Post**: x\n2. **Author**: B\n**Post**: y\n\
### 2. Without posts\nJust a summary paragraph.\n";
        let candidates = TopicPostDetector.detect(text).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[2].label, "2. Without posts");
        assert_eq!(candidates[2].body, "Just a summary paragraph.");
    }

    #[test]
    fn test_header_without_body_line_is_skipped() {
        let candidates = TopicPostDetector.detect("### 1. Lonely header").unwrap();
        assert!(candidates.is_empty());
    }
}
