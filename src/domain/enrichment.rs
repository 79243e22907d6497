//! Enrichment metadata attached to URLs referenced by sources
//!
//! The enrichment table arrives as a side channel of a completed source-list
//! run, keyed by the cleaned URL string. Entries are looked up, never mutated.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// URL -> enrichment lookup table
pub type EnrichmentTable = HashMap<String, Enrichment>;

/// Structured metadata about a URL mentioned in a source body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Enrichment {
    /// A post on a social network
    #[serde(rename = "twitter", alias = "social-post")]
    SocialPost {
        #[serde(rename = "author_name", alias = "author", default)]
        author: String,
        #[serde(default)]
        text: String,
        #[serde(
            default,
            deserialize_with = "empty_as_none",
            skip_serializing_if = "Option::is_none"
        )]
        created_at: Option<String>,
        url: String,
    },

    /// Title and leading text of a web page
    #[serde(rename = "website", alias = "web-page")]
    WebPage {
        #[serde(
            default,
            deserialize_with = "empty_as_none",
            skip_serializing_if = "Option::is_none"
        )]
        title: Option<String>,
        #[serde(default)]
        text: String,
        url: String,
    },
}

impl Enrichment {
    /// Short kind name for display
    pub fn kind(&self) -> &'static str {
        match self {
            Enrichment::SocialPost { .. } => "social-post",
            Enrichment::WebPage { .. } => "web-page",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Enrichment::SocialPost { url, .. } | Enrichment::WebPage { url, .. } => url,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Enrichment::SocialPost { text, .. } | Enrichment::WebPage { text, .. } => text,
        }
    }

    /// Calendar date of a social post, if the timestamp is in a known format.
    ///
    /// Accepts RFC 3339 and the X/Twitter `Wed Oct 10 20:19:24 +0000 2018` form.
    pub fn created_on(&self) -> Option<NaiveDate> {
        let Enrichment::SocialPost {
            created_at: Some(raw),
            ..
        } = self
        else {
            return None;
        };

        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y"))
            .map(|dt| dt.date_naive())
            .ok()
    }
}

/// Parse an enrichment table from its JSON wire form.
pub fn parse_table(raw: &str) -> Result<EnrichmentTable> {
    Ok(serde_json::from_str(raw)?)
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_twitter_wire_shape() {
        let raw = r#"{
            "type": "twitter",
            "author_name": "Jane Doe",
            "text": "Road closed on Main St",
            "created_at": "",
            "url": "https://x.com/jane/status/1"
        }"#;
        let enrichment: Enrichment = serde_json::from_str(raw).unwrap();
        match &enrichment {
            Enrichment::SocialPost {
                author, created_at, ..
            } => {
                assert_eq!(author, "Jane Doe");
                assert!(created_at.is_none());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
        assert_eq!(enrichment.kind(), "social-post");
        assert_eq!(enrichment.url(), "https://x.com/jane/status/1");
    }

    #[test]
    fn test_deserialize_web_page_alias() {
        let raw = r#"{"type": "web-page", "title": "City Council", "text": "Agenda", "url": "https://a.example"}"#;
        let enrichment: Enrichment = serde_json::from_str(raw).unwrap();
        assert_eq!(
            enrichment,
            Enrichment::WebPage {
                title: Some("City Council".to_string()),
                text: "Agenda".to_string(),
                url: "https://a.example".to_string(),
            }
        );
    }

    #[test]
    fn test_serialize_uses_wire_tag() {
        let enrichment = Enrichment::WebPage {
            title: None,
            text: "body".to_string(),
            url: "https://a.example".to_string(),
        };
        let value = serde_json::to_value(&enrichment).unwrap();
        assert_eq!(value["type"], "website");
        assert!(value.get("title").is_none());
    }

    #[test]
    fn test_created_on_rfc3339() {
        let enrichment = Enrichment::SocialPost {
            author: "a".to_string(),
            text: String::new(),
            created_at: Some("2025-03-04T10:00:00Z".to_string()),
            url: "https://x.com/a/status/1".to_string(),
        };
        assert_eq!(enrichment.created_on(), NaiveDate::from_ymd_opt(2025, 3, 4));
    }

    #[test]
    fn test_created_on_twitter_format() {
        let enrichment = Enrichment::SocialPost {
            author: "a".to_string(),
            text: String::new(),
            created_at: Some("Wed Oct 10 20:19:24 +0000 2018".to_string()),
            url: "https://x.com/a/status/1".to_string(),
        };
        assert_eq!(enrichment.created_on(), NaiveDate::from_ymd_opt(2018, 10, 10));
    }

    #[test]
    fn test_created_on_unknown_format() {
        let enrichment = Enrichment::SocialPost {
            author: "a".to_string(),
            text: String::new(),
            created_at: Some("yesterday".to_string()),
            url: "https://x.com/a/status/1".to_string(),
        };
        assert!(enrichment.created_on().is_none());
    }

    #[test]
    fn test_parse_table() {
        let raw = r#"{"https://a.example": {"type": "website", "title": "", "text": "t", "url": "https://a.example"}}"#;
        let table = parse_table(raw).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("https://a.example"));
    }

    #[test]
    fn test_parse_table_invalid() {
        assert!(parse_table("not json").is_err());
    }
}
