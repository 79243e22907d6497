//! Fallback block format: blank-line separated blocks that look like sources.

use std::sync::LazyLock;

use regex::Regex;

use super::text::truncate_with_ellipsis;
use super::{Candidate, Detector};
use crate::error::Result;

static BLOCK_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

static HAS_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://").unwrap());

static HAS_HANDLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@[A-Za-z0-9_]+").unwrap());

static HAS_FIELD_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:Author|Tweet|Content|Post [0-9]):").unwrap());

/// Headings of methodology or search-parameter preambles that are not sources.
pub const DEFAULT_BLOCK_EXCLUSIONS: &[&str] = &[
    r"(?i)^\*\*search parameters\*\*",
    r"(?i)^\*\*context\*\*",
    r"(?i)^\*\*localization note\*\*",
    r"(?i)^#{1,4}\s+.*search results",
];

static DEFAULT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DEFAULT_BLOCK_EXCLUSIONS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Maximum characters of a block kept in its label
const BLOCK_PREVIEW_CHARS: usize = 100;

/// Patterns that reject a block even when it looks like a source.
///
/// The list is not meant to be complete; callers extend or replace it.
#[derive(Debug, Clone)]
pub struct BlockExclusions {
    patterns: Vec<Regex>,
}

impl Default for BlockExclusions {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.clone(),
        }
    }
}

impl BlockExclusions {
    /// Compile a custom exclusion list.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// An empty list: no block is excluded.
    pub fn none() -> Self {
        Self { patterns: Vec::new() }
    }

    /// Add one more pattern.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.patterns.push(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_excluded(&self, block: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(block))
    }
}

pub struct FallbackBlockDetector {
    exclusions: BlockExclusions,
}

impl FallbackBlockDetector {
    pub fn new(exclusions: BlockExclusions) -> Self {
        Self { exclusions }
    }
}

impl Default for FallbackBlockDetector {
    fn default() -> Self {
        Self::new(BlockExclusions::default())
    }
}

/// URL, @handle or a field label such as `Author:`
fn looks_like_source(block: &str) -> bool {
    HAS_URL.is_match(block) || HAS_HANDLE.is_match(block) || HAS_FIELD_LABEL.is_match(block)
}

impl Detector for FallbackBlockDetector {
    fn name(&self) -> &'static str {
        "fallback-blocks"
    }

    fn detect(&self, text: &str) -> Option<Vec<Candidate>> {
        let blocks: Vec<&str> = BLOCK_SEPARATOR
            .split(text)
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .collect();

        // A single block is the whole answer, not a list of sources.
        if blocks.len() < 2 {
            return None;
        }

        let candidates = blocks
            .into_iter()
            .filter(|block| looks_like_source(block) && !self.exclusions.is_excluded(block))
            .map(|block| Candidate::new(truncate_with_ellipsis(block, BLOCK_PREVIEW_CHARS), block))
            .collect();
        Some(candidates)
    }
}
