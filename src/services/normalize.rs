// src/services/normalize.rs

//! Posting normalization.
//!
//! Maps discussion posts and feed rows onto the uniform [`Posting`] record.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::models::{DiscussionPost, FeedRow, FilterConfig, Posting, RawRecord};

static BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("bracket pattern is valid"));
static LOCATION_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[|/,·•]+").expect("split pattern is valid"));
static AGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*(h|d|w|mo)\s*$").expect("age pattern is valid")
});

/// Characters trimmed from both ends of a cleaned title.
const TITLE_TRIM: &[char] = &[' ', '-', '|', '·', '•', '—', '–'];

/// Grapheme cap on description snippets.
const SNIPPET_LEN: usize = 280;

/// Builds postings from raw records.
#[derive(Debug, Clone)]
pub struct PostingNormalizer {
    title_tags: Option<Regex>,
    non_location_tags: HashSet<String>,
}

impl PostingNormalizer {
    pub fn new(config: &FilterConfig) -> Result<Self> {
        let tags: Vec<String> = config
            .title_tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();
        let title_tags = if tags.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"(?i)\[\s*(?:{})\s*\]", tags.join("|")))?)
        };

        Ok(Self {
            title_tags,
            non_location_tags: config
                .non_location_tags
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
        })
    }

    /// Strip platform tags, collapse whitespace and trim stray separators.
    pub fn clean_title(&self, title: &str) -> String {
        let stripped = match &self.title_tags {
            Some(re) => re.replace_all(title, " ").into_owned(),
            None => title.to_string(),
        };
        stripped
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(TITLE_TRIM)
            .to_string()
    }

    /// Locations listed in bracketed groups of the raw title.
    pub fn locations_from_title(&self, title: &str) -> Vec<String> {
        BRACKET_RE
            .captures_iter(title)
            .filter_map(|caps| caps.get(1))
            .flat_map(|group| LOCATION_SPLIT_RE.split(group.as_str()))
            .map(str::trim)
            .filter(|piece| {
                !piece.is_empty() && !self.non_location_tags.contains(&piece.to_lowercase())
            })
            .map(str::to_string)
            .collect()
    }

    /// Build a posting from a record that passed screening.
    ///
    /// `url` is the resolved application link; `now` is the run clock in epoch seconds.
    pub fn normalize(&self, record: &RawRecord, url: &str, now: i64) -> Posting {
        let source = record.source_tag();
        match record {
            RawRecord::Discussion(post) => self.from_discussion(post, url, source),
            RawRecord::Feed(row) => Self::from_feed(row, url, source, now),
        }
    }

    fn from_discussion(&self, post: &DiscussionPost, url: &str, source: String) -> Posting {
        Posting {
            id: post.id.clone(),
            title: self.clean_title(&post.title),
            url: url.to_string(),
            source,
            created_at: post.created_utc,
            locations: self.locations_from_title(&post.title),
            description: snippet(&post.body),
        }
    }

    fn from_feed(row: &FeedRow, url: &str, source: String, now: i64) -> Posting {
        let created_at = row
            .age
            .as_deref()
            .and_then(parse_age)
            .map_or(now, |age| now - age);

        Posting {
            id: feed_id(&row.company, &row.role, url),
            title: format!("{} — {}", row.company.trim(), row.role.trim()),
            url: url.to_string(),
            source,
            created_at,
            locations: row.locations.clone(),
            description: String::new(),
        }
    }
}

/// Stable content hash for rows without a native id.
pub fn feed_id(company: &str, role: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(company.as_bytes());
    hasher.update(role.as_bytes());
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse an age column like `5h`, `3d`, `2w` or `1mo` into seconds.
pub fn parse_age(age: &str) -> Option<i64> {
    let caps = AGE_RE.captures(age)?;
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "h" => 3_600,
        "d" => 86_400,
        "w" => 7 * 86_400,
        "mo" => 30 * 86_400,
        _ => return None,
    };
    amount.checked_mul(unit)
}

/// First few sentences of a body, whitespace collapsed.
fn snippet(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut graphemes = collapsed.graphemes(true);
    let head: String = graphemes.by_ref().take(SNIPPET_LEN).collect();
    if graphemes.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
