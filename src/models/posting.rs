//! Posting and raw source record structures.

/// A normalized, pipeline-ready job or internship posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Source-native id, or a content hash when the source has none
    pub id: String,

    /// Cleaned headline
    pub title: String,

    /// Application link; replaced by the resolved link during the pipeline
    pub url: String,

    /// Provenance tag, e.g. `r/internships` or `SimplifyJobs`
    pub source: String,

    /// Epoch seconds, used for recency ordering
    pub created_at: i64,

    /// Free-text locations, possibly empty
    pub locations: Vec<String>,

    pub description: String,
}

impl Posting {
    /// Format posting for display using a template.
    ///
    /// Supported placeholders: `{title}`, `{url}`, `{source}`, `{locations}`, `{id}`.
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{title}", &self.title)
            .replace("{url}", &self.url)
            .replace("{source}", &self.source)
            .replace("{locations}", &self.locations.join(" / "))
            .replace("{id}", &self.id)
    }
}

/// A post from a discussion community.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscussionPost {
    pub id: String,
    pub title: String,
    /// Self-text body (may contain markdown links)
    pub body: String,
    /// Link target of a link post
    pub link: Option<String>,
    /// True for text posts whose `link` points back at the post itself
    pub is_self: bool,
    /// Stickied/pinned by moderators
    pub pinned: bool,
    pub community: String,
    pub created_utc: i64,
}

/// A row of the curated internship table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedRow {
    pub company: String,
    pub role: String,
    pub locations: Vec<String>,
    pub apply_url: Option<String>,
    /// Age column as shown in the table, e.g. `3d` or `1mo`
    pub age: Option<String>,
    /// Feed name used as the posting source
    pub feed: String,
}

/// A source-native record before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Discussion(DiscussionPost),
    Feed(FeedRow),
}

impl RawRecord {
    /// Text the relevance classifiers look at.
    pub fn headline(&self) -> String {
        match self {
            RawRecord::Discussion(post) => post.title.clone(),
            RawRecord::Feed(row) => format!("{} {}", row.company, row.role),
        }
    }

    /// Provenance tag carried onto the posting.
    pub fn source_tag(&self) -> String {
        match self {
            RawRecord::Discussion(post) => format!("r/{}", post.community),
            RawRecord::Feed(row) => row.feed.clone(),
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, RawRecord::Discussion(post) if post.pinned)
    }
}
