// src/pipeline/filter.rs

//! Per-source filter chain.
//!
//! Screens the raw records of one source and turns the survivors into
//! postings:
//!
//! 1. pinned posts
//! 2. megathreads and recurring threads
//! 3. intent (hiring intent for discussion posts, student focus for feed rows)
//! 4. candidate links, ranked trusted-ATS first
//! 5. resolution in rank order; first valid link wins
//! 6. normalization

use std::collections::HashSet;

use crate::models::{FilterStats, Posting, RawRecord, RejectReason};
use crate::services::{
    LinkClass, LinkClassifier, LinkResolver, PostingNormalizer, ResolutionBudget, TextClassifier,
};
use crate::utils::canonicalize;
use crate::utils::url::extract_urls;

/// Marker some feed rows carry when the upstream link checker flagged them.
const FEED_ERROR_MARKER: &str = "error=true";

/// A candidate link with its class.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    url: String,
    class: LinkClass,
    /// Already probed while unwrapping a shortener
    verified: bool,
}

/// Filter chain shared by every source of a run.
pub struct SourceFilter<'a> {
    text: &'a TextClassifier,
    links: &'a LinkClassifier,
    resolver: LinkResolver<'a>,
    normalizer: &'a PostingNormalizer,
    /// Run clock, epoch seconds
    now: i64,
}

impl<'a> SourceFilter<'a> {
    pub fn new(
        text: &'a TextClassifier,
        links: &'a LinkClassifier,
        resolver: LinkResolver<'a>,
        normalizer: &'a PostingNormalizer,
        now: i64,
    ) -> Self {
        Self {
            text,
            links,
            resolver,
            normalizer,
            now,
        }
    }

    /// Screen one source's records. Rejections are counted in `stats`.
    pub async fn screen(
        &self,
        records: &[RawRecord],
        budget: &mut ResolutionBudget,
        stats: &mut FilterStats,
    ) -> Vec<Posting> {
        let mut postings = Vec::new();
        for record in records {
            match self.screen_one(record, budget).await {
                Ok(posting) => postings.push(posting),
                Err(reason) => {
                    log::debug!("Rejected ({}): {}", reason, record.headline());
                    stats.reject(reason);
                }
            }
        }
        postings
    }

    async fn screen_one(
        &self,
        record: &RawRecord,
        budget: &mut ResolutionBudget,
    ) -> Result<Posting, RejectReason> {
        if record.is_pinned() {
            return Err(RejectReason::Pinned);
        }

        let headline = record.headline();
        if self.text.is_megathread(&headline) {
            return Err(RejectReason::Megathread);
        }

        self.check_intent(record)?;

        let candidates = self.rank_candidates(record, budget).await?;
        if candidates.is_empty() {
            return Err(RejectReason::NoCandidateLink);
        }

        for candidate in &candidates {
            if candidate.verified {
                return Ok(self.normalizer.normalize(record, &candidate.url, self.now));
            }
            let resolution = self.resolver.resolve(&candidate.url, budget).await;
            if resolution.is_valid() {
                return Ok(self.normalizer.normalize(record, resolution.url(), self.now));
            }
        }
        Err(RejectReason::NoValidLink)
    }

    fn check_intent(&self, record: &RawRecord) -> Result<(), RejectReason> {
        match record {
            RawRecord::Discussion(post) => {
                let ats_link = primary_link(record)
                    .is_some_and(|link| self.links.classify(link) == LinkClass::TrustedAts);
                if self.text.has_hiring_intent(&post.title, &post.body, ats_link) {
                    Ok(())
                } else {
                    Err(RejectReason::NoHiringIntent)
                }
            }
            RawRecord::Feed(_) => {
                if self.text.is_student_friendly(&record.headline()) {
                    Ok(())
                } else {
                    Err(RejectReason::NotStudentFriendly)
                }
            }
        }
    }

    /// Accepted candidates, deduplicated by canonical key, trusted-ATS first.
    async fn rank_candidates(
        &self,
        record: &RawRecord,
        budget: &mut ResolutionBudget,
    ) -> Result<Vec<Candidate>, RejectReason> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for raw in raw_candidates(record) {
            let key = canonicalize(&raw);
            if key.is_empty() || !seen.insert(key) {
                continue;
            }

            if matches!(record, RawRecord::Feed(_)) && raw.contains(FEED_ERROR_MARKER) {
                return Err(RejectReason::InvalidLink);
            }

            let (url, verified) = if self.links.is_shortener(&raw) {
                let resolution = self.resolver.unwrap_shortener(&raw, budget).await;
                if !resolution.is_valid() {
                    log::debug!("Dropping unresolved shortener {raw}");
                    continue;
                }
                (resolution.url().to_string(), true)
            } else {
                (raw, false)
            };

            let class = self.links.classify(&url);
            if class.is_accepted() {
                candidates.push(Candidate {
                    url,
                    class,
                    verified,
                });
            }
        }

        // Stable: keeps source order within a class.
        candidates.sort_by_key(|c| c.class);
        Ok(candidates)
    }
}

/// The record's own link: a link post's target or a feed row's apply URL.
fn primary_link(record: &RawRecord) -> Option<&str> {
    match record {
        RawRecord::Discussion(post) if !post.is_self => post.link.as_deref(),
        RawRecord::Discussion(_) => None,
        RawRecord::Feed(row) => row.apply_url.as_deref(),
    }
    .map(str::trim)
    .filter(|link| !link.is_empty())
}

/// Primary link first, then links found in the body.
fn raw_candidates(record: &RawRecord) -> Vec<String> {
    let mut urls: Vec<String> = primary_link(record).map(str::to_string).into_iter().collect();
    if let RawRecord::Discussion(post) = record {
        urls.extend(extract_urls(&post.body));
    }
    urls
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::Method;

    use super::*;
    use crate::error::Result;
    use crate::models::{DiscussionPost, FeedRow, FilterConfig};
    use crate::services::LinkProbe;
    use crate::services::resolver::ProbeResponse;

    /// Answers 200 for every URL except those listed as dead; shorteners
    /// redirect to `target`.
    struct FakeProbe {
        dead: Vec<String>,
        target: String,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProbe {
        fn new(dead: &[&str]) -> Self {
            Self {
                dead: dead.iter().map(|s| s.to_string()).collect(),
                target: "https://jobs.lever.co/acme/42".to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LinkProbe for FakeProbe {
        async fn probe(&self, _method: Method, url: &str) -> Result<ProbeResponse> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.dead.iter().any(|d| d == url) {
                return Ok(ProbeResponse {
                    status: 404,
                    final_url: url.to_string(),
                });
            }
            let final_url = if url.contains("bit.ly") {
                self.target.clone()
            } else {
                url.to_string()
            };
            Ok(ProbeResponse {
                status: 200,
                final_url,
            })
        }
    }

    struct Fixture {
        text: TextClassifier,
        links: LinkClassifier,
        normalizer: PostingNormalizer,
    }

    impl Fixture {
        fn new() -> Self {
            let filters = FilterConfig::default();
            Self {
                text: TextClassifier::new(&filters).unwrap(),
                links: LinkClassifier::default(),
                normalizer: PostingNormalizer::new(&filters).unwrap(),
            }
        }

        fn filter<'a>(&'a self, probe: &'a FakeProbe) -> SourceFilter<'a> {
            SourceFilter::new(
                &self.text,
                &self.links,
                LinkResolver::new(probe, &self.links),
                &self.normalizer,
                1_760_000_000,
            )
        }
    }

    fn link_post(title: &str, link: &str) -> RawRecord {
        RawRecord::Discussion(DiscussionPost {
            id: "p1".into(),
            title: title.into(),
            link: Some(link.into()),
            community: "internships".into(),
            created_utc: 1_759_000_000,
            ..Default::default()
        })
    }

    fn self_post(title: &str, body: &str) -> RawRecord {
        RawRecord::Discussion(DiscussionPost {
            id: "p2".into(),
            title: title.into(),
            body: body.into(),
            link: Some("https://www.reddit.com/r/internships/comments/p2/".into()),
            is_self: true,
            community: "internships".into(),
            created_utc: 1_759_000_000,
            ..Default::default()
        })
    }

    fn feed_row(role: &str, apply_url: &str) -> RawRecord {
        RawRecord::Feed(FeedRow {
            company: "Acme".into(),
            role: role.into(),
            locations: vec!["San Francisco, CA".into()],
            apply_url: Some(apply_url.into()),
            age: Some("2d".into()),
            feed: "SimplifyJobs".into(),
        })
    }

    async fn run(
        fixture: &Fixture,
        probe: &FakeProbe,
        records: &[RawRecord],
    ) -> (Vec<Posting>, FilterStats) {
        let mut budget = ResolutionBudget::new(50);
        let mut stats = FilterStats::default();
        let postings = fixture
            .filter(probe)
            .screen(records, &mut budget, &mut stats)
            .await;
        (postings, stats)
    }

    #[tokio::test]
    async fn test_ats_link_post_passes_without_probe() {
        let fixture = Fixture::new();
        let probe = FakeProbe::new(&[]);
        let records = [link_post(
            "[Hiring] Software Engineer Intern [Remote]",
            "https://jobs.lever.co/acme/1",
        )];

        let (postings, _) = run(&fixture, &probe, &records).await;
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].url, "https://jobs.lever.co/acme/1");
        assert_eq!(postings[0].source, "r/internships");
        assert!(probe.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pinned_and_megathread_rejected() {
        let fixture = Fixture::new();
        let probe = FakeProbe::new(&[]);
        let mut pinned = link_post("Hiring intern", "https://jobs.lever.co/acme/1");
        if let RawRecord::Discussion(post) = &mut pinned {
            post.pinned = true;
        }
        let records = [
            pinned,
            self_post("Weekly Hiring Thread", "post intern roles here"),
        ];

        let (postings, stats) = run(&fixture, &probe, &records).await;
        assert!(postings.is_empty());
        assert_eq!(stats.count(RejectReason::Pinned), 1);
        assert_eq!(stats.count(RejectReason::Megathread), 1);
    }

    #[tokio::test]
    async fn test_no_hiring_intent() {
        let fixture = Fixture::new();
        let probe = FakeProbe::new(&[]);
        let records = [self_post(
            "How do I prepare for interviews?",
            "https://acme.com/careers/intern",
        )];

        let (postings, stats) = run(&fixture, &probe, &records).await;
        assert!(postings.is_empty());
        assert_eq!(stats.count(RejectReason::NoHiringIntent), 1);
    }

    #[tokio::test]
    async fn test_body_links_ranked_ats_first() {
        let fixture = Fixture::new();
        let probe = FakeProbe::new(&[]);
        let records = [self_post(
            "Hiring summer intern",
            "Apply at https://acme.com/careers/intern or [here](https://boards.greenhouse.io/acme/jobs/9).",
        )];

        let (postings, _) = run(&fixture, &probe, &records).await;
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].url, "https://boards.greenhouse.io/acme/jobs/9");
        assert!(probe.calls().is_empty());
    }

    #[tokio::test]
    async fn test_first_valid_candidate_wins() {
        let fixture = Fixture::new();
        let probe = FakeProbe::new(&["https://acme.com/careers/dead"]);
        let records = [self_post(
            "Hiring intern",
            "https://acme.com/careers/dead and https://acme.com/jobs/live",
        )];

        let (postings, _) = run(&fixture, &probe, &records).await;
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].url, "https://acme.com/jobs/live");
        assert_eq!(probe.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_no_candidate_and_no_valid_link() {
        let fixture = Fixture::new();
        let probe = FakeProbe::new(&["https://acme.com/careers/dead"]);
        let records = [
            self_post("Hiring intern", "see https://imgur.com/a/flyer.png"),
            self_post("Hiring intern", "https://acme.com/careers/dead"),
        ];

        let (postings, stats) = run(&fixture, &probe, &records).await;
        assert!(postings.is_empty());
        assert_eq!(stats.count(RejectReason::NoCandidateLink), 1);
        assert_eq!(stats.count(RejectReason::NoValidLink), 1);
    }

    #[tokio::test]
    async fn test_shortener_resolved_then_classified() {
        let fixture = Fixture::new();
        let probe = FakeProbe::new(&[]);
        let records = [link_post("Hiring SWE intern", "https://bit.ly/xyz")];

        let (postings, _) = run(&fixture, &probe, &records).await;
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].url, "https://jobs.lever.co/acme/42");
        assert_eq!(probe.calls(), vec!["https://bit.ly/xyz".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_body_links_probed_once() {
        let fixture = Fixture::new();
        let probe = FakeProbe::new(&[]);
        let records = [self_post(
            "Hiring intern",
            "https://acme.com/careers/x https://ACME.com/careers/x/ https://acme.com/careers/x?utm_source=r",
        )];

        let (postings, _) = run(&fixture, &probe, &records).await;
        assert_eq!(postings.len(), 1);
        assert_eq!(probe.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_feed_rows() {
        let fixture = Fixture::new();
        let probe = FakeProbe::new(&[]);
        let records = [
            feed_row("Software Engineering Intern", "https://jobs.lever.co/acme/7"),
            feed_row("Staff Engineer", "https://jobs.lever.co/acme/8"),
            feed_row("Data Science Intern", "https://acme.com/careers/1?error=true"),
        ];

        let (postings, stats) = run(&fixture, &probe, &records).await;
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].source, "SimplifyJobs");
        assert_eq!(postings[0].created_at, 1_760_000_000 - 2 * 86_400);
        assert_eq!(stats.count(RejectReason::NotStudentFriendly), 1);
        assert_eq!(stats.count(RejectReason::InvalidLink), 1);
    }

    #[tokio::test]
    async fn test_feed_roles_with_topic_words_pass() {
        let fixture = Fixture::new();
        let probe = FakeProbe::new(&[]);
        let records = [
            feed_row("Human Resources Intern", "https://jobs.lever.co/acme/21"),
            feed_row("Clinical Study Intern", "https://jobs.lever.co/acme/22"),
            feed_row("Data Collection Intern", "https://jobs.lever.co/acme/23"),
        ];

        let (postings, stats) = run(&fixture, &probe, &records).await;
        assert_eq!(postings.len(), 3);
        assert_eq!(stats.count(RejectReason::Megathread), 0);
    }
}
