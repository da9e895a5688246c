// src/pipeline/run.rs

//! Run orchestration.
//!
//! Fetches every source, screens each one, then applies the cross-source
//! stages: dedup, title screen, staleness, location, already-announced,
//! recency sort and truncation. Delivered postings are appended to the run
//! state.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Utc};

use crate::error::Result;
use crate::models::{Config, FilterStats, Posting, RejectReason};
use crate::services::classify::is_stale;
use crate::services::{
    Deliverer, LinkClassifier, LinkProbe, LinkResolver, PostSource, PostingNormalizer,
    ResolutionBudget, TextClassifier,
};
use crate::storage::{RunState, StateStore};
use crate::utils::canonicalize;

use super::filter::SourceFilter;

/// Line format for dry-run digests.
pub const DIGEST_TEMPLATE: &str = "[{source}] {title} ({locations})\n    {url}";

/// Per-run switches.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Ignore the run state
    pub force: bool,
    /// Print instead of delivering; never writes state
    pub dry_run: bool,
    pub now: DateTime<Utc>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            dry_run: false,
            now: Utc::now(),
        }
    }
}

/// Collaborators of one run.
pub struct Hunt<'a> {
    pub sources: &'a [Box<dyn PostSource>],
    pub probe: &'a dyn LinkProbe,
    pub store: &'a dyn StateStore,
    /// `None` when no webhook is configured
    pub deliverer: Option<&'a dyn Deliverer>,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Final, ordered digest
    pub postings: Vec<Posting>,
    pub stats: FilterStats,
    /// Canonical keys appended to the run state
    pub announced: Vec<String>,
}

impl RunReport {
    /// Human-readable digest lines.
    pub fn digest(&self) -> Vec<String> {
        self.postings
            .iter()
            .map(|p| p.format(DIGEST_TEMPLATE))
            .collect()
    }
}

/// Run the whole hunt: collect, deliver, remember.
pub async fn run_hunt(
    config: &Config,
    hunt: &Hunt<'_>,
    options: &RunOptions,
) -> Result<RunReport> {
    let state = if options.force {
        log::info!("Force mode: ignoring run state");
        RunState::new()
    } else {
        let state = hunt.store.load().await;
        log::info!("Loaded {} previously announced link(s)", state.len());
        state
    };

    let (postings, stats) =
        collect_postings(config, hunt.sources, hunt.probe, &state, options).await?;
    let mut report = RunReport {
        postings,
        stats,
        announced: Vec::new(),
    };

    log::info!("{}", report.stats.summary_line());
    for failure in &report.stats.source_failures {
        log::warn!("Source failed: {failure}");
    }

    if report.postings.is_empty() {
        log::info!("No new postings found.");
        return Ok(report);
    }

    if options.dry_run {
        log::info!("Dry run: {} posting(s) not delivered", report.postings.len());
        return Ok(report);
    }

    let Some(deliverer) = hunt.deliverer else {
        log::warn!("No webhook configured; nothing delivered");
        return Ok(report);
    };

    let delivery = deliverer.deliver(&report.postings).await?;
    report.announced = delivery
        .delivered
        .iter()
        .filter_map(|&i| report.postings.get(i))
        .map(|p| canonicalize(&p.url))
        .collect();

    if delivery.batches_failed > 0 {
        log::warn!(
            "{} batch(es) failed; {} of {} posting(s) delivered",
            delivery.batches_failed,
            report.announced.len(),
            report.postings.len()
        );
    }

    if let Err(e) = hunt.store.append(&report.announced).await {
        log::error!("Failed to save run state: {e}");
    } else if !report.announced.is_empty() {
        log::info!("Recorded {} announced link(s)", report.announced.len());
    }

    Ok(report)
}

/// Fetch, screen and rank postings without side effects beyond the network.
pub async fn collect_postings(
    config: &Config,
    sources: &[Box<dyn PostSource>],
    probe: &dyn LinkProbe,
    state: &RunState,
    options: &RunOptions,
) -> Result<(Vec<Posting>, FilterStats)> {
    let text = TextClassifier::new(&config.filters)?;
    let links = LinkClassifier::new(config.links.clone());
    let normalizer = PostingNormalizer::new(&config.filters)?;
    let filter = SourceFilter::new(
        &text,
        &links,
        LinkResolver::new(probe, &links),
        &normalizer,
        options.now.timestamp(),
    );

    let mut stats = FilterStats::default();
    let mut budget = ResolutionBudget::new(config.run.max_validations_per_run);
    let mut merged = Vec::new();

    for source in sources {
        let records = match source.fetch().await {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Error fetching {}: {} (continuing)", source.name(), e);
                stats.record_source_failure(source.name(), &e);
                continue;
            }
        };
        stats.totals.raw += records.len();

        let postings = filter.screen(&records, &mut budget, &mut stats).await;
        log::info!(
            "{}: {} of {} record(s) passed screening",
            source.name(),
            postings.len(),
            records.len()
        );
        merged.extend(postings);
    }
    stats.totals.screened = merged.len();
    stats.resolution_calls = budget.spent();
    if budget.is_exhausted() {
        log::info!("Link resolution budget exhausted ({} calls)", budget.spent());
    }

    let unique = dedup_by_key(merged, &mut stats);
    stats.totals.unique = unique.len();

    let year = options.now.year();
    let title_ok: Vec<Posting> = unique
        .into_iter()
        .filter(|p| match text.seniority_rejection(&p.title) {
            Some(reason) => {
                stats.reject(reason);
                false
            }
            None if is_stale(&p.title, year) => {
                stats.reject(RejectReason::Stale);
                false
            }
            None => true,
        })
        .collect();
    stats.totals.title_ok = title_ok.len();

    let location_ok: Vec<Posting> = title_ok
        .into_iter()
        .filter(|p| {
            let accepted = text.classify_location(&p.title, &p.locations).is_accepted();
            if !accepted {
                stats.reject(RejectReason::Location);
            }
            accepted
        })
        .collect();
    stats.totals.location_ok = location_ok.len();

    let mut fresh: Vec<Posting> = location_ok
        .into_iter()
        .filter(|p| {
            let seen = state.contains(&canonicalize(&p.url));
            if seen {
                stats.reject(RejectReason::AlreadyPosted);
            }
            !seen
        })
        .collect();
    stats.totals.new = fresh.len();

    // Stable: ties keep merge order.
    fresh.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let limit = config.run.max_posts_per_run;
    if fresh.len() > limit {
        for _ in limit..fresh.len() {
            stats.reject(RejectReason::OverLimit);
        }
        fresh.truncate(limit);
    }
    stats.totals.posting = fresh.len();

    Ok((fresh, stats))
}

/// Keep the first posting per canonical URL key.
fn dedup_by_key(postings: Vec<Posting>, stats: &mut FilterStats) -> Vec<Posting> {
    let mut seen = HashSet::new();
    postings
        .into_iter()
        .filter(|p| {
            let key = canonicalize(&p.url);
            if key.is_empty() {
                stats.reject(RejectReason::InvalidLink);
                return false;
            }
            if !seen.insert(key) {
                stats.reject(RejectReason::Duplicate);
                return false;
            }
            true
        })
        .collect()
}
