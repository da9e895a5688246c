//! Per-run diagnostic counters.

use std::collections::BTreeMap;
use std::fmt;

/// Why a record or posting was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectReason {
    Pinned,
    Megathread,
    NoHiringIntent,
    NotStudentFriendly,
    NoCandidateLink,
    InvalidLink,
    NoValidLink,
    Duplicate,
    Seniority,
    AdvancedDegree,
    Stale,
    Location,
    AlreadyPosted,
    OverLimit,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Pinned => "pinned",
            RejectReason::Megathread => "megathread",
            RejectReason::NoHiringIntent => "no_hiring_intent",
            RejectReason::NotStudentFriendly => "not_student_friendly",
            RejectReason::NoCandidateLink => "no_candidate_link",
            RejectReason::InvalidLink => "invalid_link",
            RejectReason::NoValidLink => "no_valid_link",
            RejectReason::Duplicate => "duplicate",
            RejectReason::Seniority => "seniority",
            RejectReason::AdvancedDegree => "advanced_degree",
            RejectReason::Stale => "stale",
            RejectReason::Location => "location",
            RejectReason::AlreadyPosted => "already_posted",
            RejectReason::OverLimit => "over_limit",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage totals for the run summary line.
#[derive(Debug, Clone, Default)]
pub struct StageTotals {
    pub raw: usize,
    pub screened: usize,
    pub unique: usize,
    pub title_ok: usize,
    pub location_ok: usize,
    pub new: usize,
    pub posting: usize,
}

/// Counters keyed by rejection reason, plus source failures.
#[derive(Debug, Clone, Default)]
pub struct FilterStats {
    pub rejected: BTreeMap<RejectReason, usize>,
    pub source_failures: Vec<String>,
    pub totals: StageTotals,
    /// Expensive link resolution calls made this run
    pub resolution_calls: usize,
}

impl FilterStats {
    pub fn reject(&mut self, reason: RejectReason) {
        *self.rejected.entry(reason).or_default() += 1;
    }

    pub fn count(&self, reason: RejectReason) -> usize {
        self.rejected.get(&reason).copied().unwrap_or(0)
    }

    pub fn record_source_failure(&mut self, source: &str, message: impl fmt::Display) {
        self.source_failures.push(format!("{source}: {message}"));
    }

    /// One-line summary of the stage totals.
    pub fn summary_line(&self) -> String {
        let t = &self.totals;
        format!(
            "total:{} | screened:{} | unique:{} | title_ok:{} | loc_ok:{} | new:{} | posting:{}",
            t.raw, t.screened, t.unique, t.title_ok, t.location_ok, t.new, t.posting
        )
    }
}
