// src/services/classify.rs

//! Text classifiers over posting titles and bodies.
//!
//! Every classifier is built from the token lists in [`FilterConfig`]. Tokens
//! match case-insensitively on alphanumeric boundaries, so `ca` never matches
//! inside `canada` and `sr.` still matches before a space.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::models::{FilterConfig, RejectReason};

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("year pattern is valid"));

/// A compiled set of tokens (and optional raw patterns).
#[derive(Debug, Clone)]
pub struct TokenSet {
    tokens: Option<Regex>,
    patterns: Vec<Regex>,
}

impl TokenSet {
    /// Compile a word-boundary matcher for the given tokens.
    pub fn new(tokens: &[String]) -> Result<Self> {
        Self::with_patterns(tokens, &[])
    }

    /// Compile tokens plus raw regex patterns (matched case-insensitively).
    pub fn with_patterns(tokens: &[String], patterns: &[String]) -> Result<Self> {
        let mut escaped: Vec<String> = tokens
            .iter()
            .map(|t| normalize(t))
            .filter(|t| !t.is_empty())
            .map(|t| regex::escape(&t))
            .collect();
        // Longest first so multi-word phrases win over their prefixes.
        escaped.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        escaped.dedup();

        let tokens = if escaped.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"(?i)(?:^|[^\p{{L}}\p{{N}}])(?:{})(?:[^\p{{L}}\p{{N}}]|$)",
                escaped.join("|")
            ))?)
        };

        let patterns = patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { tokens, patterns })
    }

    /// True if any token or pattern occurs in the text.
    pub fn matches(&self, text: &str) -> bool {
        let text = normalize(text);
        self.tokens.as_ref().is_some_and(|re| re.is_match(&text))
            || self.patterns.iter().any(|re| re.is_match(&text))
    }
}

/// True if any of the sets matches.
pub fn contains_any(text: &str, sets: &[&TokenSet]) -> bool {
    sets.iter().any(|set| set.matches(text))
}

/// True if every set matches.
pub fn contains_all(text: &str, sets: &[&TokenSet]) -> bool {
    sets.iter().all(|set| set.matches(text))
}

/// Collapse whitespace so phrases match across line breaks and double spaces.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Location verdict for a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Remote,
    California,
    Neither,
}

impl Location {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Location::Neither)
    }
}

/// All text classifiers, compiled once per run.
#[derive(Debug, Clone)]
pub struct TextClassifier {
    hiring: TokenSet,
    role: TokenSet,
    megathread: TokenSet,
    student: TokenSet,
    seniority: TokenSet,
    advanced_degree: TokenSet,
    bachelor: TokenSet,
    remote: TokenSet,
    california: TokenSet,
}

impl TextClassifier {
    pub fn new(config: &FilterConfig) -> Result<Self> {
        Ok(Self {
            hiring: TokenSet::new(&config.hiring_tokens)?,
            role: TokenSet::new(&config.role_tokens)?,
            megathread: TokenSet::with_patterns(
                &config.megathread_tokens,
                &config.megathread_patterns,
            )?,
            student: TokenSet::new(&config.student_tokens)?,
            seniority: TokenSet::new(&config.seniority_tokens)?,
            advanced_degree: TokenSet::with_patterns(
                &config.advanced_degree_tokens,
                &config.advanced_degree_patterns,
            )?,
            bachelor: TokenSet::new(&config.bachelor_tokens)?,
            remote: TokenSet::new(&config.remote_tokens)?,
            california: TokenSet::new(&config.california_tokens)?,
        })
    }

    /// Recurring threads, lists and discussions.
    pub fn is_megathread(&self, title: &str) -> bool {
        self.megathread.matches(title)
    }

    /// A role token in the title plus hiring evidence from the title, the
    /// body, or a trusted applicant-tracking link.
    pub fn has_hiring_intent(&self, title: &str, body: &str, ats_link: bool) -> bool {
        if contains_all(title, &[&self.role, &self.hiring]) {
            return true;
        }
        self.role.matches(title) && (ats_link || self.hiring.matches(body))
    }

    pub fn is_student_friendly(&self, text: &str) -> bool {
        self.student.matches(text)
    }

    /// Strict title screen: seniority always rejects; an advanced degree
    /// rejects unless a bachelor's/undergraduate mention is also present.
    pub fn seniority_rejection(&self, title: &str) -> Option<RejectReason> {
        if self.seniority.matches(title) {
            return Some(RejectReason::Seniority);
        }
        if self.advanced_degree.matches(title) && !self.bachelor.matches(title) {
            return Some(RejectReason::AdvancedDegree);
        }
        None
    }

    /// Classify title + locations. Without structured locations only the
    /// title is consulted, and only for remote synonyms.
    pub fn classify_location(&self, title: &str, locations: &[String]) -> Location {
        let locations: Vec<&str> = locations
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        if locations.is_empty() {
            return if self.remote.matches(title) {
                Location::Remote
            } else {
                Location::Neither
            };
        }

        let haystack = std::iter::once(title)
            .chain(locations)
            .collect::<Vec<_>>()
            .join(" | ");

        if self.remote.matches(&haystack) {
            Location::Remote
        } else if self.california.matches(&haystack) {
            Location::California
        } else {
            Location::Neither
        }
    }
}

/// All years mentioned in a title.
pub fn years_in(title: &str) -> Vec<i32> {
    YEAR_RE
        .captures_iter(title)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

/// A title is stale if it mentions years and the latest is before `current_year`.
pub fn is_stale(title: &str, current_year: i32) -> bool {
    years_in(title)
        .into_iter()
        .max()
        .is_some_and(|latest| latest < current_year)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TextClassifier {
        TextClassifier::new(&FilterConfig::default()).unwrap()
    }

    fn locs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_token_set_word_boundaries() {
        let set = TokenSet::new(&locs(&["ca", "sr.", "hybrid (remote"])).unwrap();
        assert!(set.matches("San Jose, CA"));
        assert!(set.matches("CA"));
        assert!(!set.matches("Toronto, Canada"));
        assert!(!set.matches("Credit card team"));
        assert!(set.matches("Sr. Engineer"));
        assert!(set.matches("Hybrid (Remote 2 days)"));
    }

    #[test]
    fn test_token_set_empty_never_matches() {
        let set = TokenSet::new(&[]).unwrap();
        assert!(!set.matches("anything"));
    }

    #[test]
    fn test_combinators() {
        let a = TokenSet::new(&locs(&["intern"])).unwrap();
        let b = TokenSet::new(&locs(&["hiring"])).unwrap();
        assert!(contains_any("we are hiring", &[&a, &b]));
        assert!(!contains_all("we are hiring", &[&a, &b]));
        assert!(contains_all("hiring an intern", &[&a, &b]));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(TokenSet::with_patterns(&[], &["(unclosed".to_string()]).is_err());
    }

    #[test]
    fn test_megathread() {
        let c = classifier();
        assert!(c.is_megathread("Weekly Hiring Thread - March"));
        assert!(c.is_megathread("Daily internship thread"));
        assert!(c.is_megathread("Internship MEGATHREAD 2026"));
        assert!(c.is_megathread("My list of 200 internships"));
        assert!(c.is_megathread("Discussion: how is the market?"));
        assert!(!c.is_megathread("Hiring SWE Intern at Acme"));
        assert!(!c.is_megathread("Specialist Intern opening"));
    }

    #[test]
    fn test_role_words_are_not_megathreads() {
        let c = classifier();
        assert!(!c.is_megathread("Acme Human Resources Intern"));
        assert!(!c.is_megathread("Acme Clinical Study Intern"));
        assert!(!c.is_megathread("Acme Data Collection Intern"));
    }

    #[test]
    fn test_hiring_intent_needs_both_families() {
        let c = classifier();
        assert!(c.has_hiring_intent("[Hiring] Data Science Intern", "", false));
        assert!(c.has_hiring_intent("Summer co-op opening at Acme", "", false));
        assert!(!c.has_hiring_intent("How do I land an internship?", "", false));
        assert!(!c.has_hiring_intent("Hiring senior engineers", "", false));
    }

    #[test]
    fn test_hiring_intent_body_and_ats_evidence() {
        let c = classifier();
        let title = "Acme ML Intern (Summer 2026)";
        assert!(!c.has_hiring_intent(title, "", false));
        assert!(c.has_hiring_intent(title, "Apply at the link below", false));
        assert!(c.has_hiring_intent(title, "", true));
    }

    #[test]
    fn test_student_friendly() {
        let c = classifier();
        assert!(c.is_student_friendly("Acme Software Engineering Intern"));
        assert!(c.is_student_friendly("Acme New Grad SWE"));
        assert!(c.is_student_friendly("Research Fellowship"));
        assert!(!c.is_student_friendly("Acme Software Engineer"));
    }

    #[test]
    fn test_degree_rejection_and_override() {
        let c = classifier();
        assert_eq!(
            c.seniority_rejection("Software Engineering Intern (PhD)"),
            Some(RejectReason::AdvancedDegree)
        );
        assert_eq!(
            c.seniority_rejection("Software Engineering Intern (PhD or BS)"),
            None
        );
        assert_eq!(
            c.seniority_rejection("Research Intern - Master's Students"),
            Some(RejectReason::AdvancedDegree)
        );
        assert_eq!(
            c.seniority_rejection("Research Intern - Bachelor's or Master's"),
            None
        );
    }

    #[test]
    fn test_seniority_rejection() {
        let c = classifier();
        assert_eq!(
            c.seniority_rejection("Senior Software Engineer"),
            Some(RejectReason::Seniority)
        );
        assert_eq!(
            c.seniority_rejection("Sr. Data Analyst"),
            Some(RejectReason::Seniority)
        );
        assert_eq!(
            c.seniority_rejection("Software Engineer III"),
            Some(RejectReason::Seniority)
        );
        assert_eq!(
            c.seniority_rejection("Senior Engineer (BS required)"),
            Some(RejectReason::Seniority)
        );
        assert_eq!(c.seniority_rejection("Software Engineering Intern"), None);
        assert_eq!(c.seniority_rejection("Insider Threat Intern"), None);
    }

    #[test]
    fn test_manager_and_master_roles_kept() {
        let c = classifier();
        assert_eq!(c.seniority_rejection("Acme — Product Manager Intern"), None);
        assert_eq!(c.seniority_rejection("Program Manager Intern"), None);
        assert_eq!(c.seniority_rejection("Scrum Master Intern"), None);
        assert_eq!(
            c.seniority_rejection("Software Engineer Intern (MS Office team)"),
            None
        );
    }

    #[test]
    fn test_ms_degree_forms_rejected() {
        let c = classifier();
        for title in [
            "Research Intern (MS)",
            "ML Intern - MS/PhD",
            "Data Science Intern, MS or PhD",
            "Quant Intern for MS students",
            "Applied Scientist Intern - MS",
            "Intern (M.S. degree)",
        ] {
            assert_eq!(
                c.seniority_rejection(title),
                Some(RejectReason::AdvancedDegree),
                "{title}"
            );
        }
        assert_eq!(c.seniority_rejection("Research Intern (BS/MS)"), None);
    }

    #[test]
    fn test_staleness() {
        assert!(is_stale("Intern — Summer 2023", 2026));
        assert!(!is_stale("Intern — Summer 2026", 2026));
        assert!(!is_stale("Platform Intern", 2026));
        assert!(!is_stale("Intern 2025-2026 cycle", 2026));
        assert!(is_stale("Fall 2024 / Spring 2025 Co-op", 2026));
        assert_eq!(years_in("Summer 2026 (2025 grads)"), vec![2026, 2025]);
    }

    #[test]
    fn test_location_examples() {
        let c = classifier();
        assert_eq!(
            c.classify_location("Data Intern", &locs(&["Remote"])),
            Location::Remote
        );
        assert_eq!(
            c.classify_location("Data Intern", &locs(&["Austin, TX"])),
            Location::Neither
        );
        assert_eq!(
            c.classify_location("Remote Internship", &[]),
            Location::Remote
        );
        assert_eq!(c.classify_location("Internship", &[]), Location::Neither);
    }

    #[test]
    fn test_location_california() {
        let c = classifier();
        assert_eq!(
            c.classify_location("SWE Intern", &locs(&["San Jose, CA"])),
            Location::California
        );
        assert_eq!(
            c.classify_location("SWE Intern", &locs(&["Mountain View"])),
            Location::California
        );
        assert_eq!(
            c.classify_location("SWE Intern", &locs(&["Toronto, Canada"])),
            Location::Neither
        );
        assert_eq!(
            c.classify_location("SWE Intern", &locs(&["NYC", "Work from home"])),
            Location::Remote
        );
    }

    #[test]
    fn test_location_fallback_ignores_california_in_title() {
        let c = classifier();
        assert_eq!(
            c.classify_location("SWE Intern - San Francisco", &[]),
            Location::Neither
        );
        assert_eq!(
            c.classify_location("SWE Intern - San Francisco", &locs(&["  "])),
            Location::Neither
        );
    }
}
