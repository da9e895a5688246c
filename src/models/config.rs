//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Per-run limits and state location
    #[serde(default)]
    pub run: RunConfig,

    /// HTTP client behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Where postings come from
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Link classification lists
    #[serde(default)]
    pub links: LinkConfig,

    /// Token lists for the text classifiers
    #[serde(default)]
    pub filters: FilterConfig,

    /// Webhook message settings
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Config load failed from {:?}: {}. Using defaults.", path, e);
                Self::default()
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.run.max_posts_per_run == 0 {
            return Err(AppError::validation("run.max_posts_per_run must be > 0"));
        }
        if self.run.state_file.trim().is_empty() {
            return Err(AppError::validation("run.state_file is empty"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.resolve_timeout_secs == 0 {
            return Err(AppError::validation("http.resolve_timeout_secs must be > 0"));
        }
        if self.http.feed_timeout_secs == 0 || self.http.source_timeout_secs == 0 {
            return Err(AppError::validation("http source timeouts must be > 0"));
        }
        if self.http.webhook_timeout_secs == 0 {
            return Err(AppError::validation("http.webhook_timeout_secs must be > 0"));
        }
        if self.sources.communities.is_empty() && self.sources.feed_url.trim().is_empty() {
            return Err(AppError::validation("No sources defined"));
        }
        if self.delivery.max_per_batch == 0 {
            return Err(AppError::validation("delivery.max_per_batch must be > 0"));
        }
        if self.filters.role_tokens.is_empty() || self.filters.hiring_tokens.is_empty() {
            return Err(AppError::validation(
                "filters.role_tokens and filters.hiring_tokens must not be empty",
            ));
        }
        Ok(())
    }
}

/// Per-run limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum postings announced per run
    #[serde(default = "defaults::max_posts_per_run")]
    pub max_posts_per_run: usize,

    /// Maximum expensive link resolution calls per run
    #[serde(default = "defaults::max_validations_per_run")]
    pub max_validations_per_run: usize,

    /// Append-only file of announced canonical URLs
    #[serde(default = "defaults::state_file")]
    pub state_file: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_posts_per_run: defaults::max_posts_per_run(),
            max_validations_per_run: defaults::max_validations_per_run(),
            state_file: defaults::state_file(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent for API and feed requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Browser-like User-Agent for link probes (some career sites reject bots)
    #[serde(default = "defaults::probe_user_agent")]
    pub probe_user_agent: String,

    /// Timeout for a single link resolution request
    #[serde(default = "defaults::resolve_timeout")]
    pub resolve_timeout_secs: u64,

    /// Timeout for the feed download
    #[serde(default = "defaults::feed_timeout")]
    pub feed_timeout_secs: u64,

    /// Timeout for discussion platform requests
    #[serde(default = "defaults::source_timeout")]
    pub source_timeout_secs: u64,

    /// Timeout for a webhook post
    #[serde(default = "defaults::webhook_timeout")]
    pub webhook_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            probe_user_agent: defaults::probe_user_agent(),
            resolve_timeout_secs: defaults::resolve_timeout(),
            feed_timeout_secs: defaults::feed_timeout(),
            source_timeout_secs: defaults::source_timeout(),
            webhook_timeout_secs: defaults::webhook_timeout(),
        }
    }
}

/// Posting sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Discussion communities scanned for new posts
    #[serde(default = "defaults::communities")]
    pub communities: Vec<String>,

    /// Wanted posts per community (the newest `fetch_limit * 3` are scanned)
    #[serde(default = "defaults::fetch_limit")]
    pub fetch_limit: usize,

    /// Raw README containing the curated internship table
    #[serde(default = "defaults::feed_url")]
    pub feed_url: String,

    /// Source tag stamped on feed postings
    #[serde(default = "defaults::feed_name")]
    pub feed_name: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            communities: defaults::communities(),
            fetch_limit: defaults::fetch_limit(),
            feed_url: defaults::feed_url(),
            feed_name: defaults::feed_name(),
        }
    }
}

/// Domain and path lists used by the link classifier and resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Hosts that never carry job postings
    #[serde(default = "defaults::blocked_domains")]
    pub blocked_domains: Vec<String>,

    /// Applicant tracking systems
    #[serde(default = "defaults::ats_domains")]
    pub ats_domains: Vec<String>,

    /// Hosts accepted without a network probe
    #[serde(default = "defaults::skip_validation_domains")]
    pub skip_validation_domains: Vec<String>,

    /// Link shorteners that must be resolved before classification
    #[serde(default = "defaults::shortener_domains")]
    pub shortener_domains: Vec<String>,

    /// Host or path fragments that suggest a careers page
    #[serde(default = "defaults::job_link_tokens")]
    pub job_link_tokens: Vec<String>,

    /// Path suffixes of media files
    #[serde(default = "defaults::image_extensions")]
    pub image_extensions: Vec<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            blocked_domains: defaults::blocked_domains(),
            ats_domains: defaults::ats_domains(),
            skip_validation_domains: defaults::skip_validation_domains(),
            shortener_domains: defaults::shortener_domains(),
            job_link_tokens: defaults::job_link_tokens(),
            image_extensions: defaults::image_extensions(),
        }
    }
}

/// Token lists for the text classifiers.
///
/// Tokens match case-insensitively on word boundaries. Patterns are raw regexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "defaults::hiring_tokens")]
    pub hiring_tokens: Vec<String>,

    #[serde(default = "defaults::role_tokens")]
    pub role_tokens: Vec<String>,

    #[serde(default = "defaults::megathread_tokens")]
    pub megathread_tokens: Vec<String>,

    #[serde(default = "defaults::megathread_patterns")]
    pub megathread_patterns: Vec<String>,

    #[serde(default = "defaults::student_tokens")]
    pub student_tokens: Vec<String>,

    #[serde(default = "defaults::seniority_tokens")]
    pub seniority_tokens: Vec<String>,

    #[serde(default = "defaults::advanced_degree_tokens")]
    pub advanced_degree_tokens: Vec<String>,

    #[serde(default = "defaults::advanced_degree_patterns")]
    pub advanced_degree_patterns: Vec<String>,

    /// Mentions that override an advanced-degree rejection
    #[serde(default = "defaults::bachelor_tokens")]
    pub bachelor_tokens: Vec<String>,

    #[serde(default = "defaults::remote_tokens")]
    pub remote_tokens: Vec<String>,

    #[serde(default = "defaults::california_tokens")]
    pub california_tokens: Vec<String>,

    /// Bracketed title tags removed during normalization
    #[serde(default = "defaults::title_tags")]
    pub title_tags: Vec<String>,

    /// Bracketed tags that are not locations
    #[serde(default = "defaults::non_location_tags")]
    pub non_location_tags: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            hiring_tokens: defaults::hiring_tokens(),
            role_tokens: defaults::role_tokens(),
            megathread_tokens: defaults::megathread_tokens(),
            megathread_patterns: defaults::megathread_patterns(),
            student_tokens: defaults::student_tokens(),
            seniority_tokens: defaults::seniority_tokens(),
            advanced_degree_tokens: defaults::advanced_degree_tokens(),
            advanced_degree_patterns: defaults::advanced_degree_patterns(),
            bachelor_tokens: defaults::bachelor_tokens(),
            remote_tokens: defaults::remote_tokens(),
            california_tokens: defaults::california_tokens(),
            title_tags: defaults::title_tags(),
            non_location_tags: defaults::non_location_tags(),
        }
    }
}

/// Webhook message settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Embeds per webhook message (the webhook itself caps this at 10)
    #[serde(default = "defaults::max_per_batch")]
    pub max_per_batch: usize,

    /// Header on the first message; the run date is appended
    #[serde(default = "defaults::header")]
    pub header: String,

    /// Display name override for the webhook
    #[serde(default)]
    pub username: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_per_batch: defaults::max_per_batch(),
            header: defaults::header(),
            username: None,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

mod defaults {
    use super::strings;

    // Run defaults
    pub fn max_posts_per_run() -> usize {
        10
    }
    pub fn max_validations_per_run() -> usize {
        50
    }
    pub fn state_file() -> String {
        "posted_jobs.txt".into()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "job-hunter/0.1 (internship digest bot)".into()
    }
    pub fn probe_user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/104.0.0.0 Safari/537.36"
            .into()
    }
    pub fn resolve_timeout() -> u64 {
        3
    }
    pub fn feed_timeout() -> u64 {
        15
    }
    pub fn source_timeout() -> u64 {
        15
    }
    pub fn webhook_timeout() -> u64 {
        12
    }

    // Source defaults
    pub fn communities() -> Vec<String> {
        strings(&["internships", "DataScienceJobs", "MLJobs"])
    }
    pub fn fetch_limit() -> usize {
        75
    }
    pub fn feed_url() -> String {
        "https://raw.githubusercontent.com/SimplifyJobs/Summer2026-Internships/dev/README.md"
            .into()
    }
    pub fn feed_name() -> String {
        "SimplifyJobs".into()
    }

    // Link defaults
    pub fn blocked_domains() -> Vec<String> {
        strings(&[
            "reddit.com",
            "redd.it",
            "i.redd.it",
            "imgur.com",
            "medium.com",
            "substack.com",
            "youtube.com",
            "youtu.be",
            "news.ycombinator.com",
        ])
    }
    pub fn ats_domains() -> Vec<String> {
        strings(&[
            "greenhouse.io",
            "boards.greenhouse.io",
            "lever.co",
            "jobs.lever.co",
            "myworkdayjobs.com",
            "ashbyhq.com",
            "smartrecruiters.com",
            "workable.com",
            "icims.com",
        ])
    }
    pub fn skip_validation_domains() -> Vec<String> {
        strings(&[
            "greenhouse.io",
            "lever.co",
            "myworkdayjobs.com",
            "ashbyhq.com",
            "smartrecruiters.com",
            "workable.com",
            "icims.com",
            "oraclecloud.com",
            "eightfold.ai",
            "careerpuck.com",
        ])
    }
    pub fn shortener_domains() -> Vec<String> {
        strings(&["bit.ly", "t.co", "tinyurl.com", "lnkd.in", "ow.ly", "buff.ly"])
    }
    pub fn job_link_tokens() -> Vec<String> {
        strings(&["career", "job", "join-us", "joinus"])
    }
    pub fn image_extensions() -> Vec<String> {
        strings(&[".jpg", ".jpeg", ".png", ".gif", ".webp"])
    }

    // Filter defaults
    pub fn hiring_tokens() -> Vec<String> {
        strings(&[
            "hiring",
            "hire",
            "apply",
            "job",
            "jobs",
            "position",
            "positions",
            "opening",
            "openings",
            "opportunity",
            "opportunities",
        ])
    }
    pub fn role_tokens() -> Vec<String> {
        strings(&[
            "intern",
            "interns",
            "internship",
            "internships",
            "co-op",
            "coop",
            "new grad",
            "new-grad",
            "entry level",
            "entry-level",
            "university program",
        ])
    }
    pub fn megathread_tokens() -> Vec<String> {
        strings(&[
            "megathread",
            "mega thread",
            "mega-thread",
            "daily thread",
            "weekly thread",
            "list of",
            "my list",
            "compilation",
            "discussion",
            "sharing",
        ])
    }
    pub fn megathread_patterns() -> Vec<String> {
        strings(&[r"^\s*(daily|weekly)\b.*\b(thread|hiring)\b"])
    }
    pub fn student_tokens() -> Vec<String> {
        strings(&[
            "intern",
            "interns",
            "internship",
            "internships",
            "new grad",
            "new-grad",
            "entry level",
            "entry-level",
            "junior",
            "sophomore",
            "freshman",
            "undergraduate",
            "university",
            "student",
            "co-op",
            "coop",
            "research",
            "fellowship",
            "part-time",
            "campus",
            "early career",
            "summer",
        ])
    }
    pub fn seniority_tokens() -> Vec<String> {
        strings(&[
            "senior",
            "sr.",
            "sr",
            "staff",
            "principal",
            "lead",
            "director",
            "ii",
            "iii",
            "iv",
            "v",
        ])
    }
    pub fn advanced_degree_tokens() -> Vec<String> {
        strings(&["phd", "ph.d.", "ph.d", "master's", "masters", "m.s.", "mba"])
    }
    pub fn advanced_degree_patterns() -> Vec<String> {
        // Bare "MS" only next to degree wording or a separator.
        strings(&[
            r"(?:^|[^\p{L}\p{N}])ms\s*(?:/|\)|$|or\b|degrees?\b|students?\b|candidates?\b|programs?\b)",
        ])
    }
    pub fn bachelor_tokens() -> Vec<String> {
        strings(&[
            "bachelor's",
            "bachelors",
            "bachelor",
            "bs",
            "b.s.",
            "ba",
            "undergrad",
            "undergraduate",
        ])
    }
    pub fn remote_tokens() -> Vec<String> {
        strings(&[
            "remote",
            "remote-friendly",
            "fully remote",
            "work from home",
            "wfh",
            "anywhere in usa",
            "anywhere in us",
            "us remote",
            "usa remote",
            "north america remote",
            "hybrid (remote",
        ])
    }
    pub fn california_tokens() -> Vec<String> {
        strings(&[
            "california",
            "ca",
            "san francisco",
            "sf",
            "oakland",
            "berkeley",
            "san jose",
            "palo alto",
            "mountain view",
            "cupertino",
            "sunnyvale",
            "santa clara",
            "menlo park",
            "redwood city",
            "fremont",
            "los angeles",
            "la",
            "santa monica",
            "pasadena",
            "irvine",
            "san diego",
            "sacramento",
        ])
    }
    pub fn title_tags() -> Vec<String> {
        strings(&[
            "hiring", "remote", "us", "usa", "ca", "onsite", "sf", "bay", "nyc",
        ])
    }
    pub fn non_location_tags() -> Vec<String> {
        strings(&["hiring", "onsite", "us", "usa"])
    }

    // Delivery defaults
    pub fn max_per_batch() -> usize {
        10
    }
    pub fn header() -> String {
        "Job Hunter: Top Opportunities".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [run]
            max_posts_per_run = 3

            [sources]
            communities = ["csMajors"]
            "#,
        )
        .unwrap();

        assert_eq!(config.run.max_posts_per_run, 3);
        assert_eq!(config.run.max_validations_per_run, 50);
        assert_eq!(config.sources.communities, vec!["csMajors"]);
        assert_eq!(config.sources.fetch_limit, 75);
        assert!(config.links.ats_domains.contains(&"lever.co".to_string()));
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let mut config = Config::default();
        config.run.max_posts_per_run = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("definitely/not/here.toml");
        assert_eq!(config.run.state_file, "posted_jobs.txt");
    }

    #[test]
    fn test_load_or_default_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[run]\nstate_file = \"state/sent.txt\"\n").unwrap();

        let config = Config::load_or_default(&path);
        assert_eq!(config.run.state_file, "state/sent.txt");
        assert_eq!(config.run.max_posts_per_run, Config::default().run.max_posts_per_run);
    }

    #[test]
    fn test_load_or_default_unparseable_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[run\nstate_file = ").unwrap();

        let config = Config::load_or_default(&path);
        assert_eq!(config.run.state_file, "posted_jobs.txt");
    }
}
