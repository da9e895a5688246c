// src/services/links.rs

//! Link classification.
//!
//! Decides from the URL alone whether a link is worth following. This is a
//! precision-first heuristic: unknown hosts without career-looking paths are
//! rejected.

use url::Url;

use crate::models::LinkConfig;
use crate::utils::url::host_in;

/// Verdict for a candidate application link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkClass {
    /// Known applicant tracking system; ranked first and never probed
    TrustedAts,
    /// Career-looking link on some other host
    PlausibleExternal,
    Rejected,
}

impl LinkClass {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, LinkClass::Rejected)
    }
}

/// Classifies URLs using the configured domain lists.
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    config: LinkConfig,
}

impl LinkClassifier {
    pub fn new(config: LinkConfig) -> Self {
        let mut config = config;
        for list in [
            &mut config.blocked_domains,
            &mut config.ats_domains,
            &mut config.skip_validation_domains,
            &mut config.shortener_domains,
            &mut config.job_link_tokens,
            &mut config.image_extensions,
        ] {
            for item in list.iter_mut() {
                *item = item.trim().to_lowercase();
            }
        }
        Self { config }
    }

    /// Classify a URL.
    pub fn classify(&self, url: &str) -> LinkClass {
        let Some((host, path)) = Self::http_parts(url) else {
            return LinkClass::Rejected;
        };

        if host_in(&host, &self.config.blocked_domains) {
            return LinkClass::Rejected;
        }
        if self
            .config
            .image_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
        {
            return LinkClass::Rejected;
        }
        if host_in(&host, &self.config.ats_domains) {
            return LinkClass::TrustedAts;
        }

        let haystack = format!("{host}{path}");
        if self
            .config
            .job_link_tokens
            .iter()
            .any(|token| haystack.contains(token.as_str()))
        {
            return LinkClass::PlausibleExternal;
        }

        LinkClass::Rejected
    }

    /// True for known link shorteners, which must be resolved before classifying.
    pub fn is_shortener(&self, url: &str) -> bool {
        Self::http_parts(url)
            .is_some_and(|(host, _)| host_in(&host, &self.config.shortener_domains))
    }

    /// True for hosts accepted without a network probe.
    pub fn skips_validation(&self, url: &str) -> bool {
        Self::http_parts(url).is_some_and(|(host, _)| {
            host_in(&host, &self.config.skip_validation_domains)
                || host_in(&host, &self.config.ats_domains)
        })
    }

    /// Lower-cased host and path of an http(s) URL.
    fn http_parts(url: &str) -> Option<(String, String)> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let parsed = Url::parse(url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str()?.to_lowercase();
        Some((host, parsed.path().to_lowercase()))
    }
}

impl Default for LinkClassifier {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}
