// src/services/resolver.rs

//! Link resolution and validation.
//!
//! Follows redirects to a terminal URL and checks that it answers with a
//! success status. Every probe is paid for from a per-run [`ResolutionBudget`]
//! so the run's worst-case latency stays bounded.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};

use crate::error::Result;
use crate::services::LinkClassifier;

/// Per-run cap on expensive resolution calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionBudget {
    remaining: usize,
    spent: usize,
}

impl ResolutionBudget {
    pub fn new(limit: usize) -> Self {
        Self {
            remaining: limit,
            spent: 0,
        }
    }

    /// Take one call from the budget; false once exhausted.
    pub fn try_spend(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.spent += 1;
        true
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn spent(&self) -> usize {
        self.spent
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Response of a single probe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
}

/// Network seam for link probes.
#[async_trait]
pub trait LinkProbe: Send + Sync {
    async fn probe(&self, method: Method, url: &str) -> Result<ProbeResponse>;
}

/// Probe backed by a reqwest client (redirects followed, short timeout).
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LinkProbe for HttpProbe {
    async fn probe(&self, method: Method, url: &str) -> Result<ProbeResponse> {
        let response = self.client.request(method, url).send().await?;
        Ok(ProbeResponse {
            status: response.status().as_u16(),
            final_url: response.url().to_string(),
        })
    }
}

/// Why a resolution did not produce a usable link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    BudgetExhausted,
    Status(u16),
    Network(String),
}

/// Outcome of resolving one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Host is trusted; no call was made
    Trusted(String),
    /// Probe succeeded; holds the terminal URL
    Verified(String),
    /// Unusable; holds the original URL unchanged
    Failed { url: String, reason: ResolveFailure },
}

impl Resolution {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Resolution::Failed { .. })
    }

    /// Resolved URL, or the original one when resolution failed.
    pub fn url(&self) -> &str {
        match self {
            Resolution::Trusted(url)
            | Resolution::Verified(url)
            | Resolution::Failed { url, .. } => url.as_str(),
        }
    }
}

/// Resolves candidate links against the network within a budget.
pub struct LinkResolver<'a> {
    probe: &'a dyn LinkProbe,
    classifier: &'a LinkClassifier,
}

impl<'a> LinkResolver<'a> {
    pub fn new(probe: &'a dyn LinkProbe, classifier: &'a LinkClassifier) -> Self {
        Self { probe, classifier }
    }

    /// Resolve a URL, paying for any network call from `budget`.
    pub async fn resolve(&self, url: &str, budget: &mut ResolutionBudget) -> Resolution {
        if self.classifier.skips_validation(url) {
            return Resolution::Trusted(url.to_string());
        }
        self.probe_within_budget(url, budget).await
    }

    /// Follow a shortener to its destination without the trusted-host shortcut.
    pub async fn unwrap_shortener(&self, url: &str, budget: &mut ResolutionBudget) -> Resolution {
        self.probe_within_budget(url, budget).await
    }

    async fn probe_within_budget(&self, url: &str, budget: &mut ResolutionBudget) -> Resolution {
        if !budget.try_spend() {
            log::debug!("Resolution budget exhausted, skipping {url}");
            return Resolution::Failed {
                url: url.to_string(),
                reason: ResolveFailure::BudgetExhausted,
            };
        }

        let failed = |reason: ResolveFailure| Resolution::Failed {
            url: url.to_string(),
            reason,
        };

        let head = match self.probe.probe(Method::HEAD, url).await {
            Ok(response) => response,
            Err(e) => {
                log::debug!("HEAD {url} failed: {e}");
                return failed(ResolveFailure::Network(e.to_string()));
            }
        };
        if is_success(head.status) {
            return Resolution::Verified(head.final_url);
        }

        // Some career sites refuse HEAD; retry as GET on the same budget unit.
        match self.probe.probe(Method::GET, url).await {
            Ok(response) if is_success(response.status) => Resolution::Verified(response.final_url),
            Ok(response) => failed(ResolveFailure::Status(response.status)),
            Err(e) => {
                log::debug!("GET {url} failed: {e}");
                failed(ResolveFailure::Network(e.to_string()))
            }
        }
    }
}

fn is_success(status: u16) -> bool {
    status < StatusCode::BAD_REQUEST.as_u16()
}
