//! Run state persistence.
//!
//! The run state is the set of canonical URL keys announced by any previous
//! run. It is stored as an append-only text file:
//!
//! ```text
//! posted_jobs.txt
//! ├── https://jobs.lever.co/acme/123
//! ├── https://acme.com/careers/intern
//! └── ...                            # one key per line, blank lines ignored
//! ```

pub mod local;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStateStore;

/// Canonical keys already announced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    keys: HashSet<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the line-oriented store format.
    pub fn from_lines(text: &str) -> Self {
        Self {
            keys: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Trait for run state backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the announced set. Missing or unreadable state is an empty set.
    async fn load(&self) -> RunState;

    /// Append newly announced keys.
    async fn append(&self, keys: &[String]) -> Result<()>;
}
