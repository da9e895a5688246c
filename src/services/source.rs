// src/services/source.rs

//! Posting source abstraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::RawRecord;

/// Anything that yields raw records for one run.
///
/// Implementations should skip partial failures (an unreachable community)
/// themselves and only return `Err` when nothing could be fetched.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Name used in logs and failure stats.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<RawRecord>>;
}
