// src/models/mod.rs

//! Domain models for the job hunter.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod posting;
mod stats;

// Re-export all public types
pub use config::{
    Config, DeliveryConfig, FilterConfig, HttpConfig, LinkConfig, RunConfig, SourcesConfig,
};
pub use posting::{DiscussionPost, FeedRow, Posting, RawRecord};
pub use stats::{FilterStats, RejectReason, StageTotals};
