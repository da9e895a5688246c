//! Pipeline entry points for a hunt.
//!
//! - `SourceFilter`: per-source screening chain
//! - `run_hunt`: fetch, screen, dedup, rank, deliver and remember

pub mod filter;
pub mod run;

pub use filter::SourceFilter;
pub use run::{Hunt, RunOptions, RunReport, collect_postings, run_hunt};
