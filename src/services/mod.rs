//! Service layer for the job hunter.
//!
//! This module contains the business logic for:
//! - Link classification and resolution (`LinkClassifier`, `LinkResolver`)
//! - Text classification (`TextClassifier`)
//! - Posting normalization (`PostingNormalizer`)
//! - Posting sources (`RedditClient`, `SimplifyFeed`)
//! - Webhook delivery (`DiscordWebhook`)

pub mod classify;
pub mod discord;
pub mod feed;
pub mod links;
pub mod normalize;
pub mod reddit;
pub mod resolver;
mod source;

pub use classify::{Location, TextClassifier, TokenSet};
pub use discord::{Deliverer, DeliveryReport, DiscordWebhook};
pub use feed::SimplifyFeed;
pub use links::{LinkClass, LinkClassifier};
pub use normalize::PostingNormalizer;
pub use reddit::{RedditClient, RedditCredentials};
pub use resolver::{HttpProbe, LinkProbe, LinkResolver, Resolution, ResolutionBudget};
pub use source::PostSource;
