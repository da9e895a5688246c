// src/services/discord.rs

//! Chat webhook delivery.
//!
//! Sends postings as Discord embeds, at most ten per message. A rate-limited
//! batch is retried once after the server-specified delay.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{DeliveryConfig, Posting};

/// Hard cap on embeds per webhook message.
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;

const EMBED_TITLE_LIMIT: usize = 256;
const EMBED_DESCRIPTION_LIMIT: usize = 4000;
const DEFAULT_RETRY_AFTER_SECS: f64 = 1.0;

/// Which postings actually reached the webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Indices into the slice passed to `deliver`
    pub delivered: Vec<usize>,
    pub batches_sent: usize,
    pub batches_failed: usize,
}

/// Delivery seam for the digest.
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, postings: &[Posting]) -> Result<DeliveryReport>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Embed {
    title: String,
    url: String,
    description: String,
}

#[derive(Debug, Clone, Serialize)]
struct WebhookPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    embeds: &'a [Embed],
}

/// Discord webhook client.
pub struct DiscordWebhook {
    client: Client,
    webhook_url: String,
    config: DeliveryConfig,
    now: DateTime<Utc>,
}

impl DiscordWebhook {
    pub fn new(client: Client, webhook_url: &str, config: DeliveryConfig) -> Self {
        Self {
            client,
            webhook_url: repair_webhook_url(webhook_url),
            config,
            now: Utc::now(),
        }
    }

    /// Fix the run date used in the header.
    pub fn with_date(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn batch_size(&self) -> usize {
        self.config.max_per_batch.clamp(1, MAX_EMBEDS_PER_MESSAGE)
    }

    fn header(&self) -> String {
        format!("**{} for {}**", self.config.header, self.now.format("%B %d, %Y"))
    }

    /// Post one batch; on 429 wait and retry exactly once.
    async fn send_batch(&self, payload: &WebhookPayload<'_>, label: &str) -> Result<()> {
        let response = self.post(payload).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::TOO_MANY_REQUESTS => {
                let wait = retry_after(response).await;
                log::warn!("Rate limited on {label}. Sleeping {:.2}s…", wait.as_secs_f64());
                tokio::time::sleep(wait).await;

                let retry = self.post(payload).await?;
                if retry.status().is_success() {
                    log::info!("{label} sent after retry");
                    Ok(())
                } else {
                    Err(AppError::delivery(format!(
                        "{label} retry failed: {} - {}",
                        retry.status(),
                        body_excerpt(retry).await
                    )))
                }
            }
            status => Err(AppError::delivery(format!(
                "{label} rejected: {} - {}",
                status,
                body_excerpt(response).await
            ))),
        }
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> Result<reqwest::Response> {
        Ok(self.client.post(&self.webhook_url).json(payload).send().await?)
    }
}

#[async_trait]
impl Deliverer for DiscordWebhook {
    async fn deliver(&self, postings: &[Posting]) -> Result<DeliveryReport> {
        let mut report = DeliveryReport::default();
        if postings.is_empty() {
            log::info!("No postings to send");
            return Ok(report);
        }

        let embeds: Vec<Embed> = postings.iter().map(to_embed).collect();
        let size = self.batch_size();
        let total = embeds.len().div_ceil(size);
        log::info!(
            "Sending {} message chunk(s) for {} posting(s) to {}",
            total,
            embeds.len(),
            mask(&self.webhook_url)
        );

        for (n, chunk) in embeds.chunks(size).enumerate() {
            let payload = WebhookPayload {
                content: (n == 0).then(|| self.header()),
                username: self.config.username.as_deref(),
                embeds: chunk,
            };
            let label = format!("chunk {}/{}", n + 1, total);

            match self.send_batch(&payload, &label).await {
                Ok(()) => {
                    log::info!("{label} sent");
                    report.batches_sent += 1;
                    let start = n * size;
                    report.delivered.extend(start..start + chunk.len());
                }
                Err(e) => {
                    log::warn!("Failed to deliver {label}: {e}");
                    report.batches_failed += 1;
                }
            }
        }

        Ok(report)
    }
}

fn to_embed(posting: &Posting) -> Embed {
    let title = truncate_chars(&posting.title, EMBED_TITLE_LIMIT);
    let location = if posting.locations.is_empty() {
        "N/A".to_string()
    } else {
        posting.locations.join(", ")
    };

    let mut description = format!(
        "**Source:** {} • **Location:** {}\n**Details:** {}",
        posting.source, location, title
    );
    if !posting.description.is_empty() {
        description.push_str("\n\n");
        description.push_str(&posting.description);
    }

    Embed {
        title,
        url: posting.url.clone(),
        description: truncate_chars(&description, EMBED_DESCRIPTION_LIMIT),
    }
}

/// Embed limits count Unicode scalar values.
fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Server-requested delay: `Retry-After` header, then JSON `retry_after`.
async fn retry_after(response: reqwest::Response) -> Duration {
    let header = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok());

    let secs = match header {
        Some(secs) => secs,
        None => response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("retry_after").and_then(|v| v.as_f64()))
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
    };

    retry_delay(secs)
}

/// The server's delay as given; only unusable values are replaced.
fn retry_delay(secs: f64) -> Duration {
    if !secs.is_finite() {
        return Duration::from_secs_f64(DEFAULT_RETRY_AFTER_SECS);
    }
    Duration::from_secs_f64(secs.max(0.0))
}

async fn body_excerpt(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    text.chars().take(300).collect()
}

/// Repair the doubled-scheme paste mistake (`httpshttps://…`).
pub fn repair_webhook_url(url: &str) -> String {
    let url = url.trim();
    match url.strip_prefix("httpshttps://") {
        Some(rest) => {
            log::warn!("Webhook URL starts with 'httpshttps://'; fixing for this run");
            format!("https://{rest}")
        }
        None => url.to_string(),
    }
}

/// Hide the webhook token in logs.
pub fn mask(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let token = url.rsplit('/').next().unwrap_or_default();
            let visible: String = token.chars().take(8).collect();
            format!(
                "{}://{}/.../{}***",
                parsed.scheme(),
                parsed.host_str().unwrap_or_default(),
                visible
            )
        }
        Err(_) => "<invalid>".to_string(),
    }
}
