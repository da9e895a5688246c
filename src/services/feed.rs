// src/services/feed.rs

//! Curated internship table feed.
//!
//! Downloads the SimplifyJobs README and parses the HTML table embedded in it.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{FeedRow, RawRecord};
use crate::services::PostSource;
use crate::utils::http::fetch_text;

static LOCATION_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|+|/+").expect("split pattern is valid"));
static LOCATION_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d+\s+locations?$").expect("count pattern is valid"));

/// Company cell marker for "same company as the previous row".
const CONTINUATION: &str = "↳";

/// Feed source backed by a raw README URL.
pub struct SimplifyFeed {
    client: Client,
    url: String,
    name: String,
}

impl SimplifyFeed {
    pub fn new(client: Client, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
impl PostSource for SimplifyFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let text = fetch_text(&self.client, &self.url)
            .await
            .map_err(|e| AppError::source(&self.name, e))?;
        let rows = parse_rows(&text, &self.name)?;
        log::info!("Parsed {} rows from {}", rows.len(), self.name);
        Ok(rows.into_iter().map(RawRecord::Feed).collect())
    }
}

/// Parse every row of the first `<tbody>` in the document.
///
/// Rows with fewer than four cells are skipped. A missing table is an error.
pub fn parse_rows(html: &str, feed_name: &str) -> Result<Vec<FeedRow>> {
    let document = Html::parse_document(html);
    let tbody_sel = parse_selector("tbody")?;
    let row_sel = parse_selector("tr")?;
    let cell_sel = parse_selector("td")?;
    let link_sel = parse_selector("a[href]")?;

    let tbody = document
        .select(&tbody_sel)
        .next()
        .ok_or_else(|| AppError::source(feed_name, "no <tbody> found"))?;

    let mut rows = Vec::new();
    let mut previous_company = String::new();

    for row in tbody.select(&row_sel) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < 4 {
            continue;
        }

        let mut company = cell_text(&cells[0]).replace('🔥', "").trim().to_string();
        if company == CONTINUATION || company.is_empty() {
            company = previous_company.clone();
        } else {
            previous_company = company.clone();
        }

        let apply_url = cells[3]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty());

        let age = cells
            .get(4)
            .map(cell_text)
            .filter(|text| !text.is_empty());

        rows.push(FeedRow {
            company,
            role: cell_text(&cells[1]),
            locations: split_locations(&cells[2]),
            apply_url,
            age,
            feed: feed_name.to_string(),
        });
    }

    Ok(rows)
}

/// Concatenated, trimmed text of a cell.
fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Location cells hold one location per text node (`<br>` separated), or a
/// `<details>` block whose summary is just a count.
fn split_locations(cell: &ElementRef) -> Vec<String> {
    let joined = cell
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("|");

    LOCATION_SPLIT_RE
        .split(&joined)
        .map(str::trim)
        .filter(|loc| !loc.is_empty() && !LOCATION_COUNT_RE.is_match(loc))
        .map(str::to_string)
        .collect()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
