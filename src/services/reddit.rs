// src/services/reddit.rs

//! Discussion platform source.
//!
//! Pulls the newest posts of each configured community. Uses app-only OAuth
//! when client credentials are configured, and the public JSON listing
//! otherwise.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{DiscussionPost, RawRecord};
use crate::services::PostSource;

/// Largest page the listing endpoint serves.
const MAX_LISTING_LIMIT: usize = 100;

const PUBLIC_BASE: &str = "https://www.reddit.com";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

/// App-only OAuth credentials.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl RedditCredentials {
    /// Read `REDDIT_CLIENT_ID` / `REDDIT_CLIENT_SECRET`; `None` if either is unset.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("REDDIT_CLIENT_ID").ok()?;
        let client_secret = std::env::var("REDDIT_CLIENT_SECRET").ok()?;
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return None;
        }
        Some(Self {
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: ListingPost,
}

#[derive(Debug, Deserialize)]
struct ListingPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    created_utc: f64,
}

impl ListingPost {
    fn into_post(self, community: &str) -> DiscussionPost {
        DiscussionPost {
            id: self.id,
            title: self.title,
            body: self.selftext,
            link: self.url.filter(|u| !u.trim().is_empty()),
            is_self: self.is_self,
            pinned: self.stickied || self.pinned,
            community: community.to_string(),
            created_utc: self.created_utc as i64,
        }
    }
}

/// Source over a set of communities.
pub struct RedditClient {
    client: Client,
    communities: Vec<String>,
    limit: usize,
    credentials: Option<RedditCredentials>,
    public_base: String,
    oauth_base: String,
}

impl RedditClient {
    /// Scan the newest `fetch_limit * 3` posts of each community.
    pub fn new(
        client: Client,
        communities: Vec<String>,
        fetch_limit: usize,
        credentials: Option<RedditCredentials>,
    ) -> Self {
        Self {
            client,
            communities,
            limit: fetch_limit.saturating_mul(3).clamp(1, MAX_LISTING_LIMIT),
            credentials,
            public_base: PUBLIC_BASE.to_string(),
            oauth_base: OAUTH_BASE.to_string(),
        }
    }

    /// Point the client at other hosts (used by tests).
    pub fn with_endpoints(mut self, public_base: &str, oauth_base: &str) -> Self {
        self.public_base = public_base.trim_end_matches('/').to_string();
        self.oauth_base = oauth_base.trim_end_matches('/').to_string();
        self
    }

    pub fn listing_limit(&self) -> usize {
        self.limit
    }

    async fn access_token(&self, credentials: &RedditCredentials) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/v1/access_token", self.public_base))
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?;
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn fetch_community(
        &self,
        community: &str,
        token: Option<&str>,
    ) -> Result<Vec<DiscussionPost>> {
        let request = match token {
            Some(token) => self
                .client
                .get(format!("{}/r/{}/new", self.oauth_base, community))
                .bearer_auth(token),
            None => self
                .client
                .get(format!("{}/r/{}/new.json", self.public_base, community)),
        };

        let listing: Listing = request
            .query(&[("limit", self.limit.to_string()), ("raw_json", "1".to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into_post(community))
            .collect())
    }
}

#[async_trait]
impl PostSource for RedditClient {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let token = match &self.credentials {
            Some(credentials) => Some(
                self.access_token(credentials)
                    .await
                    .map_err(|e| AppError::source(self.name(), format!("auth failed: {e}")))?,
            ),
            None => None,
        };

        log::info!(
            "Scanning {} communities (latest {} posts each)",
            self.communities.len(),
            self.limit
        );

        let mut records = Vec::new();
        let mut failures = 0;
        for community in &self.communities {
            match self.fetch_community(community, token.as_deref()).await {
                Ok(posts) => {
                    log::info!("Pulled {} posts from r/{}", posts.len(), community);
                    records.extend(posts.into_iter().map(RawRecord::Discussion));
                }
                Err(e) => {
                    failures += 1;
                    log::warn!("Error fetching r/{}: {} (skipping)", community, e);
                }
            }
        }

        if !self.communities.is_empty() && failures == self.communities.len() {
            return Err(AppError::source(
                self.name(),
                "every community failed to load",
            ));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::utils::http::create_client;

    fn listing_json() -> serde_json::Value {
        serde_json::json!({
            "kind": "Listing",
            "data": {
                "children": [
                    { "kind": "t3", "data": {
                        "id": "abc",
                        "title": "[Hiring] SWE Intern",
                        "selftext": "",
                        "url": "https://jobs.lever.co/acme/1",
                        "is_self": false,
                        "stickied": false,
                        "created_utc": 1760000000.0,
                        "link_flair_text": "Hiring"
                    }},
                    { "kind": "t3", "data": {
                        "id": "def",
                        "title": "Weekly thread",
                        "selftext": "Ask here",
                        "url": "https://www.reddit.com/r/internships/comments/def/",
                        "is_self": true,
                        "stickied": true,
                        "created_utc": 1750000000.0
                    }}
                ]
            }
        })
    }

    fn client(server: &MockServer, communities: &[&str], creds: bool) -> RedditClient {
        let credentials = creds.then(|| RedditCredentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
        });
        RedditClient::new(
            create_client("test-agent", 5).unwrap(),
            communities.iter().map(|s| s.to_string()).collect(),
            75,
            credentials,
        )
        .with_endpoints(&server.uri(), &server.uri())
    }

    #[test]
    fn test_limit_is_capped() {
        let client = RedditClient::new(Client::new(), vec![], 75, None);
        assert_eq!(client.listing_limit(), 100);
        let client = RedditClient::new(Client::new(), vec![], 10, None);
        assert_eq!(client.listing_limit(), 30);
    }

    #[tokio::test]
    async fn test_public_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/internships/new.json"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_json()))
            .mount(&server)
            .await;

        let records = client(&server, &["internships"], false)
            .fetch()
            .await
            .unwrap();
        assert_eq!(records.len(), 2);

        let RawRecord::Discussion(first) = &records[0] else {
            panic!("expected discussion record");
        };
        assert_eq!(first.id, "abc");
        assert_eq!(first.community, "internships");
        assert_eq!(first.created_utc, 1_760_000_000);
        assert_eq!(first.link.as_deref(), Some("https://jobs.lever.co/acme/1"));
        assert!(!first.pinned);

        let RawRecord::Discussion(second) = &records[1] else {
            panic!("expected discussion record");
        };
        assert!(second.pinned);
        assert!(second.is_self);
    }

    #[tokio::test]
    async fn test_oauth_listing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "tok", "expires_in": 3600 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/MLJobs/new"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_json()))
            .mount(&server)
            .await;

        let records = client(&server, &["MLJobs"], true).fetch().await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_community_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/internships/new.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_json()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/private/new.json"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let records = client(&server, &["private", "internships"], false)
            .fetch()
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_all_communities_failing_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client(&server, &["a", "b"], false).fetch().await;
        assert!(matches!(result, Err(AppError::Source { .. })));
    }
}
