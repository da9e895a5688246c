// src/utils/url.rs

//! URL manipulation utilities.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Markdown links first, then bare URLs.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[[^\]]+\]\((?P<md>https?://[^\s)]+)\)|(?P<bare>https?://[^\s()<>\[\]]+)")
        .expect("URL pattern is valid")
});

/// Canonical dedup key for a URL.
///
/// Drops query and fragment, lower-cases the host and strips trailing slashes.
///
/// # Examples
/// ```
/// use job_hunter::utils::url::canonicalize;
///
/// assert_eq!(
///     canonicalize("https://Jobs.Example.com/apply/?ref=reddit#top"),
///     "https://jobs.example.com/apply"
/// );
/// ```
pub fn canonicalize(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(parsed) if parsed.has_host() => {
            let host = parsed.host_str().unwrap_or_default().to_lowercase();
            let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
            let path = parsed.path().trim_end_matches('/');
            format!("{}://{}{}{}", parsed.scheme(), host, port, path)
        }
        _ => {
            let cut = raw.find(['?', '#']).unwrap_or(raw.len());
            raw[..cut].trim_end_matches('/').to_string()
        }
    }
}

/// Extract the lower-cased host from a URL.
///
/// # Examples
/// ```
/// use job_hunter::utils::url::get_domain;
///
/// assert_eq!(
///     get_domain("https://Example.COM/path"),
///     Some("example.com".to_string())
/// );
/// ```
pub fn get_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    parsed.host_str().map(|h| h.to_lowercase())
}

/// True if `host` is `domain` or one of its subdomains.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches('.').to_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(domain.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// True if `host` matches any domain in the list.
pub fn host_in(host: &str, domains: &[String]) -> bool {
    domains.iter().any(|d| host_matches(host, d))
}

/// Extract http(s) URLs from free text, including markdown `[text](url)` links.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .captures_iter(text)
        .filter_map(|caps| caps.name("md").or_else(|| caps.name("bare")))
        .map(|m| {
            m.as_str()
                .trim_end_matches(['.', ',', '!', '?', ':', ';', '*'])
                .to_string()
        })
        .filter(|u| !u.is_empty())
        .collect()
}
