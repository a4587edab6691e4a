use crate::traits::*;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

static LINK_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s"'<>()\[\]{}`]+"#).ok());

const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Scanner used when image scanning is switched off: identity on the text.
pub struct DisabledScanner;

#[async_trait]
impl ContentScanner for DisabledScanner {
    async fn scan(&self, text: &str) -> ScanOutcome {
        ScanOutcome::passthrough(text)
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// Applies the domain trust policy to every link in a request and hands
/// trusted links to the moderation backend.
pub struct UrlScanner {
    trusted_domains: Vec<String>,
    placeholder_url: String,
    moderator: Arc<dyn ImageModerator>,
    timeout: Duration,
}

impl UrlScanner {
    pub fn new(
        trusted_domains: Vec<String>,
        placeholder_url: String,
        moderator: Arc<dyn ImageModerator>,
        timeout: Duration,
    ) -> Self {
        Self {
            trusted_domains: trusted_domains
                .into_iter()
                .map(|d| d.trim().trim_start_matches('.').to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            placeholder_url,
            moderator,
            timeout,
        }
    }

    pub fn placeholder_url(&self) -> &str {
        &self.placeholder_url
    }

    /// Host equals a trusted domain or is a subdomain of one.
    pub fn is_trusted(&self, link: &str) -> bool {
        let Some(host) = Url::parse(link)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        else {
            return false;
        };

        self.trusted_domains
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
    }

    async fn moderate(&self, link: &str) -> Result<ModerationVerdict, ProviderError> {
        match tokio::time::timeout(self.timeout, self.moderator.moderate(link)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[async_trait]
impl ContentScanner for UrlScanner {
    async fn scan(&self, text: &str) -> ScanOutcome {
        if LINK_PATTERN.is_none() {
            warn!(target: "chaos_bridge::safety", "Link pattern unavailable, blocking request");
            return ScanOutcome {
                sanitized_text: text.to_string(),
                extracted_context: String::new(),
                blocked: true,
            };
        }

        let links = extract_links(text);
        if links.is_empty() {
            return ScanOutcome::passthrough(text);
        }

        let mut sanitized = text.to_string();
        let mut context = Vec::new();
        let mut blocked = false;

        for link in links {
            if !self.is_trusted(&link) {
                warn!(target: "chaos_bridge::safety", link = %link, "Blocked untrusted domain");
                sanitized = sanitized.replace(&link, &self.placeholder_url);
                blocked = true;
                continue;
            }

            info!(target: "chaos_bridge::safety", link = %link, "Sending image for moderation");
            match self.moderate(&link).await {
                Ok(verdict) if verdict.blocked => {
                    warn!(
                        target: "chaos_bridge::safety",
                        link = %link,
                        reason = %verdict.context,
                        "Moderation rejected image"
                    );
                    sanitized = sanitized.replace(&link, &self.placeholder_url);
                    if !verdict.context.trim().is_empty() {
                        context.push(verdict.context.trim().to_string());
                    }
                    blocked = true;
                }
                Ok(verdict) => {
                    if !verdict.context.trim().is_empty() {
                        info!(target: "chaos_bridge::safety", context = %verdict.context, "Image context extracted");
                        context.push(verdict.context.trim().to_string());
                    }
                }
                Err(e) => {
                    warn!(
                        target: "chaos_bridge::safety",
                        link = %link,
                        error = %e,
                        "Scan failed, blocking to be safe"
                    );
                    sanitized = sanitized.replace(&link, &self.placeholder_url);
                    blocked = true;
                }
            }
        }

        ScanOutcome {
            sanitized_text: sanitized,
            extracted_context: context.join(" "),
            blocked,
        }
    }

    fn enabled(&self) -> bool {
        true
    }
}

/// Distinct `http(s)://` links in order of first appearance.
pub fn extract_links(text: &str) -> Vec<String> {
    let Some(pattern) = LINK_PATTERN.as_ref() else {
        return Vec::new();
    };

    let mut links: Vec<String> = Vec::new();
    for found in pattern.find_iter(text) {
        let link = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        if link.ends_with("://") || links.iter().any(|l| l == link) {
            continue;
        }
        links.push(link.to_string());
    }
    links
}
