//! Feed fetcher.
//!
//! Retrieves one RSS document over HTTP and decodes it into a [`FeedDocument`].
//! There is no retry here; a failed feed waits for its next turn in the scheduler.

use std::future::Future;
use std::time::Duration;

use htmlescape::decode_html;
use reqwest::Client;
use rss::Channel;
use tracing::{debug, info};

use crate::config::ScraperConfig;
use crate::error::{GatorError, Result};
use crate::feed::types::{FeedDocument, FeedItem};
use crate::shutdown::Shutdown;

/// Longest text treated as a candidate entity, `&` and `;` included.
const MAX_ENTITY_LEN: usize = 32;

/// Source of feed documents used by the scraper.
pub trait FetchFeed {
    /// Fetch and decode the document at `url`, aborting when `shutdown` fires.
    fn fetch(&self, url: &str, shutdown: &Shutdown) -> impl Future<Output = Result<FeedDocument>>;
}

/// HTTP feed fetcher.
pub struct FeedFetcher {
    client: Client,
    max_feed_size: u64,
}

impl FeedFetcher {
    /// Create a new fetcher from the scraper settings.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| GatorError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    async fn fetch_document(&self, url: &str) -> Result<FeedDocument> {
        info!("Making request to {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatorError::FetchFailed(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(GatorError::FetchFailed(format!(
                "{}: HTTP error: {}",
                url,
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(GatorError::FetchFailed(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatorError::FetchFailed(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(GatorError::FetchFailed(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        debug!("Received {} bytes from {}", bytes.len(), url);
        parse_document(&bytes)
    }
}

impl FetchFeed for FeedFetcher {
    async fn fetch(&self, url: &str, shutdown: &Shutdown) -> Result<FeedDocument> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(GatorError::Cancelled),
            result = self.fetch_document(url) => result,
        }
    }
}

/// Decode an RSS body into a feed document with HTML entities unescaped.
pub fn parse_document(bytes: &[u8]) -> Result<FeedDocument> {
    let channel = Channel::read_from(bytes)
        .map_err(|e| GatorError::ParseFailed(format!("failed to parse feed: {}", e)))?;

    let items = channel
        .items()
        .iter()
        .map(|item| FeedItem {
            title: item.title().unwrap_or_default().to_string(),
            link: item.link().unwrap_or_default().to_string(),
            description: item.description().unwrap_or_default().to_string(),
            pub_date: item.pub_date().unwrap_or_default().to_string(),
        })
        .collect();

    let mut document = FeedDocument {
        title: channel.title().to_string(),
        link: channel.link().to_string(),
        description: channel.description().to_string(),
        items,
    };
    unescape_document(&mut document);

    Ok(document)
}

/// Unescape HTML entities in the channel and item text, in place.
pub fn unescape_document(document: &mut FeedDocument) {
    document.title = unescape_html(&document.title);
    document.description = unescape_html(&document.description);

    for item in document.items.iter_mut() {
        item.title = unescape_html(&item.title);
        item.description = unescape_html(&item.description);
    }
}

/// Decode HTML entities, leaving anything that is not a valid entity as written.
pub fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        result.push_str(&rest[..start]);
        let candidate = &rest[start..];

        let decoded = candidate[1..]
            .find(';')
            .map(|end| &candidate[..end + 2])
            .filter(|entity| entity.len() <= MAX_ENTITY_LEN)
            .and_then(|entity| decode_html(entity).ok().map(|s| (s, entity.len())));

        match decoded {
            Some((text, len)) => {
                result.push_str(&text);
                rest = &candidate[len..];
            }
            None => {
                result.push('&');
                rest = &candidate[1..];
            }
        }
    }
    result.push_str(rest);

    result
}

/// Check that a feed URL is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| GatorError::Validation(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(GatorError::Validation(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(GatorError::Validation("URL has no host".to_string()));
    }

    Ok(())
}
