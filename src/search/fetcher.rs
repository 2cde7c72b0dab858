//! Full-page content retrieval

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Fetch the readable text of a page.
///
/// `None` signals an unrecoverable failure; implementations never error.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// Page fetcher powered by daedra (HTML converted to markdown)
pub struct PageFetcher {
    timeout: Duration,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl ContentFetcher for PageFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let fetch_args = daedra::VisitPageArgs {
            url: url.to_string(),
            include_images: false,
            selector: None,
        };

        match tokio::time::timeout(self.timeout, daedra::tools::fetch::fetch_page(&fetch_args))
            .await
        {
            Ok(Ok(page)) => {
                debug!("Fetched {} ({} words)", url, page.word_count);
                Some(page.content)
            }
            Ok(Err(e)) => {
                warn!("Failed to fetch {}: {}", url, e);
                None
            }
            Err(_) => {
                warn!("Fetching {} timed out after {:?}", url, self.timeout);
                None
            }
        }
    }
}

/// Number of whitespace-separated words in `text`
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
