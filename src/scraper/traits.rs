use crate::model::ScraperError;

/// Anything that can return the body of a page by URL.
#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError>;
}
