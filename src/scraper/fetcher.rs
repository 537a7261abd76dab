use crate::config::AppConfig;
use crate::model::ScraperError;
use crate::scraper::traits::Scraper;

use rand::seq::IndexedRandom;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::time::Duration;
use tracing::debug;

const FALLBACK_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AspTracker/0.1";

pub struct ScraperImpl {
    client: Client,
    user_agents: Vec<String>,
}

impl ScraperImpl {
    pub fn new(config: &AppConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            user_agents: config.user_agents.clone(),
        })
    }

    fn pick_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::rng())
            .map(String::as_str)
            .unwrap_or(FALLBACK_AGENT)
    }
}

#[async_trait::async_trait]
impl Scraper for ScraperImpl {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        let agent = self.pick_agent().to_string();
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, agent)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::InvalidResponse {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
