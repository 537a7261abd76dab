// Wayback CDX index: lists captures of a page and keeps one per month
use crate::config::AppConfig;
use crate::model::{ScraperError, Snapshot};
use crate::scraper::traits::Scraper;
use crate::utils::{Month, parse_archive_timestamp};

use chrono::NaiveDate;
use reqwest::Url;
use std::collections::HashSet;
use tracing::warn;

pub struct ArchiveIndex {
    cdx_endpoint: String,
    archive_prefix: String,
}

impl ArchiveIndex {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            cdx_endpoint: config.cdx_endpoint.clone(),
            archive_prefix: config.archive_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn query_url(&self, page_url: &str, from: NaiveDate, to: NaiveDate) -> Result<String, ScraperError> {
        let mut url = Url::parse(&self.cdx_endpoint)
            .map_err(|e| ScraperError::MalformedIndex(format!("bad CDX endpoint: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("url", page_url)
            .append_pair("from", &from.format("%Y%m%d").to_string())
            .append_pair("to", &to.format("%Y%m%d").to_string())
            .append_pair("output", "json")
            .append_pair("fl", "timestamp,original,statuscode")
            .append_pair("filter", "statuscode:200");
        Ok(url.into())
    }

    /// Raw page URL for a capture; `id_` strips the archive toolbar.
    pub fn archive_url(&self, timestamp: &str, original: &str) -> String {
        format!("{}/{}id_/{}", self.archive_prefix, timestamp, original)
    }

    /// First capture of every calendar month in `[from, to]`, oldest first.
    pub async fn monthly_snapshots<S: Scraper + ?Sized>(
        &self,
        scraper: &S,
        page_url: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Snapshot>, ScraperError> {
        let query = self.query_url(page_url, from, to)?;
        let body = scraper.fetch(&query).await?;
        let snapshots = self
            .parse_index(&body)?
            .into_iter()
            .filter(|s| {
                let day = s.timestamp.date();
                day >= from && day <= to
            })
            .collect();
        Ok(collapse_monthly(snapshots))
    }

    /// Parses CDX `output=json`: an array of string rows, the first being the header.
    pub fn parse_index(&self, body: &str) -> Result<Vec<Snapshot>, ScraperError> {
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<Vec<String>> = serde_json::from_str(body)
            .map_err(|e| ScraperError::MalformedIndex(e.to_string()))?;

        let Some((header, rows)) = rows.split_first() else {
            return Ok(Vec::new());
        };
        let column = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ScraperError::MalformedIndex(format!("missing column {}", name)))
        };
        let ts_col = column("timestamp")?;
        let url_col = column("original")?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for row in rows {
            let (Some(ts), Some(original)) = (row.get(ts_col), row.get(url_col)) else {
                warn!("Short CDX row skipped: {:?}", row);
                continue;
            };
            let Some(timestamp) = parse_archive_timestamp(ts) else {
                warn!("Bad CDX timestamp skipped: {}", ts);
                continue;
            };
            snapshots.push(Snapshot {
                timestamp,
                original_url: original.clone(),
                archive_url: self.archive_url(ts, original),
            });
        }
        Ok(snapshots)
    }
}

pub fn collapse_monthly(mut snapshots: Vec<Snapshot>) -> Vec<Snapshot> {
    snapshots.sort_by_key(|s| s.timestamp);
    let mut seen = HashSet::new();
    snapshots
        .into_iter()
        .filter(|s| seen.insert(Month::of(s.timestamp.date())))
        .collect()
}
