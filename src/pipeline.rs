// Sequential collection: snapshot index -> snapshot pages -> live page, per category
use crate::config::AppConfig;
use crate::model::{PageContext, ParserError, Source};
use crate::normalizer::{Normalizer, RecordTable};
use crate::parser::Parser;
use crate::scraper::{ArchiveIndex, Scraper};

use chrono::NaiveDate;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub snapshots: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub pages_empty: usize,
    pub records_added: usize,
}

pub struct Pipeline<'a, S: Scraper + ?Sized, P: Parser> {
    config: &'a AppConfig,
    scraper: &'a S,
    parser: &'a P,
    index: ArchiveIndex,
    normalizer: Normalizer,
    delay: Duration,
    requests: usize,
}

impl<'a, S: Scraper + ?Sized, P: Parser> Pipeline<'a, S, P> {
    pub fn new(config: &'a AppConfig, scraper: &'a S, parser: &'a P) -> Self {
        Self {
            config,
            scraper,
            parser,
            index: ArchiveIndex::new(config),
            normalizer: Normalizer::new(config),
            delay: Duration::from_millis(config.request_delay_ms),
            requests: 0,
        }
    }

    /// Collects every configured category into `table`. `today` dates live pages and
    /// closes the snapshot range when no end date is configured.
    pub async fn run(&mut self, table: &mut RecordTable, today: NaiveDate) -> RunStats {
        let mut stats = RunStats::default();
        let categories: Vec<String> = self.config.categories.keys().cloned().collect();
        for category in categories {
            info!("Processing category: {}", category);
            self.collect_category(table, &category, today, &mut stats).await;
        }
        info!(
            "Collection finished: {} snapshots, {} pages fetched, {} failed, {} empty, {} new records",
            stats.snapshots, stats.pages_fetched, stats.pages_failed, stats.pages_empty, stats.records_added
        );
        stats
    }

    async fn collect_category(&mut self, table: &mut RecordTable, category: &str, today: NaiveDate, stats: &mut RunStats) {
        let page_url = self.config.category_url(category);
        let end = self.config.end_date.unwrap_or(today);

        self.throttle().await;
        let snapshots = match self
            .index
            .monthly_snapshots(self.scraper, &page_url, self.config.start_date, end)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                warn!("Snapshot index failed for {}: {}", page_url, e);
                Vec::new()
            }
        };
        info!("Found {} snapshots for {}", snapshots.len(), category);
        stats.snapshots += snapshots.len();

        for snapshot in snapshots {
            debug!("Snapshot {} of {}", snapshot.timestamp, snapshot.original_url);
            let ctx = PageContext {
                url: snapshot.archive_url.clone(),
                category: category.to_string(),
                date: snapshot.timestamp.date(),
                source: Source::Historical,
            };
            self.collect_page(table, ctx, stats).await;
        }

        if self.config.include_current {
            let ctx = PageContext {
                url: page_url,
                category: category.to_string(),
                date: today,
                source: Source::Current,
            };
            self.collect_page(table, ctx, stats).await;
        }
    }

    async fn collect_page(&mut self, table: &mut RecordTable, ctx: PageContext, stats: &mut RunStats) {
        self.throttle().await;
        let html = match self.scraper.fetch(&ctx.url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Skipping {}: {}", ctx.url, e);
                stats.pages_failed += 1;
                return;
            }
        };
        stats.pages_fetched += 1;

        match self.parser.parse(&html, &ctx.category) {
            Ok(listings) => {
                let found = listings.len();
                let added = self.normalizer.normalize_page(table, &ctx, listings);
                info!("{} ({}): {} listings, {} new records", ctx.url, ctx.date, found, added);
                stats.records_added += added;
            }
            Err(ParserError::NoListings) => {
                warn!("No product listings in {}", ctx.url);
                stats.pages_empty += 1;
            }
        }
    }

    async fn throttle(&mut self) {
        if self.requests > 0 && !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.requests += 1;
    }
}
