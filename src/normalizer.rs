use crate::config::AppConfig;
use crate::model::{Channel, PageContext, ProductRecord, Source};
use crate::parser::{RawListing, SchemaEra};
use crate::utils::{sku_from_name, to_kebab_case};

use chrono::NaiveDate;
use reqwest::Url;
use std::collections::{HashMap, HashSet};

/// Append-only record sequence with one entry per `(sku, date)`.
///
/// `is_new_product` is owned by the table: a record is new on its SKU's earliest date or
/// when its listing carried a new badge, whatever order the records arrive in.
#[derive(Debug, Default)]
pub struct RecordTable {
    records: Vec<ProductRecord>,
    index: HashMap<(String, NaiveDate), usize>,
    first_seen: HashMap<String, NaiveDate>,
    badged: HashSet<(String, NaiveDate)>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a table from rows written by a previous run. A stored flag on a row that is not
    /// its SKU's earliest is a badge; on the earliest row it is explained by first appearance.
    pub fn from_records(records: Vec<ProductRecord>) -> Self {
        let mut earliest: HashMap<&str, NaiveDate> = HashMap::new();
        for r in &records {
            earliest
                .entry(r.sku.as_str())
                .and_modify(|d| *d = (*d).min(r.date))
                .or_insert(r.date);
        }
        let badges: Vec<bool> = records
            .iter()
            .map(|r| r.is_new_product && earliest.get(r.sku.as_str()).is_some_and(|&d| r.date > d))
            .collect();

        let mut table = Self::new();
        for (record, badge) in records.into_iter().zip(badges) {
            table.upsert(record, badge);
        }
        table
    }

    /// Inserts a record, or replaces the stored one with the same `(sku, date)` in place.
    /// Returns `true` when the key was new.
    pub fn upsert(&mut self, record: ProductRecord, new_badge: bool) -> bool {
        let key = record.key();
        if new_badge {
            self.badged.insert(key.clone());
        } else {
            self.badged.remove(&key);
        }

        let previous_first = self.first_seen.get(&record.sku).copied();
        if previous_first.is_none_or(|d| record.date < d) {
            self.first_seen.insert(record.sku.clone(), record.date);
            // the old earliest row is no longer a first appearance
            if let Some(old) = previous_first {
                let old_key = (record.sku.clone(), old);
                if let Some(&pos) = self.index.get(&old_key) {
                    self.records[pos].is_new_product = self.badged.contains(&old_key);
                }
            }
        }

        let first_appearance = previous_first.is_none_or(|d| record.date <= d);
        let record = record.with_new_flag(first_appearance || new_badge);

        match self.index.get(&key) {
            Some(&pos) => {
                self.records[pos] = record;
                false
            }
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
                true
            }
        }
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct Normalizer {
    wholesale_markers: Vec<String>,
    dtc_markers: Vec<String>,
    store_host: Option<String>,
}

impl Normalizer {
    pub fn new(config: &AppConfig) -> Self {
        let lower = |v: &[String]| -> Vec<String> { v.iter().map(|m| m.to_lowercase()).collect() };
        Self {
            wholesale_markers: lower(&config.wholesale_markers),
            dtc_markers: lower(&config.dtc_markers),
            store_host: config.store_host(),
        }
    }

    /// Turns one page's listings into records and merges them into `table`.
    /// Returns the number of new `(sku, date)` keys.
    pub fn normalize_page(&self, table: &mut RecordTable, ctx: &PageContext, listings: Vec<RawListing>) -> usize {
        let mut added = 0;
        for listing in listings {
            let new_badge = listing.new_badge;
            let record = self.normalize_listing(ctx, listing);
            if table.upsert(record, new_badge) {
                added += 1;
            }
        }
        added
    }

    fn normalize_listing(&self, ctx: &PageContext, listing: RawListing) -> ProductRecord {
        let sku = resolve_sku(&listing);
        let channel = self.infer_channel(&listing.markup, ctx);

        ProductRecord::new(
            listing.name,
            sku,
            ctx.category.clone(),
            listing.style,
            listing.current_price,
            listing.original_price,
            ctx.date,
            ctx.source,
        )
        .with_channel(channel)
    }

    pub fn infer_channel(&self, markup: &str, ctx: &PageContext) -> Channel {
        let url = ctx.url.to_lowercase();
        if self
            .wholesale_markers
            .iter()
            .any(|m| markup.contains(m.as_str()) || url.contains(m.as_str()))
        {
            return Channel::Wholesale;
        }
        if self.dtc_markers.iter().any(|m| markup.contains(m.as_str())) {
            return Channel::Dtc;
        }
        if ctx.source == Source::Current && self.is_store_url(&ctx.url) {
            return Channel::Dtc;
        }
        Channel::Unknown
    }

    fn is_store_url(&self, url: &str) -> bool {
        let Some(store) = &self.store_host else {
            return false;
        };
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.") == store.as_str()))
            .unwrap_or(false)
    }
}

/// Card attributes first, then the explicit text identifier, then the name.
pub fn resolve_sku(listing: &RawListing) -> String {
    let from_era = match &listing.era {
        SchemaEra::Card { pid, sku_attr, sku_text } => {
            sku_attr.clone().or_else(|| pid.clone()).or_else(|| sku_text.clone())
        }
        SchemaEra::Tile { sku_text } => sku_text.clone(),
    };
    from_era
        .or_else(|| sku_from_name(&listing.name))
        .unwrap_or_else(|| to_kebab_case(&listing.name))
}
