// Core structs: ProductRecord, Snapshot, PageContext and the error kinds
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::utils::round2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Historical,
    Current,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    OpenToe,
    ClosedToe,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Dtc,
    Wholesale,
    /// Not inferable from the page; kept as its own segment in every mix.
    Unknown,
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Style::OpenToe => "open-toe",
            Style::ClosedToe => "closed-toe",
            Style::Unknown => "unknown",
        })
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Dtc => "dtc",
            Channel::Wholesale => "wholesale",
            Channel::Unknown => "unknown",
        })
    }
}

/// One observed product at one point in time. Column order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub sku: String,
    pub category: String,
    pub style: Style,
    pub current_price: f64,
    pub original_price: f64,
    pub discount_amount: f64,
    pub discount_percentage: f64,
    pub is_new_product: bool,
    pub channel: Channel,
    pub date: NaiveDate,
    pub source: Source,
}

impl ProductRecord {
    /// Builds a record with the discount fields derived from the price pair.
    /// An original price below the current one (or absent) collapses to the current price.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        sku: String,
        category: String,
        style: Style,
        current_price: f64,
        original_price: Option<f64>,
        date: NaiveDate,
        source: Source,
    ) -> Self {
        let current_price = round2(current_price);
        let original_price = original_price
            .map(round2)
            .filter(|&p| p > current_price)
            .unwrap_or(current_price);

        let discount_amount = round2(original_price - current_price);
        let discount_percentage = if original_price > 0.0 {
            round2(discount_amount / original_price * 100.0)
        } else {
            0.0
        };

        Self {
            name,
            sku,
            category,
            style,
            current_price,
            original_price,
            discount_amount,
            discount_percentage,
            is_new_product: false,
            channel: Channel::Unknown,
            date,
            source,
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_new_flag(mut self, is_new: bool) -> Self {
        self.is_new_product = is_new;
        self
    }

    pub fn key(&self) -> (String, NaiveDate) {
        (self.sku.clone(), self.date)
    }
}

/// A capture listed by the archive index.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: NaiveDateTime,
    pub original_url: String,
    pub archive_url: String,
}

/// Where a page body came from; travels with its parsed listings into the normalizer.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub url: String,
    pub category: String,
    pub date: NaiveDate,
    pub source: Source,
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    InvalidResponse { status: u16, url: String },
    #[error("malformed snapshot index: {0}")]
    MalformedIndex(String),
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("no product listings found")]
    NoListings,
}

/// Failure for a single listing; the rest of the page is still parsed.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("unparseable price: {0:?}")]
    InvalidPrice(String),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(current: f64, original: Option<f64>) -> ProductRecord {
        ProductRecord::new(
            "Arizona".into(),
            "ARZ-1".into(),
            "sandals".into(),
            Style::OpenToe,
            current,
            original,
            date(2023, 1, 15),
            Source::Historical,
        )
    }

    #[test]
    fn discount_is_derived_from_price_pair() {
        let r = record(79.99, Some(110.0));
        assert!((r.discount_amount - (r.original_price - r.current_price)).abs() < 0.011);
        assert_eq!(r.discount_amount, 30.01);
        assert_eq!(r.discount_percentage, 27.28);
    }

    #[test]
    fn missing_or_lower_original_collapses_to_current() {
        for r in [record(100.0, None), record(100.0, Some(90.0))] {
            assert_eq!(r.original_price, 100.0);
            assert_eq!(r.discount_amount, 0.0);
            assert_eq!(r.discount_percentage, 0.0);
        }
    }

    #[test]
    fn discount_invariant_holds_over_a_price_sweep() {
        for cents in (1..20_000).step_by(137) {
            let current = cents as f64 / 100.0;
            for markup in [0.0, 0.5, 12.34, 99.99] {
                let r = record(current, Some(current + markup));
                assert!((r.original_price - r.current_price - r.discount_amount).abs() < 0.011);
                if r.original_price > 0.0 {
                    let pct = r.discount_amount / r.original_price * 100.0;
                    assert!((pct - r.discount_percentage).abs() < 0.011);
                }
            }
        }
    }

    #[test]
    fn defaults_to_unknown_channel_and_not_new() {
        let r = record(50.0, None);
        assert_eq!(r.channel, Channel::Unknown);
        assert!(!r.is_new_product);
        let r = r.with_channel(Channel::Dtc).with_new_flag(true);
        assert_eq!(r.channel, Channel::Dtc);
        assert!(r.is_new_product);
    }
}
