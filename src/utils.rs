// Utility functions
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

static PRICE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d.,]*").expect("valid price regex"));

static SKU_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"SKU:\s*([A-Z0-9-]+)",
        r"Model:\s*([A-Z0-9-]+)",
        r"Item\s*#:\s*([A-Z0-9-]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid sku regex"))
    .collect()
});

static NAME_SKU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z0-9]{6,}").expect("valid name sku regex"));

/// Rounds to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Turns a displayed price into a number.
///
/// Handles currency symbols, thousands separators in either convention
/// (`$1,234.50`, `1.234,50 €`) and ranges, of which the first value is taken.
pub fn parse_price(text: &str) -> Option<f64> {
    let token = PRICE_TOKEN.find(text)?.as_str().trim_end_matches(['.', ',']);

    let last_dot = token.rfind('.');
    let last_comma = token.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(d), Some(c)) if c > d => token.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => token.replace(',', ""),
        (None, Some(c)) => {
            let decimals = token.len() - c - 1;
            if token.matches(',').count() == 1 && decimals <= 2 {
                token.replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
        (Some(d), None) => {
            let decimals = token.len() - d - 1;
            if token.matches('.').count() > 1 || decimals == 3 {
                token.replace('.', "")
            } else {
                token.to_string()
            }
        }
        (None, None) => token.to_string(),
    };

    normalized.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Parses a 14-digit archive timestamp (`20230115083012`).
pub fn parse_archive_timestamp(ts: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(ts, "%Y%m%d%H%M%S").ok()
}

/// Converts a string to kebab-case.
pub fn to_kebab_case(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Finds an explicit identifier (`SKU:`, `Model:`, `Item #:`) in listing text.
pub fn sku_from_text(text: &str) -> Option<String> {
    SKU_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .map(|c| c[1].to_string())
}

/// Falls back to a long uppercase alphanumeric run in the product name.
pub fn sku_from_name(name: &str) -> Option<String> {
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    NAME_SKU.find(&compact).map(|m| m.as_str().to_string())
}

/// Calendar month used as the analysis period key; serializes as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    pub fn year_before(self) -> Self {
        Self::new(self.year - 1, self.month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
