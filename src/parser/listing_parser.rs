// Product-listing HTML parsing for archived and live category pages
use crate::model::{ListingError, ParserError, Style};
use crate::utils::{parse_price, sku_from_text};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

mod selectors {
    use super::*;

    fn sel(css: &str) -> Selector {
        Selector::parse(css).expect("static selector")
    }

    pub static CARD: LazyLock<Selector> =
        LazyLock::new(|| sel("div.product-card, div.product-item, div.product-list-item"));
    pub static ANY_LISTING: LazyLock<Selector> = LazyLock::new(|| {
        sel("div.product-tile, div.product-grid-item, div.product-card, div.product-item, div.product-list-item")
    });
    pub static NAME: LazyLock<Selector> =
        LazyLock::new(|| sel(".product-name, .product-title, .name"));
    /// Tried in order; the generic `.price` wrapper comes last.
    pub static CURRENT_PRICE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        [".current-price", ".sale-price", ".product-price", ".price"]
            .into_iter()
            .map(sel)
            .collect()
    });
    pub static ORIGINAL_PRICE: LazyLock<Selector> = LazyLock::new(|| {
        sel(".original-price, .was-price, .regular-price, .list-price, del, s")
    });
    pub static BADGE: LazyLock<Selector> =
        LazyLock::new(|| sel(".badge, .product-badge, .label, .flag, .tag"));
    pub static PID: LazyLock<Selector> = LazyLock::new(|| sel("[data-pid], [data-sku]"));
}

static NEW_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(new|new arrival|just in)\b").expect("valid badge regex"));

const ORIGINAL_CLASSES: &[&str] = &["original-price", "was-price", "regular-price", "list-price"];

const OPEN_KEYWORDS: &[&str] = &["sandal", "slide", "thong", "flip-flop", "flip flop", "open-toe", "open toe"];
const CLOSED_KEYWORDS: &[&str] = &[
    "clog", "boot", "shoe", "sneaker", "loafer", "slipper", "closed-toe", "closed toe",
];

/// Listing markup generation a record was read from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaEra {
    /// Grid tiles; identifiers only appear as `SKU:`/`Model:`/`Item #:` text.
    Tile { sku_text: Option<String> },
    /// Cards carrying `data-pid`/`data-sku` attributes.
    Card {
        pid: Option<String>,
        sku_attr: Option<String>,
        sku_text: Option<String>,
    },
}

/// A single listing as found on the page, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    pub era: SchemaEra,
    pub name: String,
    pub current_price: f64,
    pub original_price: Option<f64>,
    pub style: Style,
    pub new_badge: bool,
    /// Lowercased container HTML, kept for channel markers.
    pub markup: String,
}

pub trait Parser {
    fn parse(&self, html: &str, category: &str) -> Result<Vec<RawListing>, ParserError>;
}

pub struct ListingParser {
    category_styles: BTreeMap<String, Style>,
}

impl ListingParser {
    pub fn new(category_styles: BTreeMap<String, Style>) -> Self {
        Self { category_styles }
    }

    /// Name keywords win over the configured category style.
    pub fn infer_style(&self, name: &str, category: &str) -> Style {
        keyword_style(name)
            .or_else(|| self.category_styles.get(category).copied())
            .or_else(|| keyword_style(category))
            .unwrap_or(Style::Unknown)
    }

    fn parse_listing(&self, container: ElementRef, category: &str, is_card: bool) -> Result<RawListing, ListingError> {
        let name = container
            .select(&selectors::NAME)
            .map(|n| collapse_ws(&n.text().collect::<String>()))
            .find(|n| !n.is_empty())
            .ok_or(ListingError::MissingField("name"))?;

        let price_text = current_price_text(container).ok_or(ListingError::MissingField("price"))?;
        let current_price = parse_price(&price_text)
            .filter(|p| *p > 0.0)
            .ok_or_else(|| ListingError::InvalidPrice(price_text.clone()))?;

        let original_price = container
            .select(&selectors::ORIGINAL_PRICE)
            .next()
            .and_then(|el| parse_price(&el.text().collect::<String>()));

        let text = container.text().collect::<Vec<_>>().join(" ");
        let sku_text = sku_from_text(&text);

        let era = if is_card {
            let (pid, sku_attr) = card_identifiers(container);
            SchemaEra::Card { pid, sku_attr, sku_text }
        } else {
            SchemaEra::Tile { sku_text }
        };

        let new_badge = NEW_MARKER.is_match(&name)
            || container
                .select(&selectors::BADGE)
                .any(|b| NEW_MARKER.is_match(&b.text().collect::<String>()));

        Ok(RawListing {
            era,
            style: self.infer_style(&name, category),
            name,
            current_price,
            original_price,
            new_badge,
            markup: container.html().to_lowercase(),
        })
    }
}

impl Parser for ListingParser {
    fn parse(&self, html: &str, category: &str) -> Result<Vec<RawListing>, ParserError> {
        let document = Html::parse_document(html);

        let containers: Vec<ElementRef> = document
            .select(&selectors::ANY_LISTING)
            .filter(|el| !wraps_listing(*el))
            .collect();
        if containers.is_empty() {
            return Err(ParserError::NoListings);
        }

        let mut listings = Vec::new();
        for container in containers {
            let is_card = selectors::CARD.matches(&container);
            match self.parse_listing(container, category, is_card) {
                Ok(listing) => listings.push(listing),
                Err(e) => debug!("Skipping listing in {}: {}", category, e),
            }
        }

        Ok(listings)
    }
}

fn keyword_style(text: &str) -> Option<Style> {
    let lower = text.to_lowercase();
    if OPEN_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(Style::OpenToe)
    } else if CLOSED_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(Style::ClosedToe)
    } else {
        None
    }
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_original_price(el: &ElementRef) -> bool {
    let element = el.value();
    matches!(element.name(), "del" | "s") || element.classes().any(|c| ORIGINAL_CLASSES.contains(&c))
}

/// Outer wrappers are dropped so the innermost container, which carries the card attributes, is kept.
fn wraps_listing(el: ElementRef) -> bool {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|d| selectors::ANY_LISTING.matches(&d))
}

/// Text of the first current-price element, ignoring any struck-through original price inside it.
fn current_price_text(container: ElementRef) -> Option<String> {
    selectors::CURRENT_PRICE.iter().find_map(|selector| {
        container
            .select(selector)
            .filter(|el| !is_original_price(el))
            .map(text_outside_original)
            .find(|t| !t.trim().is_empty())
    })
}

fn text_outside_original(el: ElementRef) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_original = node
            .ancestors()
            .take_while(|a| a.id() != el.id())
            .filter_map(ElementRef::wrap)
            .any(|a| is_original_price(&a));
        if !inside_original {
            out.push_str(text);
        }
    }
    out
}

fn card_identifiers(container: ElementRef) -> (Option<String>, Option<String>) {
    let attr = |name: &str| {
        std::iter::once(container)
            .chain(container.select(&selectors::PID))
            .find_map(|el| el.value().attr(name))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    (attr("data-pid"), attr("data-sku"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ListingParser {
        let styles = [("sandals".to_string(), Style::OpenToe), ("clogs".to_string(), Style::ClosedToe)]
            .into_iter()
            .collect();
        ListingParser::new(styles)
    }

    const TILE_PAGE: &str = r#"
        <html><body>
          <div class="product-tile">
            <h3 class="product-name">Arizona Soft Footbed</h3>
            <span class="price">$110.00</span>
            <p>SKU: 0051793</p>
          </div>
          <div class="product-tile">
            <h3 class="product-name">Gizeh</h3>
            <div class="price">
              <span class="was-price">$100.00</span>
              <span class="sale">$79.99</span>
            </div>
            <span class="badge">Just In</span>
          </div>
          <div class="product-tile">
            <h3 class="product-name">Broken</h3>
            <span class="price">Sold out</span>
          </div>
          <div class="product-tile">
            <span class="price">$50.00</span>
          </div>
        </body></html>
    "#;

    const CARD_PAGE: &str = r#"
        <html><body>
          <div class="product-card" data-pid="1017723">
            <a class="product-title" href="/boston">Boston Suede Leather</a>
            <span class="current-price">€ 99,95</span>
            <span class="regular-price">€ 140,00</span>
            <button class="add-to-cart">Add to cart</button>
          </div>
          <div class="product-item">
            <div class="product" data-sku="ARZ-EVA-BLK"></div>
            <span class="name">Arizona EVA</span>
            <span class="product-price">$49.95</span>
          </div>
        </body></html>
    "#;

    #[test]
    fn parses_tile_era_and_skips_bad_listings() {
        let listings = parser().parse(TILE_PAGE, "sandals").unwrap();
        assert_eq!(listings.len(), 2);

        let arizona = &listings[0];
        assert_eq!(arizona.name, "Arizona Soft Footbed");
        assert_eq!(arizona.current_price, 110.0);
        assert_eq!(arizona.original_price, None);
        assert_eq!(arizona.era, SchemaEra::Tile { sku_text: Some("0051793".into()) });
        assert_eq!(arizona.style, Style::OpenToe);
        assert!(!arizona.new_badge);

        let gizeh = &listings[1];
        assert_eq!(gizeh.current_price, 79.99);
        assert_eq!(gizeh.original_price, Some(100.0));
        assert!(gizeh.new_badge);
    }

    #[test]
    fn parses_card_era_identifiers() {
        let listings = parser().parse(CARD_PAGE, "clogs").unwrap();
        assert_eq!(listings.len(), 2);

        let boston = &listings[0];
        assert_eq!(boston.current_price, 99.95);
        assert_eq!(boston.original_price, Some(140.0));
        assert_eq!(
            boston.era,
            SchemaEra::Card { pid: Some("1017723".into()), sku_attr: None, sku_text: None }
        );
        assert_eq!(boston.style, Style::ClosedToe);
        assert!(boston.markup.contains("add to cart"));

        let eva = &listings[1];
        assert_eq!(
            eva.era,
            SchemaEra::Card { pid: None, sku_attr: Some("ARZ-EVA-BLK".into()), sku_text: None }
        );
        // falls back to the configured category style
        assert_eq!(eva.style, Style::ClosedToe);
    }

    #[test]
    fn page_without_listings_is_reported() {
        let err = parser().parse("<html><body><p>Maintenance</p></body></html>", "sandals");
        assert!(matches!(err, Err(ParserError::NoListings)));
        assert!(matches!(parser().parse("", "sandals"), Err(ParserError::NoListings)));
    }

    #[test]
    fn nested_containers_count_once() {
        let html = r#"<div class="product-tile"><div class="product-card" data-pid="X1">
            <span class="product-name">Milano</span><span class="price">$120</span></div></div>"#;
        let listings = parser().parse(html, "sandals").unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "Milano");
        assert_eq!(
            listings[0].era,
            SchemaEra::Card { pid: Some("X1".into()), sku_attr: None, sku_text: None }
        );
    }

    #[test]
    fn grid_wrapper_around_cards_keeps_each_card() {
        let html = r#"<div class="product-grid-item">
            <div class="product-card" data-pid="M1"><span class="product-name">Milano</span><span class="price">$120</span></div>
            <div class="product-card" data-pid="A1"><span class="product-name">Arizona</span><span class="price">$110</span></div>
            </div>"#;
        let pids: Vec<SchemaEra> = parser().parse(html, "sandals").unwrap().into_iter().map(|l| l.era).collect();
        assert_eq!(
            pids,
            vec![
                SchemaEra::Card { pid: Some("M1".into()), sku_attr: None, sku_text: None },
                SchemaEra::Card { pid: Some("A1".into()), sku_attr: None, sku_text: None },
            ]
        );
    }

    #[test]
    fn style_prefers_name_keywords() {
        let p = parser();
        assert_eq!(p.infer_style("Boston Clog", "sandals"), Style::ClosedToe);
        assert_eq!(p.infer_style("Mayari", "sandals"), Style::OpenToe);
        assert_eq!(p.infer_style("Highwood", "boots"), Style::ClosedToe);
        assert_eq!(p.infer_style("Gift Card", "accessories"), Style::Unknown);
    }
}
