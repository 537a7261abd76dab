// Parser module: turns category pages into era-tagged listings.

pub mod listing_parser;

pub use listing_parser::{ListingParser, Parser, RawListing, SchemaEra};
