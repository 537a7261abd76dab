// Scraper module: page fetching and the archive snapshot index.

pub mod archive;
pub mod fetcher;
pub mod traits;

pub use archive::ArchiveIndex;
pub use fetcher::ScraperImpl;
pub use traits::Scraper;
