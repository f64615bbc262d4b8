// Funda Scraper Library
//
// Extracts real-estate listings from funda.nl into a fixed 21-column schema,
// fetching pages over plain HTTP or through a headless browser.

pub mod browser;
pub mod collector;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod output;
pub mod page;
pub mod parser;
pub mod progress;
pub mod schema;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use browser::{BrowserElement, BrowserLauncher, BrowserSession, ChromiumLauncher};
pub use collector::{ListingCollector, extract_listing_urls};
pub use config::{BrowserOptions, FetchConfig, ScraperConfig};
pub use error::{CollectError, FetchError};
pub use extract::{
    SENTINEL, clean_price, extract_attribute_value, extract_by_attributes, extract_by_label,
    extract_by_text,
};
pub use fetcher::{
    ConsentOutcome, FetchStrategy, HttpResponse, HttpTransport, PageFetcher, ReqwestTransport,
};
pub use output::OutputFormat;
pub use page::{PageError, PageHandle};
pub use parser::{PropertyParser, assemble_record};
pub use progress::{LogObserver, NullObserver, ProgressObserver};
pub use schema::{ExtractionRule, FieldRule, ListingRecord, Transform, empty_record, field_names, field_rules};
