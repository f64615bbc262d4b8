use futures::stream::{self, StreamExt};
use std::sync::Arc;
use url::Url;

use crate::config::ScraperConfig;
use crate::error::CollectError;
use crate::fetcher::{FetchStrategy, PageFetcher};
use crate::page::{self, PageError, PageHandle};
use crate::parser::PropertyParser;
use crate::progress::{NullObserver, ProgressObserver};
use crate::schema::ListingRecord;

/// Drives a whole run: index page, listing links, one record per link.
pub struct ListingCollector {
    fetcher: Arc<PageFetcher>,
    parser: PropertyParser,
    link_class: String,
    index_strategy: FetchStrategy,
    concurrency: usize,
    observer: Arc<dyn ProgressObserver>,
}

impl ListingCollector {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self::from_config(fetcher, &ScraperConfig::default())
    }

    pub fn from_config(fetcher: Arc<PageFetcher>, config: &ScraperConfig) -> Self {
        Self {
            parser: PropertyParser::new(Arc::clone(&fetcher)),
            fetcher,
            link_class: config.listing_link_class.clone(),
            index_strategy: config.index_strategy,
            concurrency: config.effective_concurrency(),
            observer: Arc::new(NullObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.parser = self.parser.with_observer(Arc::clone(&observer));
        self.observer = observer;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Collects one record per listing linked from `index_url`, in link order.
    ///
    /// Only a failure to load the index page is an error; individual listings
    /// degrade to empty records instead.
    pub async fn collect(&self, index_url: &str) -> Result<Vec<ListingRecord>, CollectError> {
        let base = Url::parse(index_url).map_err(|e| CollectError::InvalidIndexUrl {
            url: index_url.to_string(),
            reason: e.to_string(),
        })?;

        let urls = {
            let page = self.fetcher.fetch(index_url, self.index_strategy).await?;
            extract_listing_urls(&page, &base, &self.link_class)?
        };
        self.observer.on_index_loaded(index_url, urls.len());

        // `buffered` keeps output in input order even when several run at once.
        let records: Vec<ListingRecord> = stream::iter(&urls)
            .map(|url| self.parser.parse_property(url))
            .buffered(self.concurrency)
            .collect()
            .await;

        self.observer.on_collection_finished(records.len());
        Ok(records)
    }
}

/// Absolute URLs of every `<a>` carrying `link_class`, in document order.
///
/// Anchors without an `href` (or with an empty one) are skipped.
pub fn extract_listing_urls(
    page: &PageHandle,
    base: &Url,
    link_class: &str,
) -> Result<Vec<String>, PageError> {
    let anchors = page.find_all("a", &[("class", link_class)])?;

    Ok(anchors
        .into_iter()
        .filter_map(|anchor| page::attribute(anchor, "href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| match base.join(href) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                log::debug!("Skipping listing link {}: {}", href, e);
                None
            }
        })
        .collect())
}
