use std::sync::Arc;

use crate::fetcher::{FetchStrategy, PageFetcher};
use crate::page::{PageError, PageHandle};
use crate::progress::{NullObserver, ProgressObserver};
use crate::schema::{FieldRule, ListingRecord, empty_record, field_rules};

/// Turns one listing URL into a [`ListingRecord`].
pub struct PropertyParser {
    fetcher: Arc<PageFetcher>,
    rules: &'static [FieldRule],
    observer: Arc<dyn ProgressObserver>,
}

impl PropertyParser {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self {
            fetcher,
            rules: field_rules(),
            observer: Arc::new(NullObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[cfg(test)]
    fn with_rules(mut self, rules: &'static [FieldRule]) -> Self {
        self.rules = rules;
        self
    }

    /// Fetches `url` and extracts every schema field.
    ///
    /// Never fails: a fetch failure or a broken extraction gives
    /// `empty_record(url)`, never a half-filled record.
    pub async fn parse_property(&self, url: &str) -> ListingRecord {
        self.observer.on_listing_started(url);

        let page = match self.fetcher.fetch(url, FetchStrategy::Lightweight).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("{}", e);
                self.observer.on_listing_degraded(url, &e.to_string());
                return empty_record(url);
            }
        };

        match assemble_with(&page, url, self.rules) {
            Ok(record) => {
                self.observer.on_listing_finished(&record);
                record
            }
            Err(e) => {
                log::warn!("Error parsing {}: {}", url, e);
                self.observer.on_listing_degraded(url, &e.to_string());
                empty_record(url)
            }
        }
    }
}

/// Extracts every schema field from an already fetched page.
pub fn assemble_record(page: &PageHandle, url: &str) -> Result<ListingRecord, PageError> {
    assemble_with(page, url, field_rules())
}

fn assemble_with(
    page: &PageHandle,
    url: &str,
    rules: &[FieldRule],
) -> Result<ListingRecord, PageError> {
    let fields = rules
        .iter()
        .map(|rule| rule.extract(page).map(|value| (rule.name, value)))
        .collect::<Result<Vec<_>, PageError>>()?;

    Ok(ListingRecord::from_fields(url, fields))
}
