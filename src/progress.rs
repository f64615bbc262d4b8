use crate::schema::ListingRecord;

/// Progress hooks for a collection run. Every method defaults to a no-op, so
/// implementors only override what they surface.
pub trait ProgressObserver: Send + Sync {
    /// The index page was loaded and `listings` links were found on it.
    fn on_index_loaded(&self, _index_url: &str, _listings: usize) {}

    fn on_listing_started(&self, _url: &str) {}

    fn on_listing_finished(&self, _record: &ListingRecord) {}

    /// The listing produced an all-sentinel record instead of data.
    fn on_listing_degraded(&self, _url: &str, _reason: &str) {}

    fn on_collection_finished(&self, _records: usize) {}
}

/// Reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {}

/// Forwards progress to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_index_loaded(&self, index_url: &str, listings: usize) {
        log::info!("Found {} properties on {}", listings, index_url);
    }

    fn on_listing_started(&self, url: &str) {
        log::info!("Scraping: {}", url);
    }

    fn on_listing_degraded(&self, url: &str, reason: &str) {
        log::warn!("No data for {}: {}", url, reason);
    }

    fn on_collection_finished(&self, records: usize) {
        log::info!("Collected {} listing(s)", records);
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every event as a short string, in arrival order.
    #[derive(Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ProgressObserver for RecordingObserver {
        fn on_index_loaded(&self, _index_url: &str, listings: usize) {
            self.push(format!("index:{}", listings));
        }

        fn on_listing_started(&self, url: &str) {
            self.push(format!("start:{}", url));
        }

        fn on_listing_finished(&self, record: &ListingRecord) {
            self.push(format!("done:{}", record.url()));
        }

        fn on_listing_degraded(&self, url: &str, _reason: &str) {
            self.push(format!("degraded:{}", url));
        }

        fn on_collection_finished(&self, records: usize) {
            self.push(format!("finished:{}", records));
        }
    }
}
