use thiserror::Error;

/// A page could not be turned into a [`PageHandle`](crate::page::PageHandle).
///
/// Callers treat this as "no data" for the page, never as a reason to panic.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("HTTP error {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("empty response body for {url}")]
    EmptyBody { url: String },

    #[error("browser automation failed for {url}: {reason}")]
    Browser { url: String, reason: String },

    #[error("timed out after {secs}s fetching {url}")]
    Timeout { url: String, secs: u64 },
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to load the index page: {0}")]
    IndexFetch(#[from] FetchError),

    #[error("invalid index URL {url}: {reason}")]
    InvalidIndexUrl { url: String, reason: String },

    #[error("could not read listing links from the index page: {0}")]
    IndexParse(#[from] crate::page::PageError),
}
