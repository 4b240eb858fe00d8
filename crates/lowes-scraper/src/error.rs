use thiserror::Error;

/// Failures surfaced by a [`crate::page::PageHandle`] implementation.
///
/// The pagination loop converts every variant into a page-level outcome;
/// none of them abort a run on their own.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("timed out after {timeout_secs}s during {operation}")]
    Timeout {
        operation: &'static str,
        timeout_secs: u64,
    },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("browser protocol error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
}

impl PageError {
    /// Navigation timeouts and transport failures are worth another attempt;
    /// script errors and protocol failures usually mean the page is gone.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, PageError::Timeout { .. } | PageError::Navigation { .. })
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error writing records to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("invalid listing URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to launch browser: {reason}")]
    Launch { reason: String },

    #[error("failed to prepare browser profile at {path}: {source}")]
    Profile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
