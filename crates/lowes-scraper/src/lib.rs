//! Store-scoped "pickup today" listing scraper for lowes.com.
//!
//! The crate is layered: pure parsers and extractors at the bottom, the
//! [`PageHandle`] browser capability in the middle, and the pickup filter,
//! store-context setter and pagination loop on top. [`browser`] provides the
//! chromiumoxide implementation of `PageHandle`.

pub mod browser;
pub mod category;
pub mod detect;
pub mod error;
pub mod extract;
pub mod page;
pub mod pagination;
pub mod parse;
pub mod pickup;
pub mod retry;
pub mod selectors;
pub mod settings;
pub mod sink;
pub mod store_context;

pub use browser::{BrowserSession, ChromePage, FingerprintPool, SessionConfig};
pub use category::{
    decide, fetch_page, scrape_category, CategoryOutcome, CategoryReport, FetchStatus,
    PageFetchOutcome, StopReason,
};
pub use detect::{classify, inspect, PageStatus};
pub use error::{PageError, ScraperError, SinkError};
pub use extract::{extract_products, DomCardSource, Extraction, JsonLdSource, ProductSource};
pub use page::{NavigationResponse, PageHandle};
pub use pickup::{apply_pickup_filter, PickupFilterResult, PickupFilterSettings, VerificationSignal};
pub use retry::{retry_until, retry_with_backoff, RetryPolicy};
pub use settings::ScrapeSettings;
pub use sink::{JsonlSink, MemorySink, RecordSink};
pub use store_context::set_store_context;
