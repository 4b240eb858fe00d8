//! Chrome session provisioning over the DevTools protocol.
//!
//! Everything site-specific lives above [`crate::page::PageHandle`]; this
//! module only launches Chrome with a fingerprint, a profile directory and
//! the stealth scripts, then hands out a [`ChromePage`].

mod page;
mod session;
mod stealth;

pub use page::ChromePage;
pub use session::{
    BrowserSession, Fingerprint, FingerprintPool, SessionConfig, DEFAULT_VIEWPORTS,
};
