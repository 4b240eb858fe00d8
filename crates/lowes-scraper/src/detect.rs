//! Block and renderer-crash detection for a loaded page.

use serde::Serialize;

use crate::page::PageHandle;

/// What a just-loaded page turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Ok,
    /// Bot wall or access-denied interstitial. Session-fatal for the category.
    Blocked,
    /// Renderer died; the same step may be reloaded.
    Crashed,
}

const BLOCK_MARKERS: &[&str] = &[
    "access denied",
    "you don't have permission to access",
    "you do not have permission to access",
    "errors.edgesuite.net",
    "reference&#32;&#35;",
    "pardon our interruption",
    "px-captcha",
    "are you a robot",
    "verify you are a human",
    "sec-if-cpt",
    "/_sec/cp_challenge",
];

const CRASH_MARKERS: &[&str] = &[
    "aw, snap",
    "he's dead, jim",
    "out of memory",
    "renderer process crashed",
    "status_access_violation",
    "status_breakpoint",
    "sad-tab",
];

/// Classifies a page from its title and serialized HTML.
///
/// Block markers win over crash markers: an Akamai denial page that also
/// mentions a crash string is still a block.
#[must_use]
pub fn classify(title: &str, content: &str) -> PageStatus {
    let title = title.to_lowercase();
    let content = content.to_lowercase();
    let found = |markers: &[&str]| {
        markers
            .iter()
            .any(|m| title.contains(m) || content.contains(m))
    };

    if found(BLOCK_MARKERS) {
        PageStatus::Blocked
    } else if found(CRASH_MARKERS) {
        PageStatus::Crashed
    } else {
        PageStatus::Ok
    }
}

/// Reads the live page and classifies it. A page that cannot be read at all
/// is reported as `Ok`; the extractor will simply find nothing on it.
pub async fn inspect<P>(page: &P) -> PageStatus
where
    P: PageHandle + ?Sized,
{
    let title = match page.title().await {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!(error = %e, "could not read page title");
            String::new()
        }
    };
    let content = match page.content().await {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "could not read page content");
            String::new()
        }
    };
    let status = classify(&title, &content);
    if status != PageStatus::Ok {
        tracing::warn!(?status, title = %title, "page is not usable");
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn akamai_denial_is_blocked() {
        let html = r#"<HTML><HEAD><TITLE>Access Denied</TITLE></HEAD><BODY>
            <H1>Access Denied</H1>You don't have permission to access
            "http://www.lowes.com/pl/paint" on this server.<P>
            Reference&#32;&#35;18&#46;2f3b3b17&#46;1700000000
            <P>https&#58;&#47;&#47;errors&#46;edgesuite&#46;net</BODY></HTML>"#;
        assert_eq!(classify("Access Denied", html), PageStatus::Blocked);
    }

    #[test]
    fn interstitial_challenge_is_blocked() {
        assert_eq!(
            classify("Pardon Our Interruption", "<div id=\"px-captcha\"></div>"),
            PageStatus::Blocked
        );
        assert_eq!(
            classify("", r#"<script src="/_sec/cp_challenge/sec-cpt-if-1.js"></script>"#),
            PageStatus::Blocked
        );
    }

    #[test]
    fn sad_tab_is_crashed() {
        assert_eq!(
            classify("", "<h1>Aw, Snap!</h1><p>Something went wrong. Error code: Out of Memory</p>"),
            PageStatus::Crashed
        );
        assert_eq!(
            classify("", "Error code: STATUS_ACCESS_VIOLATION"),
            PageStatus::Crashed
        );
    }

    #[test]
    fn block_wins_over_crash() {
        assert_eq!(
            classify("Access Denied", "Aw, snap"),
            PageStatus::Blocked
        );
    }

    #[test]
    fn normal_listing_is_ok() {
        let html = r#"<html><head><title>Paint at Lowes.com</title></head>
            <body><div data-testid="product-pod">Pickup Today</div></body></html>"#;
        assert_eq!(classify("Paint at Lowes.com", html), PageStatus::Ok);
    }

    #[test]
    fn empty_page_is_ok() {
        assert_eq!(classify("", ""), PageStatus::Ok);
    }
}
