use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use futures::StreamExt;
use lowes_core::AppConfig;
use rand::seq::IndexedRandom;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use super::page::ChromePage;
use super::stealth::STEALTH_SCRIPTS;
use crate::error::{PageError, ScraperError};

/// Common desktop resolutions.
pub const DEFAULT_VIEWPORTS: &[(u32, u32)] = &[
    (1920, 1080),
    (1536, 864),
    (1440, 900),
    (1366, 768),
    (1680, 1050),
];

/// User agents and window sizes a session may present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintPool {
    pub user_agents: Vec<String>,
    pub viewports: Vec<(u32, u32)>,
}

impl Default for FingerprintPool {
    fn default() -> Self {
        Self {
            user_agents: lowes_core::DEFAULT_USER_AGENTS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            viewports: DEFAULT_VIEWPORTS.to_vec(),
        }
    }
}

/// One concrete choice from a [`FingerprintPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub user_agent: String,
    pub viewport: (u32, u32),
}

impl FingerprintPool {
    /// Picks a random user agent and viewport. Empty pools fall back to the
    /// built-in defaults.
    #[must_use]
    pub fn pick(&self) -> Fingerprint {
        let mut rng = rand::rng();
        let user_agent = self
            .user_agents
            .choose(&mut rng)
            .cloned()
            .or_else(|| {
                lowes_core::DEFAULT_USER_AGENTS
                    .choose(&mut rng)
                    .map(|s| (*s).to_string())
            })
            .unwrap_or_default();
        let viewport = self
            .viewports
            .choose(&mut rng)
            .or_else(|| DEFAULT_VIEWPORTS.choose(&mut rng))
            .copied()
            .unwrap_or((1920, 1080));
        Fingerprint {
            user_agent,
            viewport,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    /// `scheme://host:port`. Credentials in the URL are not forwarded to
    /// Chrome, which does not accept them on the command line.
    pub proxy_url: Option<String>,
    /// Root for persistent profiles, one subdirectory per store. `None`
    /// gives every session a throwaway profile.
    pub profile_dir: Option<PathBuf>,
    pub fingerprints: FingerprintPool,
    pub nav_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            proxy_url: None,
            profile_dir: None,
            fingerprints: FingerprintPool::default(),
            nav_timeout: Duration::from_secs(60),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            headless: config.headless,
            chrome_path: config.chrome_path.clone(),
            proxy_url: config.proxy_url.clone(),
            profile_dir: config.profile_dir.clone(),
            fingerprints: FingerprintPool {
                user_agents: config.user_agents.clone(),
                viewports: DEFAULT_VIEWPORTS.to_vec(),
            },
            nav_timeout: Duration::from_secs(config.nav_timeout_secs),
        }
    }
}

enum Profile {
    Persistent(PathBuf),
    Ephemeral(TempDir),
}

impl Profile {
    fn path(&self) -> &Path {
        match self {
            Profile::Persistent(path) => path,
            Profile::Ephemeral(dir) => dir.path(),
        }
    }
}

async fn prepare_profile(root: Option<&Path>, key: &str) -> Result<Profile, ScraperError> {
    match root {
        Some(root) => {
            let path = root.join(sanitize_key(key));
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|source| ScraperError::Profile {
                    path: path.display().to_string(),
                    source,
                })?;
            Ok(Profile::Persistent(path))
        }
        None => tempfile::Builder::new()
            .prefix("lowes-profile-")
            .tempdir()
            .map(Profile::Ephemeral)
            .map_err(|source| ScraperError::Profile {
                path: std::env::temp_dir().display().to_string(),
                source,
            }),
    }
}

fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

/// Drops any `user:pass@` from a proxy URL.
fn proxy_server_arg(proxy_url: &str) -> String {
    match url::Url::parse(proxy_url) {
        Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
            tracing::warn!("proxy credentials are not supported by --proxy-server and were dropped");
            // Both setters only fail for cannot-be-a-base URLs, which a
            // proxy URL with credentials never is.
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        _ => proxy_url.to_string(),
    }
}

/// A launched Chrome with one working tab.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: ChromePage,
    fingerprint: Fingerprint,
    _profile: Profile,
}

impl BrowserSession {
    /// Launches Chrome, opens a tab, and applies the fingerprint and stealth
    /// scripts before any navigation.
    ///
    /// `profile_key` names the persistent profile subdirectory, typically
    /// the store ID.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Profile`] if the profile directory cannot be
    /// prepared, [`ScraperError::Launch`] if Chrome cannot be started, or
    /// [`ScraperError::Page`] if the initial tab setup fails.
    pub async fn launch(config: &SessionConfig, profile_key: &str) -> Result<Self, ScraperError> {
        let profile = prepare_profile(config.profile_dir.as_deref(), profile_key).await?;
        let fingerprint = config.fingerprints.pick();
        let (width, height) = fingerprint.viewport;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .window_size(width, height)
            .viewport(None)
            .request_timeout(config.nav_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-dev-shm-usage")
            .arg("--lang=en-US");
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(proxy) = &config.proxy_url {
            builder = builder.arg(format!("--proxy-server={}", proxy_server_arg(proxy)));
        }
        let browser_config = builder
            .build()
            .map_err(|reason| ScraperError::Launch { reason })?;

        let (browser, mut handler) =
            Browser::launch(browser_config)
                .await
                .map_err(|e| ScraperError::Launch {
                    reason: e.to_string(),
                })?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler event error");
                }
            }
        });

        let tab = browser.new_page("about:blank").await.map_err(PageError::from)?;
        tab.execute(SetUserAgentOverrideParams::new(fingerprint.user_agent.clone()))
            .await
            .map_err(PageError::from)?;
        for script in STEALTH_SCRIPTS {
            tab.execute(AddScriptToEvaluateOnNewDocumentParams::new(*script))
                .await
                .map_err(PageError::from)?;
        }

        tracing::info!(
            profile_key,
            headless = config.headless,
            viewport = %format!("{width}x{height}"),
            persistent_profile = matches!(profile, Profile::Persistent(_)),
            "browser session launched"
        );

        Ok(Self {
            browser,
            handler,
            page: ChromePage::new(tab, config.nav_timeout),
            fingerprint,
            _profile: profile,
        })
    }

    #[must_use]
    pub fn page(&self) -> &ChromePage {
        &self.page
    }

    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Closes Chrome and stops the protocol handler. Ephemeral profiles are
    /// removed when the session is dropped.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!(error = %e, "browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "waiting for browser exit failed");
        }
        self.handler.abort();
    }
}
