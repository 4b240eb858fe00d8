use std::path::PathBuf;

use rust_decimal::Decimal;

/// Built-in desktop Chrome user agents used when `LOWES_USER_AGENTS` is unset.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub catalog_path: PathBuf,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub proxy_url: Option<String>,
    /// Persistent browser profile root. `None` means a fresh temp profile per
    /// session.
    pub profile_dir: Option<PathBuf>,
    pub user_agents: Vec<String>,
    pub max_concurrent_stores: usize,
    pub nav_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    pub page_size: u32,
    pub min_products: usize,
    pub max_zero_new_streak: u32,
    pub max_pages: u32,
    pub crash_retries: u32,
    pub nav_retries: u32,
    pub filter_rounds: u32,
    pub page_delay_min_ms: u64,
    pub page_delay_max_ms: u64,
    pub retry_backoff_base_ms: u64,
    pub clearance_min_pct_off: Decimal,
    pub max_consecutive_blocks: u32,
    pub max_session_rotations: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field("output_dir", &self.output_dir)
            .field("headless", &self.headless)
            .field("chrome_path", &self.chrome_path)
            .field("proxy_url", &self.proxy_url.as_ref().map(|_| "[redacted]"))
            .field("profile_dir", &self.profile_dir)
            .field("user_agents", &self.user_agents.len())
            .field("max_concurrent_stores", &self.max_concurrent_stores)
            .field("nav_timeout_secs", &self.nav_timeout_secs)
            .field("selector_timeout_secs", &self.selector_timeout_secs)
            .field("page_size", &self.page_size)
            .field("min_products", &self.min_products)
            .field("max_zero_new_streak", &self.max_zero_new_streak)
            .field("max_pages", &self.max_pages)
            .field("crash_retries", &self.crash_retries)
            .field("nav_retries", &self.nav_retries)
            .field("filter_rounds", &self.filter_rounds)
            .field("page_delay_min_ms", &self.page_delay_min_ms)
            .field("page_delay_max_ms", &self.page_delay_max_ms)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("clearance_min_pct_off", &self.clearance_min_pct_off)
            .field("max_consecutive_blocks", &self.max_consecutive_blocks)
            .field("max_session_rotations", &self.max_session_rotations)
            .finish()
    }
}
