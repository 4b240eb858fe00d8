//! Tunables for one category run, derived from [`lowes_core::AppConfig`].

use std::time::Duration;

use lowes_core::AppConfig;
use rand::Rng;
use rust_decimal::Decimal;

use crate::pickup::PickupFilterSettings;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub page_size: u32,
    /// A page with fewer product entries than this is the last page.
    pub min_products: usize,
    /// Consecutive pages with no unseen records before giving up.
    pub max_zero_new_streak: u32,
    pub max_pages: u32,
    /// Reloads allowed for one offset after a renderer crash.
    pub crash_retries: u32,
    pub navigation: RetryPolicy,
    pub pickup: PickupFilterSettings,
    /// Attempts at pinning the store before scraping without it.
    pub store_context: RetryPolicy,
    pub selector_timeout: Duration,
    pub network_idle_timeout: Duration,
    pub page_delay_min: Duration,
    pub page_delay_max: Duration,
    pub clearance_min_pct_off: Decimal,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            page_size: 24,
            min_products: 6,
            max_zero_new_streak: 2,
            max_pages: 50,
            crash_retries: 2,
            navigation: RetryPolicy::new(3, Duration::from_secs(1)),
            pickup: PickupFilterSettings::default(),
            store_context: RetryPolicy::new(2, Duration::from_secs(2)),
            selector_timeout: Duration::from_secs(10),
            network_idle_timeout: Duration::from_secs(5),
            page_delay_min: Duration::from_millis(2000),
            page_delay_max: Duration::from_millis(5000),
            clearance_min_pct_off: Decimal::new(25, 2),
        }
    }
}

impl ScrapeSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let backoff = Duration::from_millis(config.retry_backoff_base_ms);
        let network_idle_timeout = Duration::from_secs(config.selector_timeout_secs.min(5));
        Self {
            page_size: config.page_size,
            min_products: config.min_products,
            max_zero_new_streak: config.max_zero_new_streak,
            max_pages: config.max_pages,
            crash_retries: config.crash_retries,
            navigation: RetryPolicy::new(config.nav_retries.saturating_add(1), backoff)
                .with_jitter(backoff / 2),
            pickup: PickupFilterSettings {
                retry: RetryPolicy::new(config.filter_rounds, backoff).with_jitter(backoff),
                network_idle_timeout,
                ..PickupFilterSettings::default()
            },
            store_context: RetryPolicy::new(2, backoff.saturating_mul(2)),
            selector_timeout: Duration::from_secs(config.selector_timeout_secs),
            network_idle_timeout,
            page_delay_min: Duration::from_millis(config.page_delay_min_ms),
            page_delay_max: Duration::from_millis(config.page_delay_max_ms),
            clearance_min_pct_off: config.clearance_min_pct_off,
        }
    }

    /// Same thresholds with every sleep removed. Used by tests and fixture
    /// replays.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.navigation.base_delay = Duration::ZERO;
        self.navigation.max_jitter = Duration::ZERO;
        self.pickup.retry.base_delay = Duration::ZERO;
        self.pickup.retry.max_jitter = Duration::ZERO;
        self.pickup.network_idle_timeout = Duration::ZERO;
        self.store_context.base_delay = Duration::ZERO;
        self.store_context.max_jitter = Duration::ZERO;
        self.network_idle_timeout = Duration::ZERO;
        self.selector_timeout = Duration::ZERO;
        self.page_delay_min = Duration::ZERO;
        self.page_delay_max = Duration::ZERO;
        self
    }

    /// A random pause in `[page_delay_min, page_delay_max]`.
    #[must_use]
    pub fn pacing_delay(&self) -> Duration {
        let min = self.page_delay_min.min(self.page_delay_max);
        let max = self.page_delay_max.max(self.page_delay_min);
        if min == max {
            return min;
        }
        let lo = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
        let hi = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacing_delay_stays_in_range() {
        let settings = ScrapeSettings::default();
        for _ in 0..100 {
            let d = settings.pacing_delay();
            assert!(d >= Duration::from_millis(2000) && d <= Duration::from_millis(5000));
        }
    }

    #[test]
    fn without_delays_zeroes_every_wait() {
        let settings = ScrapeSettings::default().without_delays();
        assert_eq!(settings.pacing_delay(), Duration::ZERO);
        assert_eq!(settings.navigation.delay_for(3), Duration::ZERO);
        assert_eq!(settings.pickup.retry.delay_for(1), Duration::ZERO);
        assert_eq!(settings.page_size, 24);
    }

    #[test]
    fn defaults_match_documented_thresholds() {
        let settings = ScrapeSettings::default();
        assert_eq!(settings.min_products, 6);
        assert_eq!(settings.max_zero_new_streak, 2);
        assert_eq!(settings.max_pages, 50);
        assert_eq!(settings.crash_retries, 2);
        assert_eq!(settings.clearance_min_pct_off, Decimal::new(25, 2));
    }
}
