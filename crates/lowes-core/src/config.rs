use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::app_config::{AppConfig, DEFAULT_USER_AGENTS};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files; useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup, with no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_num = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value = parse_num(var, default)?;
        u32::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = parse_num(var, default)?;
        usize::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let log_level = or_default("LOWES_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default("LOWES_CATALOG_PATH", "./config/catalog.yaml"));
    let output_dir = PathBuf::from(or_default("LOWES_OUTPUT_DIR", "./output"));
    let headless = parse_bool("LOWES_HEADLESS", &or_default("LOWES_HEADLESS", "true"))?;
    let chrome_path = optional("LOWES_CHROME_PATH").map(PathBuf::from);
    let proxy_url = optional("LOWES_PROXY_URL");
    let profile_dir = optional("LOWES_PROFILE_DIR").map(PathBuf::from);
    let user_agents = parse_user_agents(optional("LOWES_USER_AGENTS").as_deref());

    let max_concurrent_stores = parse_usize("LOWES_MAX_CONCURRENT_STORES", "1")?;
    let nav_timeout_secs = parse_num("LOWES_NAV_TIMEOUT_SECS", "60")?;
    let selector_timeout_secs = parse_num("LOWES_SELECTOR_TIMEOUT_SECS", "10")?;
    let page_size = parse_u32("LOWES_PAGE_SIZE", "24")?;
    let min_products = parse_usize("LOWES_MIN_PRODUCTS", "6")?;
    let max_zero_new_streak = parse_u32("LOWES_MAX_ZERO_NEW_STREAK", "2")?;
    let max_pages = parse_u32("LOWES_MAX_PAGES", "50")?;
    let crash_retries = parse_u32("LOWES_CRASH_RETRIES", "2")?;
    let nav_retries = parse_u32("LOWES_NAV_RETRIES", "2")?;
    let filter_rounds = parse_u32("LOWES_FILTER_ROUNDS", "3")?;
    let page_delay_min_ms = parse_num("LOWES_PAGE_DELAY_MIN_MS", "2000")?;
    let page_delay_max_ms = parse_num("LOWES_PAGE_DELAY_MAX_MS", "5000")?;
    let retry_backoff_base_ms = parse_num("LOWES_RETRY_BACKOFF_BASE_MS", "1000")?;
    let clearance_min_pct_off = parse_ratio(
        "LOWES_CLEARANCE_MIN_PCT_OFF",
        &or_default("LOWES_CLEARANCE_MIN_PCT_OFF", "0.25"),
    )?;
    let max_consecutive_blocks = parse_u32("LOWES_MAX_CONSECUTIVE_BLOCKS", "3")?;
    let max_session_rotations = parse_u32("LOWES_MAX_SESSION_ROTATIONS", "1")?;

    if page_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "LOWES_PAGE_SIZE".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    if page_delay_min_ms > page_delay_max_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "LOWES_PAGE_DELAY_MIN_MS".to_string(),
            reason: format!(
                "{page_delay_min_ms} exceeds LOWES_PAGE_DELAY_MAX_MS ({page_delay_max_ms})"
            ),
        });
    }

    Ok(AppConfig {
        log_level,
        catalog_path,
        output_dir,
        headless,
        chrome_path,
        proxy_url,
        profile_dir,
        user_agents,
        max_concurrent_stores,
        nav_timeout_secs,
        selector_timeout_secs,
        page_size,
        min_products,
        max_zero_new_streak,
        max_pages,
        crash_retries,
        nav_retries,
        filter_rounds,
        page_delay_min_ms,
        page_delay_max_ms,
        retry_backoff_base_ms,
        clearance_min_pct_off,
        max_consecutive_blocks,
        max_session_rotations,
    })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_ratio(var: &str, raw: &str) -> Result<Decimal, ConfigError> {
    let value = Decimal::from_str(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })?;
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("{value} is outside [0, 1]"),
        });
    }
    Ok(value)
}

/// `|`-separated override, falling back to the built-in pool. User agents
/// contain commas and semicolons, so neither works as a separator.
fn parse_user_agents(raw: Option<&str>) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or_default()
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if parsed.is_empty() {
        DEFAULT_USER_AGENTS.iter().map(|s| (*s).to_string()).collect()
    } else {
        parsed
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
