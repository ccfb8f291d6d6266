//! Environment configuration, read once at process start.
//!
//! The orchestrator and drivers never read environment state themselves;
//! everything they need arrives through [`AppConfig`].

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use page_driver::{detect_browser_executable, DriverConfig, NavigationPolicy};

use crate::orchestrator::Strategy;
use crate::providers::{default_registry, AttemptTuning, ProviderSpec};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub headless: bool,
    pub browser_executable: Option<PathBuf>,
    pub ifood_url: Option<String>,
    pub ninety_nine_url: Option<String>,
    pub strategy: Strategy,
    /// Upper bound on simultaneous browser sessions.
    pub max_sessions: usize,
    /// Boundary rate ceiling, requests per minute per client.
    pub rate_per_min: u32,
    pub nav_timeout_ms: u64,
    pub element_timeout_ms: u64,
    /// Settle window after submissions; the original flow waited 3s.
    pub settle_ms: u64,
    pub type_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            headless: true,
            browser_executable: None,
            ifood_url: None,
            ninety_nine_url: None,
            strategy: Strategy::Sequential,
            max_sessions: 2,
            rate_per_min: 30,
            nav_timeout_ms: 30_000,
            element_timeout_ms: 10_000,
            settle_ms: 3_000,
            type_delay_ms: 80,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("PORT", defaults.port),
            headless: env_var("CONFIRMA_HEADLESS")
                .map(|value| parse_bool(&value))
                .unwrap_or(defaults.headless),
            // CONFIRMA_CHROME is honored inside the detector, which also
            // verifies the path exists before trusting it. Resolution happens
            // here once; nothing downstream re-detects.
            browser_executable: detect_browser_executable(),
            ifood_url: env_var("CONFIRMA_IFOOD_URL"),
            ninety_nine_url: env_var("CONFIRMA_99FOOD_URL"),
            strategy: env_var("CONFIRMA_STRATEGY")
                .and_then(|value| Strategy::from_str(&value).ok())
                .unwrap_or(defaults.strategy),
            max_sessions: env_parse("CONFIRMA_MAX_SESSIONS", defaults.max_sessions),
            rate_per_min: env_parse("CONFIRMA_RATE_PER_MIN", defaults.rate_per_min),
            nav_timeout_ms: env_parse("CONFIRMA_NAV_TIMEOUT_MS", defaults.nav_timeout_ms),
            element_timeout_ms: env_parse(
                "CONFIRMA_ELEMENT_TIMEOUT_MS",
                defaults.element_timeout_ms,
            ),
            settle_ms: env_parse("CONFIRMA_SETTLE_MS", defaults.settle_ms),
            type_delay_ms: env_parse("CONFIRMA_TYPE_DELAY_MS", defaults.type_delay_ms),
        }
    }

    pub fn registry(&self) -> Vec<ProviderSpec> {
        default_registry(self.ifood_url.clone(), self.ninety_nine_url.clone())
    }

    pub fn tuning(&self) -> AttemptTuning {
        AttemptTuning {
            navigation: NavigationPolicy {
                max_wait: Duration::from_millis(self.nav_timeout_ms),
                settle_window: Duration::from_millis(self.settle_ms),
            },
            element_timeout: Duration::from_millis(self.element_timeout_ms),
            settle_window: Duration::from_millis(self.settle_ms),
            type_delay: Duration::from_millis(self.type_delay_ms),
        }
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig::resolved(self.browser_executable.clone(), self.headless)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr + Copy>(name: &str, default: T) -> T {
    env_var(name)
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upstream_service() {
        let config = AppConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rate_per_min, 30);
        assert_eq!(config.settle_ms, 3_000);
        assert_eq!(config.type_delay_ms, 80);
        assert_eq!(config.strategy, Strategy::Sequential);
    }

    #[test]
    fn parse_bool_treats_off_values_as_false() {
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(" OFF "));
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
    }

    #[test]
    fn driver_config_passes_the_resolved_executable_through() {
        let config = AppConfig {
            browser_executable: Some(PathBuf::from("/opt/chromium/chrome")),
            headless: false,
            ..AppConfig::default()
        };
        let driver = config.driver_config();
        assert_eq!(driver.executable, Some(PathBuf::from("/opt/chromium/chrome")));
        assert!(!driver.headless);

        // No re-detection behind the caller's back: an unresolved executable
        // stays unresolved.
        let config = AppConfig::default();
        assert_eq!(config.driver_config().executable, None);
    }

    #[test]
    fn tuning_carries_configured_windows() {
        let config = AppConfig {
            settle_ms: 500,
            type_delay_ms: 10,
            ..AppConfig::default()
        };
        let tuning = config.tuning();
        assert_eq!(tuning.settle_window, Duration::from_millis(500));
        assert_eq!(tuning.navigation.settle_window, Duration::from_millis(500));
        assert_eq!(tuning.type_delay, Duration::from_millis(10));
    }
}
