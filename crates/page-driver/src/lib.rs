//! Scoped browser session driver for scripted confirmation flows.
//!
//! Each delivery-confirmation attempt owns exactly one [`driver::PageDriver`]
//! session: acquired at the start of the attempt, released unconditionally at
//! the end. Sessions are never pooled or shared across attempts.

use std::{env, path::PathBuf};
use which::which;

pub mod driver;
pub mod factory;

pub mod ids {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use uuid::Uuid;

    /// Unique identifier for one browser session (one attempt).
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct SessionId(pub Uuid);

    impl SessionId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl Default for SessionId {
        fn default() -> Self {
            Self::new()
        }
    }

    impl fmt::Display for SessionId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }
}

pub mod error {
    use thiserror::Error;

    /// Failures surfaced by a page session. The caller classifies these into
    /// business rejection vs. automation breakage; the driver only reports
    /// what happened at the page level.
    #[derive(Clone, Debug, Error)]
    pub enum DriverError {
        #[error("navigation failed: {0}")]
        Navigation(String),
        #[error("element not found: {0}")]
        ElementNotFound(String),
        #[error("interaction failed: {0}")]
        Interaction(String),
        #[error("session failure: {0}")]
        Session(String),
    }

    impl DriverError {
        /// Stable kind label for diagnostics and tracing fields.
        pub fn kind(&self) -> &'static str {
            match self {
                DriverError::Navigation(_) => "navigation",
                DriverError::ElementNotFound(_) => "element-not-found",
                DriverError::Interaction(_) => "interaction",
                DriverError::Session(_) => "session",
            }
        }
    }
}

pub mod config {
    use crate::detect_browser_executable;
    use std::path::PathBuf;

    /// Configuration for launching one browser session.
    #[derive(Clone, Debug)]
    pub struct DriverConfig {
        /// Browser executable; auto-detected when absent.
        pub executable: Option<PathBuf>,
        pub headless: bool,
        /// Deadline for the browser process to come up.
        pub launch_timeout_ms: u64,
    }

    pub const DEFAULT_LAUNCH_TIMEOUT_MS: u64 = 20_000;

    impl DriverConfig {
        /// Config around an executable resolved by the caller. Detection runs
        /// at most once per process; this constructor never re-runs it.
        pub fn resolved(executable: Option<PathBuf>, headless: bool) -> Self {
            Self {
                executable,
                headless,
                launch_timeout_ms: DEFAULT_LAUNCH_TIMEOUT_MS,
            }
        }
    }

    impl Default for DriverConfig {
        fn default() -> Self {
            Self::resolved(detect_browser_executable(), true)
        }
    }
}

pub use config::DriverConfig;
pub use driver::{NavigationPolicy, PageDriver};
pub use error::DriverError;
pub use factory::{CdpSessionFactory, SessionFactory};
pub use ids::SessionId;

/// Locate a Chromium-family executable: env override first, then `$PATH`.
pub fn detect_browser_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("CONFIRMA_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in browser_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    None
}

fn browser_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "freebsd"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd"
    )))]
    {
        &["chrome"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_headless() {
        let config = DriverConfig::default();
        assert!(config.headless);
        assert!(config.launch_timeout_ms > 0);
    }

    #[test]
    fn resolved_config_keeps_the_given_executable() {
        let config = DriverConfig::resolved(Some(PathBuf::from("/opt/chromium/chrome")), false);
        assert_eq!(config.executable, Some(PathBuf::from("/opt/chromium/chrome")));
        assert!(!config.headless);

        // An unresolved executable stays unresolved; callers decide.
        assert_eq!(DriverConfig::resolved(None, true).executable, None);
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(DriverError::Navigation("x".into()).kind(), "navigation");
        assert_eq!(
            DriverError::ElementNotFound("x".into()).kind(),
            "element-not-found"
        );
        assert_eq!(DriverError::Interaction("x".into()).kind(), "interaction");
        assert_eq!(DriverError::Session("x".into()).kind(), "session");
    }
}
