//! The page session contract and its chromiumoxide implementation.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::ids::SessionId;

/// Poll interval while waiting for a selector to appear.
const ELEMENT_POLL: Duration = Duration::from_millis(100);

/// How a navigation is considered finished: wait for the load to complete
/// within `max_wait`, then hold a quiet `settle_window` so asynchronous
/// validation on the page has a chance to render. The settle window is a
/// bounded proxy for network quiescence and is tunable per deployment.
#[derive(Clone, Copy, Debug)]
pub struct NavigationPolicy {
    pub max_wait: Duration,
    pub settle_window: Duration,
}

/// One remote page session, scoped to a single confirmation attempt.
///
/// Every operation mutates live third-party page state and is not idempotent
/// from the provider's perspective; a failed attempt must not be replayed
/// against the same provider within the same request.
#[async_trait]
pub trait PageDriver: Send {
    /// Navigate to `url` and wait for the page to settle.
    async fn open(&mut self, url: &str, policy: &NavigationPolicy) -> Result<(), DriverError>;

    /// Wait until `selector` matches an element, polling up to `wait`.
    async fn await_element(&mut self, selector: &str, wait: Duration) -> Result<(), DriverError>;

    /// Focus the field and type `value` one character at a time. The pacing
    /// delay mimics human input; it is a tunable, not a correctness knob.
    async fn fill_field(
        &mut self,
        selector: &str,
        value: &str,
        per_char_delay: Duration,
    ) -> Result<(), DriverError>;

    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<(), DriverError>;

    /// Rendered visible text of the current page. Callers case-fold before
    /// matching success signatures.
    async fn visible_text(&mut self) -> Result<String, DriverError>;

    /// Release the session. Idempotent; must run exactly once per attempt
    /// regardless of which step failed.
    async fn close(&mut self);
}

/// [`PageDriver`] backed by a dedicated Chromium process via the DevTools
/// protocol. One process per session; nothing outlives `close`.
pub struct CdpPageDriver {
    session: SessionId,
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Option<Page>,
    closed: bool,
}

impl CdpPageDriver {
    pub async fn launch(config: &DriverConfig) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox");
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable {
            builder = builder.chrome_executable(path.clone());
        }
        let browser_config = builder.build().map_err(DriverError::Session)?;

        let launch_deadline = Duration::from_millis(config.launch_timeout_ms);
        let (browser, mut handler) = timeout(launch_deadline, Browser::launch(browser_config))
            .await
            .map_err(|_| DriverError::Session("browser did not launch before deadline".into()))?
            .map_err(|err| DriverError::Session(format!("browser launch failed: {err}")))?;

        let session = SessionId::new();
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        debug!(%session, "browser session launched");

        Ok(Self {
            session,
            browser,
            handler_task,
            page: None,
            closed: false,
        })
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    fn page(&self) -> Result<&Page, DriverError> {
        self.page
            .as_ref()
            .ok_or_else(|| DriverError::Interaction("no page opened in this session".into()))
    }
}

#[async_trait]
impl PageDriver for CdpPageDriver {
    async fn open(&mut self, url: &str, policy: &NavigationPolicy) -> Result<(), DriverError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|err| DriverError::Navigation(format!("could not open page: {err}")))?;

        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };
        match timeout(policy.max_wait, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                return Err(DriverError::Navigation(format!(
                    "navigation to {url} failed: {err}"
                )));
            }
            Err(_) => {
                return Err(DriverError::Navigation(format!(
                    "navigation to {url} did not settle within {}ms",
                    policy.max_wait.as_millis()
                )));
            }
        }

        // Settle window: many confirmation pages validate asynchronously
        // without a reliable loading indicator.
        sleep(policy.settle_window).await;
        self.page = Some(page);
        debug!(session = %self.session, url, "navigation settled");
        Ok(())
    }

    async fn await_element(&mut self, selector: &str, wait: Duration) -> Result<(), DriverError> {
        let page = self.page()?;
        let deadline = Instant::now() + wait;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::ElementNotFound(format!(
                    "selector '{selector}' not present after {}ms",
                    wait.as_millis()
                )));
            }
            sleep(ELEMENT_POLL).await;
        }
    }

    async fn fill_field(
        &mut self,
        selector: &str,
        value: &str,
        per_char_delay: Duration,
    ) -> Result<(), DriverError> {
        let page = self.page()?;
        let element = page.find_element(selector).await.map_err(|err| {
            DriverError::Interaction(format!("field '{selector}' not available: {err}"))
        })?;
        element.click().await.map_err(|err| {
            DriverError::Interaction(format!("could not focus '{selector}': {err}"))
        })?;

        let mut buf = [0u8; 4];
        for ch in value.chars() {
            element.type_str(ch.encode_utf8(&mut buf)).await.map_err(|err| {
                DriverError::Interaction(format!("typing into '{selector}' failed: {err}"))
            })?;
            if !per_char_delay.is_zero() {
                sleep(per_char_delay).await;
            }
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        let page = self.page()?;
        let element = page.find_element(selector).await.map_err(|err| {
            DriverError::Interaction(format!("click target '{selector}' not found: {err}"))
        })?;
        element.click().await.map_err(|err| {
            DriverError::Interaction(format!("click on '{selector}' failed: {err}"))
        })?;
        Ok(())
    }

    async fn visible_text(&mut self) -> Result<String, DriverError> {
        let page = self.page()?;
        let result = page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(|err| {
                DriverError::Interaction(format!("could not extract page text: {err}"))
            })?;
        result
            .into_value::<String>()
            .map_err(|err| DriverError::Interaction(format!("page text was not a string: {err}")))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.page = None;
        if let Err(err) = self.browser.close().await {
            warn!(session = %self.session, %err, "browser close reported an error");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        debug!(session = %self.session, "browser session released");
    }
}
