//! Scripted page drivers for exercising the orchestrator without a browser.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use page_driver::{DriverError, NavigationPolicy, PageDriver, SessionFactory};

use confirmatudo::providers::AttemptTuning;

/// How one scripted session behaves across the confirmation flow.
#[derive(Clone, Copy, Debug)]
pub enum Script {
    /// Full flow succeeds; final page carries a success signature.
    Accept,
    /// Code field never renders after submitting the locator.
    RejectLocator,
    /// Flow completes but the final page shows a rejection.
    RejectCode,
    /// Navigation times out (simulated network stall).
    NavStall,
    /// First field interaction fails mid-sequence.
    FailFill,
    /// Accepts after holding the navigation open for the given time.
    SlowAccept(Duration),
    /// The factory refuses to hand this session out at all.
    FailOpen,
}

pub struct ScriptedDriver {
    script: Script,
    tag: usize,
    awaited: usize,
    log: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedDriver {
    fn record(&self, event: &str) {
        self.log
            .lock()
            .expect("interaction log")
            .push(format!("{}:{}", event, self.tag));
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn open(&mut self, _url: &str, _policy: &NavigationPolicy) -> Result<(), DriverError> {
        self.record("open");
        match self.script {
            Script::NavStall => Err(DriverError::Navigation(
                "navigation did not settle within 50ms".into(),
            )),
            Script::SlowAccept(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn await_element(&mut self, _selector: &str, _wait: Duration) -> Result<(), DriverError> {
        self.record("await");
        self.awaited += 1;
        // Second wait in the flow is for the code-entry field.
        if self.awaited == 2 && matches!(self.script, Script::RejectLocator) {
            return Err(DriverError::ElementNotFound(
                "code field not present".into(),
            ));
        }
        Ok(())
    }

    async fn fill_field(
        &mut self,
        _selector: &str,
        _value: &str,
        _per_char_delay: Duration,
    ) -> Result<(), DriverError> {
        self.record("fill");
        if matches!(self.script, Script::FailFill) {
            return Err(DriverError::Interaction("field refused focus".into()));
        }
        Ok(())
    }

    async fn click(&mut self, _selector: &str) -> Result<(), DriverError> {
        self.record("click");
        Ok(())
    }

    async fn visible_text(&mut self) -> Result<String, DriverError> {
        self.record("text");
        Ok(match self.script {
            Script::Accept | Script::SlowAccept(_) => {
                "Entrega Confirmada com Sucesso!".to_string()
            }
            _ => "Localizador ou código inválido.".to_string(),
        })
    }

    async fn close(&mut self) {
        self.record("close");
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out scripted sessions in order, one per `open_session` call.
pub struct ScriptedFactory {
    scripts: Mutex<VecDeque<Script>>,
    pub log: Arc<Mutex<Vec<String>>>,
    pub opened: AtomicUsize,
    pub close_counters: Mutex<Vec<Arc<AtomicUsize>>>,
    fail_open: bool,
}

impl ScriptedFactory {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            log: Arc::new(Mutex::new(Vec::new())),
            opened: AtomicUsize::new(0),
            close_counters: Mutex::new(Vec::new()),
            fail_open: false,
        }
    }

    /// A factory whose browser never starts.
    pub fn broken() -> Self {
        let mut factory = Self::new(Vec::new());
        factory.fail_open = true;
        factory
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn opens_logged(&self) -> usize {
        self.log
            .lock()
            .expect("interaction log")
            .iter()
            .filter(|entry| entry.starts_with("open:"))
            .count()
    }

    /// Asserts every session handed out was closed exactly once.
    pub fn assert_all_closed_once(&self) {
        let counters = self.close_counters.lock().expect("close counters");
        for (index, counter) in counters.iter().enumerate() {
            assert_eq!(
                counter.load(Ordering::SeqCst),
                1,
                "session {index} was not closed exactly once"
            );
        }
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    async fn open_session(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        if self.fail_open {
            return Err(DriverError::Session("browser executable missing".into()));
        }
        let script = self
            .scripts
            .lock()
            .expect("script queue")
            .pop_front()
            .ok_or_else(|| DriverError::Session("no script queued for session".into()))?;
        if matches!(script, Script::FailOpen) {
            return Err(DriverError::Session("browser process exited on start".into()));
        }
        let tag = self.opened.fetch_add(1, Ordering::SeqCst);
        let closes = Arc::new(AtomicUsize::new(0));
        self.close_counters
            .lock()
            .expect("close counters")
            .push(Arc::clone(&closes));
        Ok(Box::new(ScriptedDriver {
            script,
            tag,
            awaited: 0,
            log: Arc::clone(&self.log),
            closes,
        }))
    }
}

/// Tight timing for scripted flows; nothing here sleeps for real.
pub fn test_tuning() -> AttemptTuning {
    AttemptTuning {
        navigation: NavigationPolicy {
            max_wait: Duration::from_millis(50),
            settle_window: Duration::from_millis(1),
        },
        element_timeout: Duration::from_millis(20),
        settle_window: Duration::from_millis(1),
        type_delay: Duration::ZERO,
    }
}
