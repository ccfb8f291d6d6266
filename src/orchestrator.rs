//! Multi-provider confirmation orchestrator.
//!
//! Owns the ordered provider registry, allocates one scoped page session per
//! attempt, and normalizes every adapter outcome into a single
//! [`ConfirmationResult`]. Provider-specific failures never leak past this
//! layer; an infrastructure failure propagates only when no session could be
//! opened for the request at all.

use std::str::FromStr;
use std::sync::Arc;

use page_driver::{DriverError, PageDriver, SessionFactory};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::model::{ConfirmationRequest, ConfirmationResult, ProviderOutcome};
use crate::providers::{AttemptTuning, ProviderSpec};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Attempt providers in registration order; stop at the first acceptance.
    #[default]
    Sequential,
    /// Launch all providers at once and wait for every attempt to settle.
    /// Trades latency for N simultaneous browser sessions.
    Concurrent,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Strategy::Sequential),
            "concurrent" => Ok(Strategy::Concurrent),
            other => Err(format!(
                "unknown strategy '{other}' (expected 'sequential' or 'concurrent')"
            )),
        }
    }
}

pub struct Orchestrator {
    providers: Arc<Vec<ProviderSpec>>,
    factory: Arc<dyn SessionFactory>,
    strategy: Strategy,
    tuning: AttemptTuning,
    /// Bounds simultaneous browser sessions across the whole process; the
    /// concurrent strategy would otherwise consume one session per provider
    /// per in-flight request.
    session_permits: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(
        providers: Vec<ProviderSpec>,
        factory: Arc<dyn SessionFactory>,
        strategy: Strategy,
        tuning: AttemptTuning,
        max_sessions: usize,
    ) -> Self {
        Self {
            providers: Arc::new(providers),
            factory,
            strategy,
            tuning,
            session_permits: Arc::new(Semaphore::new(max_sessions.max(1))),
        }
    }

    /// Precondition: `request` was validated non-empty by the HTTP boundary.
    pub async fn confirm(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<ConfirmationResult, AppError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("confirm", %request_id, strategy = ?self.strategy);
        async {
            let result = match self.strategy {
                Strategy::Sequential => self.confirm_sequential(request).await?,
                Strategy::Concurrent => self.confirm_concurrent(request).await?,
            };
            info!(
                success = result.success,
                attempts = result.attempts.len(),
                provider = result
                    .accepting_provider
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "nenhuma".to_string()),
                "confirmation finished"
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }

    async fn confirm_sequential(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<ConfirmationResult, AppError> {
        let mut attempts = Vec::with_capacity(self.providers.len());
        for spec in self.providers.iter() {
            let outcome = self
                .run_attempt(spec, request)
                .await
                .map_err(|err| AppError::Infrastructure(format!("could not open session: {err}")))?;
            let accepted = outcome.accepted;
            attempts.push(outcome);
            if accepted {
                // Stop here: attempting further providers after an
                // acceptance could confirm the same delivery twice.
                let winner = attempts[attempts.len() - 1].clone();
                return Ok(ConfirmationResult::accepted(&winner, attempts));
            }
        }
        Ok(ConfirmationResult::rejected(attempts))
    }

    async fn confirm_concurrent(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<ConfirmationResult, AppError> {
        // Full-settle aggregation: wait for every provider rather than racing
        // to the first success, so diagnostics stay deterministic.
        let settled = futures::future::join_all(
            self.providers
                .iter()
                .map(|spec| self.run_attempt(spec, request)),
        )
        .await;

        // A single provider whose browser never started must not erase what
        // the other providers answered; its failure becomes one more
        // not-accepted attempt. Only when no session opened at all is there
        // nothing to report and the request fails as infrastructure.
        let mut attempts = Vec::with_capacity(settled.len());
        let mut unopened = 0;
        for (spec, outcome) in self.providers.iter().zip(settled) {
            match outcome {
                Ok(outcome) => attempts.push(outcome),
                Err(err) => {
                    unopened += 1;
                    warn!(provider = %spec.id, %err, "session never opened for this provider");
                    attempts.push(ProviderOutcome::rejected(
                        spec.id,
                        format!("Não foi possível consultar {}", spec.id),
                        format!("session not opened: {err}"),
                    ));
                }
            }
        }
        if !attempts.is_empty() && unopened == attempts.len() {
            return Err(AppError::Infrastructure(
                "no provider session could be opened".into(),
            ));
        }

        let accepted: Vec<ProviderOutcome> = attempts
            .iter()
            .filter(|outcome| outcome.accepted)
            .cloned()
            .collect();
        match accepted.first() {
            None => Ok(ConfirmationResult::rejected(attempts)),
            Some(winner) => {
                let mut result = ConfirmationResult::accepted(winner, attempts);
                if accepted.len() > 1 {
                    // Should not happen with well-behaved providers; the
                    // tie-break is first-registered wins.
                    warn!(
                        winners = accepted.len(),
                        reported = %winner.provider,
                        "multiple providers reported acceptance for one request"
                    );
                    result.message.push_str(
                        " (mais de uma plataforma aceitou; reportando a primeira registrada)",
                    );
                }
                Ok(result)
            }
        }
    }

    /// One provider attempt on one fresh session. The session is closed
    /// unconditionally once the adapter returns — or, if this future is
    /// dropped mid-attempt, by the guard; adapters themselves never fail, so
    /// the only error path here is the session that never opened.
    async fn run_attempt(
        &self,
        spec: &ProviderSpec,
        request: &ConfirmationRequest,
    ) -> Result<ProviderOutcome, DriverError> {
        let permit = self
            .session_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DriverError::Session("session limiter closed".into()))?;

        let driver = self.factory.open_session().await?;

        let mut guard = SessionGuard::new(driver, permit);
        let driver = guard
            .driver
            .as_deref_mut()
            .ok_or_else(|| DriverError::Session("session already released".into()))?;
        let outcome = spec.attempt(driver, request, &self.tuning).await;
        guard.release().await;
        Ok(outcome)
    }
}

/// Holds one open session and its semaphore permit for the span of an
/// attempt. Normal flow goes through [`SessionGuard::release`]; if the
/// attempt future is dropped first (client gone, server shutting down), the
/// close still runs on a detached task so the browser process is not leaked
/// and the permit is not returned before the session is actually gone.
struct SessionGuard {
    driver: Option<Box<dyn PageDriver>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl SessionGuard {
    fn new(driver: Box<dyn PageDriver>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            driver: Some(driver),
            permit: Some(permit),
        }
    }

    async fn release(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.close().await;
        }
        self.permit = None;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            let permit = self.permit.take();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    driver.close().await;
                    drop(permit);
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_known_values() {
        assert_eq!(Strategy::from_str("sequential"), Ok(Strategy::Sequential));
        assert_eq!(Strategy::from_str(" Concurrent "), Ok(Strategy::Concurrent));
        assert!(Strategy::from_str("race").is_err());
    }

    #[test]
    fn strategy_defaults_to_sequential() {
        assert_eq!(Strategy::default(), Strategy::Sequential);
    }
}
