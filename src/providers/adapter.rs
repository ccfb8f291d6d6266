//! The scripted attempt flow, shared by every provider.
//!
//! Differences between providers live entirely in [`super::ProviderSpec`]
//! data; the sequence of page interactions is the same. The flow never lets a
//! driver failure escape: whatever happens, the caller gets a
//! [`ProviderOutcome`].

use std::time::Duration;

use page_driver::{DriverError, NavigationPolicy, PageDriver};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::ProviderSpec;
use crate::model::{ConfirmationRequest, ProviderOutcome};

/// Per-attempt timing knobs, read once from configuration.
#[derive(Clone, Copy, Debug)]
pub struct AttemptTuning {
    pub navigation: NavigationPolicy,
    /// Deadline for the locator field to appear after navigation.
    pub element_timeout: Duration,
    /// Bounded wait for the page to react to a submission.
    pub settle_window: Duration,
    /// Per-character typing delay.
    pub type_delay: Duration,
}

/// Internal classification of a failed attempt. Collapses to an
/// `accepted == false` outcome at the boundary, but rejection and automation
/// breakage stay distinguishable through the diagnostic.
enum AttemptFailure {
    /// The page never showed the locator field; the provider's UI changed or
    /// the page did not load. Automation-class failure.
    FormUnavailable(DriverError),
    /// A driver step failed mid-flow. Automation-class failure.
    Automation(DriverError),
    /// The code field never rendered after submitting the locator: the
    /// provider did not accept it.
    LocatorRejected,
    /// The final page did not match any success signature.
    CodeRejected,
}

impl ProviderSpec {
    /// Run the full confirmation flow against one fresh session.
    ///
    /// A failed attempt is final for this provider within the request: the
    /// form submission has real-world effects upstream and is never retried.
    pub async fn attempt(
        &self,
        driver: &mut dyn PageDriver,
        request: &ConfirmationRequest,
        tuning: &AttemptTuning,
    ) -> ProviderOutcome {
        debug!(provider = %self.id, locator = %request.locator, "starting provider attempt");
        match self.run_flow(driver, request, tuning).await {
            Ok(()) => {
                info!(provider = %self.id, "provider confirmed delivery");
                ProviderOutcome::accepted(self.id, format!("Entrega confirmada no {}", self.id))
            }
            Err(failure) => self.rejection(failure),
        }
    }

    async fn run_flow(
        &self,
        driver: &mut dyn PageDriver,
        request: &ConfirmationRequest,
        tuning: &AttemptTuning,
    ) -> Result<(), AttemptFailure> {
        driver
            .open(&self.entry_url, &tuning.navigation)
            .await
            .map_err(AttemptFailure::Automation)?;

        driver
            .await_element(&self.locator_field, tuning.element_timeout)
            .await
            .map_err(AttemptFailure::FormUnavailable)?;

        driver
            .fill_field(&self.locator_field, &request.locator, tuning.type_delay)
            .await
            .map_err(AttemptFailure::Automation)?;
        driver
            .click(&self.submit_control)
            .await
            .map_err(AttemptFailure::Automation)?;

        // Providers validate the locator asynchronously; the code field only
        // renders if it was accepted.
        if let Err(err) = driver
            .await_element(&self.code_field, tuning.settle_window)
            .await
        {
            return Err(match err {
                DriverError::ElementNotFound(_) => AttemptFailure::LocatorRejected,
                other => AttemptFailure::Automation(other),
            });
        }

        driver
            .fill_field(&self.code_field, &request.code, tuning.type_delay)
            .await
            .map_err(AttemptFailure::Automation)?;
        driver
            .click(&self.submit_control)
            .await
            .map_err(AttemptFailure::Automation)?;

        sleep(tuning.settle_window).await;
        let text = driver
            .visible_text()
            .await
            .map_err(AttemptFailure::Automation)?
            .to_lowercase();

        if self
            .success_signatures
            .iter()
            .any(|signature| text.contains(signature.as_str()))
        {
            Ok(())
        } else {
            Err(AttemptFailure::CodeRejected)
        }
    }

    fn rejection(&self, failure: AttemptFailure) -> ProviderOutcome {
        match failure {
            AttemptFailure::FormUnavailable(err) => {
                warn!(provider = %self.id, kind = err.kind(), %err, "confirmation form unavailable");
                ProviderOutcome::rejected(
                    self.id,
                    format!("Não foi possível carregar o formulário do {}", self.id),
                    format!("locator field not found: {err}"),
                )
            }
            AttemptFailure::Automation(err) => {
                warn!(provider = %self.id, kind = err.kind(), %err, "automation step failed");
                ProviderOutcome::rejected(
                    self.id,
                    format!("Falha na confirmação {}", self.id),
                    format!("{}: {err}", err.kind()),
                )
            }
            AttemptFailure::LocatorRejected => {
                debug!(provider = %self.id, "locator not accepted");
                ProviderOutcome::rejected(
                    self.id,
                    format!("{} não reconheceu o localizador", self.id),
                    "locator rejected",
                )
            }
            AttemptFailure::CodeRejected => {
                debug!(provider = %self.id, "code not accepted");
                ProviderOutcome::rejected(
                    self.id,
                    format!("Falha na confirmação {}", self.id),
                    "code rejected or unrecognized response",
                )
            }
        }
    }
}
