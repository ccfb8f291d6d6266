//! ConfirmaTudo: multi-provider delivery confirmation over browser automation.
//!
//! Exposes modules for integration testing.

pub mod config;
pub mod errors;
pub mod model;
pub mod orchestrator;
pub mod providers;
pub mod server;

pub use config::AppConfig;
pub use errors::AppError;
pub use model::{ConfirmationRequest, ConfirmationResult, ProviderOutcome};
pub use orchestrator::{Orchestrator, Strategy};
pub use providers::{default_registry, AttemptTuning, ProviderId, ProviderSpec};
