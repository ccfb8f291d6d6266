//! Request/result contract shared by the orchestrator and the HTTP boundary.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::providers::ProviderId;

/// Validated confirmation request. Immutable once built; never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub locator: String,
    pub code: String,
}

impl ConfirmationRequest {
    /// Trim and validate the raw boundary fields. Both must be non-empty;
    /// the providers themselves enforce the exact digit shapes.
    pub fn parse(localizador: &str, codigo: &str) -> Result<Self, AppError> {
        let locator = localizador.trim();
        let code = codigo.trim();
        if locator.is_empty() || code.is_empty() {
            return Err(AppError::Validation(
                "Informe localizador (8 dígitos) e codigo (4 dígitos).".into(),
            ));
        }
        Ok(Self {
            locator: locator.to_string(),
            code: code.to_string(),
        })
    }
}

/// Outcome of one provider attempt. Produced exactly once per attempted
/// provider per request. `accepted == false` covers both business rejection
/// and automation breakage; the `diagnostic` string tells them apart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderOutcome {
    pub provider: ProviderId,
    pub accepted: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ProviderOutcome {
    pub fn accepted(provider: ProviderId, message: impl Into<String>) -> Self {
        Self {
            provider,
            accepted: true,
            message: message.into(),
            diagnostic: None,
        }
    }

    pub fn rejected(
        provider: ProviderId,
        message: impl Into<String>,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            accepted: false,
            message: message.into(),
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Aggregate over all attempted providers for one request.
///
/// Invariant: `success` is true iff an accepting provider exists, and the
/// sequential strategy stops attempting once one accepts; two providers are
/// never reported as both accepting for the same request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub success: bool,
    #[serde(rename = "provider", skip_serializing_if = "Option::is_none")]
    pub accepting_provider: Option<ProviderId>,
    pub message: String,
    pub attempts: Vec<ProviderOutcome>,
}

impl ConfirmationResult {
    pub fn accepted(winner: &ProviderOutcome, attempts: Vec<ProviderOutcome>) -> Self {
        Self {
            success: true,
            accepting_provider: Some(winner.provider),
            message: winner.message.clone(),
            attempts,
        }
    }

    pub fn rejected(attempts: Vec<ProviderOutcome>) -> Self {
        let message = attempts
            .last()
            .map(|outcome| outcome.message.clone())
            .unwrap_or_else(|| {
                "Nenhuma plataforma aceitou o localizador/código. Verifique se o localizador e o código estão corretos.".to_string()
            });
        Self {
            success: false,
            accepting_provider: None,
            message,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_fields() {
        let request = ConfirmationRequest::parse(" 12345678 ", " 1234 ").expect("valid request");
        assert_eq!(request.locator, "12345678");
        assert_eq!(request.code, "1234");
    }

    #[test]
    fn parse_rejects_empty_locator() {
        assert!(ConfirmationRequest::parse("   ", "1234").is_err());
        assert!(ConfirmationRequest::parse("12345678", "").is_err());
    }

    #[test]
    fn outcome_serializes_without_empty_diagnostic() {
        let outcome = ProviderOutcome::accepted(ProviderId::IFood, "ok");
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["provider"], "iFood");
        assert_eq!(json["accepted"], true);
        assert!(json.get("diagnostic").is_none());

        let outcome = ProviderOutcome::rejected(ProviderId::NinetyNineFood, "nope", "locator rejected");
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["provider"], "99Food");
        assert_eq!(json["diagnostic"], "locator rejected");
    }

    #[test]
    fn rejected_result_summarizes_last_attempt() {
        let attempts = vec![
            ProviderOutcome::rejected(ProviderId::IFood, "iFood recusou", "locator rejected"),
            ProviderOutcome::rejected(ProviderId::NinetyNineFood, "99Food recusou", "code rejected"),
        ];
        let result = ConfirmationResult::rejected(attempts);
        assert!(!result.success);
        assert!(result.accepting_provider.is_none());
        assert_eq!(result.message, "99Food recusou");
        assert_eq!(result.attempts.len(), 2);
    }

    #[test]
    fn rejected_result_with_no_attempts_uses_generic_message() {
        let result = ConfirmationResult::rejected(Vec::new());
        assert!(result.message.contains("Nenhuma plataforma"));
    }
}
