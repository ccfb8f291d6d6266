//! Static provider registry.
//!
//! Each entry describes one delivery platform's confirmation form: where it
//! lives, which fields take the locator and the code, and which rendered
//! substrings signal success. Built once at startup, read-only afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

mod adapter;

pub use adapter::AttemptTuning;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "iFood")]
    IFood,
    #[serde(rename = "99Food")]
    NinetyNineFood,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::IFood => write!(f, "iFood"),
            ProviderId::NinetyNineFood => write!(f, "99Food"),
        }
    }
}

/// One provider's confirmation protocol, as data. The attempt flow itself is
/// identical across providers (see `adapter.rs`).
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    pub id: ProviderId,
    pub entry_url: String,
    pub locator_field: String,
    pub code_field: String,
    pub submit_control: String,
    /// Lowercase substrings of the rendered page that signal acceptance.
    pub success_signatures: Vec<String>,
}

impl ProviderSpec {
    pub fn ifood(entry_url: Option<String>) -> Self {
        Self {
            id: ProviderId::IFood,
            entry_url: entry_url.unwrap_or_else(|| {
                "https://confirmacao-entrega-propria.ifood.com.br/numero-pedido".to_string()
            }),
            locator_field: r#"input[name="pedido"]"#.to_string(),
            code_field: r#"input[name="codigo"]"#.to_string(),
            submit_control: r#"button[type="submit"]"#.to_string(),
            success_signatures: vec!["entrega confirmada".to_string(), "sucesso".to_string()],
        }
    }

    pub fn ninety_nine_food(entry_url: Option<String>) -> Self {
        Self {
            id: ProviderId::NinetyNineFood,
            entry_url: entry_url.unwrap_or_else(|| {
                "https://food-b-h5.99app.com/pt-BR/v2/confirmation-entrega/locator".to_string()
            }),
            locator_field: r#"input[name="locator"]"#.to_string(),
            code_field: r#"input[name="code"]"#.to_string(),
            submit_control: r#"button[type="submit"]"#.to_string(),
            success_signatures: vec!["confirmada".to_string(), "sucesso".to_string()],
        }
    }
}

/// Registration order is the fallback order: iFood first, then 99Food,
/// matching the upstream service behavior.
pub fn default_registry(
    ifood_url: Option<String>,
    ninety_nine_url: Option<String>,
) -> Vec<ProviderSpec> {
    vec![
        ProviderSpec::ifood(ifood_url),
        ProviderSpec::ninety_nine_food(ninety_nine_url),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_orders_ifood_first() {
        let registry = default_registry(None, None);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry[0].id, ProviderId::IFood);
        assert_eq!(registry[1].id, ProviderId::NinetyNineFood);
    }

    #[test]
    fn signatures_are_lowercase() {
        for spec in default_registry(None, None) {
            for signature in &spec.success_signatures {
                assert_eq!(signature, &signature.to_lowercase());
            }
        }
    }

    #[test]
    fn url_overrides_are_honored() {
        let registry = default_registry(Some("http://localhost:9000/ifood".into()), None);
        assert_eq!(registry[0].entry_url, "http://localhost:9000/ifood");
        assert!(registry[1].entry_url.contains("99app.com"));
    }

    #[test]
    fn provider_id_display_matches_wire_name() {
        assert_eq!(ProviderId::IFood.to_string(), "iFood");
        assert_eq!(ProviderId::NinetyNineFood.to_string(), "99Food");
    }
}
