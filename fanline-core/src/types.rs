//! Core domain types for fanline
//!
//! These types form the shared vocabulary between the router, the provider
//! adapters, and callers:
//!
//! | Term | Definition |
//! |------|------------|
//! | **Provider** | One external analytics backend (Amplitude, Mixpanel, ...) |
//! | **Fan-out** | Dispatching one logical event to every enabled provider |
//! | **Outcome** | Success/failure of one adapter operation, never a panic |
//! | **Session** | One identifier shared by all events from one router lifetime |
//! | **Journal** | Append-only record of state transitions and call attempts |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form JSON properties attached to events and identities.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Convert a `serde_json::Value` into [`Properties`].
///
/// Non-object values collapse to an empty map; callers supply arbitrary
/// JSON-compatible mappings and the router does not validate their shape.
pub fn to_properties(value: serde_json::Value) -> Properties {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Properties::new(),
    }
}

// ============================================
// Outcome
// ============================================

/// Result of one adapter operation.
///
/// Routine failures (network errors, vendor rejections, missing
/// capabilities) are converted into `Failed` at the adapter boundary so a
/// single provider's malfunction never short-circuits the fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The operation succeeded
    Ok,
    /// The operation failed; `reason` is human-readable, never a secret
    Failed { reason: String },
}

impl Outcome {
    /// Build a failed outcome from any displayable reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Outcome::Failed {
            reason: reason.into(),
        }
    }

    /// Convert a library `Result` into an outcome.
    pub fn from_result(result: crate::error::Result<()>) -> Self {
        match result {
            Ok(()) => Outcome::Ok,
            Err(e) => Outcome::failed(e.to_string()),
        }
    }

    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    /// Failure reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Ok => None,
            Outcome::Failed { reason } => Some(reason),
        }
    }
}

// ============================================
// User identity
// ============================================

/// Identity established by the auth collaborator.
///
/// The router merges this with session metadata before fan-out but never
/// validates or mutates it. Adapter-local normalization (e.g. minimum-length
/// identifier rules) must not alter the identity other adapters see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Unique user identifier
    pub id: String,
    /// Email address
    pub email: String,
    /// Display name
    pub name: String,
    /// Role (admin, user, demo)
    pub role: String,
}

// ============================================
// Provider status model
// ============================================

/// How a provider's credential looks, without revealing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    /// A real-looking credential is present
    Configured,
    /// The credential is a known placeholder value
    Placeholder,
    /// No credential at all
    Missing,
}

impl CredentialState {
    /// Classify a credential string against an optional known placeholder.
    pub fn classify(credential: &str, placeholder: Option<&str>) -> Self {
        if credential.is_empty() {
            CredentialState::Missing
        } else if placeholder.is_some_and(|p| credential == p) {
            CredentialState::Placeholder
        } else {
            CredentialState::Configured
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialState::Configured => "configured",
            CredentialState::Placeholder => "placeholder",
            CredentialState::Missing => "missing",
        }
    }
}

/// Lifecycle position of one provider within the router.
///
/// `Unconfigured → Initializing → Initialized` on success, or
/// `Unconfigured → Initializing → Disabled` on a failed initialize.
/// `Initialized` and `Disabled` are terminal for the router's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    /// Initialize has not been attempted
    Unconfigured,
    /// Initialize dispatched, not yet settled
    Initializing,
    /// Initialize succeeded; provider receives fan-out
    Initialized,
    /// Initialize failed; provider permanently removed from fan-out
    Disabled,
}

impl ProviderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderState::Unconfigured => "unconfigured",
            ProviderState::Initializing => "initializing",
            ProviderState::Initialized => "initialized",
            ProviderState::Disabled => "disabled",
        }
    }
}

/// Snapshot of one provider, safe to expose on a status dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Provider display name
    pub name: String,
    /// Whether the router still targets this provider
    pub enabled: bool,
    /// Whether initialize has succeeded
    pub initialized: bool,
    /// Credential presence, never the credential itself
    pub credential: CredentialState,
    /// Lifecycle state, distinguishing "never configured" from
    /// "failed during initialize"
    pub state: ProviderState,
}

/// Read-only snapshot assembled by [`AnalyticsRouter::connection_status`].
///
/// [`AnalyticsRouter::connection_status`]: crate::router::AnalyticsRouter::connection_status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Session identifier shared by every outbound payload
    pub session_id: String,
    /// Whether router-level initialization has completed
    pub is_initialized: bool,
    /// Per-provider status, keyed by provider name
    pub services: BTreeMap<String, ProviderStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_helpers() {
        assert!(Outcome::Ok.is_ok());
        assert_eq!(Outcome::Ok.reason(), None);

        let failed = Outcome::failed("boom");
        assert!(!failed.is_ok());
        assert_eq!(failed.reason(), Some("boom"));
    }

    #[test]
    fn test_outcome_from_result() {
        assert!(Outcome::from_result(Ok(())).is_ok());

        let outcome =
            Outcome::from_result(Err(crate::error::Error::Vendor("timeout".to_string())));
        assert_eq!(outcome.reason(), Some("vendor call failed: timeout"));
    }

    #[test]
    fn test_credential_classification() {
        assert_eq!(
            CredentialState::classify("key_abc123", None),
            CredentialState::Configured
        );
        assert_eq!(
            CredentialState::classify("", None),
            CredentialState::Missing
        );
        assert_eq!(
            CredentialState::classify("YOUR_TOKEN", Some("YOUR_TOKEN")),
            CredentialState::Placeholder
        );
    }

    #[test]
    fn test_to_properties_non_object() {
        assert!(to_properties(serde_json::json!([1, 2, 3])).is_empty());
        assert_eq!(
            to_properties(serde_json::json!({"plan": "pro"}))["plan"],
            "pro"
        );
    }
}
