//! Amplitude adapter
//!
//! Reference HTTP adapter: events are posted to Amplitude's batch endpoint.
//! Amplitude rejects user identifiers shorter than five characters, so
//! `identify_user` substitutes a deterministic, namespaced identifier for
//! short ids. The substitution is journaled with both values and never
//! alters the identity record other adapters receive.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use sha2::{Digest, Sha256};

use crate::config::ProviderSettings;
use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::types::{CredentialState, Outcome, Properties, ProviderStatus};

use super::{mask_credential, not_initialized, EnabledFlag, InitState, ProviderAdapter};

const NAME: &str = "Amplitude";
const DEFAULT_ENDPOINT: &str = "https://api2.amplitude.com";
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Amplitude requires user identifiers of at least this many characters.
pub const MIN_USER_ID_LEN: usize = 5;

/// Derive a substitute identifier for ids below the vendor minimum.
///
/// Returns `None` when the id is already acceptable. The substitute is
/// deterministic: the same original id always yields the same substitute,
/// namespaced with a truncated digest of the original.
pub fn substitute_user_id(user_id: &str) -> Option<String> {
    if user_id.chars().count() >= MIN_USER_ID_LEN {
        return None;
    }

    let digest = Sha256::digest(user_id.as_bytes());
    Some(format!("user_{}_{}", user_id, hex::encode(&digest[..4])))
}

/// Amplitude provider adapter.
pub struct AmplitudeAdapter {
    api_key: String,
    base_url: String,
    enabled: EnabledFlag,
    init: InitState,
    journal: Journal,
    http_client: reqwest::Client,
}

impl AmplitudeAdapter {
    /// Create an adapter from provider settings.
    pub fn new(settings: &ProviderSettings, journal: Journal) -> Result<Self> {
        let base_url = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: settings.credential.clone(),
            base_url,
            enabled: EnabledFlag::new(settings.enabled),
            init: InitState::new(),
            journal,
            http_client,
        })
    }

    /// Post a batch with the given events to the vendor endpoint.
    async fn post_events(&self, events: serde_json::Value) -> Result<()> {
        let url = format!("{}/2/httpapi", self.base_url);
        let body = serde_json::json!({
            "api_key": self.api_key,
            "events": events,
        });

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Vendor(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Vendor(format!(
                "vendor responded with status {}",
                status
            )))
        }
    }

    /// One-time bootstrap: an empty batch acts as a credential probe.
    async fn bootstrap(&self) -> Result<()> {
        self.post_events(serde_json::json!([])).await
    }
}

#[async_trait]
impl ProviderAdapter for AmplitudeAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn enabled(&self) -> &EnabledFlag {
        &self.enabled
    }

    async fn initialize(&self) -> Outcome {
        self.init.begin();

        match self.bootstrap().await {
            Ok(()) => {
                self.init.succeed();
                self.journal.record(
                    "Amplitude initialized successfully",
                    serde_json::json!({ "apiKey": mask_credential(&self.api_key) }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.init.fail();
                self.journal.record(
                    "Amplitude initialization failed",
                    serde_json::json!({ "error": e.to_string() }),
                );
                Outcome::failed(e.to_string())
            }
        }
    }

    async fn identify_user(&self, user_id: &str, properties: &Properties) -> Outcome {
        if !self.init.is_initialized() {
            return not_initialized(NAME, "user identification", &self.journal);
        }

        let substitute = substitute_user_id(user_id);
        if let Some(valid_id) = &substitute {
            self.journal.record(
                "Amplitude user id below minimum length, substituting",
                serde_json::json!({
                    "originalUserId": user_id,
                    "validUserId": valid_id,
                }),
            );
        }
        let effective_id = substitute.as_deref().unwrap_or(user_id);

        let event = serde_json::json!([{
            "event_type": "$identify",
            "user_id": effective_id,
            "user_properties": properties,
        }]);

        match self.post_events(event).await {
            Ok(()) => {
                self.journal.record(
                    "Amplitude user identified",
                    serde_json::json!({ "userId": effective_id }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.journal.record(
                    "Amplitude identify failed",
                    serde_json::json!({ "error": e.to_string(), "userId": effective_id }),
                );
                Outcome::failed(e.to_string())
            }
        }
    }

    async fn track_event(&self, name: &str, properties: &Properties) -> Outcome {
        if !self.init.is_initialized() {
            return not_initialized(NAME, "event tracking", &self.journal);
        }

        let event = serde_json::json!([{
            "event_type": name,
            "event_properties": properties,
        }]);

        match self.post_events(event).await {
            Ok(()) => {
                self.journal.record(
                    "Amplitude event tracked",
                    serde_json::json!({ "eventName": name }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.journal.record(
                    "Amplitude track failed",
                    serde_json::json!({ "error": e.to_string(), "eventName": name }),
                );
                Outcome::failed(e.to_string())
            }
        }
    }

    async fn track_page_view(&self, page: &str, properties: &Properties) -> Outcome {
        if !self.init.is_initialized() {
            return not_initialized(NAME, "page view tracking", &self.journal);
        }

        let mut page_properties = properties.clone();
        page_properties.insert(
            "page".to_string(),
            serde_json::Value::String(page.to_string()),
        );

        let event = serde_json::json!([{
            "event_type": "Page View",
            "event_properties": page_properties,
        }]);

        match self.post_events(event).await {
            Ok(()) => {
                self.journal.record(
                    "Amplitude page view tracked",
                    serde_json::json!({ "pageName": page }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.journal.record(
                    "Amplitude page view failed",
                    serde_json::json!({ "error": e.to_string(), "pageName": page }),
                );
                Outcome::failed(e.to_string())
            }
        }
    }

    fn status(&self) -> ProviderStatus {
        ProviderStatus {
            name: NAME.to_string(),
            enabled: self.enabled.get(),
            initialized: self.init.is_initialized(),
            credential: CredentialState::classify(&self.api_key, None),
            state: self.init.provider_state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;
    use crate::types::ProviderState;

    fn adapter() -> AmplitudeAdapter {
        let settings = ProviderSettings {
            credential: "43f7b07dcb7fcfe58a8091a289990c30".to_string(),
            enabled: true,
            endpoint: None,
        };
        let journal = Journal::new(&SessionId::generate());
        AmplitudeAdapter::new(&settings, journal).expect("build adapter")
    }

    #[test]
    fn test_substitution_only_below_minimum() {
        assert_eq!(substitute_user_id("alice"), None);
        assert_eq!(substitute_user_id("user_12345"), None);

        let substitute = substitute_user_id("ab").expect("short id substituted");
        assert_ne!(substitute, "ab");
        assert!(substitute.starts_with("user_ab_"));
        assert!(substitute.chars().count() >= MIN_USER_ID_LEN);
    }

    #[test]
    fn test_substitution_is_deterministic() {
        assert_eq!(substitute_user_id("ab"), substitute_user_id("ab"));
        assert_ne!(substitute_user_id("ab"), substitute_user_id("cd"));
    }

    #[tokio::test]
    async fn test_operations_guarded_before_initialize() {
        let adapter = adapter();

        let outcome = adapter.track_event("purchase", &Properties::new()).await;
        assert!(!outcome.is_ok());
        assert!(outcome.reason().unwrap().contains("not initialized"));

        let outcome = adapter.identify_user("alice", &Properties::new()).await;
        assert!(!outcome.is_ok());

        // One journal record per skipped attempt
        assert_eq!(adapter.journal.len(), 2);
    }

    #[test]
    fn test_status_before_initialize() {
        let adapter = adapter();
        let status = adapter.status();

        assert_eq!(status.name, "Amplitude");
        assert!(status.enabled);
        assert!(!status.initialized);
        assert_eq!(status.credential, CredentialState::Configured);
        assert_eq!(status.state, ProviderState::Unconfigured);
    }
}
