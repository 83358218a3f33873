//! VWO adapter
//!
//! VWO's tracker is injected by an external loader, so initialization is a
//! readiness poll: probe the vendor endpoint at a fixed interval until it
//! answers. The poll is bounded: when the dependency never appears the
//! adapter settles on a terminal failed outcome instead of polling forever.
//!
//! After readiness, identify/track/page forward as custom-variable style
//! payloads.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::config::ProviderSettings;
use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::types::{CredentialState, Outcome, Properties, ProviderStatus};

use super::{not_initialized, EnabledFlag, InitState, ProviderAdapter};

const NAME: &str = "VWO";
const DEFAULT_ENDPOINT: &str = "https://dev.visualwebsiteoptimizer.com";
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Fixed interval between readiness probes.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Probe attempts before giving up.
const READY_MAX_ATTEMPTS: usize = 50;

/// VWO provider adapter.
pub struct VwoAdapter {
    account_id: String,
    base_url: String,
    enabled: EnabledFlag,
    init: InitState,
    journal: Journal,
    http_client: reqwest::Client,
}

impl VwoAdapter {
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
            account_id: settings.credential.clone(),
            base_url,
            enabled: EnabledFlag::new(settings.enabled),
            init: InitState::new(),
            journal,
            http_client,
        })
    }

    /// One readiness probe against the vendor endpoint.
    async fn probe(&self) -> bool {
        let url = format!("{}/j.php?a={}", self.base_url, self.account_id);
        match self.http_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Poll for readiness at a fixed interval, up to the attempt cap.
    async fn wait_ready(&self) -> Result<usize> {
        for attempt in 1..=READY_MAX_ATTEMPTS {
            if self.probe().await {
                return Ok(attempt);
            }
            if attempt < READY_MAX_ATTEMPTS {
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
        }

        Err(Error::Vendor(format!(
            "readiness probe timed out after {} attempts",
            READY_MAX_ATTEMPTS
        )))
    }

    /// Forward a batch of custom variables to the vendor.
    async fn set_variables(&self, scope: &str, variables: serde_json::Value) -> Result<()> {
        let url = format!("{}/track", self.base_url);
        let body = serde_json::json!({
            "accountId": self.account_id,
            "scope": scope,
            "variables": variables,
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
}

#[async_trait]
impl ProviderAdapter for VwoAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn enabled(&self) -> &EnabledFlag {
        &self.enabled
    }

    async fn initialize(&self) -> Outcome {
        self.init.begin();

        match self.wait_ready().await {
            Ok(attempts) => {
                self.init.succeed();
                self.journal.record(
                    "VWO initialized successfully",
                    serde_json::json!({
                        "accountId": self.account_id,
                        "probeAttempts": attempts,
                    }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.init.fail();
                self.journal.record(
                    "VWO initialization failed",
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

        let mut variables = properties.clone();
        variables.insert(
            "userId".to_string(),
            serde_json::Value::String(user_id.to_string()),
        );

        match self
            .set_variables("user", serde_json::Value::Object(variables))
            .await
        {
            Ok(()) => {
                self.journal.record(
                    "VWO user identified",
                    serde_json::json!({ "userId": user_id }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.journal.record(
                    "VWO identify failed",
                    serde_json::json!({ "error": e.to_string(), "userId": user_id }),
                );
                Outcome::failed(e.to_string())
            }
        }
    }

    async fn track_event(&self, name: &str, properties: &Properties) -> Outcome {
        if !self.init.is_initialized() {
            return not_initialized(NAME, "event tracking", &self.journal);
        }

        let mut variables = properties.clone();
        variables.insert(
            "event".to_string(),
            serde_json::Value::String(name.to_string()),
        );

        match self
            .set_variables("event", serde_json::Value::Object(variables))
            .await
        {
            Ok(()) => {
                self.journal.record(
                    "VWO event tracked",
                    serde_json::json!({ "eventName": name }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.journal.record(
                    "VWO track failed",
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

        let mut variables = properties.clone();
        variables.insert(
            "pageName".to_string(),
            serde_json::Value::String(page.to_string()),
        );

        match self
            .set_variables("page", serde_json::Value::Object(variables))
            .await
        {
            Ok(()) => {
                self.journal.record(
                    "VWO page view tracked",
                    serde_json::json!({ "pageName": page }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.journal.record(
                    "VWO page view failed",
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
            credential: CredentialState::classify(&self.account_id, None),
            state: self.init.provider_state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;

    fn adapter() -> VwoAdapter {
        let settings = ProviderSettings {
            credential: "3000655".to_string(),
            enabled: true,
            endpoint: None,
        };
        let journal = Journal::new(&SessionId::generate());
        VwoAdapter::new(&settings, journal).expect("build adapter")
    }

    #[tokio::test]
    async fn test_guard_before_readiness() {
        let adapter = adapter();

        let outcome = adapter.track_page_view("Dashboard", &Properties::new()).await;
        assert!(!outcome.is_ok());
        assert!(outcome.reason().unwrap().contains("not initialized"));
        assert_eq!(adapter.journal.len(), 1);
    }

    #[test]
    fn test_poll_is_bounded() {
        // An absent vendor must end in a terminal failure within a few
        // seconds, not an endless loop.
        assert!(READY_MAX_ATTEMPTS * READY_POLL_INTERVAL.as_millis() as usize <= 10_000);
    }

    #[test]
    fn test_status_reports_account_credential() {
        let adapter = adapter();
        let status = adapter.status();

        assert_eq!(status.name, "VWO");
        assert_eq!(status.credential, CredentialState::Configured);
        assert!(!status.initialized);
    }
}
