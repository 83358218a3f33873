//! Mixpanel adapter
//!
//! Runs in loopback mode while the configured token is the placeholder
//! value: initialize succeeds and every forward is a journal-only success.
//! With a real token, events are posted to the vendor's track endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::config::ProviderSettings;
use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::types::{CredentialState, Outcome, Properties, ProviderStatus};

use super::{mask_credential, not_initialized, EnabledFlag, InitState, ProviderAdapter};

const NAME: &str = "Mixpanel";
const DEFAULT_ENDPOINT: &str = "https://api.mixpanel.com";
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Token value that keeps the adapter in loopback mode.
pub const PLACEHOLDER_TOKEN: &str = "YOUR_MIXPANEL_TOKEN";

/// Mixpanel provider adapter.
pub struct MixpanelAdapter {
    token: String,
    base_url: String,
    loopback: bool,
    enabled: EnabledFlag,
    init: InitState,
    journal: Journal,
    http_client: reqwest::Client,
}

impl MixpanelAdapter {
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
            token: settings.credential.clone(),
            base_url,
            loopback: settings.credential == PLACEHOLDER_TOKEN,
            enabled: EnabledFlag::new(settings.enabled),
            init: InitState::new(),
            journal,
            http_client,
        })
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);

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

    /// Forward one call, or short-circuit to a journaled success in
    /// loopback mode.
    async fn forward(
        &self,
        path: &str,
        body: serde_json::Value,
        success_message: &str,
        failure_message: &str,
        context: serde_json::Value,
    ) -> Outcome {
        if self.loopback {
            self.journal
                .record(&format!("{} (loopback)", success_message), context);
            return Outcome::Ok;
        }

        match self.post(path, body).await {
            Ok(()) => {
                self.journal.record(success_message, context);
                Outcome::Ok
            }
            Err(e) => {
                self.journal.record(
                    failure_message,
                    serde_json::json!({ "error": e.to_string() }),
                );
                Outcome::failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for MixpanelAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn enabled(&self) -> &EnabledFlag {
        &self.enabled
    }

    async fn initialize(&self) -> Outcome {
        self.init.begin();
        self.init.succeed();

        let mode = if self.loopback { "loopback" } else { "live" };
        self.journal.record(
            "Mixpanel initialized successfully",
            serde_json::json!({
                "token": mask_credential(&self.token),
                "mode": mode,
            }),
        );

        Outcome::Ok
    }

    async fn identify_user(&self, user_id: &str, properties: &Properties) -> Outcome {
        if !self.init.is_initialized() {
            return not_initialized(NAME, "user identification", &self.journal);
        }

        let body = serde_json::json!({
            "$token": self.token,
            "$distinct_id": user_id,
            "$set": properties,
        });

        self.forward(
            "/engage",
            body,
            "Mixpanel user identified",
            "Mixpanel identify failed",
            serde_json::json!({ "userId": user_id }),
        )
        .await
    }

    async fn track_event(&self, name: &str, properties: &Properties) -> Outcome {
        if !self.init.is_initialized() {
            return not_initialized(NAME, "event tracking", &self.journal);
        }

        let body = serde_json::json!({
            "event": name,
            "properties": properties,
        });

        self.forward(
            "/track",
            body,
            "Mixpanel event tracked",
            "Mixpanel track failed",
            serde_json::json!({ "eventName": name }),
        )
        .await
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

        let body = serde_json::json!({
            "event": "Page View",
            "properties": page_properties,
        });

        self.forward(
            "/track",
            body,
            "Mixpanel page view tracked",
            "Mixpanel page view failed",
            serde_json::json!({ "pageName": page }),
        )
        .await
    }

    fn status(&self) -> ProviderStatus {
        ProviderStatus {
            name: NAME.to_string(),
            enabled: self.enabled.get(),
            initialized: self.init.is_initialized(),
            credential: CredentialState::classify(&self.token, Some(PLACEHOLDER_TOKEN)),
            state: self.init.provider_state(),
        }
    }
}
