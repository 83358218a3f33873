//! Blitzllama adapter
//!
//! Bearer-authenticated HTTP adapter for the feedback/survey backend:
//! events go to `POST /events`, identities to `PUT /users/{id}`, page
//! views to `POST /page-views`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::ProviderSettings;
use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::types::{CredentialState, Outcome, Properties, ProviderStatus};

use super::{mask_credential, not_initialized, EnabledFlag, InitState, ProviderAdapter};

const NAME: &str = "Blitzllama";
const DEFAULT_ENDPOINT: &str = "https://api.blitzllama.com";
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Blitzllama provider adapter.
pub struct BlitzllamaAdapter {
    api_key: String,
    base_url: String,
    enabled: EnabledFlag,
    init: InitState,
    journal: Journal,
    http_client: reqwest::Client,
}

impl BlitzllamaAdapter {
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

        let auth_value = format!("Bearer {}", settings.credential);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
        );

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

    async fn check_response(response: reqwest::Response) -> Result<()> {
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

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Vendor(format!("HTTP request failed: {}", e)))?;
        Self::check_response(response).await
    }

    async fn put_user(&self, user_id: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}/users/{}", self.base_url, urlencoding::encode(user_id));
        let response = self
            .http_client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Vendor(format!("HTTP request failed: {}", e)))?;
        Self::check_response(response).await
    }

    /// Probe the API with the configured credential.
    async fn bootstrap(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Vendor(format!("HTTP request failed: {}", e)))?;
        Self::check_response(response).await
    }
}

#[async_trait]
impl ProviderAdapter for BlitzllamaAdapter {
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
                    "Blitzllama initialized successfully",
                    serde_json::json!({ "apiKey": mask_credential(&self.api_key) }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.init.fail();
                self.journal.record(
                    "Blitzllama initialization failed",
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

        let body = serde_json::json!({
            "userId": user_id,
            "properties": properties,
        });

        match self.put_user(user_id, body).await {
            Ok(()) => {
                self.journal.record(
                    "Blitzllama user identified successfully",
                    serde_json::json!({ "userId": user_id }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.journal.record(
                    "Blitzllama user identification error",
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

        let body = serde_json::json!({
            "event": name,
            "properties": properties,
        });

        match self.post("/events", body).await {
            Ok(()) => {
                self.journal.record(
                    "Blitzllama event tracked successfully",
                    serde_json::json!({ "event": name }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.journal.record(
                    "Blitzllama event tracking error",
                    serde_json::json!({ "error": e.to_string(), "event": name }),
                );
                Outcome::failed(e.to_string())
            }
        }
    }

    async fn track_page_view(&self, page: &str, properties: &Properties) -> Outcome {
        if !self.init.is_initialized() {
            return not_initialized(NAME, "page view tracking", &self.journal);
        }

        let body = serde_json::json!({
            "page": page,
            "properties": properties,
        });

        match self.post("/page-views", body).await {
            Ok(()) => {
                self.journal.record(
                    "Blitzllama page view tracked successfully",
                    serde_json::json!({ "pageName": page }),
                );
                Outcome::Ok
            }
            Err(e) => {
                self.journal.record(
                    "Blitzllama page view tracking error",
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
