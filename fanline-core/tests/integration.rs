//! Integration tests for the fanline analytics router
//!
//! These tests drive the public API end-to-end: real adapters in offline
//! modes, plus purpose-built adapters exercising vendor identifier
//! normalization through the router.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fanline_core::config::ProviderSettings;
use fanline_core::providers::amplitude::substitute_user_id;
use fanline_core::providers::{
    BlitzllamaAdapter, EnabledFlag, InitState, MixpanelAdapter, ProviderAdapter,
};
use fanline_core::{
    AnalyticsRouter, CredentialState, Journal, Outcome, Properties, ProviderState,
    ProviderStatus, SessionId,
};

// ============================================
// Test adapters
// ============================================

/// Adapter that enforces a vendor minimum identifier length, the way
/// Amplitude does, reusing the same deterministic substitution.
struct StrictIdAdapter {
    enabled: EnabledFlag,
    init: InitState,
    journal: Journal,
    seen_ids: Mutex<Vec<String>>,
}

impl StrictIdAdapter {
    fn new(journal: Journal) -> Self {
        Self {
            enabled: EnabledFlag::new(true),
            init: InitState::new(),
            journal,
            seen_ids: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ProviderAdapter for StrictIdAdapter {
    fn name(&self) -> &str {
        "StrictVendor"
    }

    fn enabled(&self) -> &EnabledFlag {
        &self.enabled
    }

    async fn initialize(&self) -> Outcome {
        self.init.begin();
        self.init.succeed();
        self.journal
            .record("StrictVendor initialized successfully", serde_json::json!({}));
        Outcome::Ok
    }

    async fn identify_user(&self, user_id: &str, _properties: &Properties) -> Outcome {
        if !self.init.is_initialized() {
            return Outcome::failed("not initialized");
        }

        let substitute = substitute_user_id(user_id);
        if let Some(valid_id) = &substitute {
            self.journal.record(
                "StrictVendor user id below minimum length, substituting",
                serde_json::json!({
                    "originalUserId": user_id,
                    "validUserId": valid_id,
                }),
            );
        }
        let effective = substitute.unwrap_or_else(|| user_id.to_string());
        self.seen_ids.lock().unwrap().push(effective);
        Outcome::Ok
    }

    async fn track_event(&self, _name: &str, _properties: &Properties) -> Outcome {
        Outcome::Ok
    }

    async fn track_page_view(&self, _page: &str, _properties: &Properties) -> Outcome {
        Outcome::Ok
    }

    fn status(&self) -> ProviderStatus {
        ProviderStatus {
            name: "StrictVendor".to_string(),
            enabled: self.enabled.get(),
            initialized: self.init.is_initialized(),
            credential: CredentialState::Configured,
            state: self.init.provider_state(),
        }
    }
}

/// Adapter with no identifier constraints: records ids exactly as given.
struct LenientIdAdapter {
    enabled: EnabledFlag,
    init: InitState,
    journal: Journal,
    seen_ids: Mutex<Vec<String>>,
}

impl LenientIdAdapter {
    fn new(journal: Journal) -> Self {
        Self {
            enabled: EnabledFlag::new(true),
            init: InitState::new(),
            journal,
            seen_ids: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ProviderAdapter for LenientIdAdapter {
    fn name(&self) -> &str {
        "LenientVendor"
    }

    fn enabled(&self) -> &EnabledFlag {
        &self.enabled
    }

    async fn initialize(&self) -> Outcome {
        self.init.begin();
        self.init.succeed();
        self.journal
            .record("LenientVendor initialized successfully", serde_json::json!({}));
        Outcome::Ok
    }

    async fn identify_user(&self, user_id: &str, _properties: &Properties) -> Outcome {
        if !self.init.is_initialized() {
            return Outcome::failed("not initialized");
        }
        self.seen_ids.lock().unwrap().push(user_id.to_string());
        Outcome::Ok
    }

    async fn track_event(&self, _name: &str, _properties: &Properties) -> Outcome {
        Outcome::Ok
    }

    async fn track_page_view(&self, _page: &str, _properties: &Properties) -> Outcome {
        Outcome::Ok
    }

    fn status(&self) -> ProviderStatus {
        ProviderStatus {
            name: "LenientVendor".to_string(),
            enabled: self.enabled.get(),
            initialized: self.init.is_initialized(),
            credential: CredentialState::Configured,
            state: self.init.provider_state(),
        }
    }
}

// ============================================
// Identifier normalization through the router
// ============================================

#[tokio::test]
async fn test_short_id_substituted_only_by_constrained_adapter() {
    let session = SessionId::generate();
    let journal = Journal::new(&session);

    let strict = Arc::new(StrictIdAdapter::new(journal.clone()));
    let lenient = Arc::new(LenientIdAdapter::new(journal.clone()));
    let router = AnalyticsRouter::with_adapters(
        session,
        journal,
        vec![
            strict.clone() as Arc<dyn ProviderAdapter>,
            lenient.clone() as Arc<dyn ProviderAdapter>,
        ],
    );

    router.initialize().await;
    router.identify_user("ab", Properties::new());
    router.flush().await;

    // The constrained vendor derived a distinct substitute...
    let strict_ids = strict.seen_ids.lock().unwrap().clone();
    assert_eq!(strict_ids.len(), 1);
    assert_ne!(strict_ids[0], "ab");
    assert!(strict_ids[0].starts_with("user_ab_"));

    // ...and journaled both values for auditability.
    let substitution = router
        .logs()
        .into_iter()
        .find(|r| r.message.contains("substituting"))
        .expect("substitution is journaled");
    assert_eq!(substitution.data["originalUserId"], "ab");
    assert_eq!(substitution.data["validUserId"], strict_ids[0].as_str());

    // The unconstrained vendor saw the original identity untouched.
    let lenient_ids = lenient.seen_ids.lock().unwrap().clone();
    assert_eq!(lenient_ids, vec!["ab".to_string()]);

    router.shutdown().await;
}

// ============================================
// End-to-end with real adapters in offline modes
// ============================================

fn loopback_mixpanel(journal: &Journal) -> Arc<MixpanelAdapter> {
    let settings = ProviderSettings {
        credential: "YOUR_MIXPANEL_TOKEN".to_string(),
        enabled: true,
        endpoint: None,
    };
    Arc::new(MixpanelAdapter::new(&settings, journal.clone()).expect("build mixpanel"))
}

fn disabled_blitzllama(journal: &Journal) -> Arc<BlitzllamaAdapter> {
    let settings = ProviderSettings {
        credential: "key_BJMzppuLgKVPseZ".to_string(),
        enabled: false,
        endpoint: None,
    };
    Arc::new(BlitzllamaAdapter::new(&settings, journal.clone()).expect("build blitzllama"))
}

#[tokio::test]
async fn test_one_enabled_one_disabled_end_to_end() {
    let session = SessionId::generate();
    let journal = Journal::new(&session);

    let mixpanel = loopback_mixpanel(&journal);
    let blitzllama = disabled_blitzllama(&journal);
    let router = AnalyticsRouter::with_adapters(
        session,
        journal,
        vec![
            mixpanel as Arc<dyn ProviderAdapter>,
            blitzllama as Arc<dyn ProviderAdapter>,
        ],
    );

    router.initialize().await;
    router.track_event(
        "purchase",
        fanline_core::to_properties(serde_json::json!({ "amount": 9.99 })),
    );
    router.flush().await;

    let status = router.connection_status();
    assert!(status.is_initialized);

    // The enabled provider initialized and received the event.
    let mixpanel_status = &status.services["Mixpanel"];
    assert!(mixpanel_status.enabled);
    assert!(mixpanel_status.initialized);
    assert_eq!(mixpanel_status.state, ProviderState::Initialized);

    // The disabled provider was never targeted at all.
    let blitz_status = &status.services["Blitzllama"];
    assert!(!blitz_status.enabled);
    assert!(!blitz_status.initialized);
    assert_eq!(blitz_status.state, ProviderState::Unconfigured);

    let logs = router.logs();
    assert!(
        !logs.iter().any(|r| r.message.contains("Blitzllama")),
        "disabled provider produced no journal records"
    );

    // Exactly one init-success and one track-success record for the
    // enabled provider, both referencing the router's session.
    let init_record = logs
        .iter()
        .find(|r| r.message == "Mixpanel initialized successfully")
        .expect("initialize success journaled");
    let track_record = logs
        .iter()
        .find(|r| r.message.starts_with("Mixpanel event tracked"))
        .expect("track success journaled");
    assert_eq!(init_record.session_id, router.session_id().as_str());
    assert_eq!(track_record.session_id, init_record.session_id);

    router.shutdown().await;
}

#[tokio::test]
async fn test_credential_never_journaled_in_full() {
    let session = SessionId::generate();
    let journal = Journal::new(&session);

    let settings = ProviderSettings {
        credential: "mp-live-2fd1c0a9e6b7".to_string(),
        enabled: true,
        endpoint: Some("http://127.0.0.1:1".to_string()),
    };
    let mixpanel =
        Arc::new(MixpanelAdapter::new(&settings, journal.clone()).expect("build mixpanel"));
    let router = AnalyticsRouter::with_adapters(
        session,
        journal,
        vec![mixpanel as Arc<dyn ProviderAdapter>],
    );

    router.initialize().await;

    let serialized = serde_json::to_string(&router.logs()).expect("serialize journal");
    assert!(!serialized.contains("mp-live-2fd1c0a9e6b7"));
    assert!(serialized.contains("mp-live-..."), "masked prefix present");

    router.shutdown().await;
}
