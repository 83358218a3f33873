//! Provider adapters
//!
//! Every analytics backend is wrapped behind the [`ProviderAdapter`]
//! capability trait. Adapters never propagate errors to the router: each
//! externally-observable failure is caught locally, converted into an
//! [`Outcome`], and journaled, so one provider's malfunction is isolated
//! from all others.
//!
//! ## Built-in adapters
//!
//! - [`amplitude`]: HTTP batch endpoint; enforces a minimum user-id length
//!   by deterministic substitution
//! - [`mixpanel`]: loopback mode while the token is a placeholder
//! - [`blitzllama`]: bearer-auth events/users/page-views endpoints
//! - [`vwo`]: bounded readiness poll, then custom-variable forwarding

pub mod amplitude;
pub mod blitzllama;
pub mod mixpanel;
pub mod vwo;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProvidersConfig;
use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::types::{Outcome, Properties, ProviderState, ProviderStatus};

pub use amplitude::AmplitudeAdapter;
pub use blitzllama::BlitzllamaAdapter;
pub use mixpanel::MixpanelAdapter;
pub use vwo::VwoAdapter;

/// Capability interface every concrete adapter implements.
///
/// All methods other than `initialize`/`status` are no-ops returning a
/// not-initialized failure outcome until `initialize` has succeeded.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider display name.
    fn name(&self) -> &str;

    /// Shared enable/disable flag.
    ///
    /// The router reads it to filter fan-out and downgrades it (one-way)
    /// when `initialize` fails.
    fn enabled(&self) -> &EnabledFlag;

    /// One-time vendor setup. Sets the initialized flag strictly on
    /// success and emits one journal record either way, with the
    /// credential masked.
    async fn initialize(&self) -> Outcome;

    /// Forward a normalized identity to the vendor.
    async fn identify_user(&self, user_id: &str, properties: &Properties) -> Outcome;

    /// Forward an event (properties already carry session id + timestamp).
    async fn track_event(&self, name: &str, properties: &Properties) -> Outcome;

    /// Forward a page view: `track_event` specialized to the reserved
    /// "Page View" shape carrying the page identifier.
    async fn track_page_view(&self, page: &str, properties: &Properties) -> Outcome;

    /// Synchronous, side-effect-free snapshot; available before
    /// initialization.
    fn status(&self) -> ProviderStatus;
}

// ============================================
// Shared adapter state cells
// ============================================

/// Shared enable/disable flag for one provider.
///
/// Disabling is one-way for the router's lifetime: once a provider is
/// downgraded after a failed initialize it is never automatically
/// re-enabled.
#[derive(Debug, Clone)]
pub struct EnabledFlag(Arc<AtomicBool>);

impl EnabledFlag {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn disable(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

const INIT_IDLE: u8 = 0;
const INIT_RUNNING: u8 = 1;
const INIT_DONE: u8 = 2;
const INIT_FAILED: u8 = 3;

/// Uniform initialization lifecycle cell shared by all adapters.
#[derive(Debug)]
pub struct InitState(AtomicU8);

impl InitState {
    pub fn new() -> Self {
        Self(AtomicU8::new(INIT_IDLE))
    }

    /// Mark initialization as in flight.
    pub fn begin(&self) {
        self.0.store(INIT_RUNNING, Ordering::SeqCst);
    }

    /// Mark initialization as succeeded.
    pub fn succeed(&self) {
        self.0.store(INIT_DONE, Ordering::SeqCst);
    }

    /// Mark initialization as failed (terminal).
    pub fn fail(&self) {
        self.0.store(INIT_FAILED, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.0.load(Ordering::SeqCst) == INIT_DONE
    }

    /// Map the cell onto the provider lifecycle state machine.
    pub fn provider_state(&self) -> ProviderState {
        match self.0.load(Ordering::SeqCst) {
            INIT_RUNNING => ProviderState::Initializing,
            INIT_DONE => ProviderState::Initialized,
            INIT_FAILED => ProviderState::Disabled,
            _ => ProviderState::Unconfigured,
        }
    }
}

impl Default for InitState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// Shared helpers
// ============================================

/// Mask a credential for journaling: a short non-secret prefix for long
/// credentials, only the length for short ones. The full credential never
/// reaches the journal.
pub fn mask_credential(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.is_empty() {
        "unset".to_string()
    } else if chars.len() <= 8 {
        format!("len:{}", chars.len())
    } else {
        let prefix: String = chars[..8].iter().collect();
        format!("{}...", prefix)
    }
}

/// Journal a skipped operation on an uninitialized adapter and produce the
/// corresponding failure outcome.
pub(crate) fn not_initialized(name: &str, operation: &str, journal: &Journal) -> Outcome {
    journal.record(
        &format!("{} not initialized, skipping {}", name, operation),
        serde_json::json!({ "provider": name, "operation": operation }),
    );
    Outcome::failed(Error::NotInitialized(name.to_string()).to_string())
}

/// Build the default adapter set from configuration.
///
/// The list is fixed and explicit; the router iterates it rather than any
/// dynamically keyed mapping.
pub fn default_adapters(
    config: &ProvidersConfig,
    journal: &Journal,
) -> Result<Vec<Arc<dyn ProviderAdapter>>> {
    config.validate()?;

    Ok(vec![
        Arc::new(AmplitudeAdapter::new(&config.amplitude, journal.clone())?),
        Arc::new(MixpanelAdapter::new(&config.mixpanel, journal.clone())?),
        Arc::new(BlitzllamaAdapter::new(
            &config.blitzllama,
            journal.clone(),
        )?),
        Arc::new(VwoAdapter::new(&config.vwo, journal.clone())?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;

    #[test]
    fn test_mask_credential_never_reveals_secret() {
        let secret = "43f7b07dcb7fcfe58a8091a289990c30";
        let masked = mask_credential(secret);
        assert_eq!(masked, "43f7b07d...");
        assert!(!masked.contains(secret));

        assert_eq!(mask_credential("short"), "len:5");
        assert_eq!(mask_credential(""), "unset");
    }

    #[test]
    fn test_init_state_lifecycle() {
        let state = InitState::new();
        assert_eq!(state.provider_state(), ProviderState::Unconfigured);
        assert!(!state.is_initialized());

        state.begin();
        assert_eq!(state.provider_state(), ProviderState::Initializing);

        state.succeed();
        assert_eq!(state.provider_state(), ProviderState::Initialized);
        assert!(state.is_initialized());

        let failed = InitState::new();
        failed.begin();
        failed.fail();
        assert_eq!(failed.provider_state(), ProviderState::Disabled);
        assert!(!failed.is_initialized());
    }

    #[test]
    fn test_enabled_flag_disable_is_one_way() {
        let flag = EnabledFlag::new(true);
        assert!(flag.get());

        let shared = flag.clone();
        shared.disable();
        assert!(!flag.get());
    }

    #[test]
    fn test_not_initialized_journals_one_record() {
        let session = SessionId::generate();
        let journal = Journal::new(&session);

        let outcome = not_initialized("Amplitude", "event tracking", &journal);
        assert!(!outcome.is_ok());
        assert_eq!(journal.len(), 1);

        let record = &journal.snapshot()[0];
        assert!(record.message.contains("not initialized"));
        assert_eq!(record.data["provider"], "Amplitude");
    }

    #[test]
    fn test_default_adapters_fixed_list() {
        let session = SessionId::generate();
        let journal = Journal::new(&session);
        let adapters =
            default_adapters(&ProvidersConfig::default(), &journal).expect("build adapters");

        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["Amplitude", "Mixpanel", "Blitzllama", "VWO"]);
    }
}
