//! Analytics router
//!
//! The router owns one session identity, one diagnostic journal, and a
//! fixed list of provider adapters. Every identify/track/page-view call is
//! fanned out to all enabled providers; per-provider failures are isolated
//! and observable only through the journal and the status snapshot.
//!
//! ## Dispatch model
//!
//! Each provider gets one unbounded dispatch queue consumed by one worker
//! task, so a provider observes calls in exactly the order the router
//! issued them (FIFO per adapter). No ordering exists across providers.
//! `initialize` enqueues to every enabled provider before awaiting any of
//! the acknowledgements; the track/identify calls enqueue and return
//! immediately (fire-and-forget).
//!
//! ## Lifecycle
//!
//! A router is constructed explicitly and passed by reference to its
//! consumers; it is not a process-wide singleton. A provider whose
//! `initialize` fails is disabled for the remainder of the router's
//! lifetime; there is no automatic retry or recovery.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::Result;
use crate::journal::{Journal, LogRecord};
use crate::providers::{self, ProviderAdapter};
use crate::session::SessionId;
use crate::types::{ConnectionStatus, Outcome, Properties, UserIdentity};

/// One queued adapter call.
enum Dispatch {
    Initialize { ack: oneshot::Sender<Outcome> },
    Identify { user_id: String, properties: Properties },
    Track { name: String, properties: Properties },
    PageView { page: String, properties: Properties },
    Flush { ack: oneshot::Sender<()> },
}

/// One registered provider: the adapter plus its dispatch queue.
struct ProviderEntry {
    adapter: Arc<dyn ProviderAdapter>,
    queue: mpsc::UnboundedSender<Dispatch>,
}

/// Multi-provider event router.
///
/// Must be constructed inside a Tokio runtime: one worker task is spawned
/// per provider at construction time.
pub struct AnalyticsRouter {
    session: SessionId,
    journal: Journal,
    entries: Vec<ProviderEntry>,
    init_started: AtomicBool,
    initialized: AtomicBool,
    workers: Vec<JoinHandle<()>>,
}

impl AnalyticsRouter {
    /// Build a router with the default adapter set from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let session = SessionId::generate();
        let journal = Journal::new(&session);
        let adapters = providers::default_adapters(&config.providers, &journal)?;
        Ok(Self::with_adapters(session, journal, adapters))
    }

    /// Build a router over an explicit adapter list.
    ///
    /// The journal must be the one the adapters were constructed with, so
    /// router records and adapter records land in a single sequence.
    pub fn with_adapters(
        session: SessionId,
        journal: Journal,
        adapters: Vec<Arc<dyn ProviderAdapter>>,
    ) -> Self {
        let mut entries = Vec::with_capacity(adapters.len());
        let mut workers = Vec::with_capacity(adapters.len());

        for adapter in adapters {
            let (tx, rx) = mpsc::unbounded_channel();
            workers.push(tokio::spawn(run_worker(Arc::clone(&adapter), rx)));
            entries.push(ProviderEntry { adapter, queue: tx });
        }

        Self {
            session,
            journal,
            entries,
            init_started: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            workers,
        }
    }

    /// Session identifier embedded into every outbound payload.
    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    /// Initialize every enabled provider.
    ///
    /// All initializations are dispatched before any is awaited. A failed
    /// provider is disabled for the router's lifetime; the others are
    /// unaffected, and the router itself ends up initialized even if every
    /// provider failed. Repeat calls are ignored.
    pub async fn initialize(&self) {
        if self.init_started.swap(true, Ordering::SeqCst) {
            self.journal.record(
                "Analytics initialization already performed, ignoring",
                serde_json::json!({}),
            );
            return;
        }

        self.journal.record(
            "Initializing analytics providers",
            serde_json::json!({ "sessionId": self.session.as_str() }),
        );

        // Dispatch phase: enqueue an initialize to every enabled provider.
        let mut pending = Vec::new();
        for entry in &self.entries {
            if !entry.adapter.enabled().get() {
                continue;
            }
            let (ack, settled) = oneshot::channel();
            if entry.queue.send(Dispatch::Initialize { ack }).is_ok() {
                pending.push((entry, settled));
            }
        }

        // Settle phase: await every acknowledgement.
        for (entry, settled) in pending {
            let outcome = settled
                .await
                .unwrap_or_else(|_| Outcome::failed("provider worker stopped"));

            if let Some(reason) = outcome.reason() {
                entry.adapter.enabled().disable();
                self.journal.record(
                    "Provider disabled after failed initialization",
                    serde_json::json!({
                        "provider": entry.adapter.name(),
                        "reason": reason,
                    }),
                );
            }
        }

        self.initialized.store(true, Ordering::SeqCst);

        let services: Vec<&str> = self
            .entries
            .iter()
            .filter(|e| e.adapter.enabled().get())
            .map(|e| e.adapter.name())
            .collect();
        self.journal.record(
            "All analytics providers initialized",
            serde_json::json!({
                "sessionId": self.session.as_str(),
                "services": services,
            }),
        );
    }

    /// Identify a user across every enabled provider. Fire-and-forget:
    /// returns immediately, adapter outcomes land in the journal.
    pub fn identify_user(&self, user_id: &str, properties: Properties) {
        let merged = self.with_session_metadata(properties);

        self.journal.record(
            "Identifying user across all providers",
            serde_json::json!({ "userId": user_id, "properties": merged }),
        );

        self.fan_out(|| Dispatch::Identify {
            user_id: user_id.to_string(),
            properties: merged.clone(),
        });
    }

    /// Identify from an auth-collaborator identity. The identity record is
    /// never mutated; adapters see its fields as ordinary properties.
    pub fn identify(&self, identity: &UserIdentity) {
        let mut properties = Properties::new();
        properties.insert("email".to_string(), identity.email.clone().into());
        properties.insert("name".to_string(), identity.name.clone().into());
        properties.insert("role".to_string(), identity.role.clone().into());

        self.identify_user(&identity.id, properties);
    }

    /// Track an event across every enabled provider. Fire-and-forget.
    pub fn track_event(&self, name: &str, properties: Properties) {
        let merged = self.with_session_metadata(properties);

        self.journal.record(
            "Tracking event across all providers",
            serde_json::json!({ "eventName": name, "properties": merged }),
        );

        self.fan_out(|| Dispatch::Track {
            name: name.to_string(),
            properties: merged.clone(),
        });
    }

    /// Track a page view across every enabled provider. Fire-and-forget.
    pub fn track_page_view(&self, page: &str, properties: Properties) {
        let merged = self.with_session_metadata(properties);

        self.journal.record(
            "Tracking page view across all providers",
            serde_json::json!({ "pageName": page, "properties": merged }),
        );

        self.fan_out(|| Dispatch::PageView {
            page: page.to_string(),
            properties: merged.clone(),
        });
    }

    /// Synchronous read-only snapshot of the session and every provider.
    pub fn connection_status(&self) -> ConnectionStatus {
        let services: BTreeMap<String, _> = self
            .entries
            .iter()
            .map(|e| (e.adapter.name().to_string(), e.adapter.status()))
            .collect();

        ConnectionStatus {
            session_id: self.session.to_string(),
            is_initialized: self.initialized.load(Ordering::SeqCst),
            services,
        }
    }

    /// Snapshot of the diagnostic journal, unfiltered.
    pub fn logs(&self) -> Vec<LogRecord> {
        self.journal.snapshot()
    }

    /// Truncate the diagnostic journal.
    pub fn clear_logs(&self) {
        self.journal.clear();
    }

    /// Wait until every dispatch issued so far has been processed.
    ///
    /// Does not change the fire-and-forget contract of the track calls;
    /// it exists so tests and short-lived callers can drain the queues.
    pub async fn flush(&self) {
        let mut acks = Vec::new();
        for entry in &self.entries {
            let (ack, settled) = oneshot::channel();
            if entry.queue.send(Dispatch::Flush { ack }).is_ok() {
                acks.push(settled);
            }
        }
        for settled in acks {
            let _ = settled.await;
        }
    }

    /// Drain the queues and stop every provider worker.
    pub async fn shutdown(mut self) {
        self.entries.clear();
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
    }

    /// Merge caller properties with the session id and an RFC 3339
    /// timestamp.
    fn with_session_metadata(&self, mut properties: Properties) -> Properties {
        properties.insert(
            "sessionId".to_string(),
            serde_json::Value::String(self.session.to_string()),
        );
        properties.insert(
            "timestamp".to_string(),
            serde_json::Value::String(Utc::now().to_rfc3339()),
        );
        properties
    }

    /// Enqueue one dispatch per enabled provider.
    fn fan_out<F>(&self, mut dispatch: F)
    where
        F: FnMut() -> Dispatch,
    {
        for entry in &self.entries {
            if !entry.adapter.enabled().get() {
                continue;
            }
            if entry.queue.send(dispatch()).is_err() {
                tracing::warn!(
                    provider = entry.adapter.name(),
                    "provider worker stopped, dropping dispatch"
                );
            }
        }
    }
}

/// Per-provider worker: processes dispatches strictly in order.
async fn run_worker(
    adapter: Arc<dyn ProviderAdapter>,
    mut queue: mpsc::UnboundedReceiver<Dispatch>,
) {
    while let Some(dispatch) = queue.recv().await {
        match dispatch {
            Dispatch::Initialize { ack } => {
                let outcome = adapter.initialize().await;
                let _ = ack.send(outcome);
            }
            Dispatch::Identify {
                user_id,
                properties,
            } => {
                let outcome = adapter.identify_user(&user_id, &properties).await;
                trace_outcome(adapter.name(), "identify", &outcome);
            }
            Dispatch::Track { name, properties } => {
                let outcome = adapter.track_event(&name, &properties).await;
                trace_outcome(adapter.name(), "track", &outcome);
            }
            Dispatch::PageView { page, properties } => {
                let outcome = adapter.track_page_view(&page, &properties).await;
                trace_outcome(adapter.name(), "page_view", &outcome);
            }
            Dispatch::Flush { ack } => {
                let _ = ack.send(());
            }
        }
    }
}

fn trace_outcome(provider: &str, operation: &str, outcome: &Outcome) {
    match outcome.reason() {
        None => tracing::debug!(provider, operation, "provider call succeeded"),
        Some(reason) => tracing::debug!(provider, operation, reason, "provider call failed"),
    }
}
