//! Diagnostic journal
//!
//! An append-only, in-memory sequence of timestamped records describing
//! every state transition and outbound call attempt. The journal is a
//! product feature for operator visibility, distinct from the `tracing`
//! file logs; every record is mirrored to `tracing` at debug level.
//!
//! The journal is shared by the router and every adapter. Appends and the
//! atomic `clear` are serialized behind a mutex, preserving the ordering
//! guarantee of a single-threaded host.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// When the record was appended
    pub timestamp: DateTime<Utc>,
    /// Human-readable description of the transition or call attempt
    pub message: String,
    /// Structured context (never contains full credentials)
    pub data: serde_json::Value,
    /// Session the record belongs to
    pub session_id: String,
}

/// Shared handle to the append-only diagnostic journal.
///
/// Cloning is cheap; all clones append to the same sequence.
#[derive(Debug, Clone)]
pub struct Journal {
    session_id: String,
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl Journal {
    /// Create an empty journal bound to a session.
    pub fn new(session: &SessionId) -> Self {
        Self {
            session_id: session.to_string(),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append one record describing a state transition or call attempt.
    pub fn record(&self, message: &str, data: serde_json::Value) {
        tracing::debug!(target: "fanline::journal", message, %data, "journal record");

        let record = LogRecord {
            timestamp: Utc::now(),
            message: message.to_string(),
            data,
            session_id: self.session_id.clone(),
        };

        // A poisoned mutex means another append panicked mid-push; the
        // vector itself is still usable.
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.push(record);
    }

    /// Read-only snapshot of every record, in append order.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.clone()
    }

    /// Truncate the journal to empty, atomically.
    pub fn clear(&self) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.clear();
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Session the journal is bound to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
