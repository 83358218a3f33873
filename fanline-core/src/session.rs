//! Browsing-session identity
//!
//! One `SessionId` is generated per router lifetime and embedded into every
//! outbound payload so all providers can correlate events to the same
//! session. It is never regenerated without a full router re-instantiation.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the random suffix appended to the timestamp.
const SUFFIX_LEN: usize = 13;

/// Opaque session identifier: `session_<unix-millis>_<random-suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh session identifier from the current timestamp and a
    /// random suffix.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(SUFFIX_LEN)
            .collect();
        SessionId(format!("session_{}_{}", millis, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_shape() {
        let id = SessionId::generate();
        let parts: Vec<&str> = id.as_str().splitn(3, '_').collect();

        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok(), "timestamp part is numeric");
        assert_eq!(parts[2].len(), SUFFIX_LEN);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }
}
