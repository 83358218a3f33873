//! Mock authentication collaborator
//!
//! A trivial credential lookup over a fixed user table, plus durable
//! session persistence so an identity survives process restarts. The
//! analytics router consumes the [`UserIdentity`] this module produces; it
//! is the "session restored" signal source at startup.
//!
//! Sessions persist as a small JSON file in the XDG state directory.
//! Identities persisted by older releases used short numeric ids; those are
//! rewritten once to namespaced ids on restore.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::UserIdentity;

/// One entry in the mock credential table.
#[derive(Debug, Clone)]
struct MockUser {
    id: &'static str,
    email: &'static str,
    password: &'static str,
    name: &'static str,
    role: &'static str,
}

const MOCK_USERS: &[MockUser] = &[
    MockUser {
        id: "1",
        email: "admin@example.com",
        password: "admin123",
        name: "Admin User",
        role: "admin",
    },
    MockUser {
        id: "2",
        email: "user@example.com",
        password: "user123",
        name: "Regular User",
        role: "user",
    },
    MockUser {
        id: "3",
        email: "demo@example.com",
        password: "demo123",
        name: "Demo User",
        role: "demo",
    },
];

/// Persisted authentication session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Authenticated identity
    pub user: UserIdentity,
    /// Opaque session token
    pub token: String,
}

/// Mock authentication service with durable session state.
pub struct AuthService {
    store_path: PathBuf,
    /// Users added via `register`, with their passwords
    registered: Vec<(UserIdentity, String)>,
    current: Option<AuthSession>,
}

impl AuthService {
    /// Create a service storing its session in the default XDG location.
    pub fn new() -> Self {
        Self::with_store_path(Config::auth_session_path())
    }

    /// Create a service with an explicit session file path.
    pub fn with_store_path(store_path: PathBuf) -> Self {
        Self {
            store_path,
            registered: Vec::new(),
            current: None,
        }
    }

    /// Authenticate against the credential table and persist the session.
    pub fn login(&mut self, email: &str, password: &str) -> Result<UserIdentity> {
        let user = MOCK_USERS
            .iter()
            .find(|u| u.email == email && u.password == password)
            .map(|u| UserIdentity {
                id: u.id.to_string(),
                email: u.email.to_string(),
                name: u.name.to_string(),
                role: u.role.to_string(),
            })
            .or_else(|| {
                self.registered
                    .iter()
                    .find(|(u, pw)| u.email == email && pw.as_str() == password)
                    .map(|(u, _)| u.clone())
            })
            .ok_or_else(|| Error::Auth("invalid email or password".to_string()))?;

        let session = AuthSession {
            user: user.clone(),
            token: generate_token(),
        };
        self.persist(&session)?;
        self.current = Some(session);

        tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
        Ok(user)
    }

    /// Clear the in-memory and persisted session.
    pub fn logout(&mut self) -> Result<()> {
        self.current = None;
        if self.store_path.exists() {
            std::fs::remove_file(&self.store_path)?;
        }
        tracing::info!("user logged out");
        Ok(())
    }

    /// Restore a persisted session, if any.
    ///
    /// Identities persisted with legacy short numeric ids are migrated to
    /// namespaced ids and re-persisted, once.
    pub fn restore(&mut self) -> Result<Option<UserIdentity>> {
        if !self.store_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.store_path)?;
        let mut session: AuthSession = serde_json::from_str(&content)
            .map_err(|e| Error::Auth(format!("corrupt session state: {}", e)))?;

        if let Some(migrated) = migrate_legacy_id(&session.user.id) {
            tracing::info!(
                old_id = %session.user.id,
                new_id = %migrated,
                "migrated legacy user identity"
            );
            session.user.id = migrated;
            self.persist(&session)?;
        }

        let user = session.user.clone();
        self.current = Some(session);
        Ok(Some(user))
    }

    /// Register a new user into the in-memory table.
    pub fn register(&mut self, email: &str, password: &str, name: &str) -> Result<UserIdentity> {
        let exists = MOCK_USERS.iter().any(|u| u.email == email)
            || self.registered.iter().any(|(u, _)| u.email == email);
        if exists {
            return Err(Error::Auth("user already exists".to_string()));
        }

        let user = UserIdentity {
            id: format!("user_{}", MOCK_USERS.len() + self.registered.len() + 1),
            email: email.to_string(),
            name: name.to_string(),
            role: "user".to_string(),
        };
        self.registered.push((user.clone(), password.to_string()));
        Ok(user)
    }

    /// Currently authenticated identity, if any.
    pub fn current_user(&self) -> Option<&UserIdentity> {
        self.current.as_ref().map(|s| &s.user)
    }

    /// Session token, if authenticated.
    pub fn session_token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    fn persist(&self, session: &AuthSession) -> Result<()> {
        if let Some(parent) = self.store_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.store_path, content)?;
        Ok(())
    }
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate an opaque session token.
fn generate_token() -> String {
    format!("token_{}", Uuid::new_v4())
}

/// Rewrite a legacy short numeric id to a namespaced one.
///
/// Returns `None` when the id is already well-formed.
fn migrate_legacy_id(id: &str) -> Option<String> {
    if !id.is_empty() && id.len() < 5 && id.chars().all(|c| c.is_ascii_digit()) {
        Some(format!("user_{}", id))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> AuthService {
        AuthService::with_store_path(dir.path().join("session.json"))
    }

    #[test]
    fn test_login_with_valid_credentials() {
        let dir = TempDir::new().unwrap();
        let mut auth = service(&dir);

        let user = auth.login("admin@example.com", "admin123").unwrap();
        assert_eq!(user.id, "1");
        assert_eq!(user.role, "admin");
        assert!(auth.is_logged_in());
        assert!(auth.session_token().unwrap().starts_with("token_"));
    }

    #[test]
    fn test_login_rejects_bad_password() {
        let dir = TempDir::new().unwrap();
        let mut auth = service(&dir);

        let err = auth.login("admin@example.com", "wrong").unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert!(!auth.is_logged_in());
    }

    #[test]
    fn test_restore_round_trip_migrates_legacy_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        {
            let mut auth = AuthService::with_store_path(path.clone());
            auth.login("demo@example.com", "demo123").unwrap();
        }

        // A fresh service restores the persisted identity; the legacy
        // short numeric id is rewritten once.
        let mut restored = AuthService::with_store_path(path.clone());
        let user = restored.restore().unwrap().expect("session restored");
        assert_eq!(user.id, "user_3");
        assert_eq!(user.email, "demo@example.com");

        // The migration is persisted: restoring again is a no-op rewrite.
        let mut again = AuthService::with_store_path(path);
        let user = again.restore().unwrap().expect("session restored");
        assert_eq!(user.id, "user_3");
    }

    #[test]
    fn test_logout_removes_persisted_session() {
        let dir = TempDir::new().unwrap();
        let mut auth = service(&dir);

        auth.login("user@example.com", "user123").unwrap();
        auth.logout().unwrap();

        assert!(!auth.is_logged_in());
        assert_eq!(auth.restore().unwrap(), None);
    }

    #[test]
    fn test_restore_without_session() {
        let dir = TempDir::new().unwrap();
        let mut auth = service(&dir);
        assert_eq!(auth.restore().unwrap(), None);
    }

    #[test]
    fn test_register_and_login() {
        let dir = TempDir::new().unwrap();
        let mut auth = service(&dir);

        let user = auth.register("new@example.com", "secret1", "New User").unwrap();
        assert_eq!(user.role, "user");
        assert!(user.id.len() >= 5, "registered ids are already well-formed");

        let logged_in = auth.login("new@example.com", "secret1").unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(auth.login("new@example.com", "wrong").is_err());

        assert!(auth.register("new@example.com", "x", "Dup").is_err());
        assert!(auth.register("admin@example.com", "x", "Dup").is_err());
    }

    #[test]
    fn test_migrate_legacy_id_rules() {
        assert_eq!(migrate_legacy_id("1"), Some("user_1".to_string()));
        assert_eq!(migrate_legacy_id("042"), Some("user_042".to_string()));
        assert_eq!(migrate_legacy_id("user_1"), None);
        assert_eq!(migrate_legacy_id("12345"), None);
        assert_eq!(migrate_legacy_id(""), None);
    }
}
