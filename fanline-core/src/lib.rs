//! # fanline-core
//!
//! Core library for fanline - a multi-provider analytics fan-out service.
//!
//! This library provides:
//! - The analytics router: session identity, fan-out dispatch, per-provider
//!   failure isolation, status snapshots
//! - Provider adapters behind one capability trait
//! - An in-memory diagnostic journal for operator visibility
//! - Configuration management and the mock auth collaborator
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! One router owns one session and a fixed set of provider adapters. Every
//! identify/track/page-view call is merged with session metadata and fanned
//! out to all enabled providers; a provider failure is converted into an
//! outcome and journaled, never raised to the caller.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fanline_core::{AnalyticsRouter, Config};
//!
//! # async fn run() -> fanline_core::Result<()> {
//! let config = Config::load()?;
//! let router = AnalyticsRouter::new(&config)?;
//!
//! router.initialize().await;
//! router.track_event("purchase", fanline_core::to_properties(
//!     serde_json::json!({ "amount": 9.99 }),
//! ));
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use auth::{AuthService, AuthSession};
pub use config::Config;
pub use error::{Error, Result};
pub use journal::{Journal, LogRecord};
pub use router::AnalyticsRouter;
pub use session::SessionId;
pub use types::*;

// Public modules
pub mod auth;
pub mod config;
pub mod error;
pub mod journal;
pub mod logging;
pub mod providers;
pub mod router;
pub mod session;
pub mod types;
