//! fanline - multi-provider analytics fan-out CLI
//!
//! Drives the analytics router from the command line: initialize the
//! configured providers, identify users, track events and page views, and
//! inspect per-provider status and the diagnostic journal.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/fanline/config.toml (~/.config/fanline/config.toml)
//! - State: $XDG_STATE_HOME/fanline/ (~/.local/state/fanline/)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fanline_core::{to_properties, AnalyticsRouter, AuthService, Config, Properties};

/// Journal records shown by default.
const JOURNAL_TAIL: usize = 20;

#[derive(Parser)]
#[command(name = "fanline")]
#[command(about = "Fan out analytics events to every configured provider")]
#[command(version)]
struct Args {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show session and per-provider connection status
    Status,

    /// Log in and identify the user across all providers
    Login {
        /// Account email
        email: String,
        /// Account password
        password: String,
    },

    /// Clear the persisted auth session
    Logout,

    /// Track a custom event
    Send {
        /// Event name
        event: String,

        /// Event properties as KEY=VALUE (repeatable)
        #[arg(short, long = "prop", value_name = "KEY=VALUE")]
        props: Vec<String>,
    },

    /// Track a page view
    Page {
        /// Page name
        name: String,

        /// Page properties as KEY=VALUE (repeatable)
        #[arg(short, long = "prop", value_name = "KEY=VALUE")]
        props: Vec<String>,
    },

    /// Run the full login/identify/track flow against all providers
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = fanline_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!("fanline starting up");

    if args.verbose {
        eprintln!(
            "tracing logs: {}",
            fanline_core::logging::log_file_path().display()
        );
    }

    match args.command {
        Command::Status => cmd_status(&config).await,
        Command::Login { email, password } => cmd_login(&config, &email, &password).await,
        Command::Logout => cmd_logout(),
        Command::Send { event, props } => cmd_send(&config, &event, &props).await,
        Command::Page { name, props } => cmd_page(&config, &name, &props).await,
        Command::Demo => cmd_demo(&config).await,
    }
}

async fn cmd_status(config: &Config) -> Result<()> {
    let router = AnalyticsRouter::new(config).context("failed to build analytics router")?;
    router.initialize().await;

    let status = router.connection_status();
    println!("session:     {}", status.session_id);
    println!("initialized: {}", status.is_initialized);
    println!();
    println!(
        "{:<12} {:>8} {:>12} {:>12} {:>14}",
        "provider", "enabled", "initialized", "credential", "state"
    );
    for service in status.services.values() {
        println!(
            "{:<12} {:>8} {:>12} {:>12} {:>14}",
            service.name,
            service.enabled,
            service.initialized,
            service.credential.as_str(),
            service.state.as_str()
        );
    }

    router.shutdown().await;
    Ok(())
}

async fn cmd_login(config: &Config, email: &str, password: &str) -> Result<()> {
    let mut auth = AuthService::new();
    let user = auth.login(email, password).context("login failed")?;

    let router = AnalyticsRouter::new(config).context("failed to build analytics router")?;
    router.initialize().await;
    router.identify(&user);
    router.track_event(
        "App Login Success",
        to_properties(serde_json::json!({
            "userId": user.id,
            "userEmail": user.email,
            "userRole": user.role,
        })),
    );
    router.flush().await;

    println!("Logged in as {} ({})", user.name, user.email);
    print_journal_tail(&router);

    router.shutdown().await;
    Ok(())
}

fn cmd_logout() -> Result<()> {
    let mut auth = AuthService::new();
    auth.logout().context("logout failed")?;
    println!("Logged out");
    Ok(())
}

async fn cmd_send(config: &Config, event: &str, props: &[String]) -> Result<()> {
    let properties = parse_props(props)?;

    let router = AnalyticsRouter::new(config).context("failed to build analytics router")?;
    router.initialize().await;
    router.track_event(event, properties);
    router.flush().await;

    println!("Tracked event '{}'", event);
    print_journal_tail(&router);

    router.shutdown().await;
    Ok(())
}

async fn cmd_page(config: &Config, name: &str, props: &[String]) -> Result<()> {
    let properties = parse_props(props)?;

    let router = AnalyticsRouter::new(config).context("failed to build analytics router")?;
    router.initialize().await;
    router.track_page_view(name, properties);
    router.flush().await;

    println!("Tracked page view '{}'", name);
    print_journal_tail(&router);

    router.shutdown().await;
    Ok(())
}

async fn cmd_demo(config: &Config) -> Result<()> {
    let router = AnalyticsRouter::new(config).context("failed to build analytics router")?;
    router.initialize().await;

    // Restore a persisted identity, if one exists.
    let mut auth = AuthService::new();
    match auth.restore().context("failed to restore auth session")? {
        Some(user) => {
            println!("Restored session for {} ({})", user.name, user.email);
            router.identify(&user);
        }
        None => println!("No persisted session, tracking anonymously"),
    }

    router.track_page_view(
        "Dashboard",
        to_properties(serde_json::json!({ "referrer": "direct" })),
    );
    router.track_event(
        "Purchase Completed",
        to_properties(serde_json::json!({ "amount": 9.99, "currency": "USD" })),
    );
    router.flush().await;

    let status = router.connection_status();
    println!();
    println!("session: {}", status.session_id);
    for service in status.services.values() {
        println!(
            "  {:<12} enabled={:<5} initialized={:<5} state={}",
            service.name,
            service.enabled,
            service.initialized,
            service.state.as_str()
        );
    }

    print_journal_tail(&router);

    router.shutdown().await;
    Ok(())
}

/// Parse repeated `KEY=VALUE` pairs into event properties.
///
/// Values that parse as JSON keep their type; everything else becomes a
/// string.
fn parse_props(props: &[String]) -> Result<Properties> {
    let mut properties = Properties::new();
    for prop in props {
        let (key, value) = prop
            .split_once('=')
            .with_context(|| format!("invalid property '{}', expected KEY=VALUE", prop))?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        properties.insert(key.to_string(), value);
    }
    Ok(properties)
}

/// Print the latest journal records.
fn print_journal_tail(router: &AnalyticsRouter) {
    let logs = router.logs();
    let skip = logs.len().saturating_sub(JOURNAL_TAIL);

    println!();
    println!("journal ({} records, showing latest {}):", logs.len(), logs.len() - skip);
    for record in logs.iter().skip(skip) {
        println!(
            "  {} {} {}",
            record.timestamp.format("%H:%M:%S%.3f"),
            record.message,
            record.data
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_props_types() {
        let props = parse_props(&[
            "amount=9.99".to_string(),
            "plan=pro".to_string(),
            "active=true".to_string(),
        ])
        .unwrap();

        assert_eq!(props["amount"], serde_json::json!(9.99));
        assert_eq!(props["plan"], serde_json::json!("pro"));
        assert_eq!(props["active"], serde_json::json!(true));
    }

    #[test]
    fn test_parse_props_rejects_missing_separator() {
        assert!(parse_props(&["broken".to_string()]).is_err());
    }
}
