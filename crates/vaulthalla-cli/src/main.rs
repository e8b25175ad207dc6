//! `vaulthalla`: command-line client for the Vaulthalla command socket.
//!
//! Opens one channel to the backend, sends a single catalog command, prints
//! the JSON response and disconnects.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::collections::BTreeMap;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use vaulthalla_client::{
    Channel, ChannelConfig, ChannelError, CredentialSource, SessionCredentials, StaticToken,
    WebSocketConnector,
};
use vaulthalla_core::{COMMANDS, is_known_command, is_unauthenticated_command};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ── CLI structure ────────────────────────────────────────────────────

/// Vaulthalla command socket client.
#[derive(Parser)]
#[command(
    name = "vaulthalla",
    version,
    about = "Vaulthalla CLI: send commands to a Vaulthalla backend",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         VAULTHALLA_WS_URL   Backend endpoint (default: ws://localhost:33369)\n  \
         VAULTHALLA_TOKEN    Authentication token\n  \
         RUST_LOG            Log filter (default: warn)\n\n\
         {DIM}Examples:{RESET}\n  \
         vaulthalla commands\n  \
         vaulthalla login --email admin@vh.local --password secret\n  \
         vaulthalla send storage.vault.list\n  \
         vaulthalla send storage.volume.get '{{\"volume_id\": 1}}'"
    ),
)]
struct Cli {
    /// Backend WebSocket endpoint.
    #[arg(long, env = "VAULTHALLA_WS_URL")]
    url: Option<String>,

    /// Authentication token.
    #[arg(long, env = "VAULTHALLA_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// How long to wait for a response, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// How long to wait for the connection to open, in milliseconds.
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every command in the catalog.
    Commands,
    /// Send a command and print its JSON response.
    Send {
        /// Catalog command name, e.g. `storage.vault.list`.
        command: String,
        /// JSON payload (default: `{}`).
        payload: Option<String>,
    },
    /// Log in with email and password and print the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "VAULTHALLA_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to format JSON: {e}"),
    }
}

// ── Entry point ──────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match cli.url {
        Some(url) => ChannelConfig {
            url,
            ..ChannelConfig::from_env()
        },
        None => ChannelConfig::from_env(),
    };
    if let Some(ms) = cli.timeout_ms {
        config.request_timeout = Duration::from_millis(ms);
    }
    let connect_timeout = Duration::from_millis(cli.connect_timeout_ms);

    match cli.command {
        Commands::Commands => {
            cmd_commands();
            Ok(())
        }
        Commands::Send { command, payload } => {
            cmd_send(config, connect_timeout, cli.token, &command, payload.as_deref()).await
        }
        Commands::Login { email, password } => {
            cmd_login(config, connect_timeout, &email, &password).await
        }
    }
}

// ── Commands ─────────────────────────────────────────────────────────

fn cmd_commands() {
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for &name in COMMANDS {
        let namespace = name.split('.').next().unwrap_or(name);
        groups.entry(namespace).or_default().push(name);
    }

    header("⟐", "Command catalog");
    for (namespace, names) in groups {
        println!();
        println!("  {BOLD}{namespace}{RESET}");
        for name in names {
            let note = if is_unauthenticated_command(name) {
                format!(" {DIM}(no token){RESET}")
            } else {
                String::new()
            };
            println!("    {name}{note}");
        }
    }
}

async fn cmd_send(
    config: ChannelConfig,
    connect_timeout: Duration,
    token: Option<String>,
    command: &str,
    payload: Option<&str>,
) -> Result<()> {
    // Everything checkable offline is checked before touching the network.
    if !is_known_command(command) {
        bail!("unknown command '{command}' (run `vaulthalla commands` for the catalog)");
    }
    let payload: Value = match payload {
        Some(raw) => serde_json::from_str(raw).context("payload is not valid JSON")?,
        None => Value::Object(serde_json::Map::new()),
    };
    let credentials = Arc::new(StaticToken::new(token));
    if credentials.token().is_none() && !is_unauthenticated_command(command) {
        bail!("'{command}' requires a token (pass --token or set VAULTHALLA_TOKEN)");
    }

    let channel = open_channel(config, credentials, connect_timeout).await?;
    let result = channel.send_command(command, payload).await;
    channel.disconnect();

    let data = result.map_err(|e| channel_failure(e, format!("'{command}' failed")))?;
    print_json(&data);
    Ok(())
}

async fn cmd_login(
    config: ChannelConfig,
    connect_timeout: Duration,
    email: &str,
    password: &str,
) -> Result<()> {
    let credentials = Arc::new(SessionCredentials::new());
    let channel = open_channel(config, credentials.clone(), connect_timeout).await?;
    let result = credentials.login(&channel, email, password).await;
    channel.disconnect();

    let user = result.map_err(|e| channel_failure(e, "login failed".to_owned()))?;
    let token = credentials
        .token()
        .context("backend returned no session token")?;

    success(&format!("Logged in as {}", user.name));
    kv_line("user id", &user.id.to_string());
    if let Some(email) = &user.email {
        kv_line("email", email);
    }
    if let Some(role) = &user.role {
        kv_line("role", &role.name);
    }
    println!();
    println!("{token}");
    Ok(())
}

/// Wrap a channel error for display, flagging failures a retry may cure.
fn channel_failure(err: ChannelError, what: String) -> anyhow::Error {
    if err.is_transient() {
        anyhow::Error::new(err).context(format!("{what} (transient, retrying may succeed)"))
    } else {
        anyhow::Error::new(err).context(what)
    }
}

async fn open_channel(
    config: ChannelConfig,
    credentials: Arc<dyn CredentialSource>,
    connect_timeout: Duration,
) -> Result<Channel> {
    let channel = Channel::new(config, Arc::new(WebSocketConnector::new()), credentials);
    channel.connect();
    if tokio::time::timeout(connect_timeout, channel.wait_for_connection())
        .await
        .is_err()
    {
        channel.disconnect();
        bail!(
            "timed out after {}ms waiting for connection to {}",
            connect_timeout.as_millis(),
            channel.url()
        );
    }
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_failures_carry_a_retry_hint() {
        let err = channel_failure(
            ChannelError::Timeout {
                command: "roles.list".into(),
                request_id: "r1".into(),
            },
            "'roles.list' failed".into(),
        );
        assert_eq!(
            format!("{err:#}"),
            "'roles.list' failed (transient, retrying may succeed): Request timed out"
        );
    }

    #[test]
    fn server_errors_are_reported_as_is() {
        let err = channel_failure(
            ChannelError::Server {
                message: "vault not found".into(),
            },
            "'storage.vault.get' failed".into(),
        );
        assert_eq!(format!("{err:#}"), "'storage.vault.get' failed: vault not found");
    }
}
