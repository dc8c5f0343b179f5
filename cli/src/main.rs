use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use hangouts_core::{
    AppAction, AppConfig, AppObserver, AppState, AppUpdate, Command as PeerCommand, HangoutsApp,
    LookupClient, load_app_config, load_hangouts, load_messages, open_cache,
};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "hangouts")]
#[command(about = "Inspect and drive the hangouts peer cache from a terminal")]
struct Cli {
    /// Data directory (config file and per-user caches live here)
    #[arg(long, env = "HANGOUTS_DATA_DIR", default_value = ".hangouts")]
    data_dir: PathBuf,

    /// Override the websocket endpoint from hangouts_config.json
    #[arg(long)]
    ws_url: Option<String>,

    /// Override the lookup service base URL from hangouts_config.json
    #[arg(long)]
    lookup_url: Option<String>,

    /// Local user
    #[arg(long, env = "HANGOUTS_USERNAME")]
    username: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the cached peers of the local user
    Peers,

    /// Show the cached conversation with a peer
    Messages {
        #[arg(long)]
        peer: String,
    },

    /// Search hangouts, falling back to the user directory
    Search {
        #[arg(long)]
        term: String,
    },

    /// Connect, send one command to a peer and wait for the acknowledgement
    Send {
        #[arg(long)]
        peer: String,

        /// invite, accept, decline, block, unblock or message
        #[arg(long)]
        command: PeerCommand,

        /// Message body (invite and message only)
        #[arg(long, default_value = "")]
        text: String,

        /// Seconds to wait for the channel and the acknowledgement
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },

    /// Connect and print the peer list every time it changes
    Listen {
        /// Seconds to listen (0 = forever)
        #[arg(long, default_value_t = 0)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("create data dir {}", cli.data_dir.display()))?;

    match &cli.cmd {
        Command::Peers => cmd_peers(&cli),
        Command::Messages { peer } => cmd_messages(&cli, peer),
        Command::Search { term } => cmd_search(&cli, term).await,
        Command::Send {
            peer,
            command,
            text,
            timeout,
        } => cmd_send(&cli, peer, *command, text, *timeout).await,
        Command::Listen { timeout } => cmd_listen(&cli, *timeout).await,
    }
}

fn data_dir(cli: &Cli) -> anyhow::Result<String> {
    cli.data_dir
        .to_str()
        .map(ToString::to_string)
        .ok_or_else(|| anyhow!("data dir is not valid UTF-8: {}", cli.data_dir.display()))
}

/// File config with the command-line overrides applied.
fn config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = load_app_config(&data_dir(cli)?);
    if let Some(url) = &cli.ws_url {
        config.ws_url = Some(url.clone());
    }
    if let Some(url) = &cli.lookup_url {
        config.lookup_url = Some(url.clone());
    }
    Ok(config)
}

fn print(v: serde_json::Value) {
    match serde_json::to_string_pretty(&v) {
        Ok(s) => println!("{s}"),
        Err(e) => tracing::error!(err = %e, "json encode"),
    }
}

// ── Commands ────────────────────────────────────────────────────────────────

fn cmd_peers(cli: &Cli) -> anyhow::Result<()> {
    let config = config(cli)?;
    let cache = open_cache(&data_dir(cli)?, &cli.username, config.storage())?;
    let peers = load_hangouts(cache.as_ref(), &cli.username).context("load peers")?;
    print(json!({ "username": cli.username, "peers": peers }));
    Ok(())
}

fn cmd_messages(cli: &Cli, peer: &str) -> anyhow::Result<()> {
    let config = config(cli)?;
    let cache = open_cache(&data_dir(cli)?, &cli.username, config.storage())?;
    let messages = load_messages(cache.as_ref(), peer).context("load messages")?;
    print(json!({ "peer": peer, "messages": messages }));
    Ok(())
}

async fn cmd_search(cli: &Cli, term: &str) -> anyhow::Result<()> {
    let config = config(cli)?;
    print(search(config.lookup_url(), term, &cli.username).await?);
    Ok(())
}

async fn search(base: &str, term: &str, username: &str) -> anyhow::Result<serde_json::Value> {
    let client = LookupClient::new(base)?;
    let results = client.find(term, username).await.context("lookup")?;
    Ok(json!({ "term": term, "results": results }))
}

async fn cmd_send(
    cli: &Cli,
    peer: &str,
    command: PeerCommand,
    text: &str,
    timeout_sec: u64,
) -> anyhow::Result<()> {
    let action = command_action(command, peer, text)?;
    let timeout = Duration::from_secs(timeout_sec);
    let app = connect(cli)?;

    wait_for(&app, timeout, |s| s.transport.is_open())
        .await
        .ok_or_else(|| anyhow!("channel did not open within {timeout_sec}s"))?;

    tracing::info!(peer = %peer, command = %command, "sending");
    app.dispatch(action);
    // CommandStarted lands before the acknowledgement clears it.
    wait_for(&app, Duration::from_secs(2), |s| {
        s.hangouts.pending_command.is_some() || s.hangouts.last_error.is_some()
    })
    .await;
    let state = wait_for(&app, timeout, |s| {
        s.hangouts.pending_command.is_none() || s.hangouts.last_error.is_some()
    })
    .await
    .ok_or_else(|| anyhow!("no acknowledgement for {command} within {timeout_sec}s"))?;

    if let Some(err) = &state.hangouts.last_error {
        bail!("{command} failed: {err}");
    }
    print(json!({
        "command": command,
        "peer": state.hangouts.peer(peer),
    }));
    app.dispatch(AppAction::Logout);
    Ok(())
}

fn command_action(command: PeerCommand, peer: &str, text: &str) -> anyhow::Result<AppAction> {
    let username = peer.to_string();
    Ok(match command {
        PeerCommand::Invite => AppAction::Invite {
            username,
            text: text.to_string(),
        },
        PeerCommand::Accept => AppAction::Accept { username },
        PeerCommand::Decline => AppAction::Decline { username },
        PeerCommand::Block => AppAction::Block { username },
        PeerCommand::Unblock => AppAction::Unblock { username },
        PeerCommand::Message => {
            if text.trim().is_empty() {
                bail!("--text is required for message");
            }
            AppAction::SendMessage {
                username,
                text: text.to_string(),
            }
        }
        PeerCommand::Online => bail!("ONLINE is sent automatically on connect"),
    })
}

struct ChannelObserver(tokio::sync::mpsc::UnboundedSender<AppState>);

impl AppObserver for ChannelObserver {
    fn on_update(&self, update: AppUpdate) {
        let AppUpdate::FullState(state) = update;
        let _ = self.0.send(state);
    }
}

async fn cmd_listen(cli: &Cli, timeout_sec: u64) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<AppState>();
    let app = connect(cli)?;
    app.listen_for_updates(Box::new(ChannelObserver(tx)));

    let deadline = if timeout_sec == 0 {
        None
    } else {
        Some(tokio::time::Instant::now() + Duration::from_secs(timeout_sec))
    };

    let mut last_peers = None;
    let mut last_transport = None;
    loop {
        let state = if let Some(dl) = deadline {
            let remaining = dl.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(s)) => s,
                Ok(None) => break,
                Err(_) => break, // timeout
            }
        } else {
            match rx.recv().await {
                Some(s) => s,
                None => break,
            }
        };

        if last_transport != Some(state.transport) {
            last_transport = Some(state.transport);
            tracing::info!(transport = ?state.transport, "transport changed");
        }
        if last_peers.as_ref() != Some(&state.hangouts.peers) {
            print(json!({ "rev": state.rev, "peers": state.hangouts.peers }));
            last_peers = Some(state.hangouts.peers.clone());
        }
        if let Some(toast) = &state.toast {
            tracing::warn!(rev = state.rev, "{toast}");
        }
    }

    app.dispatch(AppAction::Logout);
    Ok(())
}

fn connect(cli: &Cli) -> anyhow::Result<Arc<HangoutsApp>> {
    let app = HangoutsApp::with_config(data_dir(cli)?, config(cli)?);
    app.dispatch(AppAction::Login {
        username: cli.username.clone(),
        email: None,
    });
    Ok(app)
}

/// Polls the app snapshot until `pred` holds, returning that snapshot.
async fn wait_for(
    app: &HangoutsApp,
    timeout: Duration,
    pred: impl Fn(&AppState) -> bool,
) -> Option<AppState> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let state = app.state();
        if pred(&state) {
            return Some(state);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
