//! PiCruise console client entry point.
//!
//! Loads the settings file, builds the connection manager on top of the
//! WebSocket transport, and drives it from commands typed on stdin.  It is the
//! smallest possible presentation layer: every command goes through the same
//! `ui_bridge` handlers a graphical front end would call.
//!
//! # Usage
//!
//! ```text
//! cruise-client [OPTIONS]
//!
//! Options:
//!   --config    <PATH>   Settings file [default: platform config dir]
//!   --host      <HOST>   Controller hostname or IP
//!   --ws-port   <PORT>   Controller WebSocket port
//!   --http-port <PORT>   Controller HTTP port
//! ```
//!
//! Options override the settings file; each can also come from the
//! environment (`PICRUISE_CONFIG`, `PICRUISE_HOST`, `PICRUISE_WS_PORT`,
//! `PICRUISE_HTTP_PORT`).
//!
//! # Console commands
//!
//! ```text
//! connect | disconnect | toggle       session lifecycle
//! angle <v> | speed <v>               explicit value in [-1, 1]
//! drag <axis> <px> | release <axis>   joystick primitives
//! left | right                        HTTP steering nudges
//! status | help | quit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cruise_core::{Axis, Nudge};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cruise_client::application::connection_manager::ConnectionManager;
use cruise_client::application::event_bus::InboundMessage;
use cruise_client::application::session::SessionState;
use cruise_client::infrastructure::storage::config::{
    config_file_path, load_config_from, ClientConfig,
};
use cruise_client::infrastructure::transport::{HttpControlClient, WebSocketTransportFactory};
use cruise_client::infrastructure::ui_bridge::{self, ClientCommandResult, StatusDto};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// PiCruise remote-control console client.
#[derive(Debug, Parser)]
#[command(
    name = "cruise-client",
    about = "Console remote control for a PiCruise vehicle controller",
    version
)]
struct Cli {
    /// Settings file to load instead of the platform default.
    #[arg(long, env = "PICRUISE_CONFIG")]
    config: Option<PathBuf>,

    /// Controller hostname or IP address.
    #[arg(long, env = "PICRUISE_HOST")]
    host: Option<String>,

    /// Controller WebSocket port.
    #[arg(long, env = "PICRUISE_WS_PORT")]
    ws_port: Option<u16>,

    /// Controller HTTP port (nudge routes).
    #[arg(long, env = "PICRUISE_HTTP_PORT")]
    http_port: Option<u16>,
}

impl Cli {
    /// Loads the settings file and applies command-line overrides.
    fn into_client_config(self) -> anyhow::Result<ClientConfig> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => config_file_path().context("locating the settings file")?,
        };
        let config = load_config_from(&path)
            .with_context(|| format!("loading settings from {}", path.display()))?;
        Ok(self.apply_overrides(config))
    }

    fn apply_overrides(self, mut config: ClientConfig) -> ClientConfig {
        if let Some(host) = self.host {
            config.controller.host = host;
        }
        if let Some(port) = self.ws_port {
            config.controller.ws_port = port;
        }
        if let Some(port) = self.http_port {
            config.controller.http_port = port;
        }
        config
    }
}

// ── Console commands ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum ConsoleCommand {
    Connect,
    Disconnect,
    Toggle,
    Set(Axis, f32),
    Drag(Axis, f32),
    Release(Axis),
    Nudge(Nudge),
    Status,
    Help,
    Quit,
}

const HELP: &str = "commands: connect, disconnect, toggle, angle <v>, speed <v>, \
                    drag <axis> <px>, release <axis>, left, right, status, quit";

fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let axis = |word: &str| word.parse::<Axis>().map_err(|e| e.to_string());
    let number = |word: &str| {
        word.parse::<f32>()
            .map_err(|_| format!("expected a number, got {word:?}"))
    };

    match (verb.as_str(), args.as_slice()) {
        ("connect", []) => Ok(ConsoleCommand::Connect),
        ("disconnect", []) => Ok(ConsoleCommand::Disconnect),
        ("toggle", []) => Ok(ConsoleCommand::Toggle),
        ("angle", [v]) => Ok(ConsoleCommand::Set(Axis::Angle, number(*v)?)),
        ("speed", [v]) => Ok(ConsoleCommand::Set(Axis::Speed, number(*v)?)),
        ("drag", [a, d]) => Ok(ConsoleCommand::Drag(axis(*a)?, number(*d)?)),
        ("release", [a]) => Ok(ConsoleCommand::Release(axis(*a)?)),
        ("left", []) => Ok(ConsoleCommand::Nudge(Nudge::Left)),
        ("right", []) => Ok(ConsoleCommand::Nudge(Nudge::Right)),
        ("status", []) => Ok(ConsoleCommand::Status),
        ("help" | "?", []) => Ok(ConsoleCommand::Help),
        ("quit" | "exit", []) => Ok(ConsoleCommand::Quit),
        ("", _) => Err(String::new()),
        _ => Err(format!("unrecognised command {line:?}; {HELP}")),
    }
}

fn print_status(status: &StatusDto) {
    println!(
        "[{}] {} ({}), button: {}{}",
        status.label,
        status.endpoint,
        status.state,
        status.button_label,
        if status.button_enabled { "" } else { " (disabled)" }
    );
}

fn print_result<T: serde::Serialize>(result: ClientCommandResult<T>) {
    if let Some(error) = result.error {
        println!("error: {error}");
    }
}

async fn run_command(
    command: ConsoleCommand,
    manager: &ConnectionManager,
    nudges: &HttpControlClient,
) {
    match command {
        ConsoleCommand::Connect => match manager.connect().await {
            Ok(()) => {}
            Err(e) => println!("error: {e}"),
        },
        ConsoleCommand::Disconnect => match manager.disconnect().await {
            Ok(()) => {}
            Err(e) => println!("error: {e}"),
        },
        ConsoleCommand::Toggle => print_result(ui_bridge::toggle_connection(manager).await),
        ConsoleCommand::Set(axis, value) => {
            print_result(ui_bridge::set_axis(manager, axis.label(), value))
        }
        ConsoleCommand::Drag(axis, distance) => {
            print_result(ui_bridge::drag(manager, axis.label(), distance))
        }
        ConsoleCommand::Release(axis) => print_result(ui_bridge::release(manager, axis.label())),
        ConsoleCommand::Nudge(direction) => {
            print_result(ui_bridge::nudge(nudges, direction.route()).await)
        }
        ConsoleCommand::Status => {
            if let Some(status) = ui_bridge::get_status(manager).data {
                print_status(&status);
            }
        }
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => {}
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_client_config()?;

    // `RUST_LOG` wins over the settings file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let manager_config = config
        .manager_config()
        .context("invalid controller settings")?;
    let http_base = config
        .controller
        .http_base()
        .context("invalid controller HTTP endpoint")?;
    info!(
        endpoint = %manager_config.endpoint,
        http = %http_base,
        "PiCruise client starting"
    );

    let factory = Arc::new(WebSocketTransportFactory::new(
        config.controller.websocket_settings(),
    ));
    let manager = ConnectionManager::new(factory, manager_config);
    let nudges = HttpControlClient::new(http_base);

    // ── Indicator and inbound printers ────────────────────────────────────────
    let mut states = manager.subscribe_state();
    let endpoint = manager.endpoint().to_string();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            print_status(&StatusDto::from_state(state, &endpoint));
        }
    });

    let mut inbound = manager.subscribe_inbound();
    tokio::spawn(async move {
        loop {
            match inbound.recv().await {
                Ok(InboundMessage::Text(text)) => println!("controller: {text}"),
                Ok(InboundMessage::Binary(bytes)) => {
                    println!("controller: <{} bytes>", bytes.len())
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    println!("controller: ({n} messages skipped)")
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // ── Console loop ──────────────────────────────────────────────────────────
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("failed to listen for Ctrl+C signal: {e}");
                }
                info!("received Ctrl+C, shutting down");
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        match parse_command(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => run_command(command, &manager, &nudges).await,
            Err(message) if message.is_empty() => {}
            Err(message) => println!("{message}"),
        }
    }

    // Leave the controller in a known state.
    if manager.state() == SessionState::Connected {
        if let Err(e) = manager.disconnect().await {
            error!("disconnect on exit failed: {e}");
        }
    }

    info!("PiCruise client stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
