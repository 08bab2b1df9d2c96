//! `chat-relay` server binary.
//!
//! Usage:
//!   chat-relay
//!   chat-relay --port 9000 --path /chat
//!   chat-relay --host 0.0.0.0 --debug

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;

use chat_relay::{Error, RelayServer, Result, ServerConfig};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    config: ServerConfig,
}

impl Args {
    /// Parse command-line arguments.
    fn parse() -> Result<Self> {
        let mut debug = false;
        let mut config = ServerConfig::new();
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--debug" => debug = true,
                "--host" => {
                    let value = required(&mut args, "--host")?;
                    let ip: IpAddr = value
                        .parse()
                        .map_err(|_| Error::config(format!("invalid --host: {value}")))?;
                    config = config.with_ip(ip);
                }
                "--port" => {
                    let value = required(&mut args, "--port")?;
                    let port: u16 = value
                        .parse()
                        .map_err(|_| Error::config(format!("invalid --port: {value}")))?;
                    config = config.with_port(port);
                }
                "--path" => config = config.with_path(required(&mut args, "--path")?),
                other => return Err(Error::config(format!("unknown argument: {other}"))),
            }
        }

        Ok(Self { debug, config })
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Takes the value following `flag`.
fn required(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| Error::config(format!("{flag} requires a value")))
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let default = if debug {
        "chat_relay=debug"
    } else {
        "chat_relay=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            std::process::exit(2);
        }
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let server = RelayServer::start(args.config).await?;
    println!("Chat relay listening on {}", server.ws_url());

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;

    Ok(())
}
