//! everiToken transaction client.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller actions (JSON)
//!     ────────────────────▶ ┌──────────────┐   get_info / abi_json_to_bin    ┌──────────┐
//!                           │  assembler   │ ──────────────────────────────▶ │          │
//!                           │  + encoder   │                                 │          │
//!                           └──────┬───────┘   trx_json_to_digest            │  chain   │
//!                                  │         ──────────────────────────────▶ │  node    │
//!                                  ▼                                         │  (HTTP)  │
//!                           ┌──────────────┐   get_required_keys             │          │
//!                           │   signer     │ ──────────────────────────────▶ │          │
//!                           │  + wallet    │                                 │          │
//!                           └──────┬───────┘   push_transaction              │          │
//!     receipt / error              │         ──────────────────────────────▶ │          │
//!     ◀────────────────────────────┘                                         └──────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use evt_client::chain::{HttpGateway, Key, KeyProvider, TransactionAssembler, TransactionRequest};
use evt_client::config::loader::collect_static_keys;
use evt_client::config::{load_config, ClientConfig};
use evt_client::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "evt-client")]
#[command(about = "Assemble, sign and push everiToken transactions", long_about = None)]
struct Cli {
    /// TOML config file; defaults apply when omitted.
    #[arg(short, long, env = "EVT_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Node base URL, overriding the `[endpoint]` section.
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the node's chain info
    Info,
    /// Push the transaction request stored in a JSON file
    Push {
        /// File holding `{"actions": [...], ...}`
        file: PathBuf,
    },
    /// Print the canonical form of a key
    Key {
        /// Private or public key in any supported encoding
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    metrics::set_enabled(config.observability.metrics_enabled);

    match cli.command {
        Commands::Info => {
            let assembler = build_assembler(&config, cli.url.as_deref())?;
            let info = assembler.get_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Push { file } => {
            let content = std::fs::read_to_string(&file)?;
            let request: TransactionRequest = serde_json::from_str(&content)?;

            let assembler = build_assembler(&config, cli.url.as_deref())?;
            let receipt = assembler.push_transaction(&request).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "executed": true,
                    "transaction_id": receipt.transaction_id,
                }))?
            );
        }
        Commands::Key { value } => {
            let key = Key::normalize(&value)?;
            let output = match &key {
                Key::Private(private) => json!({
                    "kind": "private",
                    "canonical": private.to_wif(),
                    "public_key": private.public_key().to_string(),
                }),
                Key::Public(public) => json!({
                    "kind": "public",
                    "canonical": public.to_string(),
                    "k1": public.to_k1_string(),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn build_assembler(
    config: &ClientConfig,
    url: Option<&str>,
) -> Result<TransactionAssembler, Box<dyn std::error::Error>> {
    let gateway = match url {
        Some(url) => HttpGateway::new(url, config.timeouts.request_secs)?,
        None => HttpGateway::from_endpoint(&config.endpoint, config.timeouts.request_secs)?,
    };

    tracing::info!(
        keys = config.keys.static_keys.len(),
        required_keys = ?config.transaction.required_keys,
        "evt-client v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    Ok(TransactionAssembler::new(
        Arc::new(gateway),
        KeyProvider::from_keys(collect_static_keys(config)),
        config.transaction.clone(),
    ))
}
