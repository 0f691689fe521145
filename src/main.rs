//! Lander CLI
//!
//! Builds one transaction (a self transfer or a Jupiter swap), then hands it
//! to the broadcast engine and reports how it ended.
//!
//! ## Commands
//!
//! - `lander transfer`: compute-budgeted transfer from the wallet to itself
//! - `lander swap`: Jupiter swap using the `[swap]` config section

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lander::broadcast::{BroadcastSupervisor, OutcomeReporter};
use lander::config::Config;
use lander::metrics::metrics;
use lander::rpc_manager::SolanaGateway;
use lander::tx_builder::{
    build_self_transfer, sign_swap_transaction, JupiterClient, TransactionBuilderError,
};
use lander::types::{ExpiryWindow, SignedTransaction};
use lander::wallet::WalletManager;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send lamports from the wallet back to itself
    Transfer {
        /// Overrides transfer.lamports
        #[arg(long)]
        lamports: Option<u64>,
    },
    /// Swap through the Jupiter API
    Swap {
        /// Overrides swap.amount
        #[arg(long)]
        amount: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Starting lander v{}", env!("CARGO_PKG_VERSION"));
    info!("Loading configuration from: {}", args.config);
    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    match args.command {
        Command::Transfer { lamports } => {
            if let Some(lamports) = lamports {
                config.transfer.lamports = lamports;
            }
        }
        Command::Swap { amount } => {
            if let Some(amount) = amount {
                config.swap.amount = amount;
            }
        }
    }
    config.validate()?;

    let wallet = WalletManager::from_config(&config.wallet).context("Failed to load wallet")?;
    info!("Wallet address: {}", wallet.pubkey());

    let gateway = SolanaGateway::new(config.gateway_config());
    info!(
        rpc_url = %gateway.config().rpc_url,
        ws_url = %gateway.config().websocket_url(),
        "Using RPC endpoints"
    );

    let expiry = gateway
        .latest_expiry_window()
        .await
        .context("Failed to fetch latest blockhash")?;
    info!(
        blockhash = %expiry.reference_blockhash,
        last_valid_height = expiry.last_valid_height,
        "Fetched expiry window"
    );

    let tx = build_transaction(&args.command, &config, &wallet, &expiry)
        .await
        .map_err(|e| {
            error!(
                category = e.category(),
                retryable = e.is_retryable(),
                error = %e,
                "Failed to build transaction"
            );
            e
        })?;
    let tx = SignedTransaction::new(tx).context("Built transaction is not signed")?;
    info!("Transaction signature: {}", tx.signature());

    let supervisor = BroadcastSupervisor::new(Arc::new(gateway), config.broadcast.clone());
    let outcome = supervisor.run(tx, expiry).await;

    OutcomeReporter::new(config.explorer.network.clone()).report(&outcome);

    if let Ok(text) = metrics().export_text() {
        debug!("Metrics:\n{}", text);
    }

    // Every outcome is a completed run; only setup failures exit non-zero
    Ok(())
}

/// Build and sign the transaction for `command` against `expiry`'s blockhash
async fn build_transaction(
    command: &Command,
    config: &Config,
    wallet: &WalletManager,
    expiry: &ExpiryWindow,
) -> Result<VersionedTransaction, TransactionBuilderError> {
    match command {
        Command::Transfer { .. } => {
            info!(
                lamports = config.transfer.lamports,
                cu_budget = config.transfer.cu_budget,
                "Building self transfer"
            );
            build_self_transfer(wallet.keypair(), expiry.reference_blockhash, &config.transfer)
        }
        Command::Swap { .. } => {
            let client = JupiterClient::new(config.jupiter_endpoint())?;
            let quote = client.get_quote(&config.swap).await?;
            let swap = client
                .get_swap_transaction(&quote, &wallet.pubkey(), &config.swap)
                .await?;
            sign_swap_transaction(&swap, expiry.reference_blockhash, wallet.keypair())
        }
    }
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "lander=debug,info"
    } else {
        "lander=info,warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    #[cfg(feature = "json-logs")]
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_target(true))
        .init();

    #[cfg(not(feature = "json-logs"))]
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_transfer() {
        let args = Args::try_parse_from(["lander", "transfer", "--lamports", "42"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Transfer {
                lamports: Some(42)
            }
        ));
        assert_eq!(args.config, "config.toml");
    }

    #[test]
    fn test_args_parse_swap() {
        let args = Args::try_parse_from(["lander", "-c", "custom.toml", "-v", "swap"]).unwrap();
        assert!(matches!(args.command, Command::Swap { amount: None }));
        assert!(args.verbose);
        assert_eq!(args.config, "custom.toml");
    }

    #[test]
    fn test_args_require_command() {
        assert!(Args::try_parse_from(["lander"]).is_err());
    }
}
