//! Reliable broadcast & confirmation engine
//!
//! ## Architecture
//!
//! - **supervisor**: one lifecycle. Pre-flight simulation, a single initial
//!   send, then hands off to the race. Every failure becomes an `Outcome`.
//! - **race**: the resend loop. One confirmation subscription for the whole
//!   race, a fixed resend interval, and an expiry check on every tick.
//! - **report**: renders the outcome with an explorer link.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lander::broadcast::{BroadcastSupervisor, OutcomeReporter};
//! use lander::config::BroadcastConfig;
//! use lander::rpc_manager::{GatewayConfig, SolanaGateway};
//! # use lander::types::SignedTransaction;
//!
//! # async fn example(tx: SignedTransaction) -> anyhow::Result<()> {
//! let gateway = SolanaGateway::new(GatewayConfig::new("https://api.mainnet-beta.solana.com"));
//! let expiry = gateway.latest_expiry_window().await?;
//!
//! let supervisor = BroadcastSupervisor::new(Arc::new(gateway), BroadcastConfig::default());
//! let outcome = supervisor.run(tx, expiry).await;
//! OutcomeReporter::default().report(&outcome);
//! # Ok(())
//! # }
//! ```

mod race;
mod report;
mod supervisor;

pub use race::ConfirmationRace;
pub use report::OutcomeReporter;
pub use supervisor::BroadcastSupervisor;
