//! Lander - reliable transaction broadcast for Solana
//!
//! Simulates a signed transaction, sends it once, then keeps resending the
//! identical bytes while a single confirmation subscription watches for it,
//! until it confirms or its blockhash expires.

pub mod broadcast;
pub mod config;
pub mod metrics;
pub mod observability;
pub mod structured_logging;
pub mod test_utils;
pub mod tx_builder;
pub mod types;
pub mod wallet;

// Component modules with non-standard paths (directories with spaces)
#[path = "rpc manager/mod.rs"]
pub mod rpc_manager;

// Re-export commonly used types
pub use broadcast::{BroadcastSupervisor, ConfirmationRace, OutcomeReporter};
pub use rpc_manager::{GatewayError, LedgerGateway, SolanaGateway};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use types::{ExpiryWindow, Outcome, SignedTransaction};

#[cfg(test)]
mod tests {
    // Include test modules
    mod broadcast_supervisor_tests;
    mod confirmation_race_tests;
}
