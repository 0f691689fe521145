//! RPC Manager Module
//!
//! The ledger gateway seam consumed by the broadcast engine, plus the
//! Solana implementation of it.
//!
//! Gateways are the transport only. They never retry a send on their own:
//! every broadcast goes out with transport retries disabled, and the engine
//! is the sole authority on retransmission.

use async_trait::async_trait;
use solana_sdk::signature::Signature;

use crate::types::{ExpiryWindow, SignedTransaction};

// Submodules
pub mod rpc_config;
pub mod rpc_errors;
pub mod rpc_gateway;
pub mod rpc_subscription;

// Re-exports for convenience
pub use rpc_config::GatewayConfig;
pub use rpc_errors::{GatewayError, GatewayResult};
pub use rpc_gateway::SolanaGateway;
pub use rpc_subscription::ConfirmationSubscription;

/// Per-send options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendOptions {
    /// Bypass the node's own simulation before forwarding
    pub skip_preflight: bool,
}

/// Result of a dry-run execution against current ledger state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    /// Deterministic execution error, if the transaction would fail
    pub err: Option<String>,
    pub units_consumed: Option<u64>,
    pub logs: Vec<String>,
}

impl SimulationReport {
    pub fn success(units_consumed: Option<u64>) -> Self {
        Self {
            err: None,
            units_consumed,
            logs: Vec::new(),
        }
    }

    pub fn failure(err: impl Into<String>) -> Self {
        Self {
            err: Some(err.into()),
            units_consumed: None,
            logs: Vec::new(),
        }
    }
}

/// Network access required by the broadcast engine.
///
/// Implementations must tolerate concurrent in-flight calls: one live
/// confirmation subscription alongside periodic broadcasts.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Dry-run the transaction; must not mutate ledger state
    async fn simulate(&self, tx: &SignedTransaction) -> GatewayResult<SimulationReport>;

    /// Hand the transaction bytes to the network. Success means accepted for
    /// forwarding, not confirmed.
    async fn broadcast(&self, tx: &SignedTransaction, options: SendOptions) -> GatewayResult<()>;

    /// Open a confirmation listener for `signature`. The returned handle
    /// resolves at most once; dropping it releases the listener.
    async fn subscribe_confirmation(
        &self,
        signature: &Signature,
        expiry: &ExpiryWindow,
    ) -> GatewayResult<ConfirmationSubscription>;

    /// Current block height, compared against the expiry window
    async fn current_height(&self) -> GatewayResult<u64>;
}
