//! Test Utilities Module
//!
//! A scriptable in-memory [`LedgerGateway`] plus helpers for building signed
//! transactions, so the broadcast engine can be exercised deterministically
//! under tokio's paused clock.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use solana_sdk::{hash::Hash, signature::Keypair, signature::Signature};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::TransferConfig;
use crate::rpc_manager::{
    ConfirmationSubscription, GatewayError, GatewayResult, LedgerGateway, SendOptions,
    SimulationReport,
};
use crate::tx_builder::build_self_transfer;
use crate::types::{ConfirmationDetails, ExpiryWindow, SignedTransaction};

/// How one confirmation subscription behaves
#[derive(Debug, Clone)]
pub enum ConfirmationScript {
    /// Never resolves
    Never,
    /// Resolves with `result` after `delay`
    After {
        delay: Duration,
        result: GatewayResult<ConfirmationDetails>,
    },
    /// Opening the subscription fails
    SubscribeFails(GatewayError),
}

impl ConfirmationScript {
    pub fn confirmed_after(delay: Duration, slot: u64) -> Self {
        Self::After {
            delay,
            result: Ok(ConfirmationDetails { slot, err: None }),
        }
    }

    pub fn failed_after(delay: Duration, slot: u64, reason: &str) -> Self {
        Self::After {
            delay,
            result: Ok(ConfirmationDetails {
                slot,
                err: Some(reason.to_string()),
            }),
        }
    }

    pub fn errors_after(delay: Duration, message: &str) -> Self {
        Self::After {
            delay,
            result: Err(GatewayError::Subscription(message.to_string())),
        }
    }
}

/// A send the mock gateway received
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub wire: Bytes,
    pub options: SendOptions,
    pub at: Instant,
}

/// Scriptable gateway; every call is recorded
pub struct MockGateway {
    simulation: Mutex<GatewayResult<SimulationReport>>,
    broadcast_results: Mutex<VecDeque<GatewayResult<()>>>,
    heights: Mutex<VecDeque<u64>>,
    last_height: Mutex<u64>,
    confirmations: Mutex<VecDeque<ConfirmationScript>>,
    sends: Mutex<Vec<RecordedSend>>,
    simulate_calls: AtomicUsize,
    height_calls: AtomicUsize,
    subscriptions_opened: AtomicUsize,
    subscriptions_released: Arc<AtomicUsize>,
}

impl MockGateway {
    /// Simulation passes, sends succeed, height stays at 0, confirmation
    /// never arrives
    pub fn new() -> Self {
        Self {
            simulation: Mutex::new(Ok(SimulationReport::success(Some(450)))),
            broadcast_results: Mutex::new(VecDeque::new()),
            heights: Mutex::new(VecDeque::new()),
            last_height: Mutex::new(0),
            confirmations: Mutex::new(VecDeque::new()),
            sends: Mutex::new(Vec::new()),
            simulate_calls: AtomicUsize::new(0),
            height_calls: AtomicUsize::new(0),
            subscriptions_opened: AtomicUsize::new(0),
            subscriptions_released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_simulation_error(self, reason: &str) -> Self {
        *self.simulation.lock() = Ok(SimulationReport::failure(reason));
        self
    }

    pub fn with_simulation_result(self, result: GatewayResult<SimulationReport>) -> Self {
        *self.simulation.lock() = result;
        self
    }

    /// Results for successive broadcasts; once exhausted every send succeeds
    pub fn with_broadcast_results(self, results: Vec<GatewayResult<()>>) -> Self {
        *self.broadcast_results.lock() = results.into();
        self
    }

    /// Heights returned by successive `current_height` calls; the last one
    /// repeats
    pub fn with_heights(self, heights: Vec<u64>) -> Self {
        *self.heights.lock() = heights.into();
        self
    }

    /// Scripts for successive subscriptions; once exhausted they never resolve
    pub fn with_confirmation(self, script: ConfirmationScript) -> Self {
        self.confirmations.lock().push_back(script);
        self
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().clone()
    }

    pub fn broadcast_count(&self) -> usize {
        self.sends.lock().len()
    }

    pub fn simulate_calls(&self) -> usize {
        self.simulate_calls.load(Ordering::SeqCst)
    }

    pub fn height_calls(&self) -> usize {
        self.height_calls.load(Ordering::SeqCst)
    }

    pub fn subscriptions_opened(&self) -> usize {
        self.subscriptions_opened.load(Ordering::SeqCst)
    }

    pub fn subscriptions_released(&self) -> usize {
        self.subscriptions_released.load(Ordering::SeqCst)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    async fn simulate(&self, _tx: &SignedTransaction) -> GatewayResult<SimulationReport> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        self.simulation.lock().clone()
    }

    async fn broadcast(&self, tx: &SignedTransaction, options: SendOptions) -> GatewayResult<()> {
        self.sends.lock().push(RecordedSend {
            wire: tx.wire().clone(),
            options,
            at: Instant::now(),
        });
        self.broadcast_results.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn subscribe_confirmation(
        &self,
        _signature: &Signature,
        _expiry: &ExpiryWindow,
    ) -> GatewayResult<ConfirmationSubscription> {
        let script = self
            .confirmations
            .lock()
            .pop_front()
            .unwrap_or(ConfirmationScript::Never);

        let pending: futures::future::BoxFuture<'static, GatewayResult<ConfirmationDetails>> =
            match script {
                ConfirmationScript::SubscribeFails(err) => return Err(err),
                ConfirmationScript::Never => Box::pin(futures::future::pending()),
                ConfirmationScript::After { delay, result } => Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    result
                }),
            };

        self.subscriptions_opened.fetch_add(1, Ordering::SeqCst);
        let released = Arc::clone(&self.subscriptions_released);
        Ok(ConfirmationSubscription::new(pending, move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }

    async fn current_height(&self) -> GatewayResult<u64> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last_height.lock();
        if let Some(next) = self.heights.lock().pop_front() {
            *last = next;
        }
        Ok(*last)
    }
}

/// A freshly signed self-transfer bound to a random blockhash
pub fn signed_transaction() -> SignedTransaction {
    let payer = Keypair::new();
    let tx = build_self_transfer(&payer, Hash::new_unique(), &TransferConfig::default())
        .expect("self transfer builds");
    SignedTransaction::new(tx).expect("transaction is signed")
}

pub fn expiry_window(tx: &SignedTransaction, last_valid_height: u64) -> ExpiryWindow {
    ExpiryWindow::new(*tx.recent_blockhash(), last_valid_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_heights_repeat_last_value() {
        let gateway = MockGateway::new().with_heights(vec![5, 7]);
        assert_eq!(gateway.current_height().await.unwrap(), 5);
        assert_eq!(gateway.current_height().await.unwrap(), 7);
        assert_eq!(gateway.current_height().await.unwrap(), 7);
        assert_eq!(gateway.height_calls(), 3);
    }

    #[tokio::test]
    async fn test_subscription_release_is_counted() {
        let gateway = MockGateway::new();
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 100);

        let subscription = gateway
            .subscribe_confirmation(tx.signature(), &expiry)
            .await
            .unwrap();
        assert_eq!(gateway.subscriptions_opened(), 1);
        assert_eq!(gateway.subscriptions_released(), 0);

        drop(subscription);
        assert_eq!(gateway.subscriptions_released(), 1);
    }
}
