//! One full transaction lifecycle: simulate, send once, race, report

use std::sync::Arc;

use crate::config::BroadcastConfig;
use crate::metrics::{metrics, Timer};
use crate::observability::CorrelationId;
use crate::rpc_manager::{LedgerGateway, SendOptions};
use crate::structured_logging::StructuredLogger;
use crate::types::{ExpiryWindow, Outcome, SignedTransaction};

use super::race::ConfirmationRace;

/// Owns the lifecycle of a single signed transaction.
///
/// Every failure along the way is folded into the returned [`Outcome`];
/// `run` never errors and resolves exactly once.
pub struct BroadcastSupervisor {
    gateway: Arc<dyn LedgerGateway>,
    config: BroadcastConfig,
}

impl BroadcastSupervisor {
    pub fn new(gateway: Arc<dyn LedgerGateway>, config: BroadcastConfig) -> Self {
        Self { gateway, config }
    }

    pub async fn run(&self, tx: SignedTransaction, expiry: ExpiryWindow) -> Outcome {
        self.run_with_correlation(tx, expiry, CorrelationId::new())
            .await
    }

    pub async fn run_with_correlation(
        &self,
        tx: SignedTransaction,
        expiry: ExpiryWindow,
        correlation_id: CorrelationId,
    ) -> Outcome {
        let logger = StructuredLogger::new(correlation_id);
        let m = metrics();
        m.lifecycles_total.inc();
        m.lifecycles_in_flight.inc();
        let _in_flight = scopeguard::guard((), |_| metrics().lifecycles_in_flight.dec());

        let timer = Timer::new();
        let outcome = self.drive(&tx, &expiry, &logger).await;

        timer.observe_duration(&m.lifecycle_latency);
        m.record_outcome(outcome.label());
        logger.log_outcome(&outcome, (timer.elapsed_secs() * 1000.0) as u64);
        outcome
    }

    async fn drive(
        &self,
        tx: &SignedTransaction,
        expiry: &ExpiryWindow,
        logger: &StructuredLogger,
    ) -> Outcome {
        let signature = tx.signature();

        // Deterministic failures are not cured by resending
        match self.gateway.simulate(tx).await {
            Ok(report) => {
                if let Some(reason) = report.err {
                    logger.log_simulation_failure(signature, &reason, &report.logs);
                    return Outcome::SimulationFailed { reason };
                }
                logger.log_simulation(signature, report.units_consumed);
            }
            Err(e) => {
                let reason = format!("simulation request failed: {}", e);
                logger.log_simulation_failure(signature, &reason, &[]);
                return Outcome::SimulationFailed { reason };
            }
        }

        // Just simulated, so the node's own preflight would be redundant
        logger.log_send_attempt(signature, 1);
        metrics().broadcasts_total.inc();
        if let Err(e) = self
            .gateway
            .broadcast(tx, SendOptions { skip_preflight: true })
            .await
        {
            logger.log_send_failure(signature, 1, &e);
            return Outcome::SendFailed {
                reason: e.to_string(),
            };
        }

        ConfirmationRace::new(
            Arc::clone(&self.gateway),
            self.config.clone(),
            logger.clone(),
        )
        .run(tx, expiry)
        .await
    }
}
