//! Structured logging for transaction lifecycle events

use solana_sdk::signature::Signature;

use crate::observability::CorrelationId;
use crate::rpc_manager::GatewayError;
use crate::types::Outcome;

/// Structured logger for one transaction lifecycle
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    correlation_id: CorrelationId,
}

impl StructuredLogger {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self { correlation_id }
    }

    pub fn log_simulation(&self, signature: &Signature, units_consumed: Option<u64>) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            units_consumed = ?units_consumed,
            "Transaction simulation successful"
        );
    }

    pub fn log_simulation_failure(&self, signature: &Signature, reason: &str, logs: &[String]) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            reason = %reason,
            "Transaction simulation failed"
        );
        for line in logs {
            tracing::debug!(
                correlation_id = %self.correlation_id,
                signature = %signature,
                "{}",
                line
            );
        }
    }

    pub fn log_send_attempt(&self, signature: &Signature, attempt: u32) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            attempt = attempt,
            "Sending transaction"
        );
    }

    pub fn log_resend(&self, signature: &Signature, attempt: u32, elapsed_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            attempt = attempt,
            elapsed_ms = elapsed_ms,
            "Transaction not confirmed, resending"
        );
    }

    pub fn log_send_failure(&self, signature: &Signature, attempt: u32, error: &GatewayError) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            attempt = attempt,
            error = %error,
            retryable = error.is_retryable(),
            "Send failed"
        );
    }

    pub fn log_subscription(&self, signature: &Signature, generation: u32) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            generation = generation,
            "Subscribed to transaction confirmation"
        );
    }

    pub fn log_race_finished(&self, signature: &Signature, outcome: &Outcome, attempts: usize) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            outcome = outcome.label(),
            attempts = attempts,
            "Confirmation race finished"
        );
    }

    pub fn log_outcome(&self, outcome: &Outcome, latency_ms: u64) {
        if outcome.is_confirmed() {
            tracing::info!(
                correlation_id = %self.correlation_id,
                outcome = outcome.label(),
                latency_ms = latency_ms,
                "{}",
                outcome
            );
        } else {
            tracing::warn!(
                correlation_id = %self.correlation_id,
                outcome = outcome.label(),
                latency_ms = latency_ms,
                "{}",
                outcome
            );
        }
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            message = %message,
            "Warning"
        );
    }
}
