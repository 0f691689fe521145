//! Resend loop raced against a single confirmation subscription

use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::BroadcastConfig;
use crate::metrics::metrics;
use crate::rpc_manager::{ConfirmationSubscription, GatewayResult, LedgerGateway, SendOptions};
use crate::structured_logging::StructuredLogger;
use crate::types::{ExpiryWindow, Outcome, SignedTransaction, SubmissionAttempt};

/// Stand-in deadline when no wall-clock budget is configured; the branch is
/// disabled in that case and this sleep is never awaited to completion.
const NO_WALL_CLOCK: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Drives an already-sent transaction to a terminal outcome.
///
/// One confirmation subscription is opened up front and kept for the whole
/// race. Every `resend_interval` the race checks the block height against
/// the expiry window and, while the window is still open, retransmits the
/// identical bytes. The race ends on confirmation, on a confirmation error,
/// or on expiry; a failed resend only gets logged.
pub struct ConfirmationRace {
    gateway: Arc<dyn LedgerGateway>,
    config: BroadcastConfig,
    logger: StructuredLogger,
}

impl ConfirmationRace {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        config: BroadcastConfig,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            gateway,
            config,
            logger,
        }
    }

    /// Run the race. The initial send has already happened and is recorded
    /// as attempt 1.
    pub async fn run(&self, tx: &SignedTransaction, expiry: &ExpiryWindow) -> Outcome {
        let mut attempts = vec![SubmissionAttempt::new(1)];

        let outcome = self.drive(tx, expiry, &mut attempts).await;

        metrics()
            .attempts_per_lifecycle
            .observe(attempts.len() as f64);
        self.logger
            .log_race_finished(tx.signature(), &outcome, attempts.len());
        outcome
    }

    async fn drive(
        &self,
        tx: &SignedTransaction,
        expiry: &ExpiryWindow,
        attempts: &mut Vec<SubmissionAttempt>,
    ) -> Outcome {
        let signature = *tx.signature();
        let started = Instant::now();

        let mut generation = 1u32;
        let mut subscription = match self.subscribe(&signature, expiry, generation).await {
            Ok(subscription) => subscription,
            Err(e) => {
                return Outcome::Unknown {
                    signature,
                    reason: format!("failed to subscribe to confirmation: {}", e),
                }
            }
        };

        let interval = self.config.resend_interval();
        let mut resend_timer = tokio::time::interval_at(started + interval, interval);
        resend_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let wall_clock_budget = self.config.max_wall_clock();
        let wall_clock = tokio::time::sleep(wall_clock_budget.unwrap_or(NO_WALL_CLOCK));
        tokio::pin!(wall_clock);

        let resend_options = SendOptions {
            skip_preflight: self.config.skip_preflight_on_resend,
        };

        loop {
            tokio::select! {
                biased;

                result = &mut subscription => match result {
                    Ok(details) => {
                        return match details.err {
                            None => Outcome::Confirmed {
                                signature,
                                slot: details.slot,
                            },
                            Some(reason) => Outcome::ExecutionFailed {
                                signature,
                                slot: details.slot,
                                reason,
                            },
                        };
                    }
                    Err(e) => {
                        if generation > self.config.max_resubscribes {
                            return Outcome::Unknown {
                                signature,
                                reason: format!("confirmation watch failed: {}", e),
                            };
                        }
                        self.logger.warn(&format!(
                            "Confirmation watch for {} failed, resubscribing: {}",
                            signature, e
                        ));
                        if self.height_exceeded(expiry).await {
                            return Outcome::Expired {
                                signature,
                                last_valid_height: expiry.last_valid_height,
                            };
                        }
                        generation += 1;
                        subscription = match self.subscribe(&signature, expiry, generation).await {
                            Ok(subscription) => subscription,
                            Err(e) => {
                                return Outcome::Unknown {
                                    signature,
                                    reason: format!("failed to resubscribe to confirmation: {}", e),
                                }
                            }
                        };
                    }
                },

                _ = &mut wall_clock, if wall_clock_budget.is_some() => {
                    drop(subscription);
                    return Outcome::Expired {
                        signature,
                        last_valid_height: expiry.last_valid_height,
                    };
                }

                _ = resend_timer.tick() => {
                    if self.height_exceeded(expiry).await {
                        drop(subscription);
                        return Outcome::Expired {
                            signature,
                            last_valid_height: expiry.last_valid_height,
                        };
                    }

                    let attempt = SubmissionAttempt::new(attempts.len() as u32 + 1);
                    self.logger.log_resend(
                        &signature,
                        attempt.attempt_number,
                        started.elapsed().as_millis() as u64,
                    );

                    let m = metrics();
                    m.broadcasts_total.inc();
                    m.resends_total.inc();
                    if let Err(e) = self.gateway.broadcast(tx, resend_options).await {
                        m.resend_failures_total.inc();
                        self.logger
                            .log_send_failure(&signature, attempt.attempt_number, &e);
                    }
                    attempts.push(attempt);
                }
            }
        }
    }

    async fn subscribe(
        &self,
        signature: &Signature,
        expiry: &ExpiryWindow,
        generation: u32,
    ) -> GatewayResult<ConfirmationSubscription> {
        let subscription = self
            .gateway
            .subscribe_confirmation(signature, expiry)
            .await?;
        metrics().subscriptions_total.inc();
        self.logger.log_subscription(signature, generation);
        Ok(subscription)
    }

    /// An unreadable height counts as "not yet expired"
    async fn height_exceeded(&self, expiry: &ExpiryWindow) -> bool {
        match self.gateway.current_height().await {
            Ok(height) => expiry.is_expired_at(height),
            Err(e) => {
                self.logger
                    .warn(&format!("Failed to read block height, assuming unexpired: {}", e));
                false
            }
        }
    }
}
