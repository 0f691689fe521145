//! Solana JSON-RPC / websocket implementation of [`LedgerGateway`]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::StreamExt;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::{
    RpcSendTransactionConfig, RpcSignatureSubscribeConfig, RpcSimulateTransactionConfig,
};
use solana_rpc_client_api::request::RpcRequest;
use solana_rpc_client_api::response::{
    ProcessedSignatureResult, Response as RpcResponse, RpcSignatureResult,
};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_transaction_status::{TransactionStatus, UiTransactionEncoding};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::{
    ConfirmationSubscription, GatewayConfig, GatewayError, GatewayResult, LedgerGateway,
    SendOptions, SimulationReport,
};
use crate::types::{ConfirmationDetails, ExpiryWindow, SignedTransaction};

/// Gateway backed by a nonblocking [`RpcClient`] for requests and a
/// per-lifecycle [`PubsubClient`] for the confirmation subscription.
///
/// The RPC client is shared across all calls and safe for concurrent use.
#[derive(Clone)]
pub struct SolanaGateway {
    rpc: Arc<RpcClient>,
    config: GatewayConfig,
}

impl SolanaGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let rpc = RpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            Duration::from_millis(config.timeout_ms),
            config.confirmation_level.commitment(),
        );

        Self {
            rpc: Arc::new(rpc),
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Current status of `signature`, if it already meets the configured
    /// commitment
    pub async fn signature_status(
        &self,
        signature: &Signature,
    ) -> GatewayResult<Option<ConfirmationDetails>> {
        signature_status(
            &self.rpc,
            signature,
            self.config.confirmation_level.commitment(),
            &self.config.rpc_url,
        )
        .await
    }

    /// Latest blockhash and the height it stays valid through
    pub async fn latest_expiry_window(&self) -> GatewayResult<ExpiryWindow> {
        let (blockhash, last_valid_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(self.config.confirmation_level.commitment())
            .await
            .map_err(|e| GatewayError::from_client_error(e, &self.config.rpc_url))?;

        Ok(ExpiryWindow::new(blockhash, last_valid_height))
    }

    fn subscription_timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }
}

impl std::fmt::Debug for SolanaGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaGateway")
            .field("rpc_url", &self.config.rpc_url)
            .field("confirmation_level", &self.config.confirmation_level)
            .finish()
    }
}

#[async_trait]
impl LedgerGateway for SolanaGateway {
    async fn simulate(&self, tx: &SignedTransaction) -> GatewayResult<SimulationReport> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: true,
            commitment: Some(self.config.confirmation_level.commitment()),
            encoding: Some(UiTransactionEncoding::Base64),
            ..Default::default()
        };

        let response = self
            .rpc
            .simulate_transaction_with_config(tx.transaction(), config)
            .await
            .map_err(|e| GatewayError::from_client_error(e, &self.config.rpc_url))?;

        let result = response.value;
        Ok(SimulationReport {
            err: result.err.map(|e| format!("{:?}", e)),
            units_consumed: result.units_consumed,
            logs: result.logs.unwrap_or_default(),
        })
    }

    async fn broadcast(&self, tx: &SignedTransaction, options: SendOptions) -> GatewayResult<()> {
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(self.config.confirmation_level.commitment_level()),
            encoding: Some(UiTransactionEncoding::Base64),
            // Retransmission belongs to the engine, never to the node
            max_retries: Some(0),
            min_context_slot: None,
        };
        let encoded = BASE64.encode(tx.wire());

        let returned: String = self
            .rpc
            .send(
                RpcRequest::SendTransaction,
                serde_json::json!([encoded, config]),
            )
            .await
            .map_err(|e| GatewayError::from_client_error(e, &self.config.rpc_url))?;

        if returned != tx.signature().to_string() {
            warn!(
                expected = %tx.signature(),
                returned = %returned,
                "Node acknowledged a different signature"
            );
        }
        Ok(())
    }

    async fn subscribe_confirmation(
        &self,
        signature: &Signature,
        expiry: &ExpiryWindow,
    ) -> GatewayResult<ConfirmationSubscription> {
        let ws_url = self.config.websocket_url();
        debug!(
            signature = %signature,
            ws_url = %ws_url,
            last_valid_height = expiry.last_valid_height,
            "Opening confirmation subscription"
        );

        let client = tokio::time::timeout(self.subscription_timeout(), PubsubClient::new(&ws_url))
            .await
            .map_err(|_| GatewayError::Timeout {
                endpoint: ws_url.clone(),
                timeout_ms: self.config.timeout_ms,
            })?
            .map_err(|e| GatewayError::Transport {
                endpoint: ws_url.clone(),
                message: e.to_string(),
            })?;

        let subscribe_config = RpcSignatureSubscribeConfig {
            commitment: Some(self.config.confirmation_level.commitment()),
            enable_received_notification: Some(false),
        };
        let signature = *signature;

        let (ready_tx, ready_rx) = oneshot::channel::<GatewayResult<()>>();
        let (result_tx, result_rx) = oneshot::channel::<GatewayResult<ConfirmationDetails>>();
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let rpc = Arc::clone(&self.rpc);
        let rpc_url = self.config.rpc_url.clone();
        let commitment = self.config.confirmation_level.commitment();

        tokio::spawn(async move {
            let resolved = {
                let (mut notifications, unsubscribe) = match client
                    .signature_subscribe(&signature, Some(subscribe_config))
                    .await
                {
                    Ok(subscription) => subscription,
                    Err(e) => {
                        let _ = ready_tx.send(Err(GatewayError::Subscription(format!(
                            "failed to subscribe to {}: {}",
                            signature, e
                        ))));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // The transaction may have reached the commitment before the
                // subscription went live; no notification would follow then
                let status_check = signature_status(&rpc, &signature, commitment, &rpc_url);
                tokio::pin!(status_check);
                let mut status_pending = true;

                // A dropped sender counts as cancellation too
                let resolved = loop {
                    tokio::select! {
                        _ = &mut cancel_rx => break None,
                        next = notifications.next() => break Some(notification_result(next)),
                        status = &mut status_check, if status_pending => {
                            status_pending = false;
                            match status {
                                Ok(Some(details)) => break Some(Ok(details)),
                                Ok(None) => {}
                                Err(e) => debug!(
                                    signature = %signature,
                                    error = %e,
                                    "Signature status check failed"
                                ),
                            }
                        }
                    }
                };
                unsubscribe().await;
                resolved
            };

            if let Err(e) = client.shutdown().await {
                debug!(signature = %signature, error = %e, "Pubsub shutdown failed");
            }

            match resolved {
                Some(result) => {
                    let _ = result_tx.send(result);
                }
                None => debug!(signature = %signature, "Confirmation subscription cancelled"),
            }
        });

        match tokio::time::timeout(self.subscription_timeout(), ready_rx).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => return Err(e),
            Ok(Err(_)) => {
                return Err(GatewayError::Subscription(
                    "listener task exited before subscribing".to_string(),
                ))
            }
            Err(_) => {
                return Err(GatewayError::Timeout {
                    endpoint: ws_url,
                    timeout_ms: self.config.timeout_ms,
                })
            }
        }

        let pending = async move {
            result_rx.await.unwrap_or_else(|_| {
                Err(GatewayError::Subscription(
                    "listener dropped without a result".to_string(),
                ))
            })
        };

        Ok(ConfirmationSubscription::new(pending, move || {
            let _ = cancel_tx.send(());
        }))
    }

    async fn current_height(&self) -> GatewayResult<u64> {
        self.rpc
            .get_block_height_with_commitment(self.config.confirmation_level.commitment())
            .await
            .map_err(|e| GatewayError::from_client_error(e, &self.config.rpc_url))
    }
}

/// One `getSignatureStatuses` lookup; `Some` once the status meets `commitment`
async fn signature_status(
    rpc: &RpcClient,
    signature: &Signature,
    commitment: CommitmentConfig,
    endpoint: &str,
) -> GatewayResult<Option<ConfirmationDetails>> {
    let response = rpc
        .get_signature_statuses(&[*signature])
        .await
        .map_err(|e| GatewayError::from_client_error(e, endpoint))?;

    Ok(response
        .value
        .first()
        .and_then(|status| status.as_ref())
        .and_then(|status| confirmed_details(status, commitment)))
}

fn confirmed_details(
    status: &TransactionStatus,
    commitment: CommitmentConfig,
) -> Option<ConfirmationDetails> {
    if !status.satisfies_commitment(commitment) {
        return None;
    }
    Some(ConfirmationDetails {
        slot: status.slot,
        err: status.err.as_ref().map(|e| format!("{:?}", e)),
    })
}

fn notification_result(
    next: Option<RpcResponse<RpcSignatureResult>>,
) -> GatewayResult<ConfirmationDetails> {
    match next {
        Some(response) => {
            let err = match response.value {
                RpcSignatureResult::ProcessedSignature(ProcessedSignatureResult { err }) => {
                    err.map(|e| format!("{:?}", e))
                }
                RpcSignatureResult::ReceivedSignature(_) => None,
            };
            Ok(ConfirmationDetails {
                slot: response.context.slot,
                err,
            })
        }
        None => Err(GatewayError::Subscription(
            "notification stream closed before resolving".to_string(),
        )),
    }
}
