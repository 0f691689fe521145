//! Jupiter swap API client
//!
//! Fetches a quote, asks the API for a ready-made swap transaction, then
//! rebinds it to our own blockhash and signs it with the wallet.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Keypair,
    transaction::VersionedTransaction,
};
use std::time::Duration;
use tracing::info;

use super::TransactionBuilderError;
use crate::config::SwapConfig;

/// Body of `POST /swap`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest<'a> {
    quote_response: &'a serde_json::Value,
    user_public_key: String,
    wrap_and_unwrap_sol: bool,
    /// Lets the API size the compute unit limit itself
    dynamic_compute_unit_limit: bool,
    prioritization_fee_lamports: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Base64 bincode-serialized unsigned transaction
    pub swap_transaction: String,
    #[serde(default)]
    pub last_valid_block_height: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct JupiterClient {
    http: reqwest::Client,
    endpoint: String,
}

impl JupiterClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransactionBuilderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TransactionBuilderError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    /// `GET /quote`; the body is passed back verbatim to `/swap`
    pub async fn get_quote(
        &self,
        config: &SwapConfig,
    ) -> Result<serde_json::Value, TransactionBuilderError> {
        info!(
            input_mint = %config.input_mint,
            output_mint = %config.output_mint,
            amount = config.amount,
            "Fetching jupiter swap quote"
        );

        let amount = config.amount.to_string();
        let slippage = config.slippage_bps.to_string();
        let response = self
            .http
            .get(format!("{}/quote", self.endpoint))
            .query(&[
                ("inputMint", config.input_mint.as_str()),
                ("outputMint", config.output_mint.as_str()),
                ("amount", amount.as_str()),
                ("slippageBps", slippage.as_str()),
            ])
            .send()
            .await?;

        let quote = Self::json_body(response, "quote").await?;
        info!("Fetched jupiter swap quote");
        Ok(quote)
    }

    /// `POST /swap` for `user`
    pub async fn get_swap_transaction(
        &self,
        quote: &serde_json::Value,
        user: &Pubkey,
        config: &SwapConfig,
    ) -> Result<SwapResponse, TransactionBuilderError> {
        info!("Fetching jupiter swap transaction");

        let request = SwapRequest {
            quote_response: quote,
            user_public_key: user.to_string(),
            wrap_and_unwrap_sol: true,
            dynamic_compute_unit_limit: true,
            prioritization_fee_lamports: config.priority_fee_lamports,
        };
        let response = self
            .http
            .post(format!("{}/swap", self.endpoint))
            .json(&request)
            .send()
            .await?;

        let body = Self::json_body(response, "swap transaction").await?;
        let swap: SwapResponse =
            serde_json::from_value(body).map_err(|e| TransactionBuilderError::SwapApi {
                status: None,
                message: format!("unexpected swap response: {}", e),
            })?;

        info!("Fetched jupiter swap transaction");
        Ok(swap)
    }

    async fn json_body(
        response: reqwest::Response,
        what: &str,
    ) -> Result<serde_json::Value, TransactionBuilderError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransactionBuilderError::SwapApi {
                status: Some(status.as_u16()),
                message: format!("failed to fetch jupiter {}: {}", what, text),
            });
        }
        Ok(response.json().await?)
    }
}

/// Decode the API's transaction, rebind it to `blockhash` and sign it.
///
/// The API's own blockhash is replaced so the transaction's validity window
/// is exactly the one the caller fetched.
pub fn sign_swap_transaction(
    swap: &SwapResponse,
    blockhash: Hash,
    payer: &Keypair,
) -> Result<VersionedTransaction, TransactionBuilderError> {
    let raw = BASE64
        .decode(swap.swap_transaction.trim())
        .map_err(|e| TransactionBuilderError::Decode(format!("invalid base64: {}", e)))?;
    let unsigned: VersionedTransaction = bincode::deserialize(&raw)
        .map_err(|e| TransactionBuilderError::Decode(format!("invalid transaction: {}", e)))?;

    let mut message = unsigned.message;
    message.set_recent_blockhash(blockhash);

    VersionedTransaction::try_new(message, &[payer])
        .map_err(|e| TransactionBuilderError::Signing(e.to_string()))
}
