//! Configuration module for the lander CLI
//!
//! This module handles configuration loading from TOML files and
//! environment variables. The engine itself never reads the environment;
//! everything it needs arrives through these structs.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::rpc_manager::GatewayConfig;
use crate::types::ConfirmationLevel;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Resend / confirmation behaviour
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Self-transfer transaction settings
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Jupiter swap settings
    #[serde(default)]
    pub swap: SwapConfig,

    /// Outcome reporting
    #[serde(default)]
    pub explorer: ExplorerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// HTTP JSON-RPC endpoint
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,

    /// Websocket endpoint; derived from `endpoint` when unset
    #[serde(default)]
    pub ws_endpoint: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

/// Knobs of the resend / confirmation race
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastConfig {
    /// Interval between resends while unconfirmed
    #[serde(default = "default_resend_interval_ms")]
    pub resend_interval_ms: u64,

    /// Commitment the confirmation watch waits for
    #[serde(default)]
    pub confirmation_level: ConfirmationLevel,

    /// Resends bypass the node's simulation; the engine already simulated once
    #[serde(default = "default_true")]
    pub skip_preflight_on_resend: bool,

    /// Fresh subscriptions allowed after the confirmation watch errors
    #[serde(default)]
    pub max_resubscribes: u32,

    /// Optional wall-clock budget for the whole race
    #[serde(default)]
    pub max_wall_clock_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to a keypair file (JSON array or raw 64 bytes)
    #[serde(default)]
    pub keypair_path: Option<String>,

    /// Base58 secret key; normally supplied through WALLET_PRIVATE_KEY
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Compute unit limit
    #[serde(default = "default_cu_budget")]
    pub cu_budget: u32,

    /// Priority fee; the compute unit price is 1_000_000 micro-lamports per unit
    #[serde(default = "default_priority_fee")]
    pub priority_fee_lamports: u64,

    /// Amount moved from the payer back to itself
    #[serde(default = "default_transfer_lamports")]
    pub lamports: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Jupiter API base; defaults to `<rpc endpoint>/jupiter`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_input_mint")]
    pub input_mint: String,

    #[serde(default = "default_output_mint")]
    pub output_mint: String,

    /// Amount in the input mint's base units
    #[serde(default = "default_swap_amount")]
    pub amount: u64,

    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,

    #[serde(default = "default_priority_fee")]
    pub priority_fee_lamports: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Network part of `https://explorer.<network>/tx/<signature>`
    #[serde(default = "default_explorer_network")]
    pub network: String,
}

// Default value functions
fn default_rpc_endpoint() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}
fn default_rpc_timeout() -> u64 { 30 }
fn default_resend_interval_ms() -> u64 { 2000 }
fn default_true() -> bool { true }
fn default_cu_budget() -> u32 { 500 }
fn default_priority_fee() -> u64 { 1 }
fn default_transfer_lamports() -> u64 { 5000 }
fn default_input_mint() -> String {
    // Wrapped SOL
    "So11111111111111111111111111111111111111112".to_string()
}
fn default_output_mint() -> String {
    // USDC
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string()
}
fn default_swap_amount() -> u64 { 1000 }
fn default_slippage_bps() -> u16 { 50 }
fn default_explorer_network() -> String {
    "solana.com".to_string()
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            ws_endpoint: None,
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            resend_interval_ms: default_resend_interval_ms(),
            confirmation_level: ConfirmationLevel::default(),
            skip_preflight_on_resend: default_true(),
            max_resubscribes: 0,
            max_wall_clock_secs: None,
        }
    }
}

impl BroadcastConfig {
    pub fn resend_interval(&self) -> Duration {
        Duration::from_millis(self.resend_interval_ms)
    }

    pub fn max_wall_clock(&self) -> Option<Duration> {
        self.max_wall_clock_secs.map(Duration::from_secs)
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            cu_budget: default_cu_budget(),
            priority_fee_lamports: default_priority_fee(),
            lamports: default_transfer_lamports(),
        }
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            input_mint: default_input_mint(),
            output_mint: default_output_mint(),
            amount: default_swap_amount(),
            slippage_bps: default_slippage_bps(),
            priority_fee_lamports: default_priority_fee(),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            network: default_explorer_network(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            broadcast: BroadcastConfig::default(),
            wallet: WalletConfig::default(),
            transfer: TransferConfig::default(),
            swap: SwapConfig::default(),
            explorer: ExplorerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("Failed to read config file {}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load `.env`, then the TOML file if it exists, then apply environment
    /// overrides and validate
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = if std::path::Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file {} not found, using defaults", path);
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply RPC_ENDPOINT, WS_ENDPOINT, WALLET_PRIVATE_KEY, JUPITER_ENDPOINT
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("RPC_ENDPOINT").filter(|s| !s.is_empty()) {
            self.rpc.endpoint = endpoint;
        }
        if let Some(ws) = lookup("WS_ENDPOINT").filter(|s| !s.is_empty()) {
            self.rpc.ws_endpoint = Some(ws);
        }
        if let Some(key) = lookup("WALLET_PRIVATE_KEY").filter(|s| !s.is_empty()) {
            self.wallet.private_key = Some(key);
        }
        if let Some(jupiter) = lookup("JUPITER_ENDPOINT").filter(|s| !s.is_empty()) {
            self.swap.endpoint = Some(jupiter);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "rpc.endpoint must not be empty".to_string(),
            ));
        }
        if self.broadcast.resend_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "broadcast.resend_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.broadcast.max_wall_clock_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "broadcast.max_wall_clock_secs must be greater than zero when set".to_string(),
            ));
        }
        if self.transfer.lamports == 0 {
            return Err(ConfigError::ValidationError(
                "transfer.lamports must be greater than zero".to_string(),
            ));
        }
        if self.swap.amount == 0 {
            return Err(ConfigError::ValidationError(
                "swap.amount must be greater than zero".to_string(),
            ));
        }
        if self.swap.slippage_bps > 10_000 {
            return Err(ConfigError::ValidationError(format!(
                "swap.slippage_bps {} exceeds 10000",
                self.swap.slippage_bps
            )));
        }
        Ok(())
    }

    /// Gateway settings derived from the rpc and broadcast sections
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            rpc_url: self.rpc.endpoint.clone(),
            ws_url: self.rpc.ws_endpoint.clone(),
            confirmation_level: self.broadcast.confirmation_level,
            timeout_ms: self.rpc.timeout_secs * 1000,
        }
    }

    /// Jupiter API base URL
    pub fn jupiter_endpoint(&self) -> String {
        match &self.swap.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("{}/jupiter", self.rpc.endpoint.trim_end_matches('/')),
        }
    }
}
