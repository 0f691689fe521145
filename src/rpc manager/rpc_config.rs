use serde::{Deserialize, Serialize};

use crate::types::ConfirmationLevel;

/// Connection settings for [`SolanaGateway`](super::SolanaGateway)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP JSON-RPC endpoint
    pub rpc_url: String,

    /// Websocket endpoint for subscriptions. Derived from `rpc_url` when absent
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Commitment used for simulation, block height and confirmation
    #[serde(default)]
    pub confirmation_level: ConfirmationLevel,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl GatewayConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ws_url: None,
            confirmation_level: ConfirmationLevel::default(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Websocket URL, explicit or derived from the HTTP endpoint
    pub fn websocket_url(&self) -> String {
        match &self.ws_url {
            Some(url) => url.clone(),
            None => derive_ws_url(&self.rpc_url),
        }
    }
}

/// `https://host/path` -> `wss://host/path`, `http://` -> `ws://`.
///
/// An explicit port is bumped by one, where validators serve pubsub
/// (`8899` -> `8900`).
pub fn derive_ws_url(rpc_url: &str) -> String {
    let (scheme, rest) = if let Some(rest) = rpc_url.strip_prefix("https://") {
        ("wss://", rest)
    } else if let Some(rest) = rpc_url.strip_prefix("http://") {
        ("ws://", rest)
    } else {
        return rpc_url.to_string();
    };

    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    let authority = match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>().ok().and_then(|p| p.checked_add(1)) {
            Some(ws_port) => format!("{}:{}", host, ws_port),
            None => authority.to_string(),
        },
        None => authority.to_string(),
    };

    format!("{}{}{}", scheme, authority, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_ws_url() {
        assert_eq!(
            derive_ws_url("https://api.mainnet-beta.solana.com"),
            "wss://api.mainnet-beta.solana.com"
        );
        assert_eq!(derive_ws_url("wss://already"), "wss://already");
    }

    #[test]
    fn test_derive_ws_url_bumps_explicit_port() {
        assert_eq!(derive_ws_url("http://127.0.0.1:8899"), "ws://127.0.0.1:8900");
        assert_eq!(derive_ws_url("http://localhost:8899/"), "ws://localhost:8900/");
        assert_eq!(
            derive_ws_url("https://rpc.example.com:443/api-key"),
            "wss://rpc.example.com:444/api-key"
        );
        assert_eq!(derive_ws_url("http://[::1]:8899"), "ws://[::1]:8900");
        assert_eq!(derive_ws_url("http://[::1]"), "ws://[::1]");
    }

    #[test]
    fn test_explicit_ws_url_wins() {
        let mut config = GatewayConfig::new("https://rpc.example.com");
        assert_eq!(config.websocket_url(), "wss://rpc.example.com");

        config.ws_url = Some("wss://ws.example.com".to_string());
        assert_eq!(config.websocket_url(), "wss://ws.example.com");
    }
}
