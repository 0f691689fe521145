use solana_client::client_error::ClientError;
use thiserror::Error;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Errors surfaced by a ledger gateway
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// Timeout errors
    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimitExceeded { endpoint: String },

    #[error("Blockhash not found (endpoint: {endpoint})")]
    BlockhashNotFound { endpoint: String },

    #[error("Transaction expired (endpoint: {endpoint})")]
    TransactionExpired { endpoint: String },

    /// The confirmation subscription failed or closed before resolving
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// The transaction could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GatewayError {
    /// Check if a later attempt at the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport { .. } => true,
            GatewayError::Timeout { .. } => true,
            GatewayError::RateLimitExceeded { .. } => true,
            GatewayError::BlockhashNotFound { .. } => true,
            GatewayError::Subscription(_) => true,

            GatewayError::TransactionExpired { .. } => false,
            GatewayError::Serialization(_) => false,

            // Retry on server errors (5xx)
            GatewayError::RpcResponse { code, .. } => {
                matches!(code, Some(c) if (500..600).contains(c))
            }
        }
    }

    /// Get the endpoint associated with this error, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            GatewayError::Transport { endpoint, .. }
            | GatewayError::Timeout { endpoint, .. }
            | GatewayError::RpcResponse { endpoint, .. }
            | GatewayError::RateLimitExceeded { endpoint }
            | GatewayError::BlockhashNotFound { endpoint }
            | GatewayError::TransactionExpired { endpoint } => Some(endpoint),
            _ => None,
        }
    }

    /// Create from ClientError with context
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        Self::classify(&err.to_string(), endpoint)
    }

    /// Classify an error message reported by an RPC node
    pub fn classify(message: &str, endpoint: &str) -> Self {
        let err_str = message.to_lowercase();
        let endpoint = endpoint.to_string();

        if err_str.contains("blockhash not found") {
            GatewayError::BlockhashNotFound { endpoint }
        } else if err_str.contains("transaction expired")
            || err_str.contains("block height exceeded")
        {
            GatewayError::TransactionExpired { endpoint }
        } else if err_str.contains("rate limit")
            || err_str.contains("too many requests")
            || err_str.contains("429")
        {
            GatewayError::RateLimitExceeded { endpoint }
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            GatewayError::Timeout {
                endpoint,
                timeout_ms: 0,
            }
        } else if err_str.contains("connection")
            || err_str.contains("network")
            || err_str.contains("dns error")
        {
            GatewayError::Transport {
                endpoint,
                message: message.to_string(),
            }
        } else {
            let code = err_str
                .split("code:")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.trim_end_matches(|c: char| !c.is_ascii_digit()).parse::<i64>().ok());

            GatewayError::RpcResponse {
                endpoint,
                message: message.to_string(),
                code,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(GatewayError::Transport {
            endpoint: "test".to_string(),
            message: "connection failed".to_string(),
        }
        .is_retryable());

        assert!(GatewayError::Timeout {
            endpoint: "test".to_string(),
            timeout_ms: 5000,
        }
        .is_retryable());

        assert!(!GatewayError::Serialization("bad".to_string()).is_retryable());
        assert!(!GatewayError::TransactionExpired {
            endpoint: "test".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn test_error_endpoint() {
        let err = GatewayError::Timeout {
            endpoint: "https://test.com".to_string(),
            timeout_ms: 5000,
        };
        assert_eq!(err.endpoint(), Some("https://test.com"));

        let sub_err = GatewayError::Subscription("closed".to_string());
        assert_eq!(sub_err.endpoint(), None);
    }

    #[test]
    fn test_classify_messages() {
        assert!(matches!(
            GatewayError::classify("Blockhash not found", "rpc"),
            GatewayError::BlockhashNotFound { .. }
        ));
        assert!(matches!(
            GatewayError::classify("block height exceeded", "rpc"),
            GatewayError::TransactionExpired { .. }
        ));
        assert!(matches!(
            GatewayError::classify("HTTP status client error (429 Too Many Requests)", "rpc"),
            GatewayError::RateLimitExceeded { .. }
        ));
        assert!(matches!(
            GatewayError::classify("operation timed out", "rpc"),
            GatewayError::Timeout { .. }
        ));
        assert!(matches!(
            GatewayError::classify("error sending request: connection refused", "rpc"),
            GatewayError::Transport { .. }
        ));
    }

    #[test]
    fn test_classify_extracts_code() {
        match GatewayError::classify("RPC response error code: 503 node unhealthy", "rpc") {
            GatewayError::RpcResponse { code, .. } => assert_eq!(code, Some(503)),
            other => panic!("unexpected classification: {:?}", other),
        }
        assert!(GatewayError::classify("code: 503 unhealthy", "rpc").is_retryable());
        assert!(!GatewayError::classify("code: -32002 invalid", "rpc").is_retryable());
    }
}
