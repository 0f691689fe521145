//! Error types for the transaction builders
//!
//! Builders sit upstream of the broadcast engine: they assemble, fetch and
//! sign transactions. Their failures happen before any lifecycle starts and
//! are surfaced to the CLI rather than folded into an `Outcome`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransactionBuilderError {
    /// Failed to compile the message for a set of instructions
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// The program the failing instruction targets
        program: String,
        reason: String,
    },

    /// Failed to sign the transaction
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The swap API returned an error or an unusable body
    #[error("Swap API error (status={status:?}): {message}")]
    SwapApi {
        status: Option<u16>,
        message: String,
    },

    /// A returned transaction could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration or validation error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TransactionBuilderError {
    /// Check if this error is potentially retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SwapApi { status, .. } => match status {
                Some(code) => *code == 429 || *code >= 500,
                // Connection-level failure
                None => true,
            },

            Self::InstructionBuild { .. } => false,
            Self::Signing(_) => false,
            Self::Decode(_) => false,
            Self::Configuration(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InstructionBuild { .. } => "instruction",
            Self::Signing(_) => "signing",
            Self::SwapApi { .. } => "swap_api",
            Self::Decode(_) => "decode",
            Self::Configuration(_) => "config",
        }
    }

    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for TransactionBuilderError {
    fn from(err: reqwest::Error) -> Self {
        Self::SwapApi {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
