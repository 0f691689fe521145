//! Common types used throughout the engine

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::fmt;

use crate::rpc_manager::{GatewayError, GatewayResult};

/// A signed transaction ready for (re)broadcast.
///
/// The wire bytes are serialized once at construction. Every send of this
/// transaction, initial or resend, transmits exactly these bytes; nothing
/// here is ever re-signed or mutated.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    transaction: VersionedTransaction,
    wire: Bytes,
    signature: Signature,
}

impl SignedTransaction {
    /// Wrap a signed transaction, serializing it for the wire
    pub fn new(transaction: VersionedTransaction) -> GatewayResult<Self> {
        let signature = *transaction.signatures.first().ok_or_else(|| {
            GatewayError::Serialization("transaction carries no signatures".to_string())
        })?;
        if signature == Signature::default() {
            return Err(GatewayError::Serialization(
                "transaction is not signed".to_string(),
            ));
        }

        let wire = bincode::serialize(&transaction)
            .map_err(|e| GatewayError::Serialization(format!("failed to serialize: {}", e)))?;

        Ok(Self {
            transaction,
            wire: Bytes::from(wire),
            signature,
        })
    }

    /// The fee payer's signature; identifies this transaction on the ledger
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Serialized wire bytes
    pub fn wire(&self) -> &Bytes {
        &self.wire
    }

    pub fn transaction(&self) -> &VersionedTransaction {
        &self.transaction
    }

    /// Blockhash embedded in the message
    pub fn recent_blockhash(&self) -> &Hash {
        self.transaction.message.recent_blockhash()
    }
}

/// Validity window of a transaction, tied to the blockhash it embeds.
///
/// Once the cluster's block height exceeds `last_valid_height` the
/// transaction can never land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryWindow {
    pub reference_blockhash: Hash,
    pub last_valid_height: u64,
}

impl ExpiryWindow {
    pub fn new(reference_blockhash: Hash, last_valid_height: u64) -> Self {
        Self {
            reference_blockhash,
            last_valid_height,
        }
    }

    /// True once `current_height` is past the last valid height
    pub fn is_expired_at(&self, current_height: u64) -> bool {
        current_height > self.last_valid_height
    }
}

/// One send of the transaction bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionAttempt {
    /// 1 for the initial send, incremented on every resend
    pub attempt_number: u32,
    pub sent_at: DateTime<Utc>,
}

impl SubmissionAttempt {
    pub fn new(attempt_number: u32) -> Self {
        Self {
            attempt_number,
            sent_at: Utc::now(),
        }
    }
}

/// Commitment level the confirmation watch waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLevel {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl ConfirmationLevel {
    pub fn commitment(&self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.commitment_level(),
        }
    }

    pub fn commitment_level(&self) -> CommitmentLevel {
        match self {
            ConfirmationLevel::Processed => CommitmentLevel::Processed,
            ConfirmationLevel::Confirmed => CommitmentLevel::Confirmed,
            ConfirmationLevel::Finalized => CommitmentLevel::Finalized,
        }
    }
}

impl fmt::Display for ConfirmationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfirmationLevel::Processed => "processed",
            ConfirmationLevel::Confirmed => "confirmed",
            ConfirmationLevel::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ConfirmationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(ConfirmationLevel::Processed),
            "confirmed" => Ok(ConfirmationLevel::Confirmed),
            "finalized" => Ok(ConfirmationLevel::Finalized),
            other => Err(format!("unknown confirmation level: {}", other)),
        }
    }
}

/// What the confirmation watch observed when it resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationDetails {
    /// Slot the notification was reported at
    pub slot: u64,
    /// Execution error recorded by the ledger, if the transaction failed
    pub err: Option<String>,
}

/// Terminal state of one transaction lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Landed and executed successfully at the requested commitment
    Confirmed { signature: Signature, slot: u64 },
    /// Landed, but the ledger recorded an execution error
    ExecutionFailed {
        signature: Signature,
        slot: u64,
        reason: String,
    },
    /// Block height passed the last valid height (or the wall-clock budget ran out)
    Expired {
        signature: Signature,
        last_valid_height: u64,
    },
    /// Pre-flight simulation rejected the transaction; nothing was sent
    SimulationFailed { reason: String },
    /// The initial send failed; the confirmation race never started
    SendFailed { reason: String },
    /// The confirmation watch failed without resolving. The transaction may
    /// still land.
    Unknown { signature: Signature, reason: String },
}

impl Outcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Outcome::Confirmed { .. })
    }

    /// Signature of the tracked transaction, when one was sent
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Outcome::Confirmed { signature, .. }
            | Outcome::ExecutionFailed { signature, .. }
            | Outcome::Expired { signature, .. }
            | Outcome::Unknown { signature, .. } => Some(signature),
            Outcome::SimulationFailed { .. } | Outcome::SendFailed { .. } => None,
        }
    }

    /// Stable label used for metrics and structured logs
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Confirmed { .. } => "confirmed",
            Outcome::ExecutionFailed { .. } => "execution_failed",
            Outcome::Expired { .. } => "expired",
            Outcome::SimulationFailed { .. } => "simulation_failed",
            Outcome::SendFailed { .. } => "send_failed",
            Outcome::Unknown { .. } => "unknown",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Confirmed { signature, slot } => {
                write!(f, "transaction {} confirmed at slot {}", signature, slot)
            }
            Outcome::ExecutionFailed {
                signature,
                slot,
                reason,
            } => write!(
                f,
                "transaction {} landed at slot {} but failed: {}",
                signature, slot, reason
            ),
            Outcome::Expired {
                signature,
                last_valid_height,
            } => write!(
                f,
                "transaction {} expired (last valid block height {})",
                signature, last_valid_height
            ),
            Outcome::SimulationFailed { reason } => {
                write!(f, "transaction simulation failed: {}", reason)
            }
            Outcome::SendFailed { reason } => write!(f, "failed to send transaction: {}", reason),
            Outcome::Unknown { signature, reason } => write!(
                f,
                "status of transaction {} is unknown, it may still land: {}",
                signature, reason
            ),
        }
    }
}
