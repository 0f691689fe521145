//! Self-transfer transaction: compute budget + a transfer back to the payer

use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    signature::{Keypair, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};

use super::TransactionBuilderError;
use crate::config::TransferConfig;

/// Micro-lamports of compute unit price per lamport of priority fee
const MICRO_LAMPORTS_PER_LAMPORT: u64 = 1_000_000;

/// Instructions in order: unit limit, unit price, transfer
pub fn self_transfer_instructions(payer: &Keypair, config: &TransferConfig) -> Vec<Instruction> {
    let payer_key = payer.pubkey();
    vec![
        ComputeBudgetInstruction::set_compute_unit_limit(config.cu_budget),
        ComputeBudgetInstruction::set_compute_unit_price(
            config
                .priority_fee_lamports
                .saturating_mul(MICRO_LAMPORTS_PER_LAMPORT),
        ),
        system_instruction::transfer(&payer_key, &payer_key, config.lamports),
    ]
}

/// Build and sign a v0 self-transfer bound to `blockhash`
pub fn build_self_transfer(
    payer: &Keypair,
    blockhash: Hash,
    config: &TransferConfig,
) -> Result<VersionedTransaction, TransactionBuilderError> {
    let instructions = self_transfer_instructions(payer, config);

    let message = v0::Message::try_compile(&payer.pubkey(), &instructions, &[], blockhash)
        .map_err(|e| TransactionBuilderError::instruction_failed("system", e.to_string()))?;

    VersionedTransaction::try_new(VersionedMessage::V0(message), &[payer])
        .map_err(|e| TransactionBuilderError::Signing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Signature;

    #[test]
    fn test_instruction_order() {
        let payer = Keypair::new();
        let ixs = self_transfer_instructions(&payer, &TransferConfig::default());

        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[0].program_id, solana_sdk::compute_budget::id());
        assert_eq!(ixs[1].program_id, solana_sdk::compute_budget::id());
        assert_eq!(ixs[2].program_id, solana_sdk::system_program::id());
    }

    #[test]
    fn test_signed_and_bound_to_blockhash() {
        let payer = Keypair::new();
        let blockhash = Hash::new_unique();

        let tx = build_self_transfer(&payer, blockhash, &TransferConfig::default()).unwrap();

        assert_eq!(tx.signatures.len(), 1);
        assert_ne!(tx.signatures[0], Signature::default());
        assert_eq!(*tx.message.recent_blockhash(), blockhash);
        assert!(tx.verify_with_results().iter().all(|ok| *ok));
    }
}
