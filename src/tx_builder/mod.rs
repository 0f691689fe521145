//! Transaction builders feeding the broadcast engine
//!
//! - **transfer**: compute-budgeted self transfer, useful as a landing probe
//! - **jupiter**: swap transactions fetched from the Jupiter API
//!
//! Both return a signed `VersionedTransaction` bound to a blockhash the
//! caller fetched, so the matching `ExpiryWindow` is known up front.

pub mod errors;
pub mod jupiter;
pub mod transfer;

pub use errors::TransactionBuilderError;
pub use jupiter::{sign_swap_transaction, JupiterClient, SwapResponse};
pub use transfer::{build_self_transfer, self_transfer_instructions};
