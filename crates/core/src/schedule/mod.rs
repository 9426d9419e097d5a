//! The operation/transaction model shared by every analysis.

pub mod display;
pub mod transaction;
pub mod types;

pub use display::format_schedule;
pub use transaction::{group_transactions, transaction_ids, Outcome, Transaction, TransactionSummary};
pub use types::{Action, Operation, OperationKind, TransactionId};
