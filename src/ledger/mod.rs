//! The ledger core: transaction factory, balance-mutating operations, the
//! reversal engine and history/statistics views.

pub mod error;
pub mod history;
pub mod operations;
pub mod reversal;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::LedgerError;
pub use history::{BalanceView, HistoryEntry, HistoryPage, OwnerInfo, RecipientInfo};
pub use operations::{CashReceipt, CreditReceipt, Ledger, TransferDestination, TransferReceipt};
pub use reversal::ReversalReceipt;
pub use transaction::{
    Actors, ReversalInfo, Transaction, TransactionDetails, TransactionKind, TransactionStatus,
    MAX_AMOUNT, MIN_AGENT_CREDIT, MIN_TRANSFER_AMOUNT, SYSTEM_ACCOUNT, percent_of,
};
