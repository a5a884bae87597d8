use thiserror::Error;

use crate::store::StoreError;

/// Business errors surfaced by ledger operations. All variants except
/// `Internal` carry messages safe to show verbatim to the dashboard.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Permission(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InsufficientFunds(String),

    #[error("{0}")]
    AccountLocked(String),

    #[error("Vous ne pouvez pas transférer vers votre propre compte")]
    SelfTransfer,

    #[error("Transaction déjà annulée")]
    AlreadyCancelled,

    /// Optimistic-concurrency collision. Retried internally; only surfaces
    /// when the retry budget is exhausted.
    #[error("Opération concurrente, veuillez réessayer")]
    Conflict,

    #[error("Erreur interne: {0}")]
    Internal(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => LedgerError::Conflict,
            // A duplicate transaction number is retried with a fresh number.
            StoreError::DuplicateTransaction(_) => LedgerError::Conflict,
            StoreError::WalletNotFound(number) => {
                LedgerError::NotFound(format!("Compte {} introuvable", number))
            }
            StoreError::InsufficientBalance(_) => {
                LedgerError::InsufficientFunds("Solde insuffisant".to_string())
            }
            StoreError::AlreadyReversed(_) => LedgerError::AlreadyCancelled,
            StoreError::DuplicateUser(field) => {
                LedgerError::Validation(format!("Ce champ existe déjà: {}", field))
            }
            StoreError::Backend(msg) => LedgerError::Internal(msg),
        }
    }
}
