//! Storage abstraction for users, wallets and the transaction collection.
//!
//! Every balance mutation goes through [`LedgerStore::commit`] as a
//! [`LedgerBatch`]: a set of version-checked wallet deltas plus exactly one
//! transaction record (insert or reversal marking). A backend applies the
//! batch all-or-nothing and rejects it with [`StoreError::Conflict`] when any
//! wallet version moved since it was read.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::Transaction;
use crate::models::{LockState, Role, UserProfile, Wallet, WalletView};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A wallet version check failed during commit.
    #[error("version conflict on wallet {0}")]
    Conflict(String),

    /// Transaction number collision on insert.
    #[error("duplicate transaction number {0}")]
    DuplicateTransaction(String),

    #[error("wallet {0} not found")]
    WalletNotFound(String),

    /// A delta would have driven a balance below zero.
    #[error("insufficient balance on wallet {0}")]
    InsufficientBalance(String),

    /// Reversal marking raced with another reversal of the same transaction.
    #[error("transaction {0} already reversed")]
    AlreadyReversed(String),

    /// Unique constraint hit while creating a user (email, phone or CNI).
    #[error("duplicate user field: {0}")]
    DuplicateUser(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Version-checked delta against one wallet.
#[derive(Debug, Clone)]
pub struct WalletUpdate {
    pub number: String,
    pub expected_version: i64,
    pub balance_delta: i64,
    pub bonus_delta: i64,
}

/// The single transaction-collection write carried by a batch.
#[derive(Debug, Clone)]
pub enum BatchRecord {
    /// Insert a freshly built transaction.
    Insert(Transaction),
    /// Flip an existing transaction's reversal record, exactly once.
    Reversal {
        number: String,
        reversed_at: DateTime<Utc>,
        reversed_by: String,
        reason: String,
    },
}

/// An atomic ledger commit: wallet deltas plus one transaction write.
#[derive(Debug, Clone)]
pub struct LedgerBatch {
    pub updates: Vec<WalletUpdate>,
    pub record: BatchRecord,
}

/// Aggregates over validated, non-reversed transactions.
#[derive(Debug, Clone, Default)]
pub struct LedgerStats {
    pub total_transactions: u64,
    pub deposits: u64,
    pub withdrawals: u64,
    pub transfers: u64,
    pub agent_credits: u64,
    pub total_volume: i64,
    pub total_fees: i64,
    pub total_commissions: i64,
}

/// Backend-neutral persistence surface. Implemented by [`MemoryStore`] and
/// [`PgStore`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create a user together with their wallet. Email, phone and national
    /// id are unique across non-archived users.
    async fn create_user(&self, profile: UserProfile, wallet: Wallet) -> Result<(), StoreError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<UserProfile>, StoreError>;

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError>;

    /// Users of one role with their wallets, most recent first. Archived
    /// users are excluded unless `include_archived`.
    async fn list_users(
        &self,
        role: Role,
        include_archived: bool,
    ) -> Result<Vec<(UserProfile, Wallet)>, StoreError>;

    async fn set_wallet_lock(&self, owner_id: Uuid, lock: LockState) -> Result<(), StoreError>;

    /// Archive or restore a user. Archiving records who did it and when.
    async fn set_archived(
        &self,
        owner_id: Uuid,
        archived: bool,
        by: &str,
    ) -> Result<(), StoreError>;

    async fn wallet_by_number(&self, number: &str) -> Result<Option<WalletView>, StoreError>;

    async fn wallet_by_phone(&self, phone: &str) -> Result<Option<WalletView>, StoreError>;

    async fn wallet_of(&self, email: &str) -> Result<Option<WalletView>, StoreError>;

    async fn transaction(&self, number: &str) -> Result<Option<Transaction>, StoreError>;

    /// Transactions where `email` appears as an actor, most recent first,
    /// with the total count before pagination.
    async fn transactions_of(
        &self,
        email: &str,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Transaction>, u64), StoreError>;

    /// Every transaction, most recent first, with the total count.
    async fn all_transactions(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Transaction>, u64), StoreError>;

    /// Validated, non-reversed transactions, optionally restricted to those
    /// where `email` appears as an actor. Most recent first.
    async fn reversible(&self, email: Option<&str>) -> Result<Vec<Transaction>, StoreError>;

    /// Aggregates over validated, non-reversed transactions.
    async fn statistics(&self) -> Result<LedgerStats, StoreError>;

    /// Apply a batch atomically. On any failure no wallet nor transaction
    /// is touched.
    async fn commit(&self, batch: LedgerBatch) -> Result<(), StoreError>;
}

impl LedgerStats {
    /// Fold one transaction into the aggregates.
    pub(crate) fn absorb(&mut self, tx: &Transaction) {
        use crate::ledger::TransactionKind;

        self.total_transactions += 1;
        self.total_volume += tx.amount;
        self.total_fees += tx.fee;
        self.total_commissions += tx.bonus;
        match tx.kind {
            TransactionKind::Deposit => self.deposits += 1,
            TransactionKind::Withdrawal => self.withdrawals += 1,
            TransactionKind::Transfer => self.transfers += 1,
            TransactionKind::AgentCredit => self.agent_credits += 1,
        }
    }
}
