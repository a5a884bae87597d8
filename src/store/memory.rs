//! In-memory [`LedgerStore`] used by the development server and the tests.
//!
//! A single `RwLock` guards all tables. `commit` validates the whole batch
//! against the locked state before touching anything, so a rejected batch
//! leaves no partial writes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ledger::{Transaction, TransactionStatus};
use crate::models::{LockState, Role, UserProfile, Wallet, WalletView};

use super::{BatchRecord, LedgerBatch, LedgerStats, LedgerStore, StoreError};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserProfile>,
    /// wallet number -> (owner id, wallet)
    wallets: HashMap<String, (Uuid, Wallet)>,
    wallet_numbers: HashMap<Uuid, String>,
    /// append order; history views iterate newest-first
    transactions: Vec<Transaction>,
    tx_index: HashMap<String, usize>,
}

impl Inner {
    fn view(&self, number: &str) -> Option<WalletView> {
        let (owner_id, wallet) = self.wallets.get(number)?;
        let owner = self.users.get(owner_id)?;
        Some(WalletView {
            owner_id: owner.id,
            owner_email: owner.email.clone(),
            owner_first_name: owner.first_name.clone(),
            owner_last_name: owner.last_name.clone(),
            owner_phone: owner.phone.clone(),
            role: owner.role,
            active: owner.active,
            archived: owner.archived,
            number: wallet.number.clone(),
            balance: wallet.balance,
            bonus: wallet.bonus,
            lock: wallet.lock,
            version: wallet.version,
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn create_user(&self, profile: UserProfile, wallet: Wallet) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for existing in inner.users.values().filter(|u| !u.archived) {
            if existing.email == profile.email {
                return Err(StoreError::DuplicateUser("email".to_string()));
            }
            if existing.phone == profile.phone {
                return Err(StoreError::DuplicateUser("telephone".to_string()));
            }
            if existing.national_id == profile.national_id {
                return Err(StoreError::DuplicateUser("nci".to_string()));
            }
        }
        inner.wallet_numbers.insert(profile.id, wallet.number.clone());
        inner
            .wallets
            .insert(wallet.number.clone(), (profile.id, wallet));
        inner.users.insert(profile.id, profile);
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserProfile>, StoreError> {
        let inner = self.inner.read().await;
        // A live account shadows an archived namesake.
        Ok(inner
            .users
            .values()
            .filter(|u| u.email == email)
            .min_by_key(|u| u.archived)
            .cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn list_users(
        &self,
        role: Role,
        include_archived: bool,
    ) -> Result<Vec<(UserProfile, Wallet)>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<(UserProfile, Wallet)> = inner
            .users
            .values()
            .filter(|u| u.role == role && (include_archived || !u.archived))
            .filter_map(|u| {
                let number = inner.wallet_numbers.get(&u.id)?;
                let (_, wallet) = inner.wallets.get(number)?;
                Some((u.clone(), wallet.clone()))
            })
            .collect();
        rows.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));
        Ok(rows)
    }

    async fn set_wallet_lock(&self, owner_id: Uuid, lock: LockState) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let number = inner
            .wallet_numbers
            .get(&owner_id)
            .cloned()
            .ok_or_else(|| StoreError::WalletNotFound(owner_id.to_string()))?;
        let (_, wallet) = inner
            .wallets
            .get_mut(&number)
            .ok_or_else(|| StoreError::WalletNotFound(number.clone()))?;
        wallet.lock = lock;
        Ok(())
    }

    async fn set_archived(
        &self,
        owner_id: Uuid,
        archived: bool,
        by: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&owner_id)
            .ok_or_else(|| StoreError::WalletNotFound(owner_id.to_string()))?;
        user.archived = archived;
        if archived {
            user.archived_at = Some(Utc::now());
            user.archived_by = Some(by.to_string());
        } else {
            user.archived_at = None;
            user.archived_by = None;
        }
        Ok(())
    }

    async fn wallet_by_number(&self, number: &str) -> Result<Option<WalletView>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.view(number))
    }

    async fn wallet_by_phone(&self, phone: &str) -> Result<Option<WalletView>, StoreError> {
        let inner = self.inner.read().await;
        let Some(user) = inner.users.values().find(|u| u.phone == phone && !u.archived) else {
            return Ok(None);
        };
        let Some(number) = inner.wallet_numbers.get(&user.id) else {
            return Ok(None);
        };
        Ok(inner.view(number))
    }

    async fn wallet_of(&self, email: &str) -> Result<Option<WalletView>, StoreError> {
        let inner = self.inner.read().await;
        let Some(user) = inner
            .users
            .values()
            .filter(|u| u.email == email)
            .min_by_key(|u| u.archived)
        else {
            return Ok(None);
        };
        let Some(number) = inner.wallet_numbers.get(&user.id) else {
            return Ok(None);
        };
        Ok(inner.view(number))
    }

    async fn transaction(&self, number: &str) -> Result<Option<Transaction>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .tx_index
            .get(number)
            .map(|&i| inner.transactions[i].clone()))
    }

    async fn transactions_of(
        &self,
        email: &str,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Transaction>, u64), StoreError> {
        let inner = self.inner.read().await;
        let matching: Vec<&Transaction> = inner
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.actors.involves(email))
            .collect();
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn all_transactions(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Transaction>, u64), StoreError> {
        let inner = self.inner.read().await;
        let total = inner.transactions.len() as u64;
        let page = inner
            .transactions
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn reversible(&self, email: Option<&str>) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.is_reversible())
            .filter(|tx| email.is_none_or(|e| tx.actors.involves(e)))
            .cloned()
            .collect())
    }

    async fn statistics(&self) -> Result<LedgerStats, StoreError> {
        let inner = self.inner.read().await;
        let mut stats = LedgerStats::default();
        for tx in inner
            .transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Validated && !tx.reversal.reversed)
        {
            stats.absorb(tx);
        }
        Ok(stats)
    }

    async fn commit(&self, batch: LedgerBatch) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        // Validate everything against the locked state first.
        for update in &batch.updates {
            let (_, wallet) = inner
                .wallets
                .get(&update.number)
                .ok_or_else(|| StoreError::WalletNotFound(update.number.clone()))?;
            if wallet.version != update.expected_version {
                return Err(StoreError::Conflict(update.number.clone()));
            }
            if wallet.balance + update.balance_delta < 0 || wallet.bonus + update.bonus_delta < 0 {
                return Err(StoreError::InsufficientBalance(update.number.clone()));
            }
        }
        match &batch.record {
            BatchRecord::Insert(tx) => {
                if inner.tx_index.contains_key(&tx.number) {
                    return Err(StoreError::DuplicateTransaction(tx.number.clone()));
                }
            }
            BatchRecord::Reversal { number, .. } => {
                let idx = inner
                    .tx_index
                    .get(number)
                    .copied()
                    .ok_or_else(|| StoreError::WalletNotFound(number.clone()))?;
                if !inner.transactions[idx].is_reversible() {
                    return Err(StoreError::AlreadyReversed(number.clone()));
                }
            }
        }

        // All checks passed; apply.
        for update in &batch.updates {
            let (_, wallet) = inner
                .wallets
                .get_mut(&update.number)
                .expect("validated above");
            wallet.balance += update.balance_delta;
            wallet.bonus += update.bonus_delta;
            wallet.version += 1;
        }
        match batch.record {
            BatchRecord::Insert(tx) => {
                let idx = inner.transactions.len();
                inner.tx_index.insert(tx.number.clone(), idx);
                inner.transactions.push(tx);
            }
            BatchRecord::Reversal {
                number,
                reversed_at,
                reversed_by,
                reason,
            } => {
                let idx = inner.tx_index[&number];
                let tx = &mut inner.transactions[idx];
                tx.status = TransactionStatus::Cancelled;
                tx.reversal.reversed = true;
                tx.reversal.reversed_at = Some(reversed_at);
                tx.reversal.reversed_by = Some(reversed_by);
                tx.reversal.reason = Some(reason);
            }
        }
        Ok(())
    }
}
