//! Read side of the ledger: balances, paginated history, single-transaction
//! detail, reversible listing and aggregate statistics.
//!
//! Transactions are stored once, so history is a plain filtered scan with no
//! per-party duplicate handling. Agents see the whole collection with the
//! owning party attached; everyone else sees the transactions they acted in.

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthenticatedUser;
use crate::models::{LockState, Role};
use crate::store::LedgerStats;

use super::error::LedgerError;
use super::operations::{Ledger, TransferDestination};
use super::transaction::Transaction;

pub const DEFAULT_PAGE_LIMIT: u64 = 50;
pub const MAX_PAGE_LIMIT: u64 = 200;

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceView {
    #[serde(rename = "numeroCompte")]
    pub account_number: String,
    #[serde(rename = "solde")]
    pub balance: i64,
    #[serde(rename = "bonus")]
    pub bonus: i64,
    #[serde(rename = "statut")]
    pub lock: LockState,
}

/// The party a transaction belongs to, attached on the agent-wide view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OwnerInfo {
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub role: Role,
}

/// Alias kept for the phone-lookup response.
pub type RecipientInfo = TransferDestination;

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(rename = "proprietaire", skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryPage {
    pub transactions: Vec<HistoryEntry>,
    pub pagination: Pagination,
}

/// Aggregates over validated, non-reversed transactions.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsView {
    #[serde(rename = "totalTransactions")]
    pub total_transactions: u64,
    #[serde(rename = "totalDepots")]
    pub deposits: u64,
    #[serde(rename = "totalRetraits")]
    pub withdrawals: u64,
    #[serde(rename = "totalTransferts")]
    pub transfers: u64,
    #[serde(rename = "totalCredits")]
    pub agent_credits: u64,
    #[serde(rename = "volumeTotal")]
    pub total_volume: i64,
    #[serde(rename = "fraisTotal")]
    pub total_fees: i64,
    #[serde(rename = "commissionsTotal")]
    pub total_commissions: i64,
}

impl From<LedgerStats> for StatsView {
    fn from(stats: LedgerStats) -> Self {
        Self {
            total_transactions: stats.total_transactions,
            deposits: stats.deposits,
            withdrawals: stats.withdrawals,
            transfers: stats.transfers,
            agent_credits: stats.agent_credits,
            total_volume: stats.total_volume,
            total_fees: stats.total_fees,
            total_commissions: stats.total_commissions,
        }
    }
}

impl Ledger {
    /// The caller's wallet balance.
    pub async fn balance_of(&self, caller: &AuthenticatedUser) -> Result<BalanceView, LedgerError> {
        let wallet = self
            .store()
            .wallet_of(&caller.email)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Compte introuvable".to_string()))?;
        Ok(BalanceView {
            account_number: wallet.number,
            balance: wallet.balance,
            bonus: wallet.bonus,
            lock: wallet.lock,
        })
    }

    /// Paginated history, newest first. `page` is 1-based.
    pub async fn history(
        &self,
        caller: &AuthenticatedUser,
        page: u64,
        limit: u64,
    ) -> Result<HistoryPage, LedgerError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let offset = page.saturating_sub(1).saturating_mul(limit);

        let (transactions, total) = if caller.role == Role::Agent {
            self.store().all_transactions(limit, offset).await?
        } else {
            self.store()
                .transactions_of(&caller.email, limit, offset)
                .await?
        };

        let entries = if caller.role == Role::Agent {
            self.attach_owners(transactions).await?
        } else {
            transactions
                .into_iter()
                .map(|transaction| HistoryEntry {
                    transaction,
                    owner: None,
                })
                .collect()
        };

        Ok(HistoryPage {
            transactions: entries,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages: total.div_ceil(limit),
            },
        })
    }

    /// One transaction. Non-agents only see transactions they acted in.
    pub async fn transaction_detail(
        &self,
        caller: &AuthenticatedUser,
        number: &str,
    ) -> Result<Transaction, LedgerError> {
        let tx = self
            .store()
            .transaction(number)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Transaction introuvable".to_string()))?;
        if caller.role != Role::Agent && !tx.actors.involves(&caller.email) {
            return Err(LedgerError::Permission(
                "Vous n'avez pas accès à cette transaction".to_string(),
            ));
        }
        Ok(tx)
    }

    /// Transactions the caller is allowed to reverse, newest first.
    pub async fn reversible(
        &self,
        caller: &AuthenticatedUser,
    ) -> Result<Vec<Transaction>, LedgerError> {
        match caller.role {
            Role::Agent => Ok(self.store().reversible(None).await?),
            Role::Distributor => {
                let all = self.store().reversible(Some(&caller.email)).await?;
                Ok(all
                    .into_iter()
                    .filter(|tx| {
                        tx.kind.is_cash_operation()
                            && tx.actors.distributor_email.as_deref()
                                == Some(caller.email.as_str())
                    })
                    .collect())
            }
            Role::Client => Err(LedgerError::Permission(
                "Vous n'êtes pas autorisé à annuler des transactions".to_string(),
            )),
        }
    }

    /// Network-wide aggregates. Agent only.
    pub async fn statistics(&self, caller: &AuthenticatedUser) -> Result<StatsView, LedgerError> {
        if caller.role != Role::Agent {
            return Err(LedgerError::Permission(
                "Seul un agent peut consulter les statistiques".to_string(),
            ));
        }
        let stats = self.store().statistics().await?;
        Ok(stats.into())
    }

    /// Resolve a recipient for a transfer by phone number. Only live client
    /// accounts are valid targets.
    pub async fn recipient_by_phone(
        &self,
        caller: &AuthenticatedUser,
        phone: &str,
    ) -> Result<RecipientInfo, LedgerError> {
        let wallet = self
            .store()
            .wallet_by_phone(phone)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound("Aucun compte associé à ce numéro de téléphone".to_string())
            })?;
        if wallet.owner_email == caller.email {
            return Err(LedgerError::SelfTransfer);
        }
        if wallet.role != Role::Client {
            return Err(LedgerError::Validation(
                "Le compte destinataire n'est pas un compte client".to_string(),
            ));
        }
        if !wallet.is_operational() || wallet.lock == LockState::Blocked {
            return Err(LedgerError::Validation(
                "Ce compte ne peut pas recevoir de transfert".to_string(),
            ));
        }
        Ok(TransferDestination::from_view(&wallet))
    }

    /// Resolve the owning party of each transaction, one store hit per
    /// distinct email in the page.
    async fn attach_owners(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<HistoryEntry>, LedgerError> {
        let mut owners: HashMap<String, Option<OwnerInfo>> = HashMap::new();
        let mut entries = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let email = owner_email(&transaction).map(str::to_string);
            let owner = match email {
                Some(email) => {
                    if !owners.contains_key(&email) {
                        let info = self.store().user_by_email(&email).await?.map(|u| OwnerInfo {
                            last_name: u.last_name,
                            first_name: u.first_name,
                            email: u.email,
                            role: u.role,
                        });
                        owners.insert(email.clone(), info);
                    }
                    owners[&email].clone()
                }
                None => None,
            };
            entries.push(HistoryEntry { transaction, owner });
        }
        Ok(entries)
    }
}

/// The party a transaction "belongs to" on the agent dashboard: the client
/// when one is involved, otherwise the credited distributor.
fn owner_email(tx: &Transaction) -> Option<&str> {
    tx.actors
        .client_email
        .as_deref()
        .or(tx.actors.distributor_email.as_deref())
        .or(tx.actors.agent_email.as_deref())
}
