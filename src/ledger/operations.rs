//! Balance-mutating ledger operations.
//!
//! Each operation re-reads the involved wallets, validates the business
//! rules, then submits one [`LedgerBatch`]. A version conflict (or a
//! transaction-number collision) re-plans the whole operation from fresh
//! reads, up to [`COMMIT_RETRIES`] attempts.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::models::{LockState, Role, WalletView};
use crate::store::{BatchRecord, LedgerBatch, LedgerStore, StoreError, WalletUpdate};

use super::error::LedgerError;
use super::transaction::{MAX_AMOUNT, MIN_AGENT_CREDIT, MIN_TRANSFER_AMOUNT, Transaction};

pub(crate) const COMMIT_RETRIES: usize = 3;

/// The ledger service. Cheap to clone; all state lives in the store.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
}

/// Receipt for a cash-in or cash-out.
#[derive(Debug, Serialize, ToSchema)]
pub struct CashReceipt {
    pub transaction: Transaction,
    #[serde(rename = "nouveauSoldeClient")]
    pub new_client_balance: i64,
    #[serde(rename = "nouveauSoldeDistributeur")]
    pub new_distributor_balance: i64,
    #[serde(rename = "nouveauBonusDistributeur")]
    pub new_distributor_bonus: i64,
}

/// Recipient of a transfer, also returned by the phone lookup.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferDestination {
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    #[serde(rename = "numeroCompte")]
    pub account_number: String,
    #[serde(rename = "telephone")]
    pub phone: String,
}

impl TransferDestination {
    pub(crate) fn from_view(view: &WalletView) -> Self {
        Self {
            last_name: view.owner_last_name.clone(),
            first_name: view.owner_first_name.clone(),
            account_number: view.number.clone(),
            phone: view.owner_phone.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferReceipt {
    pub transaction: Transaction,
    #[serde(rename = "nouveauSoldeExpediteur")]
    pub new_sender_balance: i64,
    #[serde(rename = "destinataire")]
    pub recipient: TransferDestination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreditReceipt {
    pub transaction: Transaction,
    #[serde(rename = "nouveauSolde")]
    pub new_balance: i64,
    #[serde(rename = "beneficiaire")]
    pub beneficiary: String,
    #[serde(rename = "numeroCompte")]
    pub account_number: String,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Cash-in: the calling distributor funds a client wallet and earns a
    /// 1% commission on their bonus balance.
    pub async fn deposit(
        &self,
        caller: &AuthenticatedUser,
        client_account: &str,
        amount: i64,
    ) -> Result<CashReceipt, LedgerError> {
        require_role(caller, Role::Distributor)?;
        require_positive(amount)?;

        for _ in 0..COMMIT_RETRIES {
            let distributor = self.operational_wallet_of(&caller.email).await?;
            let client = self.client_wallet(client_account).await?;

            if distributor.balance < amount {
                return Err(LedgerError::InsufficientFunds(
                    "Solde distributeur insuffisant".to_string(),
                ));
            }

            let tx = Transaction::deposit(
                amount,
                &distributor.number,
                &client.number,
                &caller.email,
                &client.owner_email,
            );
            let commission = tx.bonus;
            let batch = LedgerBatch {
                updates: vec![
                    WalletUpdate {
                        number: distributor.number.clone(),
                        expected_version: distributor.version,
                        balance_delta: -amount,
                        bonus_delta: commission,
                    },
                    WalletUpdate {
                        number: client.number.clone(),
                        expected_version: client.version,
                        balance_delta: amount,
                        bonus_delta: 0,
                    },
                ],
                record: BatchRecord::Insert(tx.clone()),
            };
            match self.store.commit(batch).await {
                Ok(()) => {
                    info!(
                        numero = %tx.number,
                        montant = amount,
                        distributeur = %caller.email,
                        "depot effectue"
                    );
                    return Ok(CashReceipt {
                        new_client_balance: client.balance + amount,
                        new_distributor_balance: distributor.balance - amount,
                        new_distributor_bonus: distributor.bonus + commission,
                        transaction: tx,
                    });
                }
                Err(err) if is_retryable(&err) => {
                    warn!(numero = %tx.number, "commit en conflit, nouvelle tentative");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// Cash-out: the calling distributor takes funds out of a client wallet
    /// against cash, with the same 1% commission.
    pub async fn withdraw(
        &self,
        caller: &AuthenticatedUser,
        client_account: &str,
        amount: i64,
    ) -> Result<CashReceipt, LedgerError> {
        require_role(caller, Role::Distributor)?;
        require_positive(amount)?;

        for _ in 0..COMMIT_RETRIES {
            let distributor = self.operational_wallet_of(&caller.email).await?;
            let client = self.client_wallet(client_account).await?;

            if client.balance < amount {
                return Err(LedgerError::InsufficientFunds(
                    "Solde client insuffisant".to_string(),
                ));
            }

            let tx = Transaction::withdrawal(
                amount,
                &client.number,
                &distributor.number,
                &caller.email,
                &client.owner_email,
            );
            let commission = tx.bonus;
            let batch = LedgerBatch {
                updates: vec![
                    WalletUpdate {
                        number: client.number.clone(),
                        expected_version: client.version,
                        balance_delta: -amount,
                        bonus_delta: 0,
                    },
                    WalletUpdate {
                        number: distributor.number.clone(),
                        expected_version: distributor.version,
                        balance_delta: amount,
                        bonus_delta: commission,
                    },
                ],
                record: BatchRecord::Insert(tx.clone()),
            };
            match self.store.commit(batch).await {
                Ok(()) => {
                    info!(
                        numero = %tx.number,
                        montant = amount,
                        distributeur = %caller.email,
                        "retrait effectue"
                    );
                    return Ok(CashReceipt {
                        new_client_balance: client.balance - amount,
                        new_distributor_balance: distributor.balance + amount,
                        new_distributor_bonus: distributor.bonus + commission,
                        transaction: tx,
                    });
                }
                Err(err) if is_retryable(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// Client-to-client transfer. The sender pays the amount plus a 2% fee;
    /// the recipient receives the amount.
    pub async fn transfer(
        &self,
        caller: &AuthenticatedUser,
        destination_account: &str,
        amount: i64,
    ) -> Result<TransferReceipt, LedgerError> {
        require_role(caller, Role::Client)?;
        require_positive(amount)?;
        if amount < MIN_TRANSFER_AMOUNT {
            return Err(LedgerError::Validation(format!(
                "Le montant minimum de transfert est de {} FCFA",
                MIN_TRANSFER_AMOUNT
            )));
        }

        for _ in 0..COMMIT_RETRIES {
            let sender = self.operational_wallet_of(&caller.email).await?;
            if sender.number == destination_account {
                return Err(LedgerError::SelfTransfer);
            }
            let recipient = self
                .store
                .wallet_by_number(destination_account)
                .await?
                .ok_or_else(|| {
                    LedgerError::NotFound("Compte destinataire introuvable".to_string())
                })?;
            if recipient.role != Role::Client {
                return Err(LedgerError::Validation(
                    "Le compte destinataire n'est pas un compte client".to_string(),
                ));
            }
            require_operational(&recipient, "Compte destinataire")?;

            let tx = Transaction::transfer(
                amount,
                &sender.number,
                &recipient.number,
                &caller.email,
                &recipient.owner_display_name(),
            );
            let debit = tx.total_amount;
            if sender.balance < debit {
                return Err(LedgerError::InsufficientFunds(
                    "Solde insuffisant pour couvrir le montant et les frais".to_string(),
                ));
            }

            let batch = LedgerBatch {
                updates: vec![
                    WalletUpdate {
                        number: sender.number.clone(),
                        expected_version: sender.version,
                        balance_delta: -debit,
                        bonus_delta: 0,
                    },
                    WalletUpdate {
                        number: recipient.number.clone(),
                        expected_version: recipient.version,
                        balance_delta: amount,
                        bonus_delta: 0,
                    },
                ],
                record: BatchRecord::Insert(tx.clone()),
            };
            match self.store.commit(batch).await {
                Ok(()) => {
                    info!(
                        numero = %tx.number,
                        montant = amount,
                        frais = tx.fee,
                        expediteur = %caller.email,
                        "transfert effectue"
                    );
                    return Ok(TransferReceipt {
                        new_sender_balance: sender.balance - debit,
                        recipient: TransferDestination::from_view(&recipient),
                        transaction: tx,
                    });
                }
                Err(err) if is_retryable(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// Agent float credit: money enters the network from the system account
    /// into a distributor wallet.
    pub async fn agent_credit(
        &self,
        caller: &AuthenticatedUser,
        distributor_id: Uuid,
        amount: i64,
    ) -> Result<CreditReceipt, LedgerError> {
        require_role(caller, Role::Agent)?;
        require_positive(amount)?;
        if amount < MIN_AGENT_CREDIT {
            return Err(LedgerError::Validation(format!(
                "Le montant minimum est de {} FCFA",
                MIN_AGENT_CREDIT
            )));
        }

        let target = self
            .store
            .user_by_id(distributor_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Distributeur introuvable".to_string()))?;
        if target.role != Role::Distributor {
            return Err(LedgerError::Validation(
                "Seul un compte distributeur peut être crédité".to_string(),
            ));
        }

        for _ in 0..COMMIT_RETRIES {
            let wallet = self
                .store
                .wallet_of(&target.email)
                .await?
                .ok_or_else(|| LedgerError::NotFound("Compte distributeur introuvable".to_string()))?;
            require_operational(&wallet, "Compte distributeur")?;

            let tx = Transaction::agent_credit(
                amount,
                &wallet.number,
                &caller.email,
                &caller.display_name(),
                &target.email,
            );
            let batch = LedgerBatch {
                updates: vec![WalletUpdate {
                    number: wallet.number.clone(),
                    expected_version: wallet.version,
                    balance_delta: amount,
                    bonus_delta: 0,
                }],
                record: BatchRecord::Insert(tx.clone()),
            };
            match self.store.commit(batch).await {
                Ok(()) => {
                    info!(
                        numero = %tx.number,
                        montant = amount,
                        agent = %caller.email,
                        distributeur = %target.email,
                        "credit agent effectue"
                    );
                    return Ok(CreditReceipt {
                        new_balance: wallet.balance + amount,
                        beneficiary: target.display_name(),
                        account_number: wallet.number.clone(),
                        transaction: tx,
                    });
                }
                Err(err) if is_retryable(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// The caller's own wallet, required live and unlocked.
    pub(crate) async fn operational_wallet_of(
        &self,
        email: &str,
    ) -> Result<WalletView, LedgerError> {
        let wallet = self
            .store
            .wallet_of(email)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Compte introuvable".to_string()))?;
        require_operational(&wallet, "Votre compte")?;
        Ok(wallet)
    }

    async fn client_wallet(&self, account: &str) -> Result<WalletView, LedgerError> {
        let wallet = self
            .store
            .wallet_by_number(account)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Compte client introuvable".to_string()))?;
        if wallet.role != Role::Client {
            return Err(LedgerError::Validation(
                "Le compte indiqué n'est pas un compte client".to_string(),
            ));
        }
        require_operational(&wallet, "Compte client")?;
        Ok(wallet)
    }
}

fn require_role(caller: &AuthenticatedUser, role: Role) -> Result<(), LedgerError> {
    if caller.role != role {
        let label = match role {
            Role::Client => "un client",
            Role::Distributor => "un distributeur",
            Role::Agent => "un agent",
        };
        return Err(LedgerError::Permission(format!(
            "Seul {} peut effectuer cette opération",
            label
        )));
    }
    Ok(())
}

fn require_positive(amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::Validation(
            "Le montant doit être positif".to_string(),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::Validation(format!(
            "Le montant dépasse le plafond de {} FCFA",
            MAX_AMOUNT
        )));
    }
    Ok(())
}

pub(crate) fn require_operational(view: &WalletView, label: &str) -> Result<(), LedgerError> {
    if !view.is_operational() {
        return Err(LedgerError::Validation(format!(
            "{} est désactivé ou archivé",
            label
        )));
    }
    if view.lock == LockState::Blocked {
        return Err(LedgerError::AccountLocked(format!("{} est bloqué", label)));
    }
    Ok(())
}

fn is_retryable(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::Conflict(_) | StoreError::DuplicateTransaction(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionKind;
    use crate::ledger::testutil::Fixture;

    #[tokio::test]
    async fn deposit_moves_funds_and_pays_commission() {
        let fx = Fixture::new();
        let (dis, dis_acct) = fx.user(Role::Distributor, "d@x.sn", 1_000_000).await;
        let (_, cli_acct) = fx.user(Role::Client, "c@x.sn", 150_000).await;

        let receipt = fx.ledger.deposit(&dis, &cli_acct, 50_000).await.unwrap();
        assert_eq!(receipt.new_client_balance, 200_000);
        assert_eq!(receipt.new_distributor_balance, 950_000);
        assert_eq!(receipt.new_distributor_bonus, 500);
        assert_eq!(receipt.transaction.kind, TransactionKind::Deposit);

        let dis_view = fx.store.wallet_by_number(&dis_acct).await.unwrap().unwrap();
        assert_eq!(dis_view.balance, 950_000);
        assert_eq!(dis_view.bonus, 500);
    }

    #[tokio::test]
    async fn withdraw_requires_client_funds() {
        let fx = Fixture::new();
        let (dis, _) = fx.user(Role::Distributor, "d@x.sn", 100_000).await;
        let (_, cli_acct) = fx.user(Role::Client, "c@x.sn", 1_000).await;

        let err = fx.ledger.withdraw(&dis, &cli_acct, 5_000).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds(_)));

        // Nothing moved.
        let cli = fx.store.wallet_by_number(&cli_acct).await.unwrap().unwrap();
        assert_eq!(cli.balance, 1_000);

        let receipt = fx.ledger.withdraw(&dis, &cli_acct, 1_000).await.unwrap();
        assert_eq!(receipt.new_client_balance, 0);
        assert_eq!(receipt.new_distributor_bonus, 10);
    }

    #[tokio::test]
    async fn transfer_charges_sender_the_fee() {
        let fx = Fixture::new();
        let (sender, _) = fx.user(Role::Client, "c1@x.sn", 150_000).await;
        let (_, dest) = fx.user(Role::Client, "c2@x.sn", 85_000).await;

        let receipt = fx.ledger.transfer(&sender, &dest, 25_000).await.unwrap();
        assert_eq!(receipt.transaction.fee, 500);
        assert_eq!(receipt.new_sender_balance, 124_500);
        let dest_view = fx.store.wallet_by_number(&dest).await.unwrap().unwrap();
        assert_eq!(dest_view.balance, 110_000);
    }

    #[tokio::test]
    async fn transfer_rejects_self_minimum_and_non_clients() {
        let fx = Fixture::new();
        let (sender, own) = fx.user(Role::Client, "c1@x.sn", 10_000).await;
        let (_, dis_acct) = fx.user(Role::Distributor, "d@x.sn", 0).await;

        assert!(matches!(
            fx.ledger.transfer(&sender, &own, 500).await.unwrap_err(),
            LedgerError::SelfTransfer
        ));
        assert!(matches!(
            fx.ledger.transfer(&sender, &dis_acct, 99).await.unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(matches!(
            fx.ledger.transfer(&sender, &dis_acct, 500).await.unwrap_err(),
            LedgerError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn blocked_wallet_refuses_operations() {
        let fx = Fixture::new();
        let (dis, _) = fx.user(Role::Distributor, "d@x.sn", 100_000).await;
        let (cli, cli_acct) = fx.user(Role::Client, "c@x.sn", 50_000).await;

        fx.store
            .set_wallet_lock(cli.id, LockState::Blocked)
            .await
            .unwrap();
        let err = fx.ledger.deposit(&dis, &cli_acct, 1_000).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountLocked(_)));
    }

    #[tokio::test]
    async fn agent_credit_targets_distributors_only() {
        let fx = Fixture::new();
        let (agent, _) = fx.user(Role::Agent, "ag@x.sn", 0).await;
        let (dis, dis_acct) = fx.user(Role::Distributor, "d@x.sn", 0).await;
        let (cli, _) = fx.user(Role::Client, "c@x.sn", 0).await;

        let receipt = fx.ledger.agent_credit(&agent, dis.id, 500_000).await.unwrap();
        assert_eq!(receipt.new_balance, 500_000);
        assert_eq!(receipt.transaction.source_account, super::super::SYSTEM_ACCOUNT);
        let view = fx.store.wallet_by_number(&dis_acct).await.unwrap().unwrap();
        assert_eq!(view.balance, 500_000);

        assert!(matches!(
            fx.ledger.agent_credit(&agent, cli.id, 500).await.unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(matches!(
            fx.ledger.agent_credit(&agent, dis.id, 50).await.unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(matches!(
            fx.ledger.agent_credit(&dis, dis.id, 500).await.unwrap_err(),
            LedgerError::Permission(_)
        ));
    }

    #[tokio::test]
    async fn oversized_amounts_are_rejected_before_any_arithmetic() {
        let fx = Fixture::new();
        let (agent, _) = fx.user(Role::Agent, "ag@x.sn", 0).await;
        let (dis, _) = fx.user(Role::Distributor, "d@x.sn", 100_000).await;
        let (sender, _) = fx.user(Role::Client, "c1@x.sn", 10_000).await;
        let (_, dest) = fx.user(Role::Client, "c2@x.sn", 0).await;

        assert!(matches!(
            fx.ledger.transfer(&sender, &dest, i64::MAX).await.unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(matches!(
            fx.ledger.deposit(&dis, &dest, i64::MAX).await.unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(matches!(
            fx.ledger.withdraw(&dis, &dest, MAX_AMOUNT + 1).await.unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(matches!(
            fx.ledger.agent_credit(&agent, dis.id, i64::MAX).await.unwrap_err(),
            LedgerError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn role_guards_reject_wrong_callers() {
        let fx = Fixture::new();
        let (cli, cli_acct) = fx.user(Role::Client, "c@x.sn", 10_000).await;
        let err = fx.ledger.deposit(&cli, &cli_acct, 1_000).await.unwrap_err();
        assert!(matches!(err, LedgerError::Permission(_)));
    }
}
