//! One-shot reversal of validated transactions.
//!
//! A reversal applies the exact inverse wallet deltas and flips the
//! transaction's reversal record in the same atomic commit. Every path
//! re-checks that the side being debited can cover the inverse movement;
//! when it cannot, the reversal fails with no mutation.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::AuthenticatedUser;
use crate::models::Role;
use crate::store::{BatchRecord, LedgerBatch, StoreError, WalletUpdate};

use super::error::LedgerError;
use super::operations::{COMMIT_RETRIES, Ledger};
use super::transaction::{SYSTEM_ACCOUNT, Transaction, TransactionKind};

#[derive(Debug, Serialize, ToSchema)]
pub struct ReversalReceipt {
    #[serde(rename = "numeroTransaction")]
    pub number: String,
    #[serde(rename = "typeTransaction")]
    pub kind: TransactionKind,
    #[serde(rename = "montant")]
    pub amount: i64,
    #[serde(rename = "dateAnnulation")]
    pub reversed_at: chrono::DateTime<Utc>,
}

impl Ledger {
    /// Reverse a validated transaction. Agents may reverse anything;
    /// distributors only their own cash operations.
    pub async fn reverse(
        &self,
        caller: &AuthenticatedUser,
        number: &str,
        reason: Option<String>,
    ) -> Result<ReversalReceipt, LedgerError> {
        let reason =
            reason.unwrap_or_else(|| "Aucune raison spécifiée".to_string());

        for _ in 0..COMMIT_RETRIES {
            let tx = self
                .store()
                .transaction(number)
                .await?
                .ok_or_else(|| LedgerError::NotFound("Transaction introuvable".to_string()))?;
            if !tx.is_reversible() {
                return Err(LedgerError::AlreadyCancelled);
            }
            check_reversal_permission(caller, &tx)?;

            let updates = self.inverse_updates(&tx).await?;
            let reversed_at = Utc::now();
            let batch = LedgerBatch {
                updates,
                record: BatchRecord::Reversal {
                    number: tx.number.clone(),
                    reversed_at,
                    reversed_by: caller.email.clone(),
                    reason: reason.clone(),
                },
            };
            match self.store().commit(batch).await {
                Ok(()) => {
                    info!(
                        numero = %tx.number,
                        type_transaction = ?tx.kind,
                        par = %caller.email,
                        "transaction annulée"
                    );
                    return Ok(ReversalReceipt {
                        number: tx.number,
                        kind: tx.kind,
                        amount: tx.amount,
                        reversed_at,
                    });
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(StoreError::AlreadyReversed(_)) => return Err(LedgerError::AlreadyCancelled),
                Err(err) => return Err(err.into()),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// Inverse wallet deltas for one transaction, with the debited side
    /// checked for sufficiency up front so the failure carries a business
    /// message instead of a raw store error.
    async fn inverse_updates(&self, tx: &Transaction) -> Result<Vec<WalletUpdate>, LedgerError> {
        let mut updates = Vec::with_capacity(2);
        match tx.kind {
            TransactionKind::Deposit => {
                // Take the amount back from the client, return it to the
                // distributor and claw back the commission.
                let client = self.wallet_for_reversal(&tx.destination_account).await?;
                let distributor = self.wallet_for_reversal(&tx.source_account).await?;
                if client.balance < tx.amount {
                    return Err(insufficient(&client.number));
                }
                if distributor.bonus < tx.bonus {
                    return Err(LedgerError::InsufficientFunds(
                        "Annulation impossible: bonus distributeur insuffisant".to_string(),
                    ));
                }
                updates.push(WalletUpdate {
                    number: client.number,
                    expected_version: client.version,
                    balance_delta: -tx.amount,
                    bonus_delta: 0,
                });
                updates.push(WalletUpdate {
                    number: distributor.number,
                    expected_version: distributor.version,
                    balance_delta: tx.amount,
                    bonus_delta: -tx.bonus,
                });
            }
            TransactionKind::Withdrawal => {
                let client = self.wallet_for_reversal(&tx.source_account).await?;
                let distributor = self.wallet_for_reversal(&tx.destination_account).await?;
                if distributor.balance < tx.amount {
                    return Err(insufficient(&distributor.number));
                }
                if distributor.bonus < tx.bonus {
                    return Err(LedgerError::InsufficientFunds(
                        "Annulation impossible: bonus distributeur insuffisant".to_string(),
                    ));
                }
                updates.push(WalletUpdate {
                    number: distributor.number,
                    expected_version: distributor.version,
                    balance_delta: -tx.amount,
                    bonus_delta: -tx.bonus,
                });
                updates.push(WalletUpdate {
                    number: client.number,
                    expected_version: client.version,
                    balance_delta: tx.amount,
                    bonus_delta: 0,
                });
            }
            TransactionKind::Transfer => {
                // The sender gets amount plus fee back; the recipient gives
                // up the amount.
                let sender = self.wallet_for_reversal(&tx.source_account).await?;
                let recipient = self.wallet_for_reversal(&tx.destination_account).await?;
                if recipient.balance < tx.amount {
                    return Err(insufficient(&recipient.number));
                }
                updates.push(WalletUpdate {
                    number: recipient.number,
                    expected_version: recipient.version,
                    balance_delta: -tx.amount,
                    bonus_delta: 0,
                });
                updates.push(WalletUpdate {
                    number: sender.number,
                    expected_version: sender.version,
                    balance_delta: tx.total_amount,
                    bonus_delta: 0,
                });
            }
            TransactionKind::AgentCredit => {
                // The system side has no wallet; only the distributor moves.
                debug_assert_eq!(tx.source_account, SYSTEM_ACCOUNT);
                let distributor = self.wallet_for_reversal(&tx.destination_account).await?;
                if distributor.balance < tx.amount {
                    return Err(insufficient(&distributor.number));
                }
                updates.push(WalletUpdate {
                    number: distributor.number,
                    expected_version: distributor.version,
                    balance_delta: -tx.amount,
                    bonus_delta: 0,
                });
            }
        }
        Ok(updates)
    }

    /// Reversals bypass the lock and archive guards: they are back-office
    /// corrections, not new business.
    async fn wallet_for_reversal(
        &self,
        account: &str,
    ) -> Result<crate::models::WalletView, LedgerError> {
        self.store()
            .wallet_by_number(account)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Compte {} introuvable", account)))
    }
}

fn check_reversal_permission(
    caller: &AuthenticatedUser,
    tx: &Transaction,
) -> Result<(), LedgerError> {
    if caller.role == Role::Agent {
        return Ok(());
    }
    // Non-agents only ever see their own log; a transaction they did not
    // act in does not exist for them.
    if !tx.actors.involves(&caller.email) {
        return Err(LedgerError::NotFound(
            "Transaction introuvable".to_string(),
        ));
    }
    match caller.role {
        Role::Distributor
            if tx.kind.is_cash_operation()
                && tx.actors.distributor_email.as_deref() == Some(caller.email.as_str()) =>
        {
            Ok(())
        }
        Role::Distributor => Err(LedgerError::Permission(
            "Vous ne pouvez annuler que vos propres dépôts et retraits".to_string(),
        )),
        _ => Err(LedgerError::Permission(
            "Vous n'êtes pas autorisé à annuler des transactions".to_string(),
        )),
    }
}

fn insufficient(account: &str) -> LedgerError {
    LedgerError::InsufficientFunds(format!(
        "Annulation impossible: solde insuffisant sur le compte {}",
        account
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testutil::Fixture;
    use crate::store::LedgerStore;

    #[tokio::test]
    async fn deposit_reversal_restores_all_three_balances() {
        let fx = Fixture::new();
        let (dis, dis_acct) = fx.user(Role::Distributor, "d@x.sn", 1_000_000).await;
        let (_, cli_acct) = fx.user(Role::Client, "c@x.sn", 150_000).await;

        let receipt = fx.ledger.deposit(&dis, &cli_acct, 50_000).await.unwrap();
        fx.ledger
            .reverse(&dis, &receipt.transaction.number, Some("Erreur de saisie".into()))
            .await
            .unwrap();

        let dis_view = fx.store.wallet_by_number(&dis_acct).await.unwrap().unwrap();
        assert_eq!(dis_view.balance, 1_000_000);
        assert_eq!(dis_view.bonus, 0);
        let cli_view = fx.store.wallet_by_number(&cli_acct).await.unwrap().unwrap();
        assert_eq!(cli_view.balance, 150_000);

        let stored = fx
            .store
            .transaction(&receipt.transaction.number)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.reversal.reversed);
        assert_eq!(stored.reversal.reversed_by.as_deref(), Some("d@x.sn"));
        assert_eq!(stored.reversal.reason.as_deref(), Some("Erreur de saisie"));
    }

    #[tokio::test]
    async fn transfer_reversal_refunds_amount_and_fee() {
        let fx = Fixture::new();
        let (agent, _) = fx.user(Role::Agent, "ag@x.sn", 0).await;
        let (sender, sender_acct) = fx.user(Role::Client, "c1@x.sn", 150_000).await;
        let (_, dest_acct) = fx.user(Role::Client, "c2@x.sn", 85_000).await;

        let receipt = fx.ledger.transfer(&sender, &dest_acct, 25_000).await.unwrap();
        fx.ledger
            .reverse(&agent, &receipt.transaction.number, None)
            .await
            .unwrap();

        let sender_view = fx.store.wallet_by_number(&sender_acct).await.unwrap().unwrap();
        assert_eq!(sender_view.balance, 150_000);
        let dest_view = fx.store.wallet_by_number(&dest_acct).await.unwrap().unwrap();
        assert_eq!(dest_view.balance, 85_000);
    }

    #[tokio::test]
    async fn second_reversal_is_rejected() {
        let fx = Fixture::new();
        let (dis, _) = fx.user(Role::Distributor, "d@x.sn", 100_000).await;
        let (_, cli_acct) = fx.user(Role::Client, "c@x.sn", 0).await;

        let receipt = fx.ledger.deposit(&dis, &cli_acct, 10_000).await.unwrap();
        fx.ledger
            .reverse(&dis, &receipt.transaction.number, None)
            .await
            .unwrap();
        let err = fx
            .ledger
            .reverse(&dis, &receipt.transaction.number, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyCancelled));
    }

    #[tokio::test]
    async fn reversal_permission_matrix() {
        let fx = Fixture::new();
        let (agent, _) = fx.user(Role::Agent, "ag@x.sn", 0).await;
        let (dis1, _) = fx.user(Role::Distributor, "d1@x.sn", 100_000).await;
        let (dis2, _) = fx.user(Role::Distributor, "d2@x.sn", 100_000).await;
        let (sender, _) = fx.user(Role::Client, "c1@x.sn", 50_000).await;
        let (_, dest_acct) = fx.user(Role::Client, "c2@x.sn", 0).await;

        // A client is an actor in their own transfer but still may not
        // reverse it.
        let transfer = fx.ledger.transfer(&sender, &dest_acct, 1_000).await.unwrap();
        let err = fx
            .ledger
            .reverse(&sender, &transfer.transaction.number, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Permission(_)));

        // Transactions the caller never acted in do not exist for them.
        let err = fx
            .ledger
            .reverse(&dis1, &transfer.transaction.number, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        let (_, cli_acct) = fx.user(Role::Client, "c3@x.sn", 0).await;
        let deposit = fx.ledger.deposit(&dis1, &cli_acct, 5_000).await.unwrap();
        let err = fx
            .ledger
            .reverse(&dis2, &deposit.transaction.number, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        // A distributor acts in an agent credit but it is not a cash
        // operation, so the answer is a refusal rather than a 404.
        let credit = fx.ledger.agent_credit(&agent, dis1.id, 10_000).await.unwrap();
        let err = fx
            .ledger
            .reverse(&dis1, &credit.transaction.number, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Permission(_)));
    }

    #[tokio::test]
    async fn reversal_fails_without_mutation_when_funds_are_spent() {
        let fx = Fixture::new();
        let (agent, _) = fx.user(Role::Agent, "ag@x.sn", 0).await;
        let (dis, dis_acct) = fx.user(Role::Distributor, "d@x.sn", 100_000).await;
        let (_, cli_acct) = fx.user(Role::Client, "c@x.sn", 0).await;

        let deposit = fx.ledger.deposit(&dis, &cli_acct, 10_000).await.unwrap();
        // The client withdraws everything; the deposit can no longer be
        // taken back.
        fx.ledger.withdraw(&dis, &cli_acct, 10_000).await.unwrap();

        let err = fx
            .ledger
            .reverse(&agent, &deposit.transaction.number, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds(_)));

        // Untouched: the transaction is still validated, balances unchanged.
        let stored = fx
            .store
            .transaction(&deposit.transaction.number)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_reversible());
        let dis_view = fx.store.wallet_by_number(&dis_acct).await.unwrap().unwrap();
        assert_eq!(dis_view.balance, 100_000);
        assert_eq!(dis_view.bonus, 200);
    }

    #[tokio::test]
    async fn agent_credit_reversal_guards_the_distributor_balance() {
        let fx = Fixture::new();
        let (agent, _) = fx.user(Role::Agent, "ag@x.sn", 0).await;
        let (dis, dis_acct) = fx.user(Role::Distributor, "d@x.sn", 0).await;
        let (_, cli_acct) = fx.user(Role::Client, "c@x.sn", 0).await;

        let credit = fx.ledger.agent_credit(&agent, dis.id, 50_000).await.unwrap();
        // Part of the float is already handed out.
        fx.ledger.deposit(&dis, &cli_acct, 40_000).await.unwrap();

        let err = fx
            .ledger
            .reverse(&agent, &credit.transaction.number, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds(_)));
        let view = fx.store.wallet_by_number(&dis_acct).await.unwrap().unwrap();
        assert_eq!(view.balance, 10_000);
    }
}
