//! End-to-end back-office scenarios over the in-memory store: account
//! creation, cash operations, transfers, reversals and the read views.

use std::sync::Arc;

use minibank::auth::{AuthService, AuthenticatedUser, NewUser};
use minibank::ledger::{Ledger, LedgerError, TransactionKind};
use minibank::models::Role;
use minibank::store::{LedgerStore, MemoryStore};

struct World {
    store: Arc<MemoryStore>,
    ledger: Ledger,
    auth: AuthService,
}

impl World {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn LedgerStore> = store.clone();
        Self {
            ledger: Ledger::new(dyn_store.clone()),
            auth: AuthService::new(dyn_store, "test-secret".to_string(), 24),
            store,
        }
    }

    async fn create(&self, role: Role, email: &str, phone: &str) -> (AuthenticatedUser, String) {
        let (profile, wallet) = self
            .auth
            .create_user(NewUser {
                national_id: format!("CNI-{email}"),
                last_name: "Diallo".to_string(),
                first_name: "Fatou".to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                password: "passer123".to_string(),
                role,
            })
            .await
            .unwrap();
        (
            AuthenticatedUser {
                id: profile.id,
                email: profile.email,
                role,
                first_name: profile.first_name,
                last_name: profile.last_name,
            },
            wallet.number,
        )
    }

    async fn balance(&self, account: &str) -> (i64, i64) {
        let view = self.store.wallet_by_number(account).await.unwrap().unwrap();
        (view.balance, view.bonus)
    }
}

/// Network bootstrap: an agent creates the accounts and funds the
/// distributor float from the system account.
async fn bootstrap() -> (World, AuthenticatedUser, AuthenticatedUser, String, AuthenticatedUser, String) {
    let w = World::new();
    let (agent, _) = w.create(Role::Agent, "agent@x.sn", "770000001").await;
    let (dis, dis_acct) = w.create(Role::Distributor, "dis@x.sn", "770000002").await;
    let (cli, cli_acct) = w.create(Role::Client, "cli@x.sn", "770000003").await;
    w.ledger.agent_credit(&agent, dis.id, 1_000_000).await.unwrap();
    (w, agent, dis, dis_acct, cli, cli_acct)
}

#[tokio::test]
async fn deposit_then_reversal_restores_every_balance() {
    let (w, _, dis, dis_acct, _, cli_acct) = bootstrap().await;

    // Client starts with 150 000 via two deposits, then one more 50 000.
    w.ledger.deposit(&dis, &cli_acct, 150_000).await.unwrap();
    let receipt = w.ledger.deposit(&dis, &cli_acct, 50_000).await.unwrap();

    assert_eq!(receipt.new_client_balance, 200_000);
    assert_eq!(receipt.new_distributor_balance, 800_000);
    // 1% of 50 000 on top of 1% of 150 000.
    assert_eq!(receipt.new_distributor_bonus, 2_000);

    w.ledger
        .reverse(&dis, &receipt.transaction.number, Some("Erreur de montant".into()))
        .await
        .unwrap();

    assert_eq!(w.balance(&cli_acct).await, (150_000, 0));
    assert_eq!(w.balance(&dis_acct).await, (850_000, 1_500));
}

#[tokio::test]
async fn transfer_fee_and_agent_reversal() {
    let (w, agent, dis, _, sender, sender_acct) = bootstrap().await;
    let (_, dest_acct) = w.create(Role::Client, "cli2@x.sn", "770000004").await;

    w.ledger.deposit(&dis, &sender_acct, 150_000).await.unwrap();
    w.ledger.deposit(&dis, &dest_acct, 85_000).await.unwrap();

    let receipt = w.ledger.transfer(&sender, &dest_acct, 25_000).await.unwrap();
    assert_eq!(receipt.transaction.fee, 500);
    assert_eq!(receipt.transaction.total_amount, 25_500);
    assert_eq!(w.balance(&sender_acct).await.0, 124_500);
    assert_eq!(w.balance(&dest_acct).await.0, 110_000);

    // A distributor never acted in the transfer, so its number resolves
    // to nothing for them.
    let err = w
        .ledger
        .reverse(&dis, &receipt.transaction.number, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));

    w.ledger
        .reverse(&agent, &receipt.transaction.number, None)
        .await
        .unwrap();
    assert_eq!(w.balance(&sender_acct).await.0, 150_000);
    assert_eq!(w.balance(&dest_acct).await.0, 85_000);
}

#[tokio::test]
async fn cancellation_is_one_shot() {
    let (w, _, dis, dis_acct, _, cli_acct) = bootstrap().await;

    let receipt = w.ledger.deposit(&dis, &cli_acct, 10_000).await.unwrap();
    w.ledger
        .reverse(&dis, &receipt.transaction.number, None)
        .await
        .unwrap();
    let err = w
        .ledger
        .reverse(&dis, &receipt.transaction.number, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyCancelled));

    // Replay changed nothing.
    assert_eq!(w.balance(&cli_acct).await.0, 0);
    assert_eq!(w.balance(&dis_acct).await, (1_000_000, 0));
}

#[tokio::test]
async fn failed_operations_leave_no_trace() {
    let (w, _, dis, dis_acct, sender, sender_acct) = bootstrap().await;
    let (_, dest_acct) = w.create(Role::Client, "cli2@x.sn", "770000004").await;

    w.ledger.deposit(&dis, &sender_acct, 1_000).await.unwrap();

    // 2% fee pushes the debit past the balance.
    let err = w.ledger.transfer(&sender, &dest_acct, 1_000).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds(_)));

    assert_eq!(w.balance(&sender_acct).await.0, 1_000);
    assert_eq!(w.balance(&dest_acct).await.0, 0);
    let page = w.ledger.history(&sender, 1, 50).await.unwrap();
    assert_eq!(page.pagination.total, 1);

    // Withdrawing more than the client holds fails the same way.
    let err = w.ledger.withdraw(&dis, &sender_acct, 2_000).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds(_)));
    assert_eq!(w.balance(&dis_acct).await.0, 999_000);
}

#[tokio::test]
async fn history_and_statistics_stay_consistent() {
    let (w, agent, dis, _, cli, cli_acct) = bootstrap().await;

    w.ledger.deposit(&dis, &cli_acct, 50_000).await.unwrap();
    let wd = w.ledger.withdraw(&dis, &cli_acct, 20_000).await.unwrap();
    w.ledger.reverse(&dis, &wd.transaction.number, None).await.unwrap();

    let page = w.ledger.history(&cli, 1, 50).await.unwrap();
    assert_eq!(page.pagination.total, 2);
    let kinds: Vec<TransactionKind> = page
        .transactions
        .iter()
        .map(|e| e.transaction.kind)
        .collect();
    assert!(kinds.contains(&TransactionKind::Deposit));
    assert!(kinds.contains(&TransactionKind::Withdrawal));

    // Aggregates are an agent view only.
    let err = w.ledger.statistics(&cli).await.unwrap_err();
    assert!(matches!(err, LedgerError::Permission(_)));

    // The reversed withdrawal drops out; the float credit from
    // bootstrap counts in.
    let stats = w.ledger.statistics(&agent).await.unwrap();
    assert_eq!(stats.total_transactions, 2);
    assert_eq!(stats.deposits, 1);
    assert_eq!(stats.withdrawals, 0);
    assert_eq!(stats.agent_credits, 1);
    assert_eq!(stats.total_volume, 1_050_000);
    assert_eq!(stats.total_commissions, 500);
}

#[tokio::test]
async fn login_and_phone_lookup_flow() {
    let (w, _, dis, _, cli, _) = bootstrap().await;
    let (_, dest_acct) = w.create(Role::Client, "cli2@x.sn", "770000004").await;

    let (token, profile) = w.auth.login("cli@x.sn", "passer123").await.unwrap();
    assert_eq!(profile.role, Role::Client);
    let claims = w.auth.verify_token(&token).unwrap();
    assert_eq!(claims.sub, "cli@x.sn");

    let info = w.ledger.recipient_by_phone(&cli, "770000004").await.unwrap();
    assert_eq!(info.account_number, dest_acct);

    // A distributor phone is not a valid transfer target.
    let err = w
        .ledger
        .recipient_by_phone(&cli, "770000002")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    let _ = dis;
}

#[tokio::test]
async fn archived_users_lose_access_but_keep_history() {
    let (w, agent, dis, _, cli, cli_acct) = bootstrap().await;

    w.ledger.deposit(&dis, &cli_acct, 5_000).await.unwrap();
    w.store.set_archived(cli.id, true, &agent.email).await.unwrap();

    // Login refused, operations refused, but the transactions remain.
    assert!(w.auth.login("cli@x.sn", "passer123").await.is_err());
    let err = w.ledger.deposit(&dis, &cli_acct, 1_000).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let page = w.ledger.history(&agent, 1, 50).await.unwrap();
    assert!(
        page.transactions
            .iter()
            .any(|e| e.transaction.destination_account == cli_acct)
    );
}
