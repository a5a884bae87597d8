//! Shared fixture for the ledger unit tests.

use std::sync::Arc;

use crate::auth::{AuthService, AuthenticatedUser, NewUser};
use crate::models::Role;
use crate::store::{BatchRecord, LedgerBatch, LedgerStore, MemoryStore, WalletUpdate};

use super::operations::Ledger;
use super::transaction::Transaction;

/// Deterministic, collision-free phone number for a fixture user.
pub(crate) fn phone_for(email: &str) -> String {
    format!(
        "77{}",
        email.bytes().map(|b| format!("{b:03}")).collect::<String>()
    )
}

pub(crate) struct Fixture {
    pub store: Arc<MemoryStore>,
    pub ledger: Ledger,
    pub auth: AuthService,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn LedgerStore> = store.clone();
        Self {
            ledger: Ledger::new(dyn_store.clone()),
            auth: AuthService::new(dyn_store, "test-secret".to_string(), 24),
            store,
        }
    }

    /// Create a user and seed their wallet through a system credit.
    pub(crate) async fn user(
        &self,
        role: Role,
        email: &str,
        balance: i64,
    ) -> (AuthenticatedUser, String) {
        let (profile, wallet) = self
            .auth
            .create_user(NewUser {
                national_id: format!("CNI-{email}"),
                last_name: "Sarr".to_string(),
                first_name: "Ami".to_string(),
                email: email.to_string(),
                phone: phone_for(email),
                password: "passer123".to_string(),
                role,
            })
            .await
            .unwrap();
        if balance > 0 {
            self.store
                .commit(LedgerBatch {
                    updates: vec![WalletUpdate {
                        number: wallet.number.clone(),
                        expected_version: 1,
                        balance_delta: balance,
                        bonus_delta: 0,
                    }],
                    record: BatchRecord::Insert(Transaction::agent_credit(
                        balance,
                        &wallet.number,
                        "seed@x.sn",
                        "Seed",
                        email,
                    )),
                })
                .await
                .unwrap();
        }
        (
            AuthenticatedUser {
                id: profile.id,
                email: profile.email.clone(),
                role,
                first_name: profile.first_name.clone(),
                last_name: profile.last_name.clone(),
            },
            wallet.number,
        )
    }
}
