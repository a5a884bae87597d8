use std::sync::Arc;

use crate::auth::AuthService;
use crate::ledger::Ledger;
use crate::store::LedgerStore;

/// Shared gateway state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub auth: Arc<AuthService>,
    pub store: Arc<dyn LedgerStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, auth: Arc<AuthService>) -> Self {
        Self {
            ledger: Ledger::new(store.clone()),
            auth,
            store,
        }
    }
}
