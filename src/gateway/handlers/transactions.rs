//! Transaction endpoints: cash-in/out, transfers, reversal, history and
//! statistics.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::ledger::history::{BalanceView, HistoryPage, RecipientInfo, StatsView};
use crate::ledger::history::DEFAULT_PAGE_LIMIT;
use crate::ledger::{CashReceipt, ReversalReceipt, Transaction, TransferReceipt};

use super::super::response::{ApiError, ApiResult, ok};
use super::super::state::AppState;

/// Body of a deposit or withdrawal.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CashRequest {
    #[serde(rename = "numeroCompteClient")]
    #[validate(length(min = 1, message = "Numéro de compte client requis"))]
    pub client_account: String,
    #[serde(rename = "montant")]
    pub amount: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Destination account number; alternative to the phone number.
    #[serde(rename = "numeroCompteDestination")]
    pub destination_account: Option<String>,
    #[serde(rename = "telephoneDestinataire")]
    pub destination_phone: Option<String>,
    #[serde(rename = "montant")]
    pub amount: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelRequest {
    #[serde(rename = "raison")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// 1-based page, default 1
    pub page: Option<u64>,
    /// Page size, default 50
    pub limit: Option<u64>,
}

/// Cash-in performed by a distributor on a client account.
#[utoipa::path(
    post,
    path = "/api/transactions/depot",
    request_body = CashRequest,
    responses(
        (status = 200, description = "Dépôt effectué", body = CashReceipt),
        (status = 400, description = "Montant ou compte invalide"),
        (status = 403, description = "Réservé aux distributeurs")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    axum::Json(req): axum::Json<CashRequest>,
) -> ApiResult<CashReceipt> {
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let receipt = state
        .ledger
        .deposit(&caller, &req.client_account, req.amount)
        .await?;
    ok(receipt)
}

/// Cash-out performed by a distributor on a client account.
#[utoipa::path(
    post,
    path = "/api/transactions/retrait",
    request_body = CashRequest,
    responses(
        (status = 200, description = "Retrait effectué", body = CashReceipt),
        (status = 400, description = "Solde client insuffisant"),
        (status = 403, description = "Réservé aux distributeurs")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    axum::Json(req): axum::Json<CashRequest>,
) -> ApiResult<CashReceipt> {
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let receipt = state
        .ledger
        .withdraw(&caller, &req.client_account, req.amount)
        .await?;
    ok(receipt)
}

/// Client-to-client transfer, by account number or phone number.
#[utoipa::path(
    post,
    path = "/api/transactions/transfert",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfert effectué", body = TransferReceipt),
        (status = 400, description = "Montant, destinataire ou solde invalide"),
        (status = 404, description = "Destinataire introuvable")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    axum::Json(req): axum::Json<TransferRequest>,
) -> ApiResult<TransferReceipt> {
    let destination = match (&req.destination_account, &req.destination_phone) {
        (Some(account), _) => account.clone(),
        (None, Some(phone)) => {
            state
                .ledger
                .recipient_by_phone(&caller, phone)
                .await?
                .account_number
        }
        (None, None) => {
            return Err(ApiError::bad_request(
                "Numéro de compte ou téléphone du destinataire requis",
            ));
        }
    };
    let receipt = state
        .ledger
        .transfer(&caller, &destination, req.amount)
        .await?;
    ok(receipt)
}

/// Resolve a transfer recipient from a phone number.
#[utoipa::path(
    get,
    path = "/api/transactions/verifier-telephone/{telephone}",
    params(("telephone" = String, Path, description = "Numéro de téléphone")),
    responses(
        (status = 200, description = "Destinataire trouvé", body = RecipientInfo),
        (status = 404, description = "Aucun compte associé")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn verify_phone(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(phone): Path<String>,
) -> ApiResult<RecipientInfo> {
    let info = state.ledger.recipient_by_phone(&caller, &phone).await?;
    ok(info)
}

/// Reverse a validated transaction.
#[utoipa::path(
    post,
    path = "/api/transactions/annuler/{numero}",
    params(("numero" = String, Path, description = "Numéro de transaction")),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Transaction annulée", body = ReversalReceipt),
        (status = 400, description = "Déjà annulée ou fonds insuffisants"),
        (status = 403, description = "Annulation non autorisée"),
        (status = 404, description = "Transaction introuvable")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(number): Path<String>,
    body: Option<axum::Json<CancelRequest>>,
) -> ApiResult<ReversalReceipt> {
    let reason = body.and_then(|axum::Json(req)| req.reason);
    let receipt = state.ledger.reverse(&caller, &number, reason).await?;
    ok(receipt)
}

/// Paginated transaction history. Agents see the whole network.
#[utoipa::path(
    get,
    path = "/api/transactions/historique",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Historique", body = HistoryPage)
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn history(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<HistoryPage> {
    let page = state
        .ledger
        .history(
            &caller,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
        .await?;
    ok(page)
}

/// One transaction by number.
#[utoipa::path(
    get,
    path = "/api/transactions/transaction/{numero}",
    params(("numero" = String, Path, description = "Numéro de transaction")),
    responses(
        (status = 200, description = "Détail", body = Transaction),
        (status = 403, description = "Accès refusé"),
        (status = 404, description = "Transaction introuvable")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn detail(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(number): Path<String>,
) -> ApiResult<Transaction> {
    let tx = state.ledger.transaction_detail(&caller, &number).await?;
    ok(tx)
}

/// The caller's balance.
#[utoipa::path(
    get,
    path = "/api/transactions/solde",
    responses(
        (status = 200, description = "Solde", body = BalanceView)
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn balance(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<BalanceView> {
    let view = state.ledger.balance_of(&caller).await?;
    ok(view)
}

/// Network-wide statistics over validated, non-reversed transactions.
#[utoipa::path(
    get,
    path = "/api/transactions/statistiques",
    responses(
        (status = 200, description = "Statistiques", body = StatsView),
        (status = 403, description = "Réservé aux agents")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn statistics(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<StatsView> {
    let stats = state.ledger.statistics(&caller).await?;
    ok(stats)
}

/// Transactions the caller may still reverse.
#[utoipa::path(
    get,
    path = "/api/transactions/annulables",
    responses(
        (status = 200, description = "Transactions annulables", body = [Transaction]),
        (status = 403, description = "Réservé aux distributeurs et agents")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn reversible(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<Transaction>> {
    let transactions = state.ledger.reversible(&caller).await?;
    ok(transactions)
}
