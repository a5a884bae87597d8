//! Account administration endpoints, restricted to agents.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthenticatedUser, NewUser};
use crate::ledger::{CreditReceipt, LedgerError};
use crate::models::{LockState, Role, UserProfile, Wallet, WalletView};

use super::super::response::{ApiError, ApiResult, ok};
use super::super::state::AppState;

/// User as shown to the dashboard. The password hash never leaves the
/// server.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserView {
    pub id: Uuid,
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    pub email: String,
    #[serde(rename = "telephone")]
    pub phone: String,
    #[serde(rename = "nci")]
    pub national_id: String,
    pub role: Role,
    #[serde(rename = "numeroCompte")]
    pub account_number: String,
    #[serde(rename = "solde")]
    pub balance: i64,
    #[serde(rename = "bonus")]
    pub bonus: i64,
    #[serde(rename = "statut")]
    pub lock: LockState,
    #[serde(rename = "estArchive")]
    pub archived: bool,
}

impl UserView {
    pub fn from_user(profile: &UserProfile, wallet: &WalletView) -> Self {
        Self {
            id: profile.id,
            last_name: profile.last_name.clone(),
            first_name: profile.first_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            national_id: profile.national_id.clone(),
            role: profile.role,
            account_number: wallet.number.clone(),
            balance: wallet.balance,
            bonus: wallet.bonus,
            lock: wallet.lock,
            archived: profile.archived,
        }
    }

    fn from_row(profile: &UserProfile, wallet: &Wallet) -> Self {
        Self {
            id: profile.id,
            last_name: profile.last_name.clone(),
            first_name: profile.first_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            national_id: profile.national_id.clone(),
            role: profile.role,
            account_number: wallet.number.clone(),
            balance: wallet.balance,
            bonus: wallet.bonus,
            lock: wallet.lock,
            archived: profile.archived,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[serde(rename = "nom")]
    #[validate(length(min = 2, message = "Nom trop court"))]
    pub last_name: String,
    #[serde(rename = "prenom")]
    #[validate(length(min = 2, message = "Prénom trop court"))]
    pub first_name: String,
    #[validate(email(message = "Email invalide"))]
    pub email: String,
    #[serde(rename = "telephone")]
    #[validate(length(min = 7, message = "Numéro de téléphone invalide"))]
    pub phone: String,
    #[serde(rename = "nci")]
    #[validate(length(min = 5, message = "Numéro de carte d'identité invalide"))]
    pub national_id: String,
    #[serde(rename = "motDePasse")]
    #[validate(length(min = 6, message = "Mot de passe trop court (6 caractères minimum)"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreditRequest {
    #[serde(rename = "montant")]
    pub amount: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusRequest {
    #[serde(rename = "statut")]
    pub lock: LockState,
}

fn require_agent(caller: &AuthenticatedUser) -> Result<(), ApiError> {
    if caller.role != Role::Agent {
        return Err(LedgerError::Permission(
            "Seul un agent peut administrer les comptes".to_string(),
        )
        .into());
    }
    Ok(())
}

async fn create_with_role(
    state: &AppState,
    caller: &AuthenticatedUser,
    req: CreateUserRequest,
    role: Role,
) -> ApiResult<UserView> {
    require_agent(caller)?;
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let (profile, wallet) = state
        .auth
        .create_user(NewUser {
            national_id: req.national_id,
            last_name: req.last_name,
            first_name: req.first_name,
            email: req.email,
            phone: req.phone,
            password: req.password,
            role,
        })
        .await
        .map_err(LedgerError::from)?;

    tracing::info!(
        email = %profile.email,
        role = %role,
        par = %caller.email,
        "compte créé"
    );
    ok(UserView::from_row(&profile, &wallet))
}

async fn list_with_role(
    state: &AppState,
    caller: &AuthenticatedUser,
    role: Role,
) -> ApiResult<Vec<UserView>> {
    require_agent(caller)?;
    let rows = state
        .store
        .list_users(role, false)
        .await
        .map_err(LedgerError::from)?;
    ok(rows
        .iter()
        .map(|(profile, wallet)| UserView::from_row(profile, wallet))
        .collect())
}

/// Create a client account.
#[utoipa::path(
    post,
    path = "/api/users/clients",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Client créé", body = UserView),
        (status = 400, description = "Champ invalide ou déjà utilisé"),
        (status = 403, description = "Réservé aux agents")
    ),
    security(("bearer_jwt" = [])),
    tag = "Utilisateurs"
)]
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    axum::Json(req): axum::Json<CreateUserRequest>,
) -> ApiResult<UserView> {
    create_with_role(&state, &caller, req, Role::Client).await
}

/// Create a distributor account.
#[utoipa::path(
    post,
    path = "/api/users/distributeurs",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Distributeur créé", body = UserView),
        (status = 400, description = "Champ invalide ou déjà utilisé"),
        (status = 403, description = "Réservé aux agents")
    ),
    security(("bearer_jwt" = [])),
    tag = "Utilisateurs"
)]
pub async fn create_distributor(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    axum::Json(req): axum::Json<CreateUserRequest>,
) -> ApiResult<UserView> {
    create_with_role(&state, &caller, req, Role::Distributor).await
}

/// List live client accounts.
#[utoipa::path(
    get,
    path = "/api/users/clients",
    responses(
        (status = 200, description = "Clients", body = [UserView]),
        (status = 403, description = "Réservé aux agents")
    ),
    security(("bearer_jwt" = [])),
    tag = "Utilisateurs"
)]
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<UserView>> {
    list_with_role(&state, &caller, Role::Client).await
}

/// List live distributor accounts.
#[utoipa::path(
    get,
    path = "/api/users/distributeurs",
    responses(
        (status = 200, description = "Distributeurs", body = [UserView]),
        (status = 403, description = "Réservé aux agents")
    ),
    security(("bearer_jwt" = [])),
    tag = "Utilisateurs"
)]
pub async fn list_distributors(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<UserView>> {
    list_with_role(&state, &caller, Role::Distributor).await
}

/// Credit a distributor's float from the system account.
#[utoipa::path(
    post,
    path = "/api/users/{id}/credit",
    params(("id" = Uuid, Path, description = "Identifiant du distributeur")),
    request_body = CreditRequest,
    responses(
        (status = 200, description = "Compte crédité", body = CreditReceipt),
        (status = 400, description = "Montant invalide"),
        (status = 403, description = "Réservé aux agents"),
        (status = 404, description = "Distributeur introuvable")
    ),
    security(("bearer_jwt" = [])),
    tag = "Utilisateurs"
)]
pub async fn credit(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    axum::Json(req): axum::Json<CreditRequest>,
) -> ApiResult<CreditReceipt> {
    let receipt = state.ledger.agent_credit(&caller, id, req.amount).await?;
    ok(receipt)
}

/// Block or unblock a wallet.
#[utoipa::path(
    patch,
    path = "/api/users/{id}/status",
    params(("id" = Uuid, Path, description = "Identifiant de l'utilisateur")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Statut mis à jour"),
        (status = 403, description = "Réservé aux agents"),
        (status = 404, description = "Utilisateur introuvable")
    ),
    security(("bearer_jwt" = [])),
    tag = "Utilisateurs"
)]
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    axum::Json(req): axum::Json<StatusRequest>,
) -> ApiResult<()> {
    require_agent(&caller)?;
    let target = lookup_target(&state, id).await?;
    state
        .store
        .set_wallet_lock(target.id, req.lock)
        .await
        .map_err(LedgerError::from)?;
    tracing::info!(
        email = %target.email,
        statut = ?req.lock,
        par = %caller.email,
        "statut de compte modifié"
    );
    ok(())
}

/// Archive a user. Archived accounts cannot log in or transact; their
/// transactions stay in the ledger.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "Identifiant de l'utilisateur")),
    responses(
        (status = 200, description = "Compte archivé"),
        (status = 403, description = "Réservé aux agents"),
        (status = 404, description = "Utilisateur introuvable")
    ),
    security(("bearer_jwt" = [])),
    tag = "Utilisateurs"
)]
pub async fn archive(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    require_agent(&caller)?;
    let target = lookup_target(&state, id).await?;
    if target.role == Role::Agent {
        return Err(ApiError::bad_request("Un compte agent ne peut pas être archivé"));
    }
    state
        .store
        .set_archived(target.id, true, &caller.email)
        .await
        .map_err(LedgerError::from)?;
    tracing::info!(email = %target.email, par = %caller.email, "compte archivé");
    ok(())
}

/// Restore an archived user.
#[utoipa::path(
    patch,
    path = "/api/users/{id}/restore",
    params(("id" = Uuid, Path, description = "Identifiant de l'utilisateur")),
    responses(
        (status = 200, description = "Compte restauré"),
        (status = 403, description = "Réservé aux agents"),
        (status = 404, description = "Utilisateur introuvable")
    ),
    security(("bearer_jwt" = [])),
    tag = "Utilisateurs"
)]
pub async fn restore(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    require_agent(&caller)?;
    let target = lookup_target(&state, id).await?;
    state
        .store
        .set_archived(target.id, false, &caller.email)
        .await
        .map_err(LedgerError::from)?;
    tracing::info!(email = %target.email, par = %caller.email, "compte restauré");
    ok(())
}

async fn lookup_target(state: &AppState, id: Uuid) -> Result<UserProfile, ApiError> {
    state
        .store
        .user_by_id(id)
        .await
        .map_err(LedgerError::from)?
        .ok_or_else(|| {
            ApiError::from(LedgerError::NotFound("Utilisateur introuvable".to_string()))
        })
}
