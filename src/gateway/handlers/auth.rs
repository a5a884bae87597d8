//! Login and profile endpoints.

use std::sync::Arc;

use axum::{Extension, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::ledger::LedgerError;

use super::super::response::{ApiError, ApiResult, ok};
use super::super::state::AppState;
use super::users::UserView;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Email invalide"))]
    #[schema(example = "agent@minibank.sn")]
    pub email: String,
    #[serde(rename = "motDePasse")]
    #[validate(length(min = 1, message = "Mot de passe requis"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "utilisateur")]
    pub user: UserView,
}

/// Authenticate and receive a JWT.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Connexion réussie", body = LoginResponse),
        (status = 401, description = "Identifiants invalides")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    axum::Json(req): axum::Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let (token, user) = state.auth.login(&req.email, &req.password).await?;
    let wallet = state
        .store
        .wallet_of(&user.email)
        .await
        .map_err(LedgerError::from)?
        .ok_or_else(|| ApiError::from(LedgerError::NotFound("Compte introuvable".to_string())))?;

    tracing::info!(email = %user.email, role = %user.role, "connexion");
    ok(LoginResponse {
        token,
        user: UserView::from_user(&user, &wallet),
    })
}

/// The connected user's profile and wallet.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Profil", body = UserView),
        (status = 401, description = "Non authentifié")
    ),
    security(("bearer_jwt" = [])),
    tag = "Auth"
)]
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<UserView> {
    let user = state
        .store
        .user_by_id(caller.id)
        .await
        .map_err(LedgerError::from)?
        .ok_or_else(|| {
            ApiError::from(LedgerError::NotFound("Utilisateur introuvable".to_string()))
        })?;
    let wallet = state
        .store
        .wallet_of(&user.email)
        .await
        .map_err(LedgerError::from)?
        .ok_or_else(|| ApiError::from(LedgerError::NotFound("Compte introuvable".to_string())))?;
    ok(UserView::from_user(&user, &wallet))
}
