use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::gateway::{
    response::{ApiResponse, error_codes},
    state::AppState,
};

/// Bearer-token middleware. Verifies the JWT, re-checks the account is
/// still live and injects an [`AuthenticatedUser`](super::AuthenticatedUser)
/// into the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<()>>)> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::MISSING_AUTH,
                "Token d'authentification manquant",
            )),
        ))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or((
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(
            error_codes::AUTH_FAILED,
            "Format de token invalide",
        )),
    ))?;

    let claims = state.auth.verify_token(token).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Token invalide ou expiré",
            )),
        )
    })?;

    let caller = state.auth.resolve(&claims).await.map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Compte désactivé ou introuvable",
            )),
        )
    })?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
