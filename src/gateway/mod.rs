//! HTTP surface: JSON over REST under `/api`, Bearer JWT on everything but
//! login and the health probe.

pub mod handlers;
pub mod openapi;
pub mod response;
pub mod state;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
};
use tokio::net::TcpListener;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use state::AppState;

/// Assemble the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/health", get(handlers::health::health_check));

    let transaction_routes = Router::new()
        .route("/depot", post(handlers::transactions::deposit))
        .route("/retrait", post(handlers::transactions::withdraw))
        .route("/transfert", post(handlers::transactions::transfer))
        .route(
            "/verifier-telephone/{telephone}",
            get(handlers::transactions::verify_phone),
        )
        .route("/annuler/{numero}", post(handlers::transactions::cancel))
        .route("/historique", get(handlers::transactions::history))
        .route(
            "/transaction/{numero}",
            get(handlers::transactions::detail),
        )
        .route("/solde", get(handlers::transactions::balance))
        .route("/statistiques", get(handlers::transactions::statistics))
        .route("/annulables", get(handlers::transactions::reversible));

    let user_routes = Router::new()
        .route(
            "/clients",
            get(handlers::users::list_clients).post(handlers::users::create_client),
        )
        .route(
            "/distributeurs",
            get(handlers::users::list_distributors).post(handlers::users::create_distributor),
        )
        .route("/{id}/credit", post(handlers::users::credit))
        .route("/{id}/status", patch(handlers::users::set_status))
        .route("/{id}/restore", patch(handlers::users::restore))
        .route("/{id}", delete(handlers::users::archive));

    let protected = Router::new()
        .route("/auth/profile", get(handlers::auth::profile))
        .nest("/transactions", transaction_routes)
        .nest("/users", user_routes)
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", public.merge(protected))
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = TcpListener::bind((host, port)).await?;
    info!(%host, port, "gateway en écoute");
    info!("Swagger UI: http://{}:{}/docs", host, port);
    axum::serve(listener, app).await?;
    Ok(())
}
