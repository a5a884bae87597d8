//! OpenAPI / Swagger UI documentation.
//!
//! - Swagger UI: `http://localhost:8090/docs`
//! - OpenAPI JSON: `http://localhost:8090/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::{
    CancelRequest, CashRequest, CreateUserRequest, CreditRequest, HealthResponse, LoginRequest,
    LoginResponse, StatusRequest, TransferRequest, UserView,
};
use crate::ledger::history::{
    BalanceView, HistoryEntry, HistoryPage, OwnerInfo, Pagination, StatsView,
};
use crate::ledger::{
    Actors, CashReceipt, CreditReceipt, ReversalInfo, ReversalReceipt, Transaction,
    TransactionDetails, TransactionKind, TransactionStatus, TransferDestination, TransferReceipt,
};
use crate::models::{LockState, Role};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Minibank Back-Office API",
        version = "1.0.0",
        description = "Back-office d'un réseau de monnaie mobile: comptes, dépôts/retraits, transferts, annulations et statistiques."
    ),
    servers(
        (url = "http://localhost:8090", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::auth::login,
        crate::gateway::handlers::auth::profile,
        crate::gateway::handlers::transactions::deposit,
        crate::gateway::handlers::transactions::withdraw,
        crate::gateway::handlers::transactions::transfer,
        crate::gateway::handlers::transactions::verify_phone,
        crate::gateway::handlers::transactions::cancel,
        crate::gateway::handlers::transactions::history,
        crate::gateway::handlers::transactions::detail,
        crate::gateway::handlers::transactions::balance,
        crate::gateway::handlers::transactions::statistics,
        crate::gateway::handlers::transactions::reversible,
        crate::gateway::handlers::users::create_client,
        crate::gateway::handlers::users::create_distributor,
        crate::gateway::handlers::users::list_clients,
        crate::gateway::handlers::users::list_distributors,
        crate::gateway::handlers::users::credit,
        crate::gateway::handlers::users::set_status,
        crate::gateway::handlers::users::archive,
        crate::gateway::handlers::users::restore,
    ),
    components(
        schemas(
            HealthResponse,
            LoginRequest,
            LoginResponse,
            UserView,
            CreateUserRequest,
            CreditRequest,
            StatusRequest,
            CashRequest,
            TransferRequest,
            CancelRequest,
            Transaction,
            TransactionKind,
            TransactionStatus,
            TransactionDetails,
            Actors,
            ReversalInfo,
            CashReceipt,
            TransferReceipt,
            TransferDestination,
            CreditReceipt,
            ReversalReceipt,
            BalanceView,
            HistoryEntry,
            HistoryPage,
            OwnerInfo,
            Pagination,
            StatsView,
            Role,
            LockState,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Supervision"),
        (name = "Auth", description = "Authentification"),
        (name = "Transactions", description = "Opérations et historique"),
        (name = "Utilisateurs", description = "Administration des comptes")
    )
)]
pub struct ApiDoc;
