//! HTTP handlers, grouped by route prefix.

pub mod auth;
pub mod health;
pub mod transactions;
pub mod users;

pub use auth::{LoginRequest, LoginResponse};
pub use health::HealthResponse;
pub use transactions::{
    CancelRequest, CashRequest, HistoryQuery, TransferRequest,
};
pub use users::{CreateUserRequest, CreditRequest, StatusRequest, UserView};
