//! Minibank - Mobile-money back-office
//!
//! Back-office service for a mobile-money network: Agents administer Client
//! and Distributor accounts, Distributors perform cash-in/cash-out against
//! Clients, Clients transfer between themselves, and any validated
//! transaction can be reversed exactly once by an authorized actor.
//!
//! # Modules
//!
//! - [`models`] - Roles, user profiles and wallets
//! - [`ledger`] - Transaction factory, ledger operations, reversal engine,
//!   history/statistics
//! - [`store`] - `LedgerStore` trait with in-memory and PostgreSQL backends
//! - [`auth`] - Argon2 password hashing, JWT issuing and the auth middleware
//! - [`gateway`] - Axum HTTP surface (JSON over REST, Bearer JWT)
//! - [`config`] / [`logging`] - Per-environment YAML config and tracing setup

pub mod config;
pub mod logging;
pub mod models;

pub mod ledger;
pub mod store;

pub mod auth;
pub mod gateway;

// Convenient re-exports at crate root
pub use auth::AuthenticatedUser;
pub use ledger::{Ledger, LedgerError, Transaction, TransactionKind, TransactionStatus};
pub use models::{LockState, Role, UserProfile, Wallet, WalletView};
pub use store::{LedgerBatch, LedgerStore, MemoryStore, StoreError};
