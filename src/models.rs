//! User profiles, wallets and the closed role/lock-state enums.
//!
//! Roles and lock states are tagged enums with exhaustive matching at every
//! use site; wire values stay French for dashboard compatibility.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The three account roles of the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "Client")]
    Client,
    #[serde(rename = "Distributeur")]
    Distributor,
    #[serde(rename = "Agent")]
    Agent,
}

impl Role {
    /// Prefix of the account numbers issued to this role.
    pub fn account_prefix(self) -> &'static str {
        match self {
            Role::Client => "CLI",
            Role::Distributor => "DIS",
            Role::Agent => "AGT",
        }
    }

    pub fn as_i16(self) -> i16 {
        match self {
            Role::Client => 1,
            Role::Distributor => 2,
            Role::Agent => 3,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(Role::Client),
            2 => Some(Role::Distributor),
            3 => Some(Role::Agent),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Role::Client => "Client",
            Role::Distributor => "Distributeur",
            Role::Agent => "Agent",
        };
        f.write_str(label)
    }
}

/// Lock state of a wallet. Wire values are the dashboard's French labels
/// ("Actif" / "Bloqué").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LockState {
    #[serde(rename = "Actif")]
    Active,
    #[serde(rename = "Bloqué")]
    Blocked,
}

impl LockState {
    pub fn as_i16(self) -> i16 {
        match self {
            LockState::Active => 1,
            LockState::Blocked => 2,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(LockState::Active),
            2 => Some(LockState::Blocked),
            _ => None,
        }
    }
}

/// A back-office user. Not serialized directly on the wire (the password
/// hash stays server-side); handlers build dedicated DTOs.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub national_id: String,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub active: bool,
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub archived_by: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A single FCFA wallet. Balances are plain integers (no sub-units) and the
/// version counter backs optimistic concurrency on ledger commits.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub number: String,
    pub balance: i64,
    pub bonus: i64,
    pub lock: LockState,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Fresh empty wallet for a newly created user.
    pub fn new_for(role: Role) -> Self {
        Self {
            number: new_account_number(role),
            balance: 0,
            bonus: 0,
            lock: LockState::Active,
            version: 1,
            created_at: Utc::now(),
        }
    }
}

/// Wallet joined with its owner, as ledger operations need to see it.
#[derive(Debug, Clone)]
pub struct WalletView {
    pub owner_id: Uuid,
    pub owner_email: String,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub owner_phone: String,
    pub role: Role,
    pub active: bool,
    pub archived: bool,
    pub number: String,
    pub balance: i64,
    pub bonus: i64,
    pub lock: LockState,
    pub version: i64,
}

impl WalletView {
    pub fn owner_display_name(&self) -> String {
        format!("{} {}", self.owner_first_name, self.owner_last_name)
    }

    /// Reachable for new operations: owner active and not archived.
    pub fn is_operational(&self) -> bool {
        self.active && !self.archived
    }
}

/// Random uppercase alphanumeric suffix used in account and transaction
/// numbers.
pub fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}

/// Account numbers are `<prefix><millis><5 random chars>`, e.g.
/// `CLI1719244882113A4F2B`.
pub fn new_account_number(role: Role) -> String {
    format!(
        "{}{}{}",
        role.account_prefix(),
        Utc::now().timestamp_millis(),
        random_suffix(5)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_i16() {
        for role in [Role::Client, Role::Distributor, Role::Agent] {
            assert_eq!(Role::from_i16(role.as_i16()), Some(role));
        }
        assert_eq!(Role::from_i16(0), None);
    }

    #[test]
    fn lock_state_wire_values_are_french() {
        assert_eq!(
            serde_json::to_string(&LockState::Active).unwrap(),
            "\"Actif\""
        );
        assert_eq!(
            serde_json::to_string(&LockState::Blocked).unwrap(),
            "\"Bloqué\""
        );
    }

    #[test]
    fn account_numbers_carry_role_prefix() {
        assert!(new_account_number(Role::Client).starts_with("CLI"));
        assert!(new_account_number(Role::Distributor).starts_with("DIS"));
        assert!(new_account_number(Role::Agent).starts_with("AGT"));
    }

    #[test]
    fn random_suffix_is_uppercase_alphanumeric() {
        let suffix = random_suffix(16);
        assert_eq!(suffix.len(), 16);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }
}
