//! Transaction records and the factory computing fee/commission per kind.
//!
//! Transactions are stored once in a normalized collection and referenced by
//! both parties through their account numbers; they are immutable except for
//! the one-shot reversal substructure. Wire field names stay French.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::random_suffix;

/// Sentinel source account for agent float credits.
pub const SYSTEM_ACCOUNT: &str = "AGENT_SYSTEM";

/// Distributor commission on cash-in/cash-out, percent of the amount.
pub const COMMISSION_PERCENT: i64 = 1;
/// Sender fee on client-to-client transfers, percent of the amount.
pub const TRANSFER_FEE_PERCENT: i64 = 2;

/// Minimum transfer amount (FCFA).
pub const MIN_TRANSFER_AMOUNT: i64 = 100;
/// Minimum agent credit amount (FCFA).
pub const MIN_AGENT_CREDIT: i64 = 100;
/// Upper bound on a single operation amount (FCFA). Operations reject
/// anything above it before a transaction is built, which keeps the
/// percentage arithmetic and the amount+fee total inside `i64`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Integer percentage with half-up rounding on whole FCFA. Callers bound
/// `amount` by [`MAX_AMOUNT`] first.
pub fn percent_of(amount: i64, percent: i64) -> i64 {
    (amount * percent + 50) / 100
}

/// Transaction numbers are `TRX<millis><5 random chars>`. Uniqueness is
/// enforced on insert; the operation retries with a fresh number on the
/// (vanishingly rare) collision.
pub fn new_transaction_number() -> String {
    format!("TRX{}{}", Utc::now().timestamp_millis(), random_suffix(5))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TransactionKind {
    #[serde(rename = "Depot")]
    Deposit,
    #[serde(rename = "Retrait")]
    Withdrawal,
    #[serde(rename = "Transfert")]
    Transfer,
    #[serde(rename = "Credit_Agent")]
    AgentCredit,
}

impl TransactionKind {
    /// Cash-in/cash-out performed by a distributor; the only kinds a
    /// distributor may reverse.
    pub fn is_cash_operation(self) -> bool {
        matches!(self, TransactionKind::Deposit | TransactionKind::Withdrawal)
    }

    pub fn as_i16(self) -> i16 {
        match self {
            TransactionKind::Deposit => 1,
            TransactionKind::Withdrawal => 2,
            TransactionKind::Transfer => 3,
            TransactionKind::AgentCredit => 4,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(TransactionKind::Deposit),
            2 => Some(TransactionKind::Withdrawal),
            3 => Some(TransactionKind::Transfer),
            4 => Some(TransactionKind::AgentCredit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TransactionStatus {
    #[serde(rename = "Validee")]
    Validated,
    #[serde(rename = "Annulee")]
    Cancelled,
}

impl TransactionStatus {
    pub fn as_i16(self) -> i16 {
        match self {
            TransactionStatus::Validated => 1,
            TransactionStatus::Cancelled => 2,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(TransactionStatus::Validated),
            2 => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }
}

/// Role-tagged actor emails, used for audit, history scoping and the
/// reversal permission check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Actors {
    #[serde(rename = "clientEmail", skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(rename = "distributeurEmail", skip_serializing_if = "Option::is_none")]
    pub distributor_email: Option<String>,
    #[serde(rename = "agentEmail", skip_serializing_if = "Option::is_none")]
    pub agent_email: Option<String>,
}

impl Actors {
    pub fn involves(&self, email: &str) -> bool {
        self.client_email.as_deref() == Some(email)
            || self.distributor_email.as_deref() == Some(email)
            || self.agent_email.as_deref() == Some(email)
    }
}

/// One-shot reversal record; mutated exactly once when the transaction is
/// annulled.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReversalInfo {
    #[serde(rename = "estAnnulee")]
    pub reversed: bool,
    #[serde(rename = "dateAnnulation", skip_serializing_if = "Option::is_none")]
    pub reversed_at: Option<DateTime<Utc>>,
    #[serde(rename = "annuleeParEmail", skip_serializing_if = "Option::is_none")]
    pub reversed_by: Option<String>,
    #[serde(rename = "raison", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TransactionDetails {
    pub description: String,
}

/// A single ledger event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    #[serde(rename = "numeroTransaction")]
    pub number: String,
    #[serde(rename = "dateTransaction")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "typeTransaction")]
    pub kind: TransactionKind,
    #[serde(rename = "montant")]
    pub amount: i64,
    #[serde(rename = "frais")]
    pub fee: i64,
    #[serde(rename = "bonus")]
    pub bonus: i64,
    #[serde(rename = "montantTotal")]
    pub total_amount: i64,
    #[serde(rename = "compteSource")]
    pub source_account: String,
    #[serde(rename = "compteDestination")]
    pub destination_account: String,
    #[serde(rename = "acteurs")]
    pub actors: Actors,
    #[serde(rename = "statut")]
    pub status: TransactionStatus,
    #[serde(rename = "dateValidation")]
    pub validated_at: DateTime<Utc>,
    #[serde(rename = "valideParEmail")]
    pub validated_by: String,
    #[serde(rename = "annulation")]
    pub reversal: ReversalInfo,
    #[serde(rename = "details")]
    pub details: TransactionDetails,
}

impl Transaction {
    fn base(
        kind: TransactionKind,
        amount: i64,
        fee: i64,
        bonus: i64,
        total_amount: i64,
        source_account: String,
        destination_account: String,
        actors: Actors,
        validated_by: String,
        description: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            number: new_transaction_number(),
            created_at: now,
            kind,
            amount,
            fee,
            bonus,
            total_amount,
            source_account,
            destination_account,
            actors,
            status: TransactionStatus::Validated,
            validated_at: now,
            validated_by,
            reversal: ReversalInfo::default(),
            details: TransactionDetails { description },
        }
    }

    /// Cash-in: distributor wallet -> client wallet, 1% commission to the
    /// distributor bonus balance, no fee.
    pub fn deposit(
        amount: i64,
        distributor_account: &str,
        client_account: &str,
        distributor_email: &str,
        client_email: &str,
    ) -> Self {
        Self::base(
            TransactionKind::Deposit,
            amount,
            0,
            percent_of(amount, COMMISSION_PERCENT),
            amount,
            distributor_account.to_string(),
            client_account.to_string(),
            Actors {
                client_email: Some(client_email.to_string()),
                distributor_email: Some(distributor_email.to_string()),
                agent_email: None,
            },
            distributor_email.to_string(),
            "Dépôt en espèces".to_string(),
        )
    }

    /// Cash-out: client wallet -> distributor wallet, same commission
    /// formula as deposit with source/destination swapped.
    pub fn withdrawal(
        amount: i64,
        client_account: &str,
        distributor_account: &str,
        distributor_email: &str,
        client_email: &str,
    ) -> Self {
        Self::base(
            TransactionKind::Withdrawal,
            amount,
            0,
            percent_of(amount, COMMISSION_PERCENT),
            amount,
            client_account.to_string(),
            distributor_account.to_string(),
            Actors {
                client_email: Some(client_email.to_string()),
                distributor_email: Some(distributor_email.to_string()),
                agent_email: None,
            },
            distributor_email.to_string(),
            "Retrait en espèces".to_string(),
        )
    }

    /// Client-to-client transfer: sender pays amount + 2% fee, recipient
    /// receives the amount. The fee is collected out of the ledger.
    pub fn transfer(
        amount: i64,
        sender_account: &str,
        recipient_account: &str,
        sender_email: &str,
        recipient_name: &str,
    ) -> Self {
        let fee = percent_of(amount, TRANSFER_FEE_PERCENT);
        Self::base(
            TransactionKind::Transfer,
            amount,
            fee,
            0,
            amount + fee,
            sender_account.to_string(),
            recipient_account.to_string(),
            Actors {
                client_email: Some(sender_email.to_string()),
                distributor_email: None,
                agent_email: None,
            },
            sender_email.to_string(),
            format!("Transfert vers {}", recipient_name),
        )
    }

    /// Agent float credit from the SYSTEM sentinel account to a
    /// distributor wallet.
    pub fn agent_credit(
        amount: i64,
        distributor_account: &str,
        agent_email: &str,
        agent_name: &str,
        distributor_email: &str,
    ) -> Self {
        Self::base(
            TransactionKind::AgentCredit,
            amount,
            0,
            0,
            amount,
            SYSTEM_ACCOUNT.to_string(),
            distributor_account.to_string(),
            Actors {
                client_email: None,
                distributor_email: Some(distributor_email.to_string()),
                agent_email: Some(agent_email.to_string()),
            },
            agent_email.to_string(),
            format!("Crédit par Agent {}", agent_name),
        )
    }

    /// Reversible: validated and not already annulled.
    pub fn is_reversible(&self) -> bool {
        self.status == TransactionStatus::Validated && !self.reversal.reversed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounding_is_half_up() {
        assert_eq!(percent_of(50_000, 1), 500);
        assert_eq!(percent_of(25_000, 2), 500);
        // round(1.49) = 1, round(2.02) = 2, round(0.5) = 1
        assert_eq!(percent_of(149, 1), 1);
        assert_eq!(percent_of(101, 2), 2);
        assert_eq!(percent_of(50, 1), 1);
        assert_eq!(percent_of(49, 1), 0);
    }

    #[test]
    fn deposit_factory_computes_commission_not_fee() {
        let tx = Transaction::deposit(50_000, "DIS1", "CLI1", "d@x.sn", "c@x.sn");
        assert_eq!(tx.kind, TransactionKind::Deposit);
        assert_eq!(tx.fee, 0);
        assert_eq!(tx.bonus, 500);
        assert_eq!(tx.total_amount, 50_000);
        assert_eq!(tx.source_account, "DIS1");
        assert_eq!(tx.destination_account, "CLI1");
        assert!(tx.is_reversible());
    }

    #[test]
    fn transfer_factory_adds_fee_to_total() {
        let tx = Transaction::transfer(25_000, "CLI1", "CLI2", "a@x.sn", "Bineta Sow");
        assert_eq!(tx.fee, 500);
        assert_eq!(tx.bonus, 0);
        assert_eq!(tx.total_amount, 25_500);
    }

    #[test]
    fn agent_credit_sources_from_system() {
        let tx = Transaction::agent_credit(100_000, "DIS1", "ag@x.sn", "Awa Ba", "d@x.sn");
        assert_eq!(tx.source_account, SYSTEM_ACCOUNT);
        assert_eq!(tx.fee, 0);
        assert_eq!(tx.bonus, 0);
        assert_eq!(tx.total_amount, 100_000);
    }

    #[test]
    fn fee_arithmetic_holds_at_the_amount_cap() {
        let tx = Transaction::transfer(MAX_AMOUNT, "CLI1", "CLI2", "a@x.sn", "X");
        assert_eq!(tx.fee, MAX_AMOUNT / 50);
        assert_eq!(tx.total_amount, MAX_AMOUNT + MAX_AMOUNT / 50);
        let tx = Transaction::deposit(MAX_AMOUNT, "DIS1", "CLI1", "d@x.sn", "c@x.sn");
        assert_eq!(tx.bonus, MAX_AMOUNT / 100);
    }

    #[test]
    fn transaction_numbers_are_prefixed_and_distinct() {
        let a = new_transaction_number();
        let b = new_transaction_number();
        assert!(a.starts_with("TRX"));
        assert!(b.starts_with("TRX"));
        assert_ne!(a, b);
    }

    #[test]
    fn wire_format_uses_french_names() {
        let tx = Transaction::deposit(1_000, "DIS1", "CLI1", "d@x.sn", "c@x.sn");
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["typeTransaction"], "Depot");
        assert_eq!(json["statut"], "Validee");
        assert_eq!(json["montant"], 1_000);
        assert_eq!(json["annulation"]["estAnnulee"], false);
        assert_eq!(json["acteurs"]["distributeurEmail"], "d@x.sn");
    }
}
