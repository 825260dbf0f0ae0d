//! Ledger record types: transactions and notifications.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The only asset this vault holds.
pub const ASSET: &str = "USDT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Send,
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Completed,
    Pending,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Completed => "completed",
            TxStatus::Pending => "pending",
            TxStatus::Failed => "failed",
        }
    }
}

/// History filter used by the transaction list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
    Failed,
}

impl StatusFilter {
    pub fn matches(&self, status: TxStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => status == TxStatus::Completed,
            StatusFilter::Pending => status == TxStatus::Pending,
            StatusFilter::Failed => status == TxStatus::Failed,
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(StatusFilter::All),
            "completed" => Some(StatusFilter::Completed),
            "pending" => Some(StatusFilter::Pending),
            "failed" => Some(StatusFilter::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub direction: Direction,
    pub asset: String,
    pub amount: Decimal,
    pub counterparty: String,
    pub timestamp: DateTime<Utc>,
    pub status: TxStatus,
    pub hash: String,
}

impl Transaction {
    /// Signed contribution to the balance. Zero unless completed.
    pub fn balance_effect(&self) -> Decimal {
        if self.status != TxStatus::Completed {
            return Decimal::ZERO;
        }
        match self.direction {
            Direction::Receive => self.amount,
            Direction::Send => -self.amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub read: bool,
    /// Lookup key into the same ledger's transactions. Not owned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_transaction_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(direction: Direction, status: TxStatus, amount: Decimal) -> Transaction {
        Transaction {
            id: "tx".into(),
            direction,
            asset: ASSET.into(),
            amount,
            counterparty: "0x00".into(),
            timestamp: Utc::now(),
            status,
            hash: "0x00".into(),
        }
    }

    #[test]
    fn only_completed_affects_balance() {
        let amount = Decimal::new(100000, 2);
        assert_eq!(tx(Direction::Send, TxStatus::Failed, amount).balance_effect(), Decimal::ZERO);
        assert_eq!(tx(Direction::Send, TxStatus::Pending, amount).balance_effect(), Decimal::ZERO);
        assert_eq!(tx(Direction::Send, TxStatus::Completed, amount).balance_effect(), -amount);
        assert_eq!(tx(Direction::Receive, TxStatus::Completed, amount).balance_effect(), amount);
    }

    #[test]
    fn status_filter_parse() {
        assert_eq!(StatusFilter::from_str("ALL"), Some(StatusFilter::All));
        assert_eq!(StatusFilter::from_str("failed"), Some(StatusFilter::Failed));
        assert_eq!(StatusFilter::from_str("settled"), None);
        assert!(StatusFilter::Pending.matches(TxStatus::Pending));
        assert!(!StatusFilter::Pending.matches(TxStatus::Completed));
    }

    #[test]
    fn serde_lowercase() {
        let json = serde_json::to_string(&TxStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
