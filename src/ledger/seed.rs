//! Demo history for the two ledgers.
//!
//! Real:   20000.00 in, 5000.00 + 2499.50 out, one failed 1000.00 ⇒ 12500.50
//! Duress:  1200.00 in,  150.00 +   51.00 out                    ⇒   999.00

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::context::LedgerContext;
use super::types::{Direction, Notification, Severity, Transaction, TxStatus, ASSET};
use crate::error::VaultResult;

struct SeedTx {
    id: &'static str,
    direction: Direction,
    cents: i64,
    counterparty: &'static str,
    age: Duration,
    status: TxStatus,
    hash: &'static str,
}

struct SeedNote {
    id: u64,
    title: &'static str,
    body: &'static str,
    age: Duration,
    severity: Severity,
    read: bool,
    link: Option<&'static str>,
}

fn build(now: DateTime<Utc>, txs: &[SeedTx], notes: &[SeedNote]) -> VaultResult<LedgerContext> {
    let transactions = txs
        .iter()
        .map(|s| Transaction {
            id: s.id.into(),
            direction: s.direction,
            asset: ASSET.into(),
            amount: Decimal::new(s.cents, 2),
            counterparty: s.counterparty.into(),
            timestamp: now - s.age,
            status: s.status,
            hash: s.hash.into(),
        })
        .collect();
    let notifications = notes
        .iter()
        .map(|s| Notification {
            id: s.id,
            title: s.title.into(),
            body: s.body.into(),
            timestamp: now - s.age,
            severity: s.severity,
            read: s.read,
            linked_transaction_id: s.link.map(String::from),
        })
        .collect();
    LedgerContext::from_history(transactions, notifications)
}

pub fn demo_real(now: DateTime<Utc>) -> VaultResult<LedgerContext> {
    build(
        now,
        &[
            SeedTx { id: "tx-4", direction: Direction::Receive, cents: 2_000_000, counterparty: "0x1a...8b9", age: Duration::days(9), status: TxStatus::Completed, hash: "0x123...456" },
            SeedTx { id: "tx-3", direction: Direction::Send, cents: 100_000, counterparty: "0x9f...3e4", age: Duration::days(7), status: TxStatus::Failed, hash: "0x789...112" },
            SeedTx { id: "tx-2", direction: Direction::Send, cents: 500_000, counterparty: "0x4b...7d1", age: Duration::days(5), status: TxStatus::Completed, hash: "0x456...882" },
            SeedTx { id: "tx-1", direction: Direction::Send, cents: 249_950, counterparty: "0x8a...9c2", age: Duration::minutes(2), status: TxStatus::Completed, hash: "0x7f39...3a91" },
        ],
        &[
            SeedNote { id: 3, title: "System Update", body: "Mimi Vault v2.4 live", age: Duration::hours(5), severity: Severity::Info, read: true, link: None },
            SeedNote { id: 2, title: "Security Alert", body: "New login detected", age: Duration::hours(1), severity: Severity::Warning, read: false, link: None },
            SeedNote { id: 1, title: "Transfer Sent", body: "2,499.50 USDT out", age: Duration::minutes(2), severity: Severity::Info, read: false, link: Some("tx-1") },
        ],
    )
}

pub fn demo_duress(now: DateTime<Utc>) -> VaultResult<LedgerContext> {
    build(
        now,
        &[
            SeedTx { id: "dtx-3", direction: Direction::Receive, cents: 120_000, counterparty: "Exchange", age: Duration::days(14), status: TxStatus::Completed, hash: "0x999...111" },
            SeedTx { id: "dtx-2", direction: Direction::Send, cents: 15_000, counterparty: "0x33...444", age: Duration::days(7), status: TxStatus::Completed, hash: "0x123...abc" },
            SeedTx { id: "dtx-1", direction: Direction::Send, cents: 5_100, counterparty: "0x11...222", age: Duration::days(1), status: TxStatus::Completed, hash: "0xabc...def" },
        ],
        &[
            SeedNote { id: 102, title: "Welcome", body: "Account verified", age: Duration::weeks(2), severity: Severity::Info, read: true, link: None },
            SeedNote { id: 101, title: "Funds Sent", body: "51.00 USDT sent", age: Duration::days(1), severity: Severity::Info, read: true, link: Some("dtx-1") },
        ],
    )
}
