//! LedgerContext: balance + transaction history + notification history for one mode.
//!
//! Histories are stored in append order (oldest first) and always exposed
//! newest first. The balance is maintained incrementally and is equal, at
//! every point, to the sum of completed receives minus completed sends.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rust_decimal::Decimal;

use super::types::{Notification, StatusFilter, Transaction};
use crate::error::{VaultError, VaultResult};

#[derive(Debug, Clone, Default)]
pub struct LedgerContext {
    balance: Decimal,
    transactions: Vec<Transaction>,
    notifications: Vec<Notification>,
    tx_seq: u64,
    next_notification_id: u64,
}

impl LedgerContext {
    pub fn empty() -> Self {
        Self { next_notification_id: 1, ..Default::default() }
    }

    /// Build a context from existing history, both lists oldest first.
    ///
    /// The balance is derived from the transactions; a history that would
    /// leave it negative is rejected.
    pub fn from_history(transactions: Vec<Transaction>, notifications: Vec<Notification>) -> VaultResult<Self> {
        for tx in &transactions {
            if tx.amount <= Decimal::ZERO {
                return Err(VaultError::validation(format!("transaction {} has non-positive amount", tx.id)));
            }
        }
        let balance: Decimal = transactions.iter().map(Transaction::balance_effect).sum();
        if balance < Decimal::ZERO {
            return Err(VaultError::validation("history overdraws the ledger"));
        }
        let next_notification_id = notifications.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        Ok(Self {
            balance,
            transactions,
            notifications,
            tx_seq: 0,
            next_notification_id,
        })
    }

    pub fn balance(&self) -> Decimal { self.balance }

    /// Balance recomputed from history. Always equal to `balance()`.
    pub fn computed_balance(&self) -> Decimal {
        self.transactions.iter().map(Transaction::balance_effect).sum()
    }

    /// Transactions, most recent first.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().rev()
    }

    /// Notifications, most recent first.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().rev()
    }

    pub fn transaction_count(&self) -> usize { self.transactions.len() }
    pub fn notification_count(&self) -> usize { self.notifications.len() }

    pub fn latest_transaction(&self) -> Option<&Transaction> { self.transactions.last() }
    pub fn latest_notification(&self) -> Option<&Notification> { self.notifications.last() }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn notification(&self, id: u64) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    /// Resolve a notification's weak link into this ledger's history.
    pub fn linked_transaction(&self, notification_id: u64) -> Option<&Transaction> {
        let link = self.notification(notification_id)?.linked_transaction_id.as_deref()?;
        self.transaction(link)
    }

    pub fn transactions_with_status(&self, filter: StatusFilter) -> Vec<&Transaction> {
        self.transactions().filter(|t| filter.matches(t.status)).collect()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub(crate) fn issue_transaction_id(&mut self, now: DateTime<Utc>) -> String {
        self.tx_seq += 1;
        format!("tx-{}-{}", now.timestamp_millis(), self.tx_seq)
    }

    pub(crate) fn issue_notification_id(&mut self) -> u64 {
        let id = self.next_notification_id.max(1);
        self.next_notification_id = id + 1;
        id
    }

    /// Apply a validated send: balance, transaction and notification change together.
    pub(crate) fn commit(&mut self, tx: Transaction, notification: Notification) {
        debug_assert!(tx.amount <= self.balance);
        self.balance += tx.balance_effect();
        self.transactions.push(tx);
        self.notifications.push(notification);
    }

    /// Returns `None` for unknown ids, otherwise whether the flag changed.
    pub(crate) fn set_read(&mut self, id: u64) -> Option<bool> {
        let n = self.notifications.iter_mut().find(|n| n.id == id)?;
        let changed = !n.read;
        n.read = true;
        Some(changed)
    }

    pub(crate) fn set_all_read(&mut self) -> usize {
        let mut changed = 0;
        for n in self.notifications.iter_mut().filter(|n| !n.read) {
            n.read = true;
            changed += 1;
        }
        changed
    }
}

/// Opaque transaction hash: `0x` followed by 8 hex digits.
pub(crate) fn random_hash() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}
