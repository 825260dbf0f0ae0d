//! TransactionService - applies transfers against one bound LedgerContext.

use chrono::Utc;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::context::{random_hash, LedgerContext};
use super::types::{Direction, Notification, Severity, Transaction, TxStatus, ASSET};
use crate::error::{VaultError, VaultResult};

/// Parse a user-entered amount as an exact decimal.
pub fn parse_amount(input: &str) -> VaultResult<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(VaultError::validation("Amount required"));
    }
    let amount = Decimal::from_str(trimmed)
        .map_err(|_| VaultError::validation(format!("Invalid amount: {trimmed}")))?;
    if amount <= Decimal::ZERO {
        return Err(VaultError::validation("Amount must be greater than zero"));
    }
    Ok(amount.normalize())
}

/// Every precondition of a send, evaluated without touching state.
pub fn check_send(ledger: &LedgerContext, amount: Decimal, recipient: &str) -> VaultResult<()> {
    if amount <= Decimal::ZERO {
        return Err(VaultError::validation("Amount must be greater than zero"));
    }
    if recipient.trim().is_empty() {
        return Err(VaultError::validation("Recipient required"));
    }
    if amount > ledger.balance() {
        return Err(VaultError::InsufficientFunds {
            requested: amount.to_string(),
            available: ledger.balance().to_string(),
        });
    }
    Ok(())
}

pub struct TransactionService<'a> {
    ledger: &'a mut LedgerContext,
}

impl<'a> TransactionService<'a> {
    pub fn new(ledger: &'a mut LedgerContext) -> Self { Self { ledger } }

    pub fn ledger(&self) -> &LedgerContext { self.ledger }

    pub fn check(&self, amount: Decimal, recipient: &str) -> VaultResult<()> {
        check_send(self.ledger, amount, recipient)
    }

    /// Record a completed send and its notification. Nothing changes on error.
    pub fn send(&mut self, amount: Decimal, recipient: &str) -> VaultResult<Transaction> {
        self.check(amount, recipient)?;

        let now = Utc::now();
        let tx = Transaction {
            id: self.ledger.issue_transaction_id(now),
            direction: Direction::Send,
            asset: ASSET.into(),
            amount,
            counterparty: recipient.trim().to_string(),
            timestamp: now,
            status: TxStatus::Completed,
            hash: random_hash(),
        };
        let notification = Notification {
            id: self.ledger.issue_notification_id(),
            title: "Funds Sent".into(),
            body: format!("Sent {:.2} {}", amount, ASSET),
            timestamp: now,
            severity: Severity::Info,
            read: false,
            linked_transaction_id: Some(tx.id.clone()),
        };

        self.ledger.commit(tx.clone(), notification);
        tracing::info!(tx = %tx.id, amount = %amount, "transfer recorded");
        Ok(tx)
    }

    /// Idempotent. Returns false only for unknown ids.
    pub fn mark_read(&mut self, notification_id: u64) -> bool {
        self.ledger.set_read(notification_id).is_some()
    }

    pub fn mark_all_read(&mut self) -> usize {
        self.ledger.set_all_read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::seed;

    #[test]
    fn parse_amounts() {
        assert_eq!(parse_amount(" 12.50 ").unwrap(), Decimal::new(125, 1));
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-5").is_err());
    }

    #[test]
    fn send_updates_all_three() {
        let mut ledger = seed::demo_real(Utc::now()).unwrap();
        let before_txs = ledger.transaction_count();
        let before_notes = ledger.notification_count();

        let tx = TransactionService::new(&mut ledger)
            .send(Decimal::new(50025, 2), "0xabc")
            .unwrap();

        assert_eq!(ledger.balance(), Decimal::new(1_200_025, 2));
        assert_eq!(ledger.balance(), ledger.computed_balance());
        assert_eq!(ledger.transaction_count(), before_txs + 1);
        assert_eq!(ledger.notification_count(), before_notes + 1);
        assert_eq!(ledger.latest_transaction().unwrap().id, tx.id);

        let note = ledger.latest_notification().unwrap();
        assert_eq!(note.body, "Sent 500.25 USDT");
        assert!(!note.read);
        assert_eq!(ledger.linked_transaction(note.id).unwrap().id, tx.id);
    }

    #[test]
    fn rejected_send_leaves_ledger_untouched() {
        let mut ledger = seed::demo_duress(Utc::now()).unwrap();
        let snapshot = ledger.clone();
        let mut service = TransactionService::new(&mut ledger);

        assert!(matches!(
            service.send(Decimal::new(99901, 2), "0xabc"),
            Err(VaultError::InsufficientFunds { .. })
        ));
        assert!(matches!(service.send(Decimal::ZERO, "0xabc"), Err(VaultError::Validation(_))));
        assert!(matches!(service.send(Decimal::ONE, "   "), Err(VaultError::Validation(_))));

        assert_eq!(ledger.balance(), snapshot.balance());
        assert_eq!(ledger.transaction_count(), snapshot.transaction_count());
        assert_eq!(ledger.notification_count(), snapshot.notification_count());
    }

    #[test]
    fn exact_balance_can_be_sent() {
        let mut ledger = seed::demo_duress(Utc::now()).unwrap();
        TransactionService::new(&mut ledger).send(Decimal::new(999, 0), "0xabc").unwrap();
        assert_eq!(ledger.balance(), Decimal::ZERO);
    }

    #[test]
    fn mark_read_idempotent() {
        let mut ledger = seed::demo_real(Utc::now()).unwrap();
        let unread = ledger.unread_count();
        let id = ledger.notifications().find(|n| !n.read).unwrap().id;
        let mut service = TransactionService::new(&mut ledger);
        assert!(service.mark_read(id));
        assert!(service.mark_read(id));
        assert!(!service.mark_read(424242));
        assert_eq!(ledger.unread_count(), unread - 1);

        assert_eq!(TransactionService::new(&mut ledger).mark_all_read(), unread - 1);
        assert_eq!(ledger.unread_count(), 0);
    }
}
