//! Staged transfer: Input → Confirm → Authorize → Done.
//!
//! The ledger is only touched after the enclave answered successfully. The
//! signing call is split out (`begin_authorization` / `complete`) so callers
//! holding the session behind a lock can release it while the call is in
//! flight.

use rust_decimal::Decimal;
use serde::Serialize;

use super::context::LedgerContext;
use super::service::{check_send, parse_amount, TransactionService};
use super::types::Transaction;
use crate::enclave::{SigningClient, SigningProbe, SigningToken};
use crate::error::{VaultError, VaultResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStep {
    Input,
    Confirm,
    Authorize,
    Done,
}

#[derive(Debug, Clone)]
pub struct TransferFlow {
    step: TransferStep,
    amount: Decimal,
    recipient: String,
    in_flight: bool,
    receipt: Option<Transaction>,
}

impl Default for TransferFlow {
    fn default() -> Self { Self::new() }
}

impl TransferFlow {
    pub fn new() -> Self {
        Self {
            step: TransferStep::Input,
            amount: Decimal::ZERO,
            recipient: String::new(),
            in_flight: false,
            receipt: None,
        }
    }

    pub fn step(&self) -> TransferStep { self.step }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn recipient(&self) -> &str { &self.recipient }
    pub fn receipt(&self) -> Option<&Transaction> { self.receipt.as_ref() }
    pub fn in_flight(&self) -> bool { self.in_flight }

    /// Largest amount the bound ledger can send.
    pub fn max_amount(ledger: &LedgerContext) -> Decimal { ledger.balance() }

    /// Validate input against the ledger and move to confirmation.
    pub fn draft(&mut self, ledger: &LedgerContext, amount: &str, recipient: &str) -> VaultResult<()> {
        self.expect_step(&[TransferStep::Input, TransferStep::Confirm], "draft")?;
        let amount = parse_amount(amount)?;
        check_send(ledger, amount, recipient)?;
        self.amount = amount;
        self.recipient = recipient.trim().to_string();
        self.step = TransferStep::Confirm;
        Ok(())
    }

    pub fn confirm(&mut self) -> VaultResult<()> {
        self.expect_step(&[TransferStep::Confirm], "confirm")?;
        self.step = TransferStep::Authorize;
        Ok(())
    }

    /// Step back one screen. No-op at Input and Done.
    pub fn back(&mut self) {
        if self.in_flight {
            return;
        }
        self.step = match self.step {
            TransferStep::Confirm => TransferStep::Input,
            TransferStep::Authorize => TransferStep::Confirm,
            other => other,
        };
    }

    /// First half of authorization: check the password and hand out the probe.
    pub fn begin_authorization(&mut self, password: &str) -> VaultResult<SigningProbe> {
        self.expect_step(&[TransferStep::Authorize], "authorize")?;
        if self.in_flight {
            return Err(VaultError::validation("Authorization already in progress"));
        }
        if password.is_empty() {
            return Err(VaultError::validation("Password required"));
        }
        self.in_flight = true;
        Ok(SigningProbe::default())
    }

    /// Second half: apply the send only if the enclave answered successfully.
    ///
    /// On failure the flow stays at Authorize so the whole transfer can be
    /// retried; the ledger is not touched.
    pub fn complete(
        &mut self,
        ledger: &mut LedgerContext,
        signed: VaultResult<SigningToken>,
    ) -> VaultResult<Transaction> {
        self.expect_step(&[TransferStep::Authorize], "complete")?;
        if !self.in_flight {
            return Err(VaultError::validation("No authorization in progress"));
        }
        self.in_flight = false;
        let token = signed?;
        tracing::debug!(token_len = token.as_str().len(), "enclave authorized transfer");

        let tx = TransactionService::new(ledger).send(self.amount, &self.recipient)?;
        self.step = TransferStep::Done;
        self.receipt = Some(tx.clone());
        Ok(tx)
    }

    /// Convenience for single-owner callers: both halves around one signing call.
    pub async fn authorize(
        &mut self,
        ledger: &mut LedgerContext,
        password: &str,
        signer: &dyn SigningClient,
    ) -> VaultResult<Transaction> {
        let probe = self.begin_authorization(password)?;
        let signed = signer.sign(&probe).await;
        self.complete(ledger, signed)
    }

    fn expect_step(&self, allowed: &[TransferStep], action: &str) -> VaultResult<()> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(VaultError::IllegalTransition {
                phase: format!("transfer {:?}", self.step).to_lowercase(),
                event: action.into(),
            })
        }
    }
}
