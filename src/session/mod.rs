//! SessionController - registration, login and the bound ledger.
//!
//! All transitions go through `state::next_phase`. Any phase change bumps the
//! generation, empties the keypad and drops the pending validation, so a
//! ticket issued before a navigation resolves to `Discarded`.
//!
//! The mode chosen at login is only readable through `session()`; nothing in
//! the view or in logs reveals it.

mod onboarding;
mod state;

pub use onboarding::{
    generate_seed_phrase, generate_vault_id, validate_vault_id, SetupKind, DICTIONARY, FALLBACK_VAULT_ID,
    SEED_WORDS,
};
pub use state::{next_phase, Event, Mode, Onboarding, Phase, PinStep};

use serde::Serialize;

use crate::auth::{Credentials, Key, Pin, PinPad, VaultStore};
use crate::enclave::{SigningProbe, SigningToken};
use crate::enrollment::EnrollmentSnapshot;
use crate::error::{VaultError, VaultResult};
use crate::ledger::{LedgerContext, Ledgers, TransactionService, Transaction, TransferFlow, TransferStep};

/// Proof that the 4th digit was entered in a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationTicket {
    generation: u64,
}

impl ValidationTicket {
    pub fn generation(&self) -> u64 { self.generation }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadOutcome {
    /// Key had no effect (validation pending, or buffer full).
    Ignored,
    Updated { len: usize },
    /// Buffer reached 4 digits; resolve the ticket after the PIN delay.
    Submitted(ValidationTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Ticket was stale. Nothing happened.
    Discarded,
    AwaitingConfirmation,
    Registered,
    Authenticated,
}

/// An in-flight enclave call for the transfer of one session.
#[derive(Debug, Clone)]
pub struct TransferTicket {
    generation: u64,
    pub probe: SigningProbe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub mode: Mode,
    pub vault_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferView {
    pub step: TransferStep,
    pub amount: String,
    pub recipient: String,
    pub in_flight: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
}

/// Everything a screen needs. Carries no mode.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub phase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<&'static str>,
    pub pin_length: usize,
    pub pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_phrase: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferView>,
}

pub struct SessionController {
    phase: Phase,
    generation: u64,
    pad: PinPad,
    pending: Option<ValidationTicket>,
    pending_pin: Option<Pin>,
    credentials: Credentials,
    store: VaultStore,
    ledgers: Ledgers,
    seed_phrase: Option<Vec<String>>,
    transfer: Option<TransferFlow>,
    last_error: Option<VaultError>,
}

impl SessionController {
    pub fn new(credentials: Credentials, store: VaultStore, ledgers: Ledgers) -> Self {
        Self {
            phase: Phase::Booting,
            generation: 0,
            pad: PinPad::new(),
            pending: None,
            pending_pin: None,
            credentials,
            store,
            ledgers,
            seed_phrase: None,
            transfer: None,
            last_error: None,
        }
    }

    pub fn phase(&self) -> Phase { self.phase }
    pub fn generation(&self) -> u64 { self.generation }
    pub fn pin_length(&self) -> usize { self.pad.len() }
    pub fn is_pending(&self) -> bool { self.pending.is_some() }
    pub fn last_error(&self) -> Option<&VaultError> { self.last_error.as_ref() }
    pub fn store(&self) -> &VaultStore { &self.store }
    pub fn seed_phrase(&self) -> Option<&[String]> { self.seed_phrase.as_deref() }
    pub fn transfer(&self) -> Option<&TransferFlow> { self.transfer.as_ref() }

    /// Resolve the boot phase from the persisted flag alone.
    pub fn boot(&mut self) -> VaultResult<Phase> {
        let vault_exists = self.store.exists();
        self.apply(Event::BootResolved { vault_exists })?;
        Ok(self.phase)
    }

    // -------------------------------------------------------------------------
    // Keypad
    // -------------------------------------------------------------------------

    pub fn press(&mut self, key: Key) -> VaultResult<PadOutcome> {
        if !self.phase.accepts_pin() {
            return Err(self.illegal("keypad"));
        }
        if self.pending.is_some() {
            return Ok(PadOutcome::Ignored);
        }
        self.last_error = None;
        match key {
            Key::Clear => self.pad.clear(),
            Key::Backspace => self.pad.backspace(),
            Key::Digit(d) => {
                if !self.pad.push(d) {
                    return Ok(PadOutcome::Ignored);
                }
                if self.pad.is_full() {
                    let ticket = ValidationTicket { generation: self.generation };
                    self.pending = Some(ticket);
                    return Ok(PadOutcome::Submitted(ticket));
                }
            }
        }
        Ok(PadOutcome::Updated { len: self.pad.len() })
    }

    /// Validate the buffered PIN. Call after the PIN delay has elapsed.
    pub fn resolve(&mut self, ticket: ValidationTicket) -> VaultResult<Resolution> {
        if self.pending != Some(ticket) || ticket.generation != self.generation {
            return Ok(Resolution::Discarded);
        }
        self.pending = None;
        let Some(pin) = self.pad.take() else {
            return Ok(Resolution::Discarded);
        };

        match self.phase {
            Phase::Registering(PinStep::SetPin) => {
                self.apply(Event::PinCaptured)?;
                self.pending_pin = Some(pin);
                Ok(Resolution::AwaitingConfirmation)
            }
            Phase::Registering(PinStep::ConfirmPin) => {
                if self.pending_pin.as_ref() != Some(&pin) {
                    self.apply(Event::PinMismatch)?;
                    self.last_error = Some(VaultError::PinMismatch);
                    tracing::info!("registration PINs differ");
                    return Err(VaultError::PinMismatch);
                }
                self.store.mark_exists()?;
                self.apply(Event::PinConfirmed)?;
                tracing::info!("vault registered");
                Ok(Resolution::Registered)
            }
            Phase::Authenticating => match self.credentials.classify(&pin) {
                Some(mode) => {
                    self.apply(Event::CredentialAccepted(mode))?;
                    tracing::info!("session unlocked");
                    Ok(Resolution::Authenticated)
                }
                None => {
                    tracing::warn!("credential rejected");
                    self.last_error = Some(VaultError::AuthRejected);
                    Err(VaultError::AuthRejected)
                }
            },
            _ => Ok(Resolution::Discarded),
        }
    }

    // -------------------------------------------------------------------------
    // Onboarding
    // -------------------------------------------------------------------------

    /// Issue and persist a vault identifier, then enter the chosen setup path.
    pub fn begin_setup(&mut self, kind: SetupKind) -> VaultResult<()> {
        self.check(Event::BeginSetup(kind))?;
        let vault_id = generate_vault_id(&mut rand::thread_rng());
        self.store.set_vault_id(&vault_id)?;
        self.apply(Event::BeginSetup(kind))?;
        if kind == SetupKind::Standard {
            self.seed_phrase = Some(generate_seed_phrase(&mut rand::thread_rng()));
        }
        Ok(())
    }

    pub fn acknowledge_identity(&mut self) -> VaultResult<()> {
        self.apply(Event::IdentityAcknowledged)
    }

    /// Advance past the face scan once the enrollment reports completion.
    pub fn complete_enrollment(&mut self, snapshot: &EnrollmentSnapshot) -> VaultResult<()> {
        self.check(Event::EnrollmentCompleted)?;
        if !snapshot.is_enrolled() {
            return Err(VaultError::validation("Face enrollment not complete"));
        }
        self.apply(Event::EnrollmentCompleted)?;
        self.seed_phrase = Some(generate_seed_phrase(&mut rand::thread_rng()));
        Ok(())
    }

    pub fn acknowledge_seed(&mut self) -> VaultResult<()> {
        self.apply(Event::SeedAcknowledged)
    }

    pub fn begin_recovery(&mut self) -> VaultResult<()> {
        self.apply(Event::BeginRecovery)
    }

    pub fn cancel_recovery(&mut self) -> VaultResult<()> {
        self.apply(Event::CancelRecovery)
    }

    /// Restore an existing vault from its identifier. Enters the real ledger.
    pub fn submit_recovery(&mut self, input: &str) -> VaultResult<()> {
        self.check(Event::RecoveryAccepted)?;
        let vault_id = validate_vault_id(input)?;
        self.store.set_vault_id(&vault_id)?;
        self.store.mark_exists()?;
        self.apply(Event::RecoveryAccepted)?;
        tracing::info!("vault recovered");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Session end
    // -------------------------------------------------------------------------

    pub fn logout(&mut self) -> VaultResult<()> {
        self.apply(Event::Logout)?;
        let vault_exists = self.store.exists();
        self.apply(Event::Resume { vault_exists })
    }

    /// Wipe persisted state and reseed the ledgers. Valid from any phase but boot.
    pub fn factory_reset(&mut self) -> VaultResult<()> {
        self.check(Event::FactoryReset)?;
        self.store.clear()?;
        self.ledgers = Ledgers::demo()?;
        self.apply(Event::FactoryReset)?;
        self.apply(Event::Resume { vault_exists: false })?;
        tracing::info!("factory reset");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Bound ledger
    // -------------------------------------------------------------------------

    pub fn session(&self) -> Option<AuthenticatedSession> {
        let mode = self.phase.mode()?;
        Some(AuthenticatedSession { mode, vault_id: self.display_vault_id() })
    }

    /// Identifier to show: the stored one, or the fallback once authenticated.
    pub fn vault_id(&self) -> Option<String> {
        match self.phase {
            Phase::Authenticated(_) => Some(self.display_vault_id()),
            Phase::Unregistered(Onboarding::IdentityIssued | Onboarding::FaceScan | Onboarding::SeedPhrase)
            | Phase::Registering(_) => self.store.vault_id().map(String::from),
            _ => None,
        }
    }

    pub fn ledger(&self) -> VaultResult<&LedgerContext> {
        Ok(self.ledgers.get(self.mode()?))
    }

    /// Direct send, without the staged flow.
    pub fn send(&mut self, amount: &str, recipient: &str) -> VaultResult<Transaction> {
        let mode = self.mode()?;
        let amount = crate::ledger::parse_amount(amount)?;
        TransactionService::new(self.ledgers.get_mut(mode)).send(amount, recipient)
    }

    pub fn mark_read(&mut self, notification_id: u64) -> VaultResult<bool> {
        let mode = self.mode()?;
        Ok(TransactionService::new(self.ledgers.get_mut(mode)).mark_read(notification_id))
    }

    pub fn mark_all_read(&mut self) -> VaultResult<usize> {
        let mode = self.mode()?;
        Ok(TransactionService::new(self.ledgers.get_mut(mode)).mark_all_read())
    }

    // -------------------------------------------------------------------------
    // Transfer flow
    // -------------------------------------------------------------------------

    /// Start (or amend) a transfer. A finished flow is replaced by a fresh one.
    pub fn draft_transfer(&mut self, amount: &str, recipient: &str) -> VaultResult<&TransferFlow> {
        let mode = self.mode()?;
        let replace = self.transfer.as_ref().map(|f| f.step() == TransferStep::Done).unwrap_or(true);
        if replace {
            self.transfer = Some(TransferFlow::new());
        }
        let ledger = self.ledgers.get(mode);
        let flow = self.transfer.get_or_insert_with(TransferFlow::new);
        flow.draft(ledger, amount, recipient)?;
        Ok(flow)
    }

    pub fn confirm_transfer(&mut self) -> VaultResult<&TransferFlow> {
        self.mode()?;
        let flow = self.transfer_mut()?;
        flow.confirm()?;
        Ok(flow)
    }

    pub fn transfer_back(&mut self) -> VaultResult<&TransferFlow> {
        self.mode()?;
        let flow = self.transfer_mut()?;
        flow.back();
        Ok(flow)
    }

    pub fn cancel_transfer(&mut self) {
        if self.transfer.as_ref().map(|f| !f.in_flight()).unwrap_or(false) {
            self.transfer = None;
        }
    }

    /// First half of authorization. The caller performs the signing call
    /// without holding the controller, then calls `complete_transfer`.
    pub fn begin_transfer_authorization(&mut self, password: &str) -> VaultResult<TransferTicket> {
        self.mode()?;
        let generation = self.generation;
        let probe = self.transfer_mut()?.begin_authorization(password)?;
        Ok(TransferTicket { generation, probe })
    }

    /// Apply the enclave's answer. A ticket from an ended session is refused
    /// and touches nothing.
    pub fn complete_transfer(
        &mut self,
        ticket: TransferTicket,
        signed: VaultResult<SigningToken>,
    ) -> VaultResult<Transaction> {
        if ticket.generation != self.generation {
            return Err(VaultError::NotAuthenticated);
        }
        let mode = self.mode()?;
        let flow = self
            .transfer
            .as_mut()
            .ok_or_else(|| VaultError::validation("No transfer in progress"))?;
        flow.complete(self.ledgers.get_mut(mode), signed)
    }

    // -------------------------------------------------------------------------
    // View
    // -------------------------------------------------------------------------

    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase.name(),
            step: self.phase.step(),
            pin_length: self.pad.len(),
            pending: self.pending.is_some(),
            error: self.last_error.as_ref().map(|e| e.to_string()),
            error_code: self.last_error.as_ref().map(|e| e.code()),
            vault_id: self.vault_id(),
            seed_phrase: self.seed_phrase.clone(),
            transfer: self.transfer.as_ref().map(|f| TransferView {
                step: f.step(),
                amount: format!("{:.2}", f.amount()),
                recipient: f.recipient().to_string(),
                in_flight: f.in_flight(),
                receipt: f.receipt().map(|tx| tx.id.clone()),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn mode(&self) -> VaultResult<Mode> {
        self.phase.mode().ok_or(VaultError::NotAuthenticated)
    }

    fn transfer_mut(&mut self) -> VaultResult<&mut TransferFlow> {
        self.transfer
            .as_mut()
            .ok_or_else(|| VaultError::validation("No transfer in progress"))
    }

    fn display_vault_id(&self) -> String {
        self.store.vault_id().unwrap_or(FALLBACK_VAULT_ID).to_string()
    }

    fn illegal(&self, event: &str) -> VaultError {
        VaultError::IllegalTransition { phase: self.phase.label(), event: event.into() }
    }

    fn check(&self, event: Event) -> VaultResult<Phase> {
        next_phase(self.phase, event).ok_or_else(|| self.illegal(event.name()))
    }

    fn apply(&mut self, event: Event) -> VaultResult<()> {
        let next = self.check(event)?;
        let from = self.phase;
        self.phase = next;
        self.generation += 1;
        self.pad.clear();
        self.pending = None;
        self.last_error = None;
        if next != Phase::Registering(PinStep::ConfirmPin) {
            self.pending_pin = None;
        }
        if next != Phase::Unregistered(Onboarding::SeedPhrase) {
            self.seed_phrase = None;
        }
        if next.mode().is_none() {
            self.transfer = None;
        }
        tracing::info!(from = %from.label(), to = %next.label(), event = event.name(), "phase change");
        Ok(())
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase.label())
            .field("generation", &self.generation)
            .field("pin_length", &self.pad.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::EnrollmentStatus;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn controller(dir: &TempDir) -> SessionController {
        let store = VaultStore::load(dir.path(), "test").unwrap();
        let creds = Credentials::from_pins("1234", "8888").unwrap();
        SessionController::new(creds, store, Ledgers::demo().unwrap())
    }

    fn enter(c: &mut SessionController, digits: &str) -> Option<ValidationTicket> {
        let mut ticket = None;
        for ch in digits.chars() {
            let d = ch.to_digit(10).unwrap() as u8;
            if let PadOutcome::Submitted(t) = c.press(Key::Digit(d)).unwrap() {
                ticket = Some(t);
            }
        }
        ticket
    }

    fn registered(dir: &TempDir) -> SessionController {
        let mut c = controller(dir);
        c.boot().unwrap();
        c.begin_setup(SetupKind::Standard).unwrap();
        c.acknowledge_seed().unwrap();
        let t = enter(&mut c, "4321").unwrap();
        c.resolve(t).unwrap();
        let t = enter(&mut c, "4321").unwrap();
        assert_eq!(c.resolve(t).unwrap(), Resolution::Registered);
        c.logout().unwrap();
        c
    }

    #[test]
    fn boot_without_vault() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        assert_eq!(c.boot().unwrap(), Phase::Unregistered(Onboarding::Welcome));
    }

    #[test]
    fn standard_registration() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        c.boot().unwrap();
        c.begin_setup(SetupKind::Standard).unwrap();
        assert_eq!(c.seed_phrase().unwrap().len(), SEED_WORDS);
        let issued = c.vault_id().unwrap();
        c.acknowledge_seed().unwrap();
        assert!(c.seed_phrase().is_none());
        assert_eq!(c.phase(), Phase::Registering(PinStep::SetPin));

        let t = enter(&mut c, "5555").unwrap();
        assert_eq!(c.resolve(t).unwrap(), Resolution::AwaitingConfirmation);
        assert_eq!(c.pin_length(), 0);
        let t = enter(&mut c, "5555").unwrap();
        assert_eq!(c.resolve(t).unwrap(), Resolution::Registered);

        assert!(c.store().exists());
        let session = c.session().unwrap();
        assert_eq!(session.mode, Mode::Real);
        assert_eq!(session.vault_id, issued);
    }

    #[test]
    fn mismatch_restarts_registration() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        c.boot().unwrap();
        c.begin_setup(SetupKind::Standard).unwrap();
        c.acknowledge_seed().unwrap();
        let t = enter(&mut c, "1111").unwrap();
        c.resolve(t).unwrap();
        let t = enter(&mut c, "2222").unwrap();
        assert_eq!(c.resolve(t).unwrap_err(), VaultError::PinMismatch);
        assert_eq!(c.phase(), Phase::Registering(PinStep::SetPin));
        assert!(!c.store().exists());
        assert_eq!(c.pin_length(), 0);
        assert_eq!(c.view().error.as_deref(), Some("PINs do not match"));
    }

    #[test]
    fn login_routes_by_secret() {
        let dir = TempDir::new().unwrap();
        let mut c = registered(&dir);
        assert_eq!(c.phase(), Phase::Authenticating);

        let t = enter(&mut c, "8888").unwrap();
        assert_eq!(c.resolve(t).unwrap(), Resolution::Authenticated);
        assert_eq!(c.session().unwrap().mode, Mode::Duress);
        assert_eq!(c.ledger().unwrap().balance(), Decimal::new(999, 0));

        c.logout().unwrap();
        let t = enter(&mut c, "1234").unwrap();
        c.resolve(t).unwrap();
        assert_eq!(c.session().unwrap().mode, Mode::Real);
        assert_eq!(c.ledger().unwrap().balance(), Decimal::new(1_250_050, 2));
    }

    #[test]
    fn rejected_pin_mutates_nothing_but_the_pad() {
        let dir = TempDir::new().unwrap();
        let mut c = registered(&dir);
        let generation = c.generation();
        let t = enter(&mut c, "0000").unwrap();
        assert_eq!(c.resolve(t).unwrap_err(), VaultError::AuthRejected);
        assert_eq!(c.phase(), Phase::Authenticating);
        assert_eq!(c.generation(), generation);
        assert_eq!(c.pin_length(), 0);
        assert!(!c.is_pending());
        assert_eq!(c.view().error.as_deref(), Some("Decryption Failed"));

        // the next key clears the message
        c.press(Key::Digit(1)).unwrap();
        assert!(c.view().error.is_none());
    }

    #[test]
    fn only_the_two_secrets_authenticate() {
        let dir = TempDir::new().unwrap();
        let mut c = registered(&dir);
        let mut accepted = Vec::new();

        for n in 0..10_000u32 {
            let pin = format!("{n:04}");
            let generation = c.generation();
            let t = enter(&mut c, &pin).unwrap();
            match c.resolve(t) {
                Ok(Resolution::Authenticated) => {
                    accepted.push((pin, c.session().unwrap().mode));
                    c.logout().unwrap();
                }
                Ok(other) => panic!("{pin} resolved to {other:?}"),
                Err(e) => {
                    assert_eq!(e, VaultError::AuthRejected, "{pin}");
                    assert_eq!(e.to_string(), "Decryption Failed");
                    assert_eq!(c.generation(), generation, "{pin}");
                    assert_eq!(c.phase(), Phase::Authenticating, "{pin}");
                    assert_eq!(c.pin_length(), 0);
                }
            }
        }

        assert_eq!(accepted, vec![("1234".to_string(), Mode::Real), ("8888".to_string(), Mode::Duress)]);
    }

    #[test]
    fn mismatched_confirmations_never_persist() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        c.boot().unwrap();
        c.begin_setup(SetupKind::Standard).unwrap();
        c.acknowledge_seed().unwrap();

        let pairs = (0..10_000u32).step_by(173).flat_map(|a| [(a, (a + 1) % 10_000), (a, (a * 7 + 5_003) % 10_000)]);
        for (a, b) in pairs.filter(|(a, b)| a != b) {
            let (first, second) = (format!("{a:04}"), format!("{b:04}"));
            let t = enter(&mut c, &first).unwrap();
            assert_eq!(c.resolve(t).unwrap(), Resolution::AwaitingConfirmation);
            let t = enter(&mut c, &second).unwrap();
            assert_eq!(c.resolve(t).unwrap_err(), VaultError::PinMismatch, "{first}/{second}");
            assert!(!c.store().exists(), "{first}/{second}");
            assert_eq!(c.phase(), Phase::Registering(PinStep::SetPin));
            assert_eq!(c.pin_length(), 0);
        }

        // a matching pair still registers afterwards
        let t = enter(&mut c, "2468").unwrap();
        c.resolve(t).unwrap();
        let t = enter(&mut c, "2468").unwrap();
        assert_eq!(c.resolve(t).unwrap(), Resolution::Registered);
        assert!(c.store().exists());
    }

    #[test]
    fn keypad_ignored_while_pending() {
        let dir = TempDir::new().unwrap();
        let mut c = registered(&dir);
        let t = enter(&mut c, "1234").unwrap();
        assert_eq!(c.press(Key::Digit(5)).unwrap(), PadOutcome::Ignored);
        assert_eq!(c.press(Key::Clear).unwrap(), PadOutcome::Ignored);
        assert_eq!(c.pin_length(), 4);
        c.resolve(t).unwrap();
    }

    #[test]
    fn stale_ticket_discarded_after_navigation() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        c.boot().unwrap();
        c.begin_recovery().unwrap();
        c.submit_recovery("1234 5678 9012").unwrap();
        c.logout().unwrap();

        let t = enter(&mut c, "1234").unwrap();
        c.factory_reset().unwrap();
        assert_eq!(c.resolve(t).unwrap(), Resolution::Discarded);
        assert_eq!(c.phase(), Phase::Unregistered(Onboarding::Welcome));
        assert_eq!(c.pin_length(), 0);
        assert!(c.session().is_none());
    }

    #[test]
    fn guided_setup_waits_for_enrollment() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        c.boot().unwrap();
        c.begin_setup(SetupKind::Guided).unwrap();
        assert!(c.vault_id().is_some());
        assert!(c.seed_phrase().is_none());
        c.acknowledge_identity().unwrap();

        let partial = EnrollmentSnapshot { status: EnrollmentStatus::Stopped, progress_tenths: 500, motion: false };
        assert!(matches!(c.complete_enrollment(&partial), Err(VaultError::Validation(_))));
        assert_eq!(c.phase(), Phase::Unregistered(Onboarding::FaceScan));

        let done = EnrollmentSnapshot { status: EnrollmentStatus::Enrolled, progress_tenths: 1000, motion: true };
        c.complete_enrollment(&done).unwrap();
        assert_eq!(c.phase(), Phase::Unregistered(Onboarding::SeedPhrase));
        assert_eq!(c.seed_phrase().unwrap().len(), SEED_WORDS);
    }

    #[test]
    fn recovery_validates_and_can_cancel() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        c.boot().unwrap();
        c.begin_recovery().unwrap();
        assert!(matches!(c.submit_recovery("12 34"), Err(VaultError::Validation(_))));
        assert_eq!(c.phase(), Phase::Unregistered(Onboarding::Recovering));
        c.cancel_recovery().unwrap();
        assert_eq!(c.phase(), Phase::Unregistered(Onboarding::Welcome));
        c.begin_recovery().unwrap();
        c.submit_recovery("9999 1000 4242").unwrap();
        assert_eq!(c.session().unwrap().vault_id, "9999 1000 4242");
        assert_eq!(c.session().unwrap().mode, Mode::Real);
    }

    #[test]
    fn fallback_vault_id() {
        let dir = TempDir::new().unwrap();
        // flag without identifier
        let mut store = VaultStore::load(dir.path(), "test").unwrap();
        store.mark_exists().unwrap();
        let mut c = controller(&dir);
        c.boot().unwrap();
        let t = enter(&mut c, "1234").unwrap();
        c.resolve(t).unwrap();
        assert_eq!(c.vault_id().as_deref(), Some(FALLBACK_VAULT_ID));
    }

    #[test]
    fn illegal_transitions_leave_state() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        assert!(matches!(c.press(Key::Digit(1)), Err(VaultError::IllegalTransition { .. })));
        c.boot().unwrap();
        let generation = c.generation();
        assert!(matches!(c.acknowledge_seed(), Err(VaultError::IllegalTransition { .. })));
        assert!(matches!(c.logout(), Err(VaultError::IllegalTransition { .. })));
        assert!(matches!(c.ledger(), Err(VaultError::NotAuthenticated)));
        assert_eq!(c.generation(), generation);
        assert_eq!(c.phase(), Phase::Unregistered(Onboarding::Welcome));
    }

    #[test]
    fn view_never_shows_mode() {
        let dir = TempDir::new().unwrap();
        let mut c = registered(&dir);
        let t = enter(&mut c, "8888").unwrap();
        c.resolve(t).unwrap();
        let json = serde_json::to_string(&c.view()).unwrap();
        assert!(!json.contains("duress"));
        assert!(!json.contains("real"));
        assert!(json.contains("\"phase\":\"authenticated\""));
    }

    #[test]
    fn transfer_ticket_dies_with_session() {
        let dir = TempDir::new().unwrap();
        let mut c = registered(&dir);
        let t = enter(&mut c, "1234").unwrap();
        c.resolve(t).unwrap();
        c.draft_transfer("10", "0xabc").unwrap();
        c.confirm_transfer().unwrap();
        let ticket = c.begin_transfer_authorization("pw").unwrap();
        c.logout().unwrap();
        let t = enter(&mut c, "1234").unwrap();
        c.resolve(t).unwrap();
        let before = c.ledger().unwrap().transaction_count();
        let err = c.complete_transfer(ticket, Ok(SigningToken("x".into()))).unwrap_err();
        assert_eq!(err, VaultError::NotAuthenticated);
        assert_eq!(c.ledger().unwrap().transaction_count(), before);
    }
}
