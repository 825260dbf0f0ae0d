//! Session phases, events, and the transition table.
//!
//! ```text
//! Booting ──► Unregistered(Welcome) ──► … ──► Registering(SetPin) ──► Registering(ConfirmPin) ──► Authenticated(Real)
//!    │                                                 ▲                        │ mismatch
//!    │                                                 └────────────────────────┘
//!    └──────► Authenticating ──► Authenticated(Real | Duress) ──► LoggedOut ──► Authenticating | Unregistered
//! ```
//!
//! Labels never carry the mode, so phases can be logged and shown freely.

use serde::{Deserialize, Serialize};

use super::onboarding::SetupKind;

/// Which ledger a session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Real,
    Duress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Onboarding {
    Welcome,
    IdentityIssued,
    FaceScan,
    SeedPhrase,
    Recovering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinStep {
    SetPin,
    ConfirmPin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Booting,
    Unregistered(Onboarding),
    Registering(PinStep),
    Authenticating,
    Authenticated(Mode),
    LoggedOut,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Booting => "booting",
            Phase::Unregistered(_) => "unregistered",
            Phase::Registering(_) => "registering",
            Phase::Authenticating => "authenticating",
            Phase::Authenticated(_) => "authenticated",
            Phase::LoggedOut => "logged_out",
        }
    }

    /// Sub-step within the phase, if it has one.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            Phase::Unregistered(o) => Some(match o {
                Onboarding::Welcome => "welcome",
                Onboarding::IdentityIssued => "identity_issued",
                Onboarding::FaceScan => "face_scan",
                Onboarding::SeedPhrase => "seed_phrase",
                Onboarding::Recovering => "recovering",
            }),
            Phase::Registering(PinStep::SetPin) => Some("set_pin"),
            Phase::Registering(PinStep::ConfirmPin) => Some("confirm_pin"),
            _ => None,
        }
    }

    /// `name` or `name/step`.
    pub fn label(&self) -> String {
        match self.step() {
            Some(step) => format!("{}/{}", self.name(), step),
            None => self.name().to_string(),
        }
    }

    pub fn accepts_pin(&self) -> bool {
        matches!(self, Phase::Registering(_) | Phase::Authenticating)
    }

    pub fn mode(&self) -> Option<Mode> {
        match self {
            Phase::Authenticated(mode) => Some(*mode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    BootResolved { vault_exists: bool },
    BeginSetup(SetupKind),
    IdentityAcknowledged,
    EnrollmentCompleted,
    SeedAcknowledged,
    BeginRecovery,
    RecoveryAccepted,
    CancelRecovery,
    PinCaptured,
    PinConfirmed,
    PinMismatch,
    CredentialAccepted(Mode),
    Logout,
    Resume { vault_exists: bool },
    FactoryReset,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::BootResolved { .. } => "boot_resolved",
            Event::BeginSetup(_) => "begin_setup",
            Event::IdentityAcknowledged => "identity_acknowledged",
            Event::EnrollmentCompleted => "enrollment_completed",
            Event::SeedAcknowledged => "seed_acknowledged",
            Event::BeginRecovery => "begin_recovery",
            Event::RecoveryAccepted => "recovery_accepted",
            Event::CancelRecovery => "cancel_recovery",
            Event::PinCaptured => "pin_captured",
            Event::PinConfirmed => "pin_confirmed",
            Event::PinMismatch => "pin_mismatch",
            Event::CredentialAccepted(_) => "credential_accepted",
            Event::Logout => "logout",
            Event::Resume { .. } => "resume",
            Event::FactoryReset => "factory_reset",
        }
    }
}

/// The whole transition table. `None` means the event is illegal in `phase`.
pub fn next_phase(phase: Phase, event: Event) -> Option<Phase> {
    use Onboarding::*;
    use PinStep::*;

    let next = match (phase, event) {
        (Phase::Booting, Event::BootResolved { vault_exists: true }) => Phase::Authenticating,
        (Phase::Booting, Event::BootResolved { vault_exists: false }) => Phase::Unregistered(Welcome),

        (Phase::Unregistered(Welcome), Event::BeginSetup(SetupKind::Standard)) => Phase::Unregistered(SeedPhrase),
        (Phase::Unregistered(Welcome), Event::BeginSetup(SetupKind::Guided)) => Phase::Unregistered(IdentityIssued),
        (Phase::Unregistered(IdentityIssued), Event::IdentityAcknowledged) => Phase::Unregistered(FaceScan),
        (Phase::Unregistered(FaceScan), Event::EnrollmentCompleted) => Phase::Unregistered(SeedPhrase),
        (Phase::Unregistered(SeedPhrase), Event::SeedAcknowledged) => Phase::Registering(SetPin),
        (Phase::Unregistered(Welcome), Event::BeginRecovery) => Phase::Unregistered(Recovering),
        (Phase::Unregistered(Recovering), Event::RecoveryAccepted) => Phase::Authenticated(Mode::Real),
        (Phase::Unregistered(Recovering), Event::CancelRecovery) => Phase::Unregistered(Welcome),

        (Phase::Registering(SetPin), Event::PinCaptured) => Phase::Registering(ConfirmPin),
        (Phase::Registering(ConfirmPin), Event::PinConfirmed) => Phase::Authenticated(Mode::Real),
        (Phase::Registering(ConfirmPin), Event::PinMismatch) => Phase::Registering(SetPin),

        (Phase::Authenticating, Event::CredentialAccepted(mode)) => Phase::Authenticated(mode),

        (Phase::Authenticated(_), Event::Logout) => Phase::LoggedOut,
        (Phase::LoggedOut, Event::Resume { vault_exists: true }) => Phase::Authenticating,
        (Phase::LoggedOut, Event::Resume { vault_exists: false }) => Phase::Unregistered(Welcome),

        (Phase::Booting, Event::FactoryReset) => return None,
        (_, Event::FactoryReset) => Phase::LoggedOut,

        _ => return None,
    };
    Some(next)
}
