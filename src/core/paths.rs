//! Route constants for the HTTP adapter.
//!
//! Centralized so the router, the CLI and the tests agree on one table.

/// Session and keypad
pub mod session {
    pub const VIEW: &str = "/session";
    pub const BOOT: &str = "/session/boot";
    pub const KEYPAD: &str = "/session/keypad";
    pub const PIN: &str = "/session/pin";
    pub const LOGOUT: &str = "/session/logout";
    pub const RESET: &str = "/session/reset";
}

/// Onboarding sub-flow
pub mod onboarding {
    pub const SETUP: &str = "/onboarding/setup";
    pub const IDENTITY_ACK: &str = "/onboarding/identity/ack";
    pub const SEED_ACK: &str = "/onboarding/seed/ack";
    pub const RECOVER: &str = "/onboarding/recover";
    pub const RECOVER_SUBMIT: &str = "/onboarding/recover/submit";
    pub const RECOVER_CANCEL: &str = "/onboarding/recover/cancel";
}

/// Face enrollment
pub mod enrollment {
    pub const STATUS: &str = "/enrollment";
    pub const START: &str = "/enrollment/start";
    pub const STOP: &str = "/enrollment/stop";
}

/// Bound ledger
pub mod ledger {
    pub const BALANCE: &str = "/ledger/balance";
    pub const TRANSACTIONS: &str = "/ledger/transactions";
    pub const TRANSACTION: &str = "/ledger/transactions/:id";
    pub const NOTIFICATIONS: &str = "/ledger/notifications";
    pub const NOTIFICATION_READ: &str = "/ledger/notifications/:id/read";
    pub const NOTIFICATION_TRANSACTION: &str = "/ledger/notifications/:id/transaction";
    pub const NOTIFICATIONS_READ_ALL: &str = "/ledger/notifications/read-all";
    pub const TRANSFER: &str = "/ledger/transfer";
    pub const TRANSFER_CONFIRM: &str = "/ledger/transfer/confirm";
    pub const TRANSFER_BACK: &str = "/ledger/transfer/back";
    pub const TRANSFER_AUTHORIZE: &str = "/ledger/transfer/authorize";
}

pub const HEALTH: &str = "/health";
