//! Ledgers - two isolated balance/history aggregates, one per session mode.
//!
//! | Piece | Role |
//! |-------|------|
//! | `LedgerContext` | balance + transactions + notifications |
//! | `TransactionService` | validated send, read flags |
//! | `TransferFlow` | Input → Confirm → Authorize → Done around the signing call |
//! | `seed` | demo history |

mod context;
mod service;
mod transfer;
mod types;

pub mod seed;

pub use context::LedgerContext;
pub use service::{check_send, parse_amount, TransactionService};
pub use transfer::{TransferFlow, TransferStep};
pub use types::{Direction, Notification, Severity, StatusFilter, Transaction, TxStatus, ASSET};

use chrono::Utc;

use crate::error::VaultResult;
use crate::session::Mode;

/// The real and duress ledgers. A session only ever sees the one its mode selects.
#[derive(Debug, Clone)]
pub struct Ledgers {
    real: LedgerContext,
    duress: LedgerContext,
}

impl Ledgers {
    pub fn new(real: LedgerContext, duress: LedgerContext) -> Self { Self { real, duress } }

    pub fn demo() -> VaultResult<Self> {
        let now = Utc::now();
        Ok(Self::new(seed::demo_real(now)?, seed::demo_duress(now)?))
    }

    pub fn get(&self, mode: Mode) -> &LedgerContext {
        match mode {
            Mode::Real => &self.real,
            Mode::Duress => &self.duress,
        }
    }

    pub fn get_mut(&mut self, mode: Mode) -> &mut LedgerContext {
        match mode {
            Mode::Real => &mut self.real,
            Mode::Duress => &mut self.duress,
        }
    }
}
