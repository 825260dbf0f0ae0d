//! Mimivault: a dual-mode vault session. One keypad, two ledgers.
//!
//! # Architecture
//!
//! ```text
//! VaultNode (entry point)
//!   │
//!   ├── SessionController (phase machine, guarded by a tokio mutex)
//!   │     ├── Credentials  → primary PIN → Real, duress PIN → Duress
//!   │     ├── VaultStore   → <root>/<app>/data/vault.json
//!   │     └── Ledgers      → real + duress, each with its TransferFlow
//!   │
//!   ├── SigningClient (offline or HTTP enclave)
//!   │
//!   └── Camera → EnrollmentTask (motion-based liveness progress)
//! ```
//!
//! # Phases
//!
//! | Phase | Reached by | Leaves on |
//! |-------|------------|-----------|
//! | Booting | start | boot resolved |
//! | Onboarding | no vault / factory reset | setup, recovery |
//! | PinEntry | onboarding or logout | matching PIN |
//! | Authenticated | primary or duress PIN | logout, factory reset |
//!
//! The authenticated mode is never rendered. Both modes produce the same
//! [`session::SessionView`] shape and the same ledger operations.
//!
//! # Features
//!
//! - `server` - axum router and the `mimivault` binary
//! - `http-enclave` - reqwest-backed [`enclave::HttpEnclave`]
//!
//! # Usage
//!
//! ```ignore
//! use mimivault::{VaultConfig, VaultNode};
//!
//! let node = VaultNode::from_config(VaultConfig::new("mimi").with_pins("1234", "8888"))?;
//! node.boot().await?;
//! node.enter_pin("1234").await?;
//! let balance = node.balance().await?;
//! ```

pub mod auth;
pub mod core;
pub mod enclave;
pub mod enrollment;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod node;
pub mod runtime;
pub mod session;

#[cfg(feature = "server")]
pub mod server;

pub use error::{VaultError, VaultResult};
pub use node::{VaultConfig, VaultNode};
pub use runtime::{install_signal_handlers, Shutdown};
pub use session::{Mode, Phase, SessionController};

#[cfg(feature = "server")]
pub use server::{create_router, create_router_with_name};
