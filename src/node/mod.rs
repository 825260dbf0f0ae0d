//! VaultNode - shared async facade over the session, signer and camera.
//!
//! The controller sits behind a tokio mutex. The lock is never held across
//! the PIN delay, the signing call, or camera I/O, so navigation during those
//! waits is observed and stale results are discarded.
//!
//! Work that must finish once a ticket is issued (PIN resolution, transfer
//! completion) runs on a spawned task. A caller that goes away mid-wait, such
//! as a disconnected HTTP client, cannot leave the keypad or transfer locked.

mod config;

pub use config::{VaultConfig, DEFAULT_APP};

use rust_decimal::Decimal;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

use crate::auth::{Credentials, Key, VaultStore, PIN_LENGTH};
use crate::enclave::{OfflineEnclave, SigningClient};
use crate::enrollment::{Camera, EnrollmentHandle, EnrollmentSnapshot, EnrollmentTask};
use crate::error::{VaultError, VaultResult};
use crate::ledger::{Ledgers, Notification, StatusFilter, Transaction};
use crate::session::{
    AuthenticatedSession, Onboarding, PadOutcome, Phase, Resolution, SessionController, SessionView, SetupKind,
};

#[derive(Clone)]
pub struct VaultNode {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    session: Mutex<SessionController>,
    enrollment: Mutex<Option<EnrollmentHandle>>,
    signer: Arc<dyn SigningClient>,
    camera: Option<Arc<dyn Camera>>,
    config: VaultConfig,
}

impl VaultNode {
    /// Node with the signer implied by the config and no camera.
    pub fn from_config(config: VaultConfig) -> VaultResult<Self> {
        let signer = default_signer(&config)?;
        Self::from_parts(config, signer, None)
    }

    pub fn from_parts(
        config: VaultConfig,
        signer: Arc<dyn SigningClient>,
        camera: Option<Arc<dyn Camera>>,
    ) -> VaultResult<Self> {
        let credentials = Credentials::from_pins(&config.primary_pin, &config.duress_pin)?;
        let store = VaultStore::load(&config.resolved_root(), &config.app)?;
        let ledgers = Ledgers::demo()?;
        let session = SessionController::new(credentials, store, ledgers);
        tracing::info!(app = %config.app, camera = camera.is_some(), "vault node ready");
        Ok(Self {
            inner: Arc::new(NodeInner {
                session: Mutex::new(session),
                enrollment: Mutex::new(None),
                signer,
                camera,
                config,
            }),
        })
    }

    pub fn config(&self) -> &VaultConfig { &self.inner.config }

    /// Simulated hardware boot, then route on the persisted flag.
    pub async fn boot(&self) -> VaultResult<SessionView> {
        tokio::time::sleep(self.inner.config.boot_delay).await;
        let mut session = self.inner.session.lock().await;
        session.boot()?;
        Ok(session.view())
    }

    pub async fn view(&self) -> SessionView { self.inner.session.lock().await.view() }

    pub async fn phase(&self) -> Phase { self.inner.session.lock().await.phase() }

    pub async fn session(&self) -> Option<AuthenticatedSession> {
        self.inner.session.lock().await.session()
    }

    // -------------------------------------------------------------------------
    // Keypad
    // -------------------------------------------------------------------------

    /// One key. On the 4th digit, waits the PIN delay and validates.
    pub async fn press(&self, key: Key) -> VaultResult<Option<Resolution>> {
        let outcome = self.inner.session.lock().await.press(key)?;
        let PadOutcome::Submitted(ticket) = outcome else {
            return Ok(None);
        };
        let inner = self.inner.clone();
        let resolving = tokio::spawn(async move {
            tokio::time::sleep(inner.config.pin_delay).await;
            inner.session.lock().await.resolve(ticket)
        });
        let resolution = resolving
            .await
            .map_err(|e| VaultError::validation(format!("PIN validation aborted: {e}")))??;
        Ok(Some(resolution))
    }

    /// Type a whole PIN.
    pub async fn enter_pin(&self, digits: &str) -> VaultResult<Resolution> {
        let keys: Vec<Key> = digits
            .chars()
            .map(|c| c.to_digit(10).map(|d| Key::Digit(d as u8)))
            .collect::<Option<_>>()
            .filter(|keys: &Vec<Key>| keys.len() == PIN_LENGTH)
            .ok_or_else(|| VaultError::validation(format!("PIN must be {PIN_LENGTH} digits")))?;

        {
            let mut session = self.inner.session.lock().await;
            if session.is_pending() {
                return Err(VaultError::validation("Validation already in progress"));
            }
            session.press(Key::Clear)?;
        }
        let mut last = Resolution::Discarded;
        for key in keys {
            if let Some(resolution) = self.press(key).await? {
                last = resolution;
            }
        }
        Ok(last)
    }

    // -------------------------------------------------------------------------
    // Onboarding
    // -------------------------------------------------------------------------

    pub async fn begin_setup(&self, kind: SetupKind) -> VaultResult<SessionView> {
        self.with_session(|s| s.begin_setup(kind)).await
    }

    pub async fn acknowledge_identity(&self) -> VaultResult<SessionView> {
        self.with_session(|s| s.acknowledge_identity()).await
    }

    pub async fn acknowledge_seed(&self) -> VaultResult<SessionView> {
        self.with_session(|s| s.acknowledge_seed()).await
    }

    pub async fn begin_recovery(&self) -> VaultResult<SessionView> {
        self.with_session(|s| s.begin_recovery()).await
    }

    pub async fn cancel_recovery(&self) -> VaultResult<SessionView> {
        self.with_session(|s| s.cancel_recovery()).await
    }

    pub async fn submit_recovery(&self, vault_id: &str) -> VaultResult<SessionView> {
        self.with_session(|s| s.submit_recovery(vault_id)).await
    }

    pub async fn logout(&self) -> VaultResult<SessionView> {
        self.stop_enrollment().await;
        self.with_session(|s| s.logout()).await
    }

    pub async fn factory_reset(&self) -> VaultResult<SessionView> {
        self.stop_enrollment().await;
        self.with_session(|s| s.factory_reset()).await
    }

    // -------------------------------------------------------------------------
    // Enrollment
    // -------------------------------------------------------------------------

    /// Start the face scan. Completion advances onboarding on its own.
    pub async fn start_enrollment(&self) -> VaultResult<EnrollmentSnapshot> {
        let phase = self.phase().await;
        if phase != Phase::Unregistered(Onboarding::FaceScan) {
            return Err(VaultError::IllegalTransition { phase: phase.label(), event: "start_enrollment".into() });
        }
        let camera = self.inner.camera.clone().ok_or(VaultError::CameraAccessDenied)?;

        self.stop_enrollment().await;
        let handle = EnrollmentTask::start(camera, self.inner.config.motion_threshold).await?;
        let snapshot = handle.snapshot();
        spawn_completion_watch(Arc::downgrade(&self.inner), handle.subscribe());
        *self.inner.enrollment.lock().await = Some(handle);
        Ok(snapshot)
    }

    pub async fn enrollment_status(&self) -> Option<EnrollmentSnapshot> {
        self.inner.enrollment.lock().await.as_ref().map(EnrollmentHandle::snapshot)
    }

    /// Stop any running scan and release the camera.
    pub async fn stop_enrollment(&self) -> Option<EnrollmentSnapshot> {
        let handle = self.inner.enrollment.lock().await.take()?;
        handle.stop();
        Some(handle.wait().await)
    }

    // -------------------------------------------------------------------------
    // Ledger
    // -------------------------------------------------------------------------

    pub async fn balance(&self) -> VaultResult<Decimal> {
        Ok(self.inner.session.lock().await.ledger()?.balance())
    }

    pub async fn transactions(&self, filter: StatusFilter) -> VaultResult<Vec<Transaction>> {
        let session = self.inner.session.lock().await;
        Ok(session.ledger()?.transactions_with_status(filter).into_iter().cloned().collect())
    }

    pub async fn transaction(&self, id: &str) -> VaultResult<Option<Transaction>> {
        Ok(self.inner.session.lock().await.ledger()?.transaction(id).cloned())
    }

    pub async fn notifications(&self) -> VaultResult<Vec<Notification>> {
        Ok(self.inner.session.lock().await.ledger()?.notifications().cloned().collect())
    }

    pub async fn linked_transaction(&self, notification_id: u64) -> VaultResult<Option<Transaction>> {
        Ok(self.inner.session.lock().await.ledger()?.linked_transaction(notification_id).cloned())
    }

    pub async fn mark_read(&self, notification_id: u64) -> VaultResult<bool> {
        self.inner.session.lock().await.mark_read(notification_id)
    }

    pub async fn mark_all_read(&self) -> VaultResult<usize> {
        self.inner.session.lock().await.mark_all_read()
    }

    // -------------------------------------------------------------------------
    // Transfer
    // -------------------------------------------------------------------------

    pub async fn draft_transfer(&self, amount: &str, recipient: &str) -> VaultResult<SessionView> {
        self.with_session(|s| s.draft_transfer(amount, recipient).map(|_| ())).await
    }

    pub async fn confirm_transfer(&self) -> VaultResult<SessionView> {
        self.with_session(|s| s.confirm_transfer().map(|_| ())).await
    }

    pub async fn transfer_back(&self) -> VaultResult<SessionView> {
        self.with_session(|s| s.transfer_back().map(|_| ())).await
    }

    pub async fn cancel_transfer(&self) -> SessionView {
        let mut session = self.inner.session.lock().await;
        session.cancel_transfer();
        session.view()
    }

    /// Check the password, call the enclave, then apply the send.
    pub async fn authorize_transfer(&self, password: &str) -> VaultResult<Transaction> {
        let ticket = self.inner.session.lock().await.begin_transfer_authorization(password)?;
        let inner = self.inner.clone();
        let signing = tokio::spawn(async move {
            let signed = inner.signer.sign(&ticket.probe).await;
            if let Err(e) = &signed {
                tracing::warn!(error = %e, "enclave call failed");
            }
            inner.session.lock().await.complete_transfer(ticket, signed)
        });
        signing
            .await
            .map_err(|e| VaultError::EnclaveUnreachable(format!("signing task aborted: {e}")))?
    }

    async fn with_session<F>(&self, f: F) -> VaultResult<SessionView>
    where
        F: FnOnce(&mut SessionController) -> VaultResult<()>,
    {
        let mut session = self.inner.session.lock().await;
        f(&mut session)?;
        Ok(session.view())
    }
}

fn spawn_completion_watch(inner: Weak<NodeInner>, mut rx: tokio::sync::watch::Receiver<EnrollmentSnapshot>) {
    tokio::spawn(async move {
        let snapshot = match rx.wait_for(EnrollmentSnapshot::is_enrolled).await {
            Ok(snap) => *snap,
            Err(_) => return,
        };
        let Some(inner) = inner.upgrade() else { return };
        let mut session = inner.session.lock().await;
        if let Err(e) = session.complete_enrollment(&snapshot) {
            tracing::warn!(error = %e, "enrollment finished outside face scan");
        }
    });
}

/// HTTP enclave when a URL is configured, otherwise the offline signer.
pub fn default_signer(config: &VaultConfig) -> VaultResult<Arc<dyn SigningClient>> {
    match config.enclave_url.as_deref() {
        #[cfg(feature = "http-enclave")]
        Some(url) => Ok(Arc::new(crate::enclave::HttpEnclave::new(url, config.enclave_timeout)?)),
        #[cfg(not(feature = "http-enclave"))]
        Some(_) => Err(VaultError::Config("enclave URL set but http-enclave feature disabled".into())),
        None => Ok(Arc::new(OfflineEnclave)),
    }
}
