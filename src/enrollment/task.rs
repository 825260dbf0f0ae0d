//! The enrollment loop as a cancellable tokio task bound to one camera lease.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::camera::{Camera, CameraLease};
use super::{EnrollmentSnapshot, EnrollmentStatus, MotionDetector};
use crate::error::VaultResult;

pub struct EnrollmentTask;

impl EnrollmentTask {
    /// Acquire the camera and start consuming frames.
    ///
    /// Fails with `CameraAccessDenied` before anything is spawned; calling
    /// again later is allowed.
    pub async fn start(camera: Arc<dyn Camera>, threshold: u32) -> VaultResult<EnrollmentHandle> {
        let lease = CameraLease::acquire(camera.as_ref()).await?;
        let detector = MotionDetector::new(threshold);
        let (snapshot_tx, snapshot_rx) = watch::channel(detector.snapshot());
        let (stop_tx, stop_rx) = broadcast::channel(1);

        tracing::info!(threshold, "enrollment started");
        let join = tokio::spawn(run(lease, detector, snapshot_tx, stop_rx));
        Ok(EnrollmentHandle { snapshot: snapshot_rx, stop: stop_tx, join: Some(join) })
    }
}

async fn run(
    mut lease: CameraLease,
    mut detector: MotionDetector,
    snapshot: watch::Sender<EnrollmentSnapshot>,
    mut stop: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = stop.recv() => {
                detector.halt();
                break;
            }
            frame = lease.next_frame() => match frame {
                Some(frame) => {
                    if let Some(metric) = detector.observe(&frame) {
                        let snap = detector.snapshot();
                        tracing::debug!(metric, progress = snap.progress_tenths, "enrollment tick");
                        snapshot.send_replace(snap);
                        if snap.is_enrolled() {
                            tracing::info!("enrollment complete");
                            break;
                        }
                    }
                }
                None => {
                    detector.halt();
                    break;
                }
            }
        }
    }
    lease.release();
    snapshot.send_replace(detector.snapshot());
}

/// Owner side of a running enrollment. Dropping it stops the loop.
pub struct EnrollmentHandle {
    snapshot: watch::Receiver<EnrollmentSnapshot>,
    stop: broadcast::Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl EnrollmentHandle {
    pub fn snapshot(&self) -> EnrollmentSnapshot { *self.snapshot.borrow() }

    pub fn subscribe(&self) -> watch::Receiver<EnrollmentSnapshot> { self.snapshot.clone() }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().map(|j| !j.is_finished()).unwrap_or(false)
    }

    pub fn stop(&self) {
        let _ = self.stop.send(());
    }

    /// Wait for the loop to end and return its final snapshot.
    pub async fn wait(mut self) -> EnrollmentSnapshot {
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                tracing::warn!(error = %e, "enrollment task failed");
            }
        }
        let snap = *self.snapshot.borrow();
        if snap.status == EnrollmentStatus::Scanning {
            // Task died without reporting; treat as stopped.
            return EnrollmentSnapshot { status: EnrollmentStatus::Stopped, motion: false, ..snap };
        }
        snap
    }
}

impl Drop for EnrollmentHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.stop();
        }
    }
}
