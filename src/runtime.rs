//! Process lifetime for `mimivault serve`.
//!
//! A single [`Shutdown`] latch is flipped by SIGINT/SIGTERM (Ctrl+C off unix)
//! and awaited by axum's graceful shutdown before the camera is released.

use std::sync::Arc;
use tokio::sync::watch;

/// One-way latch shared by the signal task and the server.
#[derive(Clone)]
pub struct Shutdown {
    latch: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self { Self::new() }
}

impl Shutdown {
    pub fn new() -> Self {
        let (latch, _) = watch::channel(false);
        Self { latch: Arc::new(latch) }
    }

    /// Receiver that observes the latch; already-set latches are visible immediately.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.latch.subscribe()
    }

    /// Flip the latch. Later calls change nothing.
    pub fn trigger(&self) {
        let flipped = self.latch.send_if_modified(|stopped| !std::mem::replace(stopped, true));
        if flipped {
            tracing::info!("shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool { *self.latch.borrow() }

    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// Spawn the signal listener and hand back the latch it flips.
pub fn install_signal_handlers() -> Shutdown {
    let shutdown = Shutdown::new();
    let latch = shutdown.clone();

    tokio::spawn(async move {
        match next_signal().await {
            Ok(name) => tracing::info!(signal = name, "received signal"),
            Err(e) => {
                tracing::error!(error = %e, "signal listener unavailable");
                return;
            }
        }
        latch.trigger();
    });

    shutdown
}

#[cfg(unix)]
async fn next_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    Ok(tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = int.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn next_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn latch_flips_once() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert!(!shutdown.is_triggered());

        shutdown.trigger();
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();
        shutdown.trigger();
        assert!(!rx.has_changed().unwrap());
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn waiters_before_and_after_trigger_both_return() {
        let shutdown = Shutdown::new();
        let early = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { shutdown.wait().await }
        });
        tokio::task::yield_now().await;
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), early).await.unwrap().unwrap();
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait()).await.unwrap();
    }
}
