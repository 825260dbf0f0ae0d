//! Camera seam. A `CameraLease` owns one open stream and releases it on drop.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::Frame;
use crate::error::{VaultError, VaultResult};

#[async_trait]
pub trait Camera: Send + Sync {
    /// Acquire the device. Fails with `CameraAccessDenied`.
    async fn open(&self) -> VaultResult<Box<dyn FrameStream>>;
}

#[async_trait]
pub trait FrameStream: Send {
    /// `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<Frame>;

    /// Stop the device. Called exactly once per opened stream.
    fn release(&mut self);
}

pub struct CameraLease {
    stream: Option<Box<dyn FrameStream>>,
}

impl CameraLease {
    pub async fn acquire(camera: &dyn Camera) -> VaultResult<Self> {
        let stream = camera.open().await.map_err(|e| match e {
            VaultError::CameraAccessDenied => VaultError::CameraAccessDenied,
            other => {
                tracing::warn!(error = %other, "camera open failed");
                VaultError::CameraAccessDenied
            }
        })?;
        Ok(Self { stream: Some(stream) })
    }

    pub async fn next_frame(&mut self) -> Option<Frame> {
        match self.stream.as_mut() {
            Some(stream) => stream.next_frame().await,
            None => None,
        }
    }

    pub fn is_held(&self) -> bool { self.stream.is_some() }

    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            tracing::debug!("camera released");
        }
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) { self.release(); }
}

/// Always denies access.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCamera;

#[async_trait]
impl Camera for UnavailableCamera {
    async fn open(&self) -> VaultResult<Box<dyn FrameStream>> {
        Err(VaultError::CameraAccessDenied)
    }
}

/// Replays a fixed list of frames at a fixed interval. Counts opens and releases.
#[derive(Debug, Clone)]
pub struct ScriptedCamera {
    frames: Arc<Vec<Frame>>,
    interval: Duration,
    repeat: bool,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl ScriptedCamera {
    pub fn new(frames: Vec<Frame>, interval: Duration) -> Self {
        Self {
            frames: Arc::new(frames),
            interval,
            repeat: false,
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Loop the script forever instead of ending the stream.
    pub fn repeating(mut self) -> Self { self.repeat = true; self }

    /// A head moving in front of the lens: alternating dark and bright frames.
    pub fn moving_head(interval: Duration) -> Self {
        Self::new(vec![Frame::solid(64, 64, 30), Frame::solid(64, 64, 210)], interval).repeating()
    }

    /// A photo held up to the lens.
    pub fn still_photo(interval: Duration) -> Self {
        Self::new(vec![Frame::solid(64, 64, 128)], interval).repeating()
    }

    pub fn opened(&self) -> usize { self.opened.load(Ordering::SeqCst) }
    pub fn released(&self) -> usize { self.released.load(Ordering::SeqCst) }
}

#[async_trait]
impl Camera for ScriptedCamera {
    async fn open(&self) -> VaultResult<Box<dyn FrameStream>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedStream {
            frames: self.frames.clone(),
            interval: self.interval,
            repeat: self.repeat,
            cursor: 0,
            released: self.released.clone(),
        }))
    }
}

struct ScriptedStream {
    frames: Arc<Vec<Frame>>,
    interval: Duration,
    repeat: bool,
    cursor: usize,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl FrameStream for ScriptedStream {
    async fn next_frame(&mut self) -> Option<Frame> {
        if self.frames.is_empty() || (!self.repeat && self.cursor >= self.frames.len()) {
            return None;
        }
        tokio::time::sleep(self.interval).await;
        let frame = self.frames[self.cursor % self.frames.len()].clone();
        self.cursor += 1;
        Some(frame)
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
