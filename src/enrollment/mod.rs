//! Motion enrollment - a coarse liveness check over a live frame stream.
//!
//! Each frame is reduced to a 32×32 luma plane. Every 4th sample of the plane
//! is compared against the previous frame; a summed absolute difference above
//! the threshold counts as a motion tick and moves progress by 1.2 points.
//! A static picture never moves progress. Reaching 100 is final.

mod camera;
mod task;

pub use camera::{Camera, CameraLease, FrameStream, ScriptedCamera, UnavailableCamera};
pub use task::{EnrollmentHandle, EnrollmentTask};

use serde::Serialize;

use crate::error::{VaultError, VaultResult, CAMERA_DENIED_MESSAGE};

pub const GRID: usize = 32;
pub const SAMPLE_STRIDE: usize = 4;
pub const DEFAULT_MOTION_THRESHOLD: u32 = 800;

/// Progress is counted in tenths of a percent.
pub const PROGRESS_STEP: u16 = 12;
pub const PROGRESS_MAX: u16 = 1000;

pub const INSTRUCTION_POSITION: &str = "Position face in frame";
pub const INSTRUCTION_SCANNING: &str = "Scanning...";
pub const INSTRUCTION_MOVE: &str = "Move head in a circle";
pub const INSTRUCTION_ENROLLED: &str = "Face ID Enrolled";

/// One RGBA camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    rgba: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize, rgba: Vec<u8>) -> VaultResult<Self> {
        if width == 0 || height == 0 {
            return Err(VaultError::validation("frame has no pixels"));
        }
        if rgba.len() != width * height * 4 {
            return Err(VaultError::validation(format!(
                "frame buffer is {} bytes, expected {}",
                rgba.len(),
                width * height * 4
            )));
        }
        Ok(Self { width, height, rgba })
    }

    /// Uniform frame of one grey level.
    pub fn solid(width: usize, height: usize, level: u8) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let mut rgba = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            rgba.extend_from_slice(&[level, level, level, 255]);
        }
        Self { width, height, rgba }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    /// Nearest-neighbour downscale to the 32×32 grid, BT.601 luma.
    pub fn to_luma(&self) -> LumaFrame {
        let mut plane = [0u8; GRID * GRID];
        for y in 0..GRID {
            let sy = y * self.height / GRID;
            for x in 0..GRID {
                let sx = x * self.width / GRID;
                let i = (sy * self.width + sx) * 4;
                let (r, g, b) = (self.rgba[i] as u32, self.rgba[i + 1] as u32, self.rgba[i + 2] as u32);
                plane[y * GRID + x] = ((77 * r + 150 * g + 29 * b) >> 8) as u8;
            }
        }
        LumaFrame(plane)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct LumaFrame([u8; GRID * GRID]);

impl LumaFrame {
    /// Sum of absolute differences over every `SAMPLE_STRIDE`th sample.
    pub fn motion_against(&self, previous: &LumaFrame) -> u32 {
        self.0
            .iter()
            .zip(previous.0.iter())
            .step_by(SAMPLE_STRIDE)
            .map(|(a, b)| a.abs_diff(*b) as u32)
            .sum()
    }
}

impl std::fmt::Debug for LumaFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LumaFrame(32x32)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Scanning,
    Enrolled,
    Stopped,
    CameraDenied,
}

/// What the caller sees of an enrollment at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnrollmentSnapshot {
    pub status: EnrollmentStatus,
    pub progress_tenths: u16,
    pub motion: bool,
}

impl EnrollmentSnapshot {
    pub fn denied() -> Self {
        Self { status: EnrollmentStatus::CameraDenied, progress_tenths: 0, motion: false }
    }

    pub fn progress(&self) -> f32 { self.progress_tenths as f32 / 10.0 }
    pub fn is_enrolled(&self) -> bool { self.status == EnrollmentStatus::Enrolled }

    pub fn instruction(&self) -> &'static str {
        match self.status {
            EnrollmentStatus::Enrolled => INSTRUCTION_ENROLLED,
            EnrollmentStatus::CameraDenied => CAMERA_DENIED_MESSAGE,
            _ if self.progress_tenths == 0 => INSTRUCTION_POSITION,
            EnrollmentStatus::Scanning if self.motion => INSTRUCTION_SCANNING,
            _ => INSTRUCTION_MOVE,
        }
    }
}

/// Frame-by-frame progress accumulator. Owns no camera.
#[derive(Debug, Clone)]
pub struct MotionDetector {
    threshold: u32,
    previous: Option<LumaFrame>,
    progress_tenths: u16,
    motion: bool,
    status: EnrollmentStatus,
}

impl Default for MotionDetector {
    fn default() -> Self { Self::new(DEFAULT_MOTION_THRESHOLD) }
}

impl MotionDetector {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            previous: None,
            progress_tenths: 0,
            motion: false,
            status: EnrollmentStatus::Scanning,
        }
    }

    /// Feed one frame. Returns the metric, or `None` for the priming frame
    /// and for frames arriving after enrollment finished.
    pub fn observe(&mut self, frame: &Frame) -> Option<u32> {
        if self.status != EnrollmentStatus::Scanning {
            return None;
        }
        let current = frame.to_luma();
        let metric = self.previous.as_ref().map(|prev| current.motion_against(prev));
        self.previous = Some(current);

        let metric = metric?;
        self.motion = metric > self.threshold;
        if self.motion {
            self.progress_tenths = (self.progress_tenths + PROGRESS_STEP).min(PROGRESS_MAX);
            if self.progress_tenths == PROGRESS_MAX {
                self.status = EnrollmentStatus::Enrolled;
            }
        }
        Some(metric)
    }

    /// Stop without completing. No effect once enrolled.
    pub fn halt(&mut self) {
        if self.status == EnrollmentStatus::Scanning {
            self.status = EnrollmentStatus::Stopped;
            self.motion = false;
        }
    }

    pub fn snapshot(&self) -> EnrollmentSnapshot {
        EnrollmentSnapshot {
            status: self.status,
            progress_tenths: self.progress_tenths,
            motion: self.motion,
        }
    }
}
