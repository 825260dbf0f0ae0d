//! Enrollment Tests: motion-based face scan driven through the node
//!
//! These tests verify:
//! 1. Progress only accrues on motion and is capped
//! 2. The camera lease is released on every exit path
//! 3. A denied camera leaves onboarding where it was

use mimivault::enrollment::{
    Camera, EnrollmentStatus, EnrollmentTask, Frame, MotionDetector, ScriptedCamera, UnavailableCamera,
    INSTRUCTION_ENROLLED, PROGRESS_MAX,
};
use mimivault::enclave::OfflineEnclave;
use mimivault::session::{Onboarding, SetupKind};
use mimivault::{Phase, VaultConfig, VaultError, VaultNode};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const TICK: Duration = Duration::from_millis(16);

async fn at_face_scan(dir: &TempDir, camera: Option<Arc<dyn Camera>>) -> VaultNode {
    let config = VaultConfig::new("enroll-test").with_root(dir.path()).with_boot_delay(Duration::ZERO);
    let node = VaultNode::from_parts(config, Arc::new(OfflineEnclave), camera).expect("node");
    node.boot().await.expect("boot");
    node.begin_setup(SetupKind::Guided).await.expect("setup");
    node.acknowledge_identity().await.expect("ack");
    assert_eq!(node.phase().await, Phase::Unregistered(Onboarding::FaceScan));
    node
}

/// Test: Alternating frames reach 100% in fixed steps
#[test]
fn detector_progress_is_monotonic_and_capped() {
    let mut detector = MotionDetector::default();
    let dark = Frame::solid(320, 240, 20);
    let bright = Frame::solid(320, 240, 220);

    let mut last = 0;
    let mut frames = 0;
    while !detector.snapshot().is_enrolled() {
        detector.observe(if frames % 2 == 0 { &dark } else { &bright });
        let progress = detector.snapshot().progress_tenths;
        assert!(progress >= last);
        last = progress;
        frames += 1;
        assert!(frames < 200, "never enrolled");
    }
    assert_eq!(last, PROGRESS_MAX);
    assert_eq!(detector.snapshot().instruction(), INSTRUCTION_ENROLLED);

    // Frames after completion are ignored.
    assert_eq!(detector.observe(&dark), None);
    assert_eq!(detector.snapshot().progress_tenths, PROGRESS_MAX);
}

/// Test: Stopping mid-scan keeps progress, releases the camera, and stays on the scan screen
#[tokio::test(start_paused = true)]
async fn stop_mid_scan_releases_camera() {
    let dir = TempDir::new().expect("tempdir");
    let camera = ScriptedCamera::moving_head(TICK);
    let node = at_face_scan(&dir, Some(Arc::new(camera.clone()))).await;

    node.start_enrollment().await.expect("start");
    tokio::time::sleep(TICK * 20).await;
    let snap = node.stop_enrollment().await.expect("running");

    assert_eq!(snap.status, EnrollmentStatus::Stopped);
    assert!(snap.progress_tenths > 0 && snap.progress_tenths < PROGRESS_MAX);
    assert_eq!(camera.opened(), 1);
    assert_eq!(camera.released(), 1);
    assert_eq!(node.phase().await, Phase::Unregistered(Onboarding::FaceScan));

    // A second attempt starts over on a fresh lease.
    let restarted = node.start_enrollment().await.expect("restart");
    assert_eq!(restarted.progress_tenths, 0);
    assert_eq!(camera.opened(), 2);
}

/// Test: Factory reset during a scan stops it and frees the camera
#[tokio::test(start_paused = true)]
async fn reset_during_scan_releases_camera() {
    let dir = TempDir::new().expect("tempdir");
    let camera = ScriptedCamera::moving_head(TICK);
    let node = at_face_scan(&dir, Some(Arc::new(camera.clone()))).await;

    node.start_enrollment().await.expect("start");
    tokio::time::sleep(TICK * 5).await;
    node.factory_reset().await.expect("reset");

    assert_eq!(camera.released(), 1);
    assert!(node.enrollment_status().await.is_none());
    assert_eq!(node.phase().await, Phase::Unregistered(Onboarding::Welcome));
}

/// Test: A photo held to the lens never completes enrollment
#[tokio::test(start_paused = true)]
async fn still_image_never_completes() {
    let dir = TempDir::new().expect("tempdir");
    let node = at_face_scan(&dir, Some(Arc::new(ScriptedCamera::still_photo(TICK)))).await;

    node.start_enrollment().await.expect("start");
    tokio::time::sleep(Duration::from_secs(30)).await;
    let snap = node.enrollment_status().await.expect("running");
    assert_eq!(snap.progress_tenths, 0);
    assert_eq!(node.phase().await, Phase::Unregistered(Onboarding::FaceScan));
}

/// Test: Denied camera surfaces the message and allows retry
#[tokio::test]
async fn denied_camera_keeps_phase() {
    let dir = TempDir::new().expect("tempdir");
    let node = at_face_scan(&dir, Some(Arc::new(UnavailableCamera))).await;

    let err = node.start_enrollment().await.unwrap_err();
    assert_eq!(err, VaultError::CameraAccessDenied);
    assert_eq!(err.to_string(), "Camera access needed for enrollment.");
    assert!(node.enrollment_status().await.is_none());
    assert!(node.start_enrollment().await.is_err());
    assert_eq!(node.phase().await, Phase::Unregistered(Onboarding::FaceScan));
}

/// Test: Enrollment outside the face scan step is refused
#[tokio::test]
async fn enrollment_requires_face_scan_step() {
    let dir = TempDir::new().expect("tempdir");
    let config = VaultConfig::new("enroll-test").with_root(dir.path()).with_boot_delay(Duration::ZERO);
    let camera = ScriptedCamera::moving_head(TICK);
    let node = VaultNode::from_parts(config, Arc::new(OfflineEnclave), Some(Arc::new(camera.clone()))).expect("node");
    node.boot().await.expect("boot");

    let err = node.start_enrollment().await.unwrap_err();
    assert!(matches!(err, VaultError::IllegalTransition { .. }));
    assert_eq!(camera.opened(), 0);
}

/// Test: A finite stream ends the task as stopped
#[tokio::test(start_paused = true)]
async fn exhausted_stream_stops() {
    let camera = ScriptedCamera::new(vec![Frame::solid(8, 8, 0), Frame::solid(8, 8, 255)], TICK);
    let handle = EnrollmentTask::start(Arc::new(camera.clone()), 800).await.expect("start");
    let snap = handle.wait().await;
    assert_eq!(snap.status, EnrollmentStatus::Stopped);
    assert!(snap.progress_tenths > 0);
    assert_eq!(camera.released(), 1);
}
