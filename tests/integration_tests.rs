mod mocks;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mocks::{RecordingActuator, ScriptedDetector, ScriptedSource};

use vservo::actuator::{Actuator, ActuatorKind, NullActuator};
use vservo::config::Config;
use vservo::frame::BoundingBox;
use vservo::policy::Direction;
use vservo::runner::{ControlLoop, DetectionTunables, LoopState};

fn tunables() -> DetectionTunables {
    DetectionTunables {
        scale_factor: 1.1,
        min_neighbors: 4,
    }
}

fn stop_flag() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

fn box_centered_at(x: u32, y: u32) -> BoundingBox {
    BoundingBox {
        x: x - 5,
        y: y - 5,
        width: 10,
        height: 10,
    }
}

#[test]
fn two_boxes_trigger_two_corrections_in_detector_order() {
    // One 100x100 frame (center 50,50), two detections: one right of
    // tolerance, one down-left of it.
    let source = ScriptedSource::with_blank_frames(1);
    let detector = ScriptedDetector::new(vec![vec![
        box_centered_at(70, 50),
        box_centered_at(30, 70),
    ]]);
    let (actuator, log) = RecordingActuator::new();

    let mut control = ControlLoop::new(source, detector, actuator, 10, tunables(), stop_flag());
    control.run().unwrap();

    assert_eq!(control.state(), LoopState::Stopped);
    assert_eq!(control.cycles(), 1);
    assert_eq!(log.recorded(), vec![Direction::Right, Direction::DownLeft]);
}

#[test]
fn centered_object_still_reports_a_correction() {
    let source = ScriptedSource::with_blank_frames(1);
    let detector = ScriptedDetector::new(vec![vec![box_centered_at(50, 50)]]);
    let (actuator, log) = RecordingActuator::new();

    let mut control = ControlLoop::new(source, detector, actuator, 10, tunables(), stop_flag());
    control.run().unwrap();

    assert_eq!(log.recorded(), vec![Direction::Centered]);
}

#[test]
fn finite_source_stops_after_its_frames() {
    let source = ScriptedSource::with_blank_frames(3);
    let detector = ScriptedDetector::always(vec![box_centered_at(80, 50)]);
    let (actuator, log) = RecordingActuator::new();

    let mut control = ControlLoop::new(source, detector, actuator, 10, tunables(), stop_flag());
    control.run().unwrap();

    assert_eq!(control.state(), LoopState::Stopped);
    assert_eq!(control.cycles(), 3);
    assert_eq!(log.recorded().len(), 3);
    // The physical channel was released exactly once, on exit.
    assert_eq!(log.shutdown_count(), 1);
}

#[test]
fn device_error_degrades_to_detection_only() {
    // Channel breaks after the first accepted write; the run must finish
    // all frames anyway, with no further device calls.
    let source = ScriptedSource::with_blank_frames(4);
    let detector = ScriptedDetector::always(vec![box_centered_at(80, 50)]);
    let (actuator, log) = RecordingActuator::failing_after(1);

    let mut control = ControlLoop::new(source, detector, actuator, 10, tunables(), stop_flag());
    control.run().unwrap();

    assert_eq!(control.state(), LoopState::Stopped);
    assert_eq!(control.cycles(), 4);
    assert_eq!(log.recorded(), vec![Direction::Right]);
    // Released once when degrading, once on exit.
    assert_eq!(log.shutdown_count(), 2);
}

#[test]
fn acquisition_failure_fails_the_run_and_releases_the_channel() {
    let source = ScriptedSource::failing_after(2);
    let detector = ScriptedDetector::always(vec![]);
    let (actuator, log) = RecordingActuator::new();

    let mut control = ControlLoop::new(source, detector, actuator, 10, tunables(), stop_flag());
    let err = control.run().unwrap_err();

    assert!(matches!(err, vservo::error::VservoError::Acquisition(_)));
    assert_eq!(control.state(), LoopState::Failed);
    assert_eq!(control.cycles(), 2);
    assert_eq!(log.shutdown_count(), 1);
}

#[test]
fn stop_request_ends_the_run_cleanly() {
    let stop = stop_flag();
    stop.store(true, Ordering::Relaxed);

    let source = ScriptedSource::with_blank_frames(100);
    let detector = ScriptedDetector::always(vec![]);
    let (actuator, log) = RecordingActuator::new();

    let mut control = ControlLoop::new(source, detector, actuator, 10, tunables(), stop);
    control.run().unwrap();

    assert_eq!(control.state(), LoopState::Stopped);
    assert_eq!(control.cycles(), 0);
    assert_eq!(log.shutdown_count(), 1);
}

#[test]
fn null_actuator_completes_a_full_detect_decide_cycle() {
    let source = ScriptedSource::with_blank_frames(2);
    let detector = ScriptedDetector::always(vec![box_centered_at(70, 70)]);

    let mut control =
        ControlLoop::new(source, detector, NullActuator, 10, tunables(), stop_flag());
    control.run().unwrap();

    assert_eq!(control.state(), LoopState::Stopped);
    assert_eq!(control.cycles(), 2);
}

#[test]
fn missing_device_falls_back_to_null_backend() {
    // A port that cannot exist: construction fails, the run must continue
    // detection-only instead of aborting.
    let config = Config {
        port: "/nonexistent/ttyVSERVO".to_string(),
        ..Config::default()
    };
    let actuator = ActuatorKind::from_config(&config);
    assert_eq!(actuator.name(), "null");
}

#[test]
fn empty_port_means_no_actuation() {
    let config = Config {
        port: String::new(),
        ..Config::default()
    };
    let actuator = ActuatorKind::from_config(&config);
    assert_eq!(actuator.name(), "null");
}

#[cfg(not(feature = "raspberry-pi"))]
#[test]
fn servo_backend_without_hardware_support_falls_back_to_null() {
    let mut config = Config::default();
    config.servo.enabled = true;
    let actuator = ActuatorKind::from_config(&config);
    assert_eq!(actuator.name(), "null");
}
