use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::actuator::Actuator;
use crate::detect::Detector;
use crate::error::VservoError;
use crate::policy;
use crate::render::FrameSink;
use crate::source::FrameSource;

/// Lifecycle of one tracking run. There is no paused state; the only way
/// out of `Running` is termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
    Failed,
}

/// Detector tunables forwarded untouched each cycle.
#[derive(Debug, Clone, Copy)]
pub struct DetectionTunables {
    pub scale_factor: f32,
    pub min_neighbors: u32,
}

/// Orchestrates one run: acquire frame, detect, decide and actuate per
/// detected object, optionally render. Strictly sequential; a cycle
/// completes before the next frame is pulled.
pub struct ControlLoop<S, D, A> {
    source: S,
    detector: D,
    actuator: A,
    offset: u32,
    tunables: DetectionTunables,
    sink: Option<FrameSink>,
    stop: Arc<AtomicBool>,
    state: LoopState,
    detection_only: bool,
    cycles: u64,
}

impl<S, D, A> ControlLoop<S, D, A>
where
    S: FrameSource,
    D: Detector,
    A: Actuator,
{
    pub fn new(
        source: S,
        detector: D,
        actuator: A,
        offset: u32,
        tunables: DetectionTunables,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            detector,
            actuator,
            offset,
            tunables,
            sink: None,
            stop,
            state: LoopState::Idle,
            detection_only: false,
            cycles: 0,
        }
    }

    pub fn with_sink(mut self, sink: Option<FrameSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run until the source ends, the stop flag is raised, or acquisition
    /// fails. The actuator's channel is released on every exit path.
    pub fn run(&mut self) -> Result<(), VservoError> {
        self.state = LoopState::Running;
        info!("Control loop running (tolerance {} px)", self.offset);

        let outcome = self.run_cycles();

        self.actuator.shutdown();
        match &outcome {
            Ok(()) => {
                self.state = LoopState::Stopped;
                info!("Control loop stopped cleanly after {} cycle(s)", self.cycles);
            }
            Err(err) => {
                self.state = LoopState::Failed;
                error!("Control loop failed after {} cycle(s): {}", self.cycles, err);
            }
        }
        outcome
    }

    fn run_cycles(&mut self) -> Result<(), VservoError> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                info!("Stop requested, leaving control loop");
                return Ok(());
            }

            let frame = match self.source.next_frame()? {
                Some(frame) => frame,
                None => {
                    info!("Frame source exhausted");
                    return Ok(());
                }
            };

            let gray = frame.grayscale();
            let boxes = self.detector.detect(
                &gray,
                self.tunables.scale_factor,
                self.tunables.min_neighbors,
            )?;
            self.cycles += 1;

            let center = frame.center();
            // One correction per detected object, in detector order.
            for detection in &boxes {
                let direction = policy::decide(detection.center(), center, self.offset);
                debug!(
                    "Cycle {}: object at {:?} -> {:?}",
                    self.cycles,
                    detection.center(),
                    direction
                );
                self.dispatch(direction);
            }

            if let Some(sink) = &mut self.sink {
                // Rendering is an optional collaborator; its failures never
                // end the run.
                if let Err(err) = sink.record(&frame, &boxes) {
                    warn!("Could not save annotated frame: {}", err);
                }
            }
        }
    }

    /// Send one correction, degrading to detection-only on a device error.
    /// The error is not retried; the policy is to keep observing rather
    /// than abort the run.
    fn dispatch(&mut self, direction: policy::Direction) {
        if self.detection_only {
            return;
        }
        if let Err(err) = self.actuator.aim(direction) {
            warn!(
                "Actuator '{}' failed ({}); continuing in detection-only mode",
                self.actuator.name(),
                err
            );
            self.actuator.shutdown();
            self.detection_only = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::NullActuator;
    use crate::detect::BlobDetector;
    use crate::source::ImageSource;

    fn tunables() -> DetectionTunables {
        DetectionTunables {
            scale_factor: 1.1,
            min_neighbors: 4,
        }
    }

    #[test]
    fn starts_idle() {
        let control = ControlLoop::new(
            ImageSource::new("unused.png"),
            BlobDetector::new(200),
            NullActuator,
            10,
            tunables(),
            Arc::new(AtomicBool::new(false)),
        );
        assert_eq!(control.state(), LoopState::Idle);
        assert_eq!(control.cycles(), 0);
    }

    #[test]
    fn acquisition_error_fails_the_run() {
        let mut control = ControlLoop::new(
            ImageSource::new("/nonexistent/frame.png"),
            BlobDetector::new(200),
            NullActuator,
            10,
            tunables(),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(control.run().is_err());
        assert_eq!(control.state(), LoopState::Failed);
    }

    #[test]
    fn stop_flag_exits_before_first_frame() {
        let stop = Arc::new(AtomicBool::new(true));
        let mut control = ControlLoop::new(
            ImageSource::new("/nonexistent/frame.png"),
            BlobDetector::new(200),
            NullActuator,
            10,
            tunables(),
            stop,
        );
        control.run().unwrap();
        assert_eq!(control.state(), LoopState::Stopped);
        assert_eq!(control.cycles(), 0);
    }
}
