use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use image::{GrayImage, RgbImage};

use vservo::actuator::Actuator;
use vservo::detect::Detector;
use vservo::error::VservoError;
use vservo::frame::{BoundingBox, Frame};
use vservo::policy::Direction;
use vservo::source::FrameSource;

/// Frame source fed from a fixed script of frames. Optionally fails with an
/// acquisition error once the script is exhausted instead of ending.
pub struct ScriptedSource {
    frames: VecDeque<Frame>,
    fail_at_end: bool,
}

impl ScriptedSource {
    pub fn with_blank_frames(count: usize) -> Self {
        let frames = (0..count)
            .map(|_| Frame::new(RgbImage::new(100, 100)))
            .collect();
        Self {
            frames,
            fail_at_end: false,
        }
    }

    pub fn failing_after(count: usize) -> Self {
        let mut source = Self::with_blank_frames(count);
        source.fail_at_end = true;
        source
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VservoError> {
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None if self.fail_at_end => {
                Err(VservoError::Acquisition("mock device unplugged".to_string()))
            }
            None => Ok(None),
        }
    }
}

/// Detector returning a scripted set of boxes per cycle; repeats the last
/// entry once the script runs out.
pub struct ScriptedDetector {
    per_cycle: Mutex<VecDeque<Vec<BoundingBox>>>,
    fallback: Vec<BoundingBox>,
}

impl ScriptedDetector {
    pub fn new(per_cycle: Vec<Vec<BoundingBox>>) -> Self {
        let fallback = per_cycle.last().cloned().unwrap_or_default();
        Self {
            per_cycle: Mutex::new(per_cycle.into()),
            fallback,
        }
    }

    pub fn always(boxes: Vec<BoundingBox>) -> Self {
        Self {
            per_cycle: Mutex::new(VecDeque::new()),
            fallback: boxes,
        }
    }
}

impl Detector for ScriptedDetector {
    fn detect(
        &self,
        _gray: &GrayImage,
        _scale_factor: f32,
        _min_neighbors: u32,
    ) -> Result<Vec<BoundingBox>, VservoError> {
        let mut script = self.per_cycle.lock().unwrap();
        Ok(script.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Shared view into what a [`RecordingActuator`] observed.
#[derive(Clone, Default)]
pub struct ActuatorLog {
    pub directions: Arc<Mutex<Vec<Direction>>>,
    pub shutdowns: Arc<Mutex<u32>>,
}

impl ActuatorLog {
    pub fn recorded(&self) -> Vec<Direction> {
        self.directions.lock().unwrap().clone()
    }

    pub fn shutdown_count(&self) -> u32 {
        *self.shutdowns.lock().unwrap()
    }
}

/// Actuator double that records every correction; can be told to fail after
/// a given number of accepted calls.
pub struct RecordingActuator {
    log: ActuatorLog,
    fail_after: Option<usize>,
    accepted: usize,
}

impl RecordingActuator {
    pub fn new() -> (Self, ActuatorLog) {
        let log = ActuatorLog::default();
        (
            Self {
                log: log.clone(),
                fail_after: None,
                accepted: 0,
            },
            log,
        )
    }

    pub fn failing_after(accepted: usize) -> (Self, ActuatorLog) {
        let (mut actuator, log) = Self::new();
        actuator.fail_after = Some(accepted);
        (actuator, log)
    }
}

impl Actuator for RecordingActuator {
    fn aim(&mut self, direction: Direction) -> Result<(), VservoError> {
        if let Some(limit) = self.fail_after {
            if self.accepted >= limit {
                return Err(VservoError::Device("mock channel broke".to_string()));
            }
        }
        self.accepted += 1;
        self.log.directions.lock().unwrap().push(direction);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }

    fn shutdown(&mut self) {
        *self.log.shutdowns.lock().unwrap() += 1;
    }
}
