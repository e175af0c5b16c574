use tracing::debug;

use super::Actuator;
use crate::error::VservoError;
use crate::policy::Direction;

/// Backend used when no physical device is reachable: accepts every
/// correction and performs no device effect. Detection-only mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActuator;

impl Actuator for NullActuator {
    fn aim(&mut self, direction: Direction) -> Result<(), VservoError> {
        debug!(target: "actuator", "Discarding correction {:?}", direction);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }

    fn shutdown(&mut self) {}
}
