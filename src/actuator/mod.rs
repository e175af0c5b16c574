mod null;
mod serial;
mod servo;

use enum_dispatch::enum_dispatch;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::VservoError;
use crate::policy::Direction;

pub use null::NullActuator;
pub use serial::SerialActuator;
pub use servo::{PwmChannel, Servo, ServoPairActuator};

/// A device that consumes centering corrections.
///
/// `aim` is side-effecting and may fail with a device error when the
/// physical channel breaks mid-run; `shutdown` releases the channel and is
/// safe to call more than once.
#[enum_dispatch(ActuatorKind)]
pub trait Actuator {
    fn aim(&mut self, direction: Direction) -> Result<(), VservoError>;

    fn name(&self) -> &'static str;

    /// Release the physical channel. Safe to call more than once.
    fn shutdown(&mut self);
}

/// The closed set of actuator backends, selected once at startup.
#[enum_dispatch]
pub enum ActuatorKind {
    Serial(SerialActuator),
    ServoPair(ServoPairActuator),
    Null(NullActuator),
}

impl ActuatorKind {
    /// Pick and construct the backend the configuration asks for.
    ///
    /// A backend that cannot be constructed is replaced by the null
    /// actuator with a single warning: the run continues in detection-only
    /// mode instead of aborting.
    pub fn from_config(config: &Config) -> Self {
        let attempt = if config.servo.enabled {
            ServoPairActuator::from_config(&config.servo).map(ActuatorKind::from)
        } else if !config.port.is_empty() {
            SerialActuator::connect(&config.port, config.serial.baud_rate).map(ActuatorKind::from)
        } else {
            info!("No actuator configured; running detection-only");
            return NullActuator.into();
        };

        match attempt {
            Ok(actuator) => {
                info!("Actuator backend ready: {}", actuator.name());
                actuator
            }
            Err(err) => {
                warn!("{err}. Running without actuation.");
                NullActuator.into()
            }
        }
    }
}
