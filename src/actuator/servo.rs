use tracing::debug;

use super::Actuator;
use crate::config;
use crate::error::VservoError;
use crate::policy::{Direction, Horizontal, Vertical};

/// One PWM output line driving a servo. Implemented by the Raspberry Pi
/// hardware channel and by recording doubles in tests.
pub trait PwmChannel: Send {
    /// Apply a duty cycle, in percent of the 50 Hz period.
    fn set_duty_cycle(&mut self, duty_percent: f64) -> Result<(), VservoError>;

    /// Stop driving the line. Called on actuator shutdown.
    fn release(&mut self);
}

/// A single servo axis: an angle accumulator clamped to its degree range,
/// mapped onto the channel's electrical duty range.
///
/// The angle is owned exclusively by this value; all adjustments go through
/// [`Servo::set_angle`].
pub struct Servo {
    channel: Box<dyn PwmChannel>,
    min_degree: i32,
    max_degree: i32,
    current_angle: i32,
}

impl Servo {
    pub fn new(channel: Box<dyn PwmChannel>, min_degree: i32, max_degree: i32) -> Self {
        Self {
            channel,
            min_degree,
            max_degree,
            current_angle: 0,
        }
    }

    pub fn current_angle(&self) -> i32 {
        self.current_angle
    }

    /// Clamp the requested angle to the configured range and apply it.
    ///
    /// `current_angle` only changes when the channel accepted the command.
    pub fn set_angle(&mut self, angle: i32) -> Result<(), VservoError> {
        let clamped = angle.clamp(self.min_degree, self.max_degree);
        self.channel.set_duty_cycle(self.duty_for(clamped))?;
        self.current_angle = clamped;
        Ok(())
    }

    /// Map `[min_degree, max_degree]` onto 2.5 to 12.5 percent duty at
    /// 50 Hz, rounded to one decimal, matching the servo's pulse range.
    fn duty_for(&self, angle: i32) -> f64 {
        let span = f64::from(self.max_degree - self.min_degree);
        let position = if span > 0.0 {
            f64::from(angle - self.min_degree) / span
        } else {
            0.0
        };
        let duty = (25.0 + position * 100.0) / 10.0;
        (duty * 10.0).round() / 10.0
    }

    fn release(&mut self) {
        self.channel.release();
    }
}

/// Pan/tilt backend: two independently owned servo axes adjusted by a fixed
/// step per correction.
pub struct ServoPairActuator {
    servo_x: Servo,
    servo_y: Servo,
    movement_amount: i32,
}

impl std::fmt::Debug for ServoPairActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServoPairActuator")
            .field("movement_amount", &self.movement_amount)
            .finish_non_exhaustive()
    }
}

impl ServoPairActuator {
    pub fn new(servo_x: Servo, servo_y: Servo, movement_amount: i32) -> Self {
        Self {
            servo_x,
            servo_y,
            movement_amount,
        }
    }

    /// Claim the hardware PWM channels named in the configuration.
    #[allow(unused_variables)]
    pub fn from_config(servo: &config::Servo) -> Result<Self, VservoError> {
        #[cfg(feature = "raspberry-pi")]
        {
            let channel_x = hardware::HardwarePwm::claim(servo.x_channel)?;
            let channel_y = hardware::HardwarePwm::claim(servo.y_channel)?;
            Ok(Self::new(
                Servo::new(Box::new(channel_x), servo.min_degree, servo.max_degree_x),
                Servo::new(Box::new(channel_y), servo.min_degree, servo.max_degree_y),
                servo.movement_amount,
            ))
        }

        #[cfg(not(feature = "raspberry-pi"))]
        {
            Err(VservoError::DeviceUnavailable(
                "servo backend requested but vservo was built without the 'raspberry-pi' feature"
                    .to_string(),
            ))
        }
    }

    pub fn angles(&self) -> (i32, i32) {
        (self.servo_x.current_angle(), self.servo_y.current_angle())
    }
}

impl Actuator for ServoPairActuator {
    /// Step each off-center axis by `movement_amount` opposite the
    /// displacement. Increasing the x angle pans left, increasing the y
    /// angle tilts down. Centered axes command no motion.
    fn aim(&mut self, direction: Direction) -> Result<(), VservoError> {
        if let Some(horizontal) = direction.horizontal() {
            let delta = match horizontal {
                Horizontal::Left => self.movement_amount,
                Horizontal::Right => -self.movement_amount,
            };
            self.servo_x
                .set_angle(self.servo_x.current_angle() + delta)?;
        }

        if let Some(vertical) = direction.vertical() {
            let delta = match vertical {
                Vertical::Up => -self.movement_amount,
                Vertical::Down => self.movement_amount,
            };
            self.servo_y
                .set_angle(self.servo_y.current_angle() + delta)?;
        }

        debug!(
            target: "actuator",
            "Servo angles after {:?}: x={} y={}",
            direction,
            self.servo_x.current_angle(),
            self.servo_y.current_angle()
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "servo-pair"
    }

    fn shutdown(&mut self) {
        self.servo_x.release();
        self.servo_y.release();
        debug!(target: "actuator", "Servo channels released");
    }
}

#[cfg(feature = "raspberry-pi")]
mod hardware {
    use rppal::pwm::{Channel, Polarity, Pwm};

    use super::PwmChannel;
    use crate::error::VservoError;

    const PWM_FREQUENCY_HZ: f64 = 50.0;

    /// Hardware PWM line on the Pi, enabled for the actuator's lifetime.
    pub struct HardwarePwm {
        pwm: Pwm,
    }

    impl HardwarePwm {
        pub fn claim(channel: u8) -> Result<Self, VservoError> {
            let channel = match channel {
                0 => Channel::Pwm0,
                1 => Channel::Pwm1,
                other => {
                    return Err(VservoError::DeviceUnavailable(format!(
                        "no PWM channel {other} on this board"
                    )))
                }
            };

            let pwm = Pwm::with_frequency(channel, PWM_FREQUENCY_HZ, 0.025, Polarity::Normal, true)
                .map_err(|err| {
                    VservoError::DeviceUnavailable(format!(
                        "could not claim PWM channel {channel:?}: {err}"
                    ))
                })?;

            Ok(Self { pwm })
        }
    }

    impl PwmChannel for HardwarePwm {
        fn set_duty_cycle(&mut self, duty_percent: f64) -> Result<(), VservoError> {
            self.pwm
                .set_duty_cycle(duty_percent / 100.0)
                .map_err(|err| VservoError::Device(format!("PWM update failed: {err}")))
        }

        fn release(&mut self) {
            let _ = self.pwm.disable();
        }
    }
}
