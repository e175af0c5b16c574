use std::io::Write;
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info};

use super::Actuator;
use crate::error::VservoError;
use crate::policy::Direction;

const SERIAL_TIMEOUT: Duration = Duration::from_millis(100);

/// Microcontroller backend: each correction goes out as a single ASCII
/// digit on the serial line. Fire-and-forget, no acknowledgement.
pub struct SerialActuator {
    port_name: String,
    connection: Option<Box<dyn SerialPort>>,
}

impl SerialActuator {
    /// Open the serial port. Failure here is a [`VservoError::DeviceUnavailable`]
    /// so the caller can fall back to detection-only operation.
    pub fn connect(port_name: &str, baud_rate: u32) -> Result<Self, VservoError> {
        let connection = serialport::new(port_name, baud_rate)
            .timeout(SERIAL_TIMEOUT)
            .open()
            .map_err(|err| {
                VservoError::DeviceUnavailable(format!(
                    "could not open serial port '{port_name}' at {baud_rate} baud: {err}"
                ))
            })?;

        info!(target: "actuator", "Serial port '{}' opened at {} baud", port_name, baud_rate);
        Ok(Self {
            port_name: port_name.to_string(),
            connection: Some(connection),
        })
    }

    #[cfg(test)]
    fn from_connection(port_name: &str, connection: Box<dyn SerialPort>) -> Self {
        Self {
            port_name: port_name.to_string(),
            connection: Some(connection),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

impl Actuator for SerialActuator {
    fn aim(&mut self, direction: Direction) -> Result<(), VservoError> {
        let connection = self.connection.as_mut().ok_or_else(|| {
            VservoError::Device(format!(
                "serial port '{}' was already released",
                self.port_name
            ))
        })?;

        let code = direction.serial_code();
        connection
            .write_all(&[code])
            .and_then(|()| connection.flush())
            .map_err(|err| {
                VservoError::Device(format!(
                    "write to serial port '{}' failed: {err}",
                    self.port_name
                ))
            })?;

        debug!(target: "actuator", "Sent '{}' for {:?}", code as char, direction);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "serial"
    }

    /// Drops the handle, which closes the port. Idempotent; the actuator
    /// may stay alive in a degraded loop long after this.
    fn shutdown(&mut self) {
        if self.connection.take().is_some() {
            debug!(target: "actuator", "Released serial port '{}'", self.port_name);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Read;

    use serialport::TTYPort;

    use super::*;

    // The master end must outlive the actuator's slave end or writes fail.
    fn actuator_on_pty() -> (SerialActuator, TTYPort) {
        let (mut master, slave) = TTYPort::pair().unwrap();
        master.set_timeout(Duration::from_millis(500)).unwrap();
        let name = slave.name().unwrap_or_else(|| "pty".to_string());
        let actuator = SerialActuator::from_connection(&name, Box::new(slave));
        (actuator, master)
    }

    #[test]
    fn aim_writes_one_code_byte() {
        let (mut actuator, mut master) = actuator_on_pty();
        actuator.aim(Direction::Right).unwrap();

        let mut buf = [0u8; 1];
        master.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], Direction::Right.serial_code());
    }

    #[test]
    fn shutdown_releases_the_connection() {
        let (mut actuator, _master) = actuator_on_pty();
        assert!(actuator.is_connected());

        actuator.shutdown();
        assert!(!actuator.is_connected());

        // A second release is a no-op.
        actuator.shutdown();
        assert!(!actuator.is_connected());
    }

    #[test]
    fn aim_after_release_is_a_device_error() {
        let (mut actuator, _master) = actuator_on_pty();
        actuator.shutdown();

        let err = actuator.aim(Direction::Up).unwrap_err();
        assert!(matches!(err, VservoError::Device(_)));
    }
}
