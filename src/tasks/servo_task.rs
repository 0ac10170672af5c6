//! Host actuator sinks.
//!
//! [`MotorServerSink`] drives the Dynamixel bus through the external `motor_server` helper:
//! one line of eight goal positions per tick on its stdin, `QUIT` to release torque.
//! [`DryRunSink`] only logs, for running the controller without hardware.
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, trace, warn};

use crate::error::ActuatorError;
use crate::robot::actuator::ActuatorSink;
use crate::JOINT_COUNT;

/// RX-24F goal position range.
pub const DXL_RESOLUTION: f64 = 1023.0;
pub const DXL_MAX_DEGREES: f64 = 300.0;

const QUIT_LINE: &str = "QUIT";
const EXIT_TIMEOUT: Duration = Duration::from_secs(2);

/// 0..=300 degrees to 0..=1023 goal ticks. Out-of-range angles are clamped.
pub fn deg_to_ticks(deg: f64) -> u16 {
    let deg = if deg.is_nan() {
        DXL_MAX_DEGREES / 2.0
    } else {
        deg.clamp(0.0, DXL_MAX_DEGREES)
    };
    (deg / DXL_MAX_DEGREES * DXL_RESOLUTION) as u16
}

/// Space-separated goal ticks, slot order, newline terminated.
pub fn format_positions(angles: &[f64; JOINT_COUNT]) -> String {
    let mut line = angles
        .iter()
        .map(|deg| deg_to_ticks(*deg).to_string())
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    line
}

pub struct MotorServerSink {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
}

impl MotorServerSink {
    /// Starts `program` with a piped stdin. The server enables torque on its own.
    pub fn spawn(program: &Path) -> Result<Self, ActuatorError> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()?;
        let stdin = child.stdin.take().ok_or(ActuatorError::Closed)?;
        info!(
            "[SERVO_TASK] started {} (pid {})",
            program.display(),
            child.id()
        );
        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
        })
    }

    fn send(&mut self, line: &str) -> Result<(), ActuatorError> {
        if let Some(status) = self.child.try_wait()? {
            error!("[SERVO_TASK] motor server exited unexpectedly ({status})");
            self.stdin = None;
            return Err(ActuatorError::Closed);
        }
        let stdin = self.stdin.as_mut().ok_or(ActuatorError::Closed)?;
        match stdin.write_all(line.as_bytes()).and_then(|_| stdin.flush()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                error!("[SERVO_TASK] broken pipe to motor server");
                self.stdin = None;
                Err(ActuatorError::Closed)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn wait_for_exit(&mut self) -> Result<(), ActuatorError> {
        let started = Instant::now();
        while started.elapsed() < EXIT_TIMEOUT {
            if let Some(status) = self.child.try_wait()? {
                info!("[SERVO_TASK] motor server stopped ({status})");
                return Ok(());
            }
            thread::sleep(Duration::from_millis(20));
        }
        warn!("[SERVO_TASK] motor server ignored QUIT, killing it");
        self.child.kill()?;
        self.child.wait()?;
        Ok(())
    }
}

impl ActuatorSink for MotorServerSink {
    fn write_positions_deg(&mut self, angles: &[f64; JOINT_COUNT]) -> Result<(), ActuatorError> {
        let line = format_positions(angles);
        trace!("[SERVO_TASK] {}", line.trim_end());
        self.send(&line)
    }

    /// Sends `QUIT`, closes the pipe and waits for the server to let go of the bus.
    fn release_torque(&mut self) -> Result<(), ActuatorError> {
        if self.stdin.is_some() {
            if let Err(e) = self.send(&format!("{QUIT_LINE}\n")) {
                warn!("[SERVO_TASK] QUIT not delivered: {e}");
            }
        }
        self.stdin = None;
        self.wait_for_exit()
    }
}

impl Drop for MotorServerSink {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.release_torque();
        }
    }
}

/// Logs every command instead of moving anything.
#[derive(Debug, Default)]
pub struct DryRunSink {
    writes: u64,
    last: Option<[f64; JOINT_COUNT]>,
    torque_released: bool,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn last(&self) -> Option<&[f64; JOINT_COUNT]> {
        self.last.as_ref()
    }

    pub fn torque_released(&self) -> bool {
        self.torque_released
    }
}

impl ActuatorSink for DryRunSink {
    fn write_positions_deg(&mut self, angles: &[f64; JOINT_COUNT]) -> Result<(), ActuatorError> {
        if angles.iter().any(|a| !a.is_finite()) {
            return Err(ActuatorError::Rejected(format!("non-finite angle in {angles:?}")));
        }
        self.writes += 1;
        self.last = Some(*angles);
        self.torque_released = false;
        trace!("[SERVO_TASK] dry run #{}: {}", self.writes, format_positions(angles).trim_end());
        Ok(())
    }

    fn set_torque_limit_all(&mut self, limit: u16) -> Result<(), ActuatorError> {
        debug!("[SERVO_TASK] dry run torque limit {limit}");
        Ok(())
    }

    fn set_moving_speed_all(&mut self, speed: u16) -> Result<(), ActuatorError> {
        debug!("[SERVO_TASK] dry run moving speed {speed}");
        Ok(())
    }

    fn release_torque(&mut self) -> Result<(), ActuatorError> {
        info!("[SERVO_TASK] dry run torque released after {} writes", self.writes);
        self.torque_released = true;
        Ok(())
    }
}

/// Either sink behind one concrete type, picked at start-up.
pub enum AnyActuator {
    MotorServer(MotorServerSink),
    DryRun(DryRunSink),
}

impl core::fmt::Debug for AnyActuator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AnyActuator::MotorServer(sink) => f
                .debug_struct("MotorServer")
                .field("pid", &sink.child.id())
                .field("open", &sink.stdin.is_some())
                .finish(),
            AnyActuator::DryRun(sink) => f
                .debug_struct("DryRun")
                .field("writes", &sink.writes)
                .finish(),
        }
    }
}

impl ActuatorSink for AnyActuator {
    fn write_positions_deg(&mut self, angles: &[f64; JOINT_COUNT]) -> Result<(), ActuatorError> {
        match self {
            AnyActuator::MotorServer(sink) => sink.write_positions_deg(angles),
            AnyActuator::DryRun(sink) => sink.write_positions_deg(angles),
        }
    }

    fn set_torque_limit_all(&mut self, limit: u16) -> Result<(), ActuatorError> {
        match self {
            AnyActuator::MotorServer(sink) => sink.set_torque_limit_all(limit),
            AnyActuator::DryRun(sink) => sink.set_torque_limit_all(limit),
        }
    }

    fn set_moving_speed_all(&mut self, speed: u16) -> Result<(), ActuatorError> {
        match self {
            AnyActuator::MotorServer(sink) => sink.set_moving_speed_all(speed),
            AnyActuator::DryRun(sink) => sink.set_moving_speed_all(speed),
        }
    }

    fn release_torque(&mut self) -> Result<(), ActuatorError> {
        match self {
            AnyActuator::MotorServer(sink) => sink.release_torque(),
            AnyActuator::DryRun(sink) => sink.release_torque(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_map_onto_the_tick_range() {
        assert_eq!(deg_to_ticks(0.0), 0);
        assert_eq!(deg_to_ticks(150.0), 511);
        assert_eq!(deg_to_ticks(300.0), 1023);
        assert_eq!(deg_to_ticks(-20.0), 0);
        assert_eq!(deg_to_ticks(420.0), 1023);
        assert_eq!(deg_to_ticks(f64::NAN), 511);
    }

    #[test]
    fn one_line_per_command() {
        let mut angles = [150.0; JOINT_COUNT];
        angles[0] = 0.0;
        angles[7] = 300.0;
        assert_eq!(
            format_positions(&angles),
            "0 511 511 511 511 511 511 1023\n"
        );
    }

    #[test]
    fn dry_run_counts_and_rejects_garbage() {
        let mut sink = DryRunSink::new();
        sink.write_positions_deg(&[150.0; JOINT_COUNT]).unwrap();
        assert!(matches!(
            sink.write_positions_deg(&[f64::INFINITY; JOINT_COUNT]),
            Err(ActuatorError::Rejected(_))
        ));
        assert_eq!(sink.writes(), 1);
        sink.release_torque().unwrap();
        assert!(sink.torque_released());
    }

    #[cfg(unix)]
    #[test]
    fn motor_server_pipe_lifecycle() {
        // cat stands in for the server: it reads lines and exits when its stdin closes
        let mut sink = AnyActuator::MotorServer(MotorServerSink::spawn(Path::new("cat")).unwrap());
        sink.write_positions_deg(&[150.0; JOINT_COUNT]).unwrap();
        sink.release_torque().unwrap();
        assert!(matches!(
            sink.write_positions_deg(&[150.0; JOINT_COUNT]),
            Err(ActuatorError::Closed)
        ));
    }

    #[test]
    fn missing_server_is_an_io_error() {
        assert!(matches!(
            MotorServerSink::spawn(Path::new("/nonexistent/motor_server")),
            Err(ActuatorError::Io(_))
        ));
    }
}
