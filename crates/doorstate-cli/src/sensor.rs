// Sensor readers for the watch agent
//
// Both readers report the raw contact value; polarity inversion and the
// majority vote happen in doorstate_core::sample.

use doorstate_core::{SensorError, SensorReader};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Interpret one sensor value. Accepts `1`/`0`, `open`/`closed`, `true`/`false`
/// and `high`/`low`, case-insensitively, surrounding whitespace ignored.
pub fn parse_reading(text: &str) -> Result<bool, SensorError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "open" | "true" | "high" => Ok(true),
        "0" | "closed" | "false" | "low" => Ok(false),
        other => Err(SensorError::InvalidValue(other.to_string())),
    }
}

/// Reads a sysfs-style value file, e.g. `/sys/class/gpio/gpio17/value`
#[derive(Debug, Clone)]
pub struct GpioFileSensor {
    path: PathBuf,
}

impl GpioFileSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SensorReader for GpioFileSensor {
    fn read(&mut self) -> Result<bool, SensorError> {
        let text = std::fs::read_to_string(&self.path)?;
        parse_reading(&text)
    }
}

/// Runs a shell command per read and parses its stdout.
/// A command still running after `timeout` is killed. Stdout is drained on
/// a separate thread while waiting, so output larger than the pipe buffer
/// cannot stall the command.
#[derive(Debug, Clone)]
pub struct CommandSensor {
    command: String,
    timeout: Duration,
}

impl CommandSensor {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    fn wait(&self, child: &mut Child) -> Result<std::process::ExitStatus, SensorError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                // The process may exit between try_wait and kill
                let _ = child.kill();
                let _ = child.wait();
                return Err(SensorError::Timeout(self.timeout));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Read a pipe to the end on its own thread
fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<std::io::Result<String>> {
    std::thread::spawn(move || {
        let mut text = String::new();
        pipe.read_to_string(&mut text)?;
        Ok(text)
    })
}

impl SensorReader for CommandSensor {
    fn read(&mut self) -> Result<bool, SensorError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child.stdout.take().map(drain);

        let status = self.wait(&mut child)?;
        if !status.success() {
            return Err(SensorError::Command(format!(
                "`{}` exited with {}",
                self.command, status
            )));
        }

        let text = match stdout {
            Some(reader) => reader.join().map_err(|_| {
                SensorError::Command(format!("stdout reader for `{}` panicked", self.command))
            })??,
            None => String::new(),
        };
        parse_reading(&text)
    }
}
