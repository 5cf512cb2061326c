// Sensor agent: debounce-sample the door contact and report changes
//
// Sampling is a blocking loop (one read at a time, sleeping in between), so
// each round runs on the blocking pool. A state is submitted when it differs
// from the last one the server acknowledged. Any submission failure ends the
// process with an error so a supervisor can alert.

use crate::client::Client;
use crate::commands::KeyArgs;
use crate::output::{format_time, print_field, OutputFormat};
use crate::sensor::{CommandSensor, GpioFileSensor};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use doorstate_core::sampler::{DEFAULT_SAMPLES, DEFAULT_THRESHOLD};
use doorstate_core::{sample, DoorState, ReportedState, SamplingPolicy, SensorReader, StateEvent};
use std::path::PathBuf;
use std::time::Duration;

type BoxedReader = Box<dyn SensorReader + Send>;

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Sysfs-style value file to read ("1"/"0")
    #[arg(
        long,
        env = "DOORSTATE_GPIO_FILE",
        conflicts_with = "command",
        required_unless_present = "command"
    )]
    pub gpio_file: Option<PathBuf>,

    /// Shell command printing 1/0 or open/closed
    #[arg(long, env = "DOORSTATE_SENSOR_COMMAND")]
    pub command: Option<String>,

    /// Reads per decision
    #[arg(long, env = "DOORSTATE_SAMPLES", default_value_t = DEFAULT_SAMPLES)]
    pub samples: u32,

    /// Open votes must exceed this to report open
    #[arg(long, env = "DOORSTATE_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: u32,

    /// Pause between two reads in milliseconds
    #[arg(long, env = "DOORSTATE_INTERVAL_MS", default_value_t = 1000)]
    pub interval_ms: u64,

    /// Flip the raw reading (contact wired the other way round)
    #[arg(long, env = "DOORSTATE_INVERTED")]
    pub inverted: bool,

    /// Timeout for a single command read in milliseconds
    #[arg(long, env = "DOORSTATE_READ_TIMEOUT_MS", default_value_t = 2000)]
    pub read_timeout_ms: u64,

    /// Sample once, submit the result and exit
    #[arg(long)]
    pub once: bool,
}

impl WatchArgs {
    pub fn policy(&self) -> SamplingPolicy {
        SamplingPolicy::default()
            .with_samples(self.samples)
            .with_threshold(self.threshold)
            .with_interval(Duration::from_millis(self.interval_ms))
            .with_inverted(self.inverted)
    }

    fn reader(&self) -> Result<BoxedReader> {
        match (&self.gpio_file, &self.command) {
            (Some(path), _) => Ok(Box::new(GpioFileSensor::new(path))),
            (None, Some(command)) => Ok(Box::new(CommandSensor::new(
                command,
                Duration::from_millis(self.read_timeout_ms),
            ))),
            (None, None) => anyhow::bail!("Either --gpio-file or --command is required"),
        }
    }
}

/// Run one blocking sampling round on the blocking pool
async fn sample_round(
    mut reader: BoxedReader,
    policy: SamplingPolicy,
) -> Result<(BoxedReader, doorstate_core::SampleReport)> {
    tokio::task::spawn_blocking(move || {
        let report = sample(reader.as_mut(), &policy);
        (reader, report)
    })
    .await
    .context("Sampling task failed")
}

/// Last state the server knows about, if it can be fetched
async fn server_state(client: &Client) -> Option<DoorState> {
    match client.current().await {
        Ok(status) => match status.state {
            ReportedState::Open => Some(DoorState::Open),
            ReportedState::Closed => Some(DoorState::Closed),
            ReportedState::Unknown => None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Could not fetch current state, will submit first reading");
            None
        }
    }
}

pub async fn run(args: WatchArgs, client: &Client, output: OutputFormat, quiet: bool) -> Result<()> {
    let key = args.key.load()?;
    let policy = args.policy();
    policy.validate().context("Invalid sampling policy")?;
    let mut reader = args.reader()?;

    tracing::info!(
        samples = policy.samples,
        threshold = policy.threshold,
        interval_ms = args.interval_ms,
        inverted = policy.inverted,
        once = args.once,
        "Watching door sensor"
    );

    let mut last_sent = if args.once {
        None
    } else {
        server_state(client).await
    };

    loop {
        let (returned, report) = sample_round(reader, policy).await?;
        reader = returned;
        tracing::debug!(
            state = %report.state,
            open_votes = report.open_votes,
            failed_reads = report.failed_reads,
            samples = report.samples,
            "Sampling round complete"
        );

        if last_sent == Some(report.state) {
            continue;
        }

        let event = StateEvent::new(Utc::now(), report.state);
        let stored = client
            .submit(&key, event)
            .await
            .with_context(|| format!("Failed to submit door state {}", report.state))?;
        tracing::info!(
            state = %stored.state,
            time = stored.seconds(),
            open_votes = report.open_votes,
            "Door state submitted"
        );
        last_sent = Some(stored.state);

        if args.once {
            if output.is_text() {
                if !quiet {
                    print_field("State", stored.state.as_str());
                    print_field("Time", &format_time(stored.timestamp));
                }
            } else {
                output.print_value(&stored)?;
            }
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        watch: WatchArgs,
    }

    #[test]
    fn test_defaults_build_default_policy() {
        let cli = TestCli::try_parse_from([
            "watch",
            "--key-file",
            "/tmp/key",
            "--gpio-file",
            "/sys/class/gpio/gpio17/value",
        ])
        .unwrap();

        let policy = cli.watch.policy();
        assert_eq!(policy, SamplingPolicy::default());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_sensor_source_is_required_and_exclusive() {
        assert!(TestCli::try_parse_from(["watch", "--key-file", "/tmp/key"]).is_err());
        assert!(TestCli::try_parse_from([
            "watch",
            "--key-file",
            "/tmp/key",
            "--gpio-file",
            "/tmp/value",
            "--command",
            "echo 1",
        ])
        .is_err());
    }

    #[tokio::test]
    async fn test_sample_round_returns_reader() {
        let mut count = 0;
        let reader: BoxedReader = Box::new(move || -> std::result::Result<bool, doorstate_core::SensorError> {
            count += 1;
            Ok(count <= 9)
        });
        let policy = SamplingPolicy::default().with_interval(Duration::ZERO);

        let (_reader, report) = sample_round(reader, policy).await.unwrap();
        assert_eq!(report.state, DoorState::Open);
        assert_eq!(report.open_votes, 9);
    }
}
