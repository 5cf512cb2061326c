// Submit an explicit door state

use crate::client::Client;
use crate::commands::KeyArgs;
use crate::output::{format_time, print_field, OutputFormat};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use doorstate_core::{DoorState, StateEvent};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// New state: open or closed
    pub state: DoorState,

    /// Time of the change in seconds since the epoch (default now)
    #[arg(long)]
    pub time: Option<i64>,

    #[command(flatten)]
    pub key: KeyArgs,
}

pub async fn run(args: UpdateArgs, client: &Client, output: OutputFormat, quiet: bool) -> Result<()> {
    let key = args.key.load()?;
    let time = args.time.unwrap_or_else(|| Utc::now().timestamp());
    let event = StateEvent::from_seconds(time, args.state)
        .with_context(|| format!("Time {} is out of range", time))?;

    let stored = client
        .submit(&key, event)
        .await
        .context("Failed to submit door state")?;
    tracing::debug!(state = %stored.state, time = stored.seconds(), "Door state submitted");

    if output.is_text() {
        if !quiet {
            println!("OK");
            print_field("State", stored.state.as_str());
            print_field("Time", &format_time(stored.timestamp));
        }
    } else {
        output.print_value(&stored)?;
    }

    Ok(())
}
