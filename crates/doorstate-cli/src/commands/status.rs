// Current door state

use crate::client::Client;
use crate::output::{format_time, print_field, OutputFormat};
use anyhow::{Context, Result};
use chrono::DateTime;
use doorstate_core::ReportedState;

pub async fn run(client: &Client, output: OutputFormat) -> Result<()> {
    let status = client
        .current()
        .await
        .context("Failed to fetch door state")?;

    if output.is_text() {
        print_field("State", &status.state.to_string());
        if status.state != ReportedState::Unknown {
            let since = DateTime::from_timestamp(status.time, 0)
                .map(format_time)
                .unwrap_or_else(|| status.time.to_string());
            print_field("Since", &since);
        }
        println!("{}", status.text);
    } else {
        output.print_value(&status)?;
    }

    Ok(())
}
