// Door state history listing

use crate::client::{Client, ListResponse};
use crate::output::{format_time, print_table_header, print_table_row, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use doorstate_core::StateEvent;
use serde::Serialize;

/// Range selection shared by `history` and `stats`
#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct RangeArgs {
    /// Oldest change time to include, seconds since the epoch
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,

    /// Newest change time to include, seconds since the epoch
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<i64>,

    /// Maximum number of events (the server caps this as well)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Fetch events in range, oldest first
pub async fn fetch(client: &Client, range: &RangeArgs) -> Result<Vec<StateEvent>> {
    let response: ListResponse<StateEvent> = client
        .get_with_query("/door/all/", range)
        .await
        .context("Failed to fetch door state history")?;
    Ok(response.data)
}

pub async fn run(range: RangeArgs, client: &Client, output: OutputFormat) -> Result<()> {
    let events = fetch(client, &range).await?;

    if output.is_text() {
        if events.is_empty() {
            println!("No door state changes recorded");
            return Ok(());
        }

        print_table_header(&[("TIME", 26), ("STATE", 6)]);
        for event in &events {
            print_table_row(&[
                (&format_time(event.timestamp), 26),
                (event.state.as_str(), 6),
            ]);
        }
    } else {
        output.print_value(&serde_json::json!({ "data": events, "total": events.len() }))?;
    }

    Ok(())
}
