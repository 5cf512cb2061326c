// Door statistics computed locally from the history
//
// Calendar buckets use the local time zone unless --utc is given.

use crate::client::Client;
use crate::commands::history::{fetch, RangeArgs};
use crate::output::{bar, format_time_in, print_table_header, print_table_row, OutputFormat};
use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use clap::{Args, ValueEnum};
use doorstate_core::{
    aggregate_by_hour, aggregate_by_week, open_intervals, weekly_open_hours, BucketRow,
    OpenInterval, StateEvent, WeekTotal,
};
use serde::Serialize;
use std::fmt::Display;

const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatsKind {
    /// Fraction open per hour of day
    Hour,
    /// Fraction open per weekday and hour
    Week,
    /// Open hours per calendar week
    WeeklyTotals,
    /// Every period the door was open
    Intervals,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Aggregation to compute
    #[arg(long, value_enum, default_value = "hour")]
    pub by: StatsKind,

    /// Use UTC instead of the local time zone for calendar buckets
    #[arg(long)]
    pub utc: bool,

    #[command(flatten)]
    pub range: RangeArgs,
}

/// Aggregation result, serialized as-is for json/yaml output
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "by", rename_all = "kebab-case")]
pub enum Stats {
    Hour { buckets: Vec<BucketRow> },
    Week { buckets: Vec<BucketRow> },
    WeeklyTotals { weeks: Vec<WeekTotal> },
    Intervals { intervals: Vec<OpenInterval> },
}

/// Run the requested aggregation over `events` as seen at `now`
pub fn compute<Tz: TimeZone>(
    kind: StatsKind,
    events: &[StateEvent],
    now: DateTime<Utc>,
    tz: &Tz,
) -> Stats {
    match kind {
        StatsKind::Hour => Stats::Hour {
            buckets: aggregate_by_hour(events, now, tz).rows(),
        },
        StatsKind::Week => Stats::Week {
            buckets: aggregate_by_week(events, now, tz).rows(),
        },
        StatsKind::WeeklyTotals => Stats::WeeklyTotals {
            weeks: weekly_open_hours(events, now, tz),
        },
        StatsKind::Intervals => Stats::Intervals {
            intervals: open_intervals(events, now),
        },
    }
}

pub async fn run(args: StatsArgs, client: &Client, output: OutputFormat) -> Result<()> {
    let events = fetch(client, &args.range).await?;
    // The last state holds until the end of the requested range
    let now = Utc::now();
    let end = args
        .range
        .to
        .and_then(|to| DateTime::from_timestamp(to, 0))
        .map_or(now, |to| to.min(now));
    tracing::debug!(events = events.len(), by = ?args.by, "Aggregating history");

    if args.utc {
        report(args.by, &events, end, &Utc, output)
    } else {
        report(args.by, &events, end, &Local, output)
    }
}

fn report<Tz>(
    kind: StatsKind,
    events: &[StateEvent],
    now: DateTime<Utc>,
    tz: &Tz,
    output: OutputFormat,
) -> Result<()>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stats = compute(kind, events, now, tz);
    if !output.is_text() {
        return output.print_value(&stats);
    }

    if events.is_empty() {
        println!("No door state changes recorded");
        return Ok(());
    }

    match stats {
        Stats::Hour { buckets } => print_buckets(&buckets),
        Stats::Week { buckets } => print_buckets(&buckets),
        Stats::WeeklyTotals { weeks } => {
            let max = weeks.iter().map(|w| w.open_hours).fold(0.0, f64::max);
            print_table_header(&[("WEEK OF", 10), ("HOURS", 7), ("", BAR_WIDTH)]);
            for week in &weeks {
                let fraction = if max > 0.0 { week.open_hours / max } else { 0.0 };
                print_table_row(&[
                    (&week.week_start.to_string(), 10),
                    (&format!("{:.1}", week.open_hours), 7),
                    (&bar(fraction, BAR_WIDTH), BAR_WIDTH),
                ]);
            }
        }
        Stats::Intervals { intervals } => {
            print_table_header(&[("OPENED", 26), ("CLOSED", 26), ("DURATION", 10)]);
            for interval in &intervals {
                let closed = interval
                    .closed
                    .map(|c| format_time_in(c, tz))
                    .unwrap_or_else(|| "still open".to_string());
                let duration = interval.closed.unwrap_or(now) - interval.opened;
                print_table_row(&[
                    (&format_time_in(interval.opened, tz), 26),
                    (&closed, 26),
                    (&format_duration(duration), 10),
                ]);
            }
        }
    }
    Ok(())
}

fn print_buckets(buckets: &[BucketRow]) {
    print_table_header(&[("DAY", 3), ("HOUR", 4), ("OPEN", 5), ("", BAR_WIDTH)]);
    for row in buckets {
        let day = row.weekday.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        let (percent, graph) = match row.fraction_open {
            Some(fraction) => (
                format!("{:.0}%", fraction * 100.0),
                bar(fraction, BAR_WIDTH),
            ),
            None => ("n/a".to_string(), String::new()),
        };
        print_table_row(&[
            (&day, 3),
            (&format!("{:02}", row.hour), 4),
            (&percent, 5),
            (&graph, BAR_WIDTH),
        ]);
    }
}

/// "3h 05m" style duration
fn format_duration(duration: chrono::Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}
