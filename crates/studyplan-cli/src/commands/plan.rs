//! Plan commands: full generation and incremental rescheduling.
//!
//! Both read a JSON snapshot `{tasks, events, blocks}` and print the result
//! as JSON on stdout.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::load_config;
use studyplan_core::adapter::{
    blocks_from_records, busy_from_blocks, busy_from_events, parse_timestamp, tasks_from_records,
    to_time_block_records,
};
use studyplan_core::{
    Config, Horizon, PlanSnapshot, ScheduleDiagnostics, ScheduleOutcome, StudyScheduler, Task,
    TimeBlockRecord,
};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Generate a fresh plan over a horizon
    Generate {
        /// Snapshot file ("-" reads stdin)
        #[arg(long, short)]
        input: PathBuf,
        /// Current time (RFC 3339); defaults to the system clock
        #[arg(long)]
        now: Option<String>,
        /// Horizon length in days
        #[arg(long, default_value_t = 7)]
        days: u32,
        /// Tie-break seed; overrides the configured seed
        #[arg(long)]
        seed: Option<u64>,
        /// Print time-block records instead of raw blocks
        #[arg(long)]
        records: bool,
    },
    /// Release completed tasks' blocks and top up under-scheduled tasks
    Reschedule {
        /// Snapshot file ("-" reads stdin); its blocks are the existing plan
        #[arg(long, short)]
        input: PathBuf,
        /// Completed task ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,
        /// Current time (RFC 3339); defaults to the system clock
        #[arg(long)]
        now: Option<String>,
        /// Tie-break seed; overrides the configured seed
        #[arg(long)]
        seed: Option<u64>,
        /// Print time-block records instead of raw blocks
        #[arg(long)]
        records: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordsOutput<'a> {
    blocks: Vec<TimeBlockRecord>,
    diagnostics: &'a ScheduleDiagnostics,
}

pub fn run(action: PlanAction, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    match action {
        PlanAction::Generate {
            input,
            now,
            days,
            seed,
            records,
        } => {
            let snapshot = read_snapshot(&input)?;
            let now = resolve_now(now.as_deref())?;
            let tasks = tasks_from_records(&snapshot.tasks, &config.scheduler.type_durations);

            let mut busy = busy_from_events(&snapshot.events);
            busy.extend(busy_from_blocks(&snapshot.blocks));

            let horizon = Horizon::days_from(now, days)?;
            let outcome = scheduler(&config, seed).generate(&tasks, &busy, &horizon, now);
            print_outcome(&outcome, &tasks, records)
        }
        PlanAction::Reschedule {
            input,
            completed,
            now,
            seed,
            records,
        } => {
            let snapshot = read_snapshot(&input)?;
            let now = resolve_now(now.as_deref())?;
            let tasks = tasks_from_records(&snapshot.tasks, &config.scheduler.type_durations);
            let busy = busy_from_events(&snapshot.events);
            let existing = blocks_from_records(&snapshot.blocks);

            let outcome =
                scheduler(&config, seed).reschedule(&completed, &tasks, &existing, &busy, now);
            print_outcome(&outcome, &tasks, records)
        }
    }
}

fn scheduler(config: &Config, seed: Option<u64>) -> StudyScheduler {
    StudyScheduler::new(config.scheduler.clone())
        .with_energy_model(config.energy_model())
        .with_seed(seed.or(config.seed).unwrap_or_default())
}

fn read_snapshot(input: &Path) -> Result<PlanSnapshot, Box<dyn std::error::Error>> {
    let content = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)
            .map_err(|e| format!("cannot read {}: {e}", input.display()))?
    };
    let snapshot: PlanSnapshot = serde_json::from_str(&content)?;
    debug!(
        tasks = snapshot.tasks.len(),
        events = snapshot.events.len(),
        blocks = snapshot.blocks.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

fn resolve_now(now: Option<&str>) -> Result<DateTime<Utc>, String> {
    match now {
        Some(value) => {
            parse_timestamp(value).ok_or_else(|| format!("invalid --now timestamp: {value}"))
        }
        None => Ok(Utc::now()),
    }
}

fn print_outcome(
    outcome: &ScheduleOutcome,
    tasks: &[Task],
    records: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = if records {
        serde_json::to_string_pretty(&RecordsOutput {
            blocks: to_time_block_records(&outcome.blocks, tasks),
            diagnostics: &outcome.diagnostics,
        })?
    } else {
        serde_json::to_string_pretty(outcome)?
    };
    println!("{json}");
    Ok(())
}
