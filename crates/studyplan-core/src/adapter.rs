//! Conversion between application records and scheduler entities.
//!
//! The surrounding application stores tasks, calendar events and time blocks
//! as loosely-typed camelCase JSON records. This module turns them into
//! [`Task`], [`BusyInterval`] and [`StudyBlock`] values and back.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ValidationError;
use crate::scheduler::config::TypeDurations;
use crate::scheduler::StudyBlock;
use crate::task::{Task, TaskType, DEFAULT_DIFFICULTY, DEFAULT_MIN_BLOCK_MINUTES, DEFAULT_PRIORITY};
use crate::timeline::BusyInterval;

/// Statuses that mark a task record as done.
const COMPLETED_STATUSES: [&str; 3] = ["completed", "done", "submitted"];

/// Task record as stored by the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default, rename = "type")]
    pub task_type: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub splittable: Option<bool>,
    #[serde(default)]
    pub min_block_size: Option<u32>,
}

/// Calendar event record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "start")]
    pub start_time: Option<String>,
    #[serde(default, alias = "end")]
    pub end_time: Option<String>,
}

/// Time-block record consumed by the application's block store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlockRecord {
    pub id: String,
    pub task_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub energy_required: f64,
    #[serde(default)]
    pub is_optimal: bool,
    #[serde(default)]
    pub confidence: f64,
}

/// Everything one planning run reads: tasks, calendar events and existing blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
    #[serde(default)]
    pub blocks: Vec<TimeBlockRecord>,
}

/// Parse a timestamp leniently.
///
/// Accepts RFC 3339, naive date-times (taken as UTC) and bare dates, which
/// mean 23:59 UTC on that day.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 0))
        .map(|naive| naive.and_utc())
}

/// Clamp an optional 0-100 score, falling back to `default` for missing,
/// non-finite or out-of-range input.
fn score_or(value: Option<f64>, default: u8) -> u8 {
    match value {
        Some(v) if v.is_finite() && (0.0..=100.0).contains(&v) => v.round() as u8,
        _ => default,
    }
}

fn estimated_minutes(record: &TaskRecord, task_type: TaskType, durations: &TypeDurations) -> u32 {
    match record.estimated_hours {
        Some(hours) if hours.is_finite() && hours > 0.0 => {
            ((hours * 60.0).floor() as u32).max(1)
        }
        _ => durations.for_type(task_type),
    }
}

/// Convert one task record.
///
/// # Errors
/// Returns a validation error when the id is empty or the due date is
/// missing or unparseable.
pub fn task_from_record(
    record: &TaskRecord,
    durations: &TypeDurations,
) -> Result<Task, ValidationError> {
    let id = record.id.trim();
    if id.is_empty() {
        return Err(ValidationError::MissingField {
            record: "task".to_string(),
            field: "id".to_string(),
        });
    }

    let due_raw = record
        .due_date
        .as_deref()
        .ok_or_else(|| ValidationError::MissingField {
            record: id.to_string(),
            field: "dueDate".to_string(),
        })?;
    let due_at = parse_timestamp(due_raw).ok_or_else(|| ValidationError::InvalidValue {
        field: "dueDate".to_string(),
        message: format!("cannot parse '{due_raw}' as a timestamp"),
    })?;

    let task_type = record
        .task_type
        .as_deref()
        .and_then(|t| t.parse::<TaskType>().ok())
        .unwrap_or(TaskType::Assignment);

    let status_done = record
        .status
        .as_deref()
        .map(|s| COMPLETED_STATUSES.contains(&s.trim().to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    let title = if record.title.trim().is_empty() {
        id.to_string()
    } else {
        record.title.clone()
    };

    Ok(Task {
        id: id.to_string(),
        title,
        course_id: record.course_id.clone(),
        task_type,
        due_at,
        estimated_minutes: estimated_minutes(record, task_type, durations),
        priority: score_or(record.priority, DEFAULT_PRIORITY),
        difficulty: score_or(record.difficulty, DEFAULT_DIFFICULTY),
        completed: record.completed.unwrap_or(false) || status_done,
        splittable: record.splittable.unwrap_or(true),
        min_block_minutes: record
            .min_block_size
            .filter(|&m| m > 0)
            .unwrap_or(DEFAULT_MIN_BLOCK_MINUTES),
    })
}

/// Convert a batch of task records, skipping and logging unusable ones.
pub fn tasks_from_records(records: &[TaskRecord], durations: &TypeDurations) -> Vec<Task> {
    records
        .iter()
        .filter_map(|record| match task_from_record(record, durations) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(id = %record.id, error = %e, "skipping task record");
                None
            }
        })
        .collect()
}

/// Busy intervals from calendar events; malformed events are dropped.
pub fn busy_from_events(events: &[EventRecord]) -> Vec<BusyInterval> {
    events
        .iter()
        .filter_map(|event| {
            let start = event.start_time.as_deref().and_then(parse_timestamp);
            let end = event.end_time.as_deref().and_then(parse_timestamp);
            match (start, end) {
                (Some(start), Some(end)) if start < end => Some(BusyInterval::new(start, end)),
                _ => {
                    warn!(id = ?event.id, "dropping malformed calendar event");
                    None
                }
            }
        })
        .collect()
}

/// Busy intervals occupied by stored time blocks.
pub fn busy_from_blocks(records: &[TimeBlockRecord]) -> Vec<BusyInterval> {
    records
        .iter()
        .map(|r| BusyInterval::new(r.start_time, r.end_time))
        .filter(BusyInterval::is_valid)
        .collect()
}

/// Convert a stored time block back into a scheduler block.
///
/// # Errors
/// Returns `InvalidTimeRange` when the block does not end after it starts.
pub fn block_from_record(record: &TimeBlockRecord) -> Result<StudyBlock, ValidationError> {
    if record.end_time <= record.start_time {
        return Err(ValidationError::InvalidTimeRange {
            start: record.start_time,
            end: record.end_time,
        });
    }
    Ok(StudyBlock {
        id: record.id.clone(),
        task_id: record.task_id.clone(),
        task_type: record.task_type,
        start_time: record.start_time,
        end_time: record.end_time,
        energy_required: record.energy_required,
        is_optimal: record.is_optimal,
        confidence: record.confidence,
    })
}

/// Convert stored time blocks, skipping and logging malformed ones.
pub fn blocks_from_records(records: &[TimeBlockRecord]) -> Vec<StudyBlock> {
    records
        .iter()
        .filter_map(|record| match block_from_record(record) {
            Ok(block) => Some(block),
            Err(e) => {
                warn!(id = %record.id, error = %e, "skipping time block record");
                None
            }
        })
        .collect()
}

/// Time-block records for `blocks`, with titles and courses looked up in `tasks`.
pub fn to_time_block_records(blocks: &[StudyBlock], tasks: &[Task]) -> Vec<TimeBlockRecord> {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    blocks
        .iter()
        .map(|block| {
            let task = by_id.get(block.task_id.as_str());
            TimeBlockRecord {
                id: block.id.clone(),
                task_id: block.task_id.clone(),
                title: task.map_or_else(|| block.task_id.clone(), |t| t.title.clone()),
                course_id: task.and_then(|t| t.course_id.clone()),
                task_type: block.task_type,
                start_time: block.start_time,
                end_time: block.end_time,
                energy_required: block.energy_required,
                is_optimal: block.is_optimal,
                confidence: block.confidence,
            }
        })
        .collect()
}
