//! Study-block scheduler.
//!
//! This module places work sessions for outstanding tasks into free time:
//! - Orders pending tasks by priority
//! - Walks the horizon day by day, skipping disallowed days
//! - Finds free slots against calendar events and already-placed blocks
//! - Asks the slot selector for the next-best (task, slot) pairing until the
//!   day's capacity is used up or nothing fits
//!
//! The scheduler is a pure function of its inputs. "Now", the energy model
//! and the random seed are all explicit.

pub mod config;
mod reschedule;
pub mod scoring;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::energy::EnergyModel;
use crate::error::ValidationError;
use crate::task::{Task, TaskType};
use crate::timeline::{BusyInterval, FreeSlotFinder, PriorityCalculator};

pub use config::{SchedulerConfig, HARD_MIN_SESSION_MINUTES, MAX_BLOCKS_PER_DAY};
use scoring::{SlotCandidate, SlotSelector};

/// A concrete scheduled interval of work on one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyBlock {
    pub id: String,
    pub task_id: String,
    pub task_type: TaskType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Energy the work demands (0-100)
    pub energy_required: f64,
    /// Ambient energy at the start met the requirement
    pub is_optimal: bool,
    /// Weighted score that won the selection
    pub confidence: f64,
}

impl StudyBlock {
    fn from_candidate<R: Rng>(task: &Task, candidate: &SlotCandidate, rng: &mut R) -> Self {
        let energy_required = task.energy_required();
        Self {
            id: uuid::Builder::from_random_bytes(rng.gen()).into_uuid().to_string(),
            task_id: task.id.clone(),
            task_type: task.task_type,
            start_time: candidate.start_time,
            end_time: candidate.end_time,
            energy_required,
            is_optimal: candidate.ambient_energy >= energy_required,
            confidence: candidate.score,
        }
    }

    /// Get total duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Check if this block overlaps with a time range
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Calendar day the block starts on
    pub fn day(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    pub fn as_busy(&self) -> BusyInterval {
        BusyInterval::new(self.start_time, self.end_time)
    }
}

/// Date range a generation run may place blocks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Horizon {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Horizon {
    /// Build a horizon; `end` must be after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Horizon of `days` whole days from `start`.
    pub fn days_from(start: DateTime<Utc>, days: u32) -> Result<Self, ValidationError> {
        let end = start
            .checked_add_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "days".to_string(),
                message: format!("{days} days from {start} is out of range"),
            })?;
        Self::new(start, end)
    }
}

/// Outcome of one day of the generation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    ProcessingDay,
    DayCapacityReached,
    NoSlotsFit,
}

/// A task left with work after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnscheduledDetail {
    pub task_id: String,
    pub title: String,
    pub remaining_minutes: i64,
    pub due_date: DateTime<Utc>,
}

/// Informational report on what could not be placed. Never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDiagnostics {
    pub unscheduled_task_ids: Vec<String>,
    /// Tasks already past due at call time; excluded from placement
    #[serde(default)]
    pub overdue_task_ids: Vec<String>,
    pub message: String,
    pub details: Vec<UnscheduledDetail>,
}

impl ScheduleDiagnostics {
    fn from_pending(pending: &[PendingTask], overdue_task_ids: Vec<String>) -> Self {
        let details: Vec<UnscheduledDetail> = pending
            .iter()
            .filter(|p| p.remaining > 0)
            .map(|p| UnscheduledDetail {
                task_id: p.task.id.clone(),
                title: p.task.title.clone(),
                remaining_minutes: p.remaining,
                due_date: p.task.due_at,
            })
            .collect();

        let mut message = if details.is_empty() {
            "All tasks scheduled".to_string()
        } else {
            format!("{} task(s) could not be fully scheduled", details.len())
        };
        if !overdue_task_ids.is_empty() {
            message.push_str(&format!("; {} overdue task(s) excluded", overdue_task_ids.len()));
        }

        Self {
            unscheduled_task_ids: details.iter().map(|d| d.task_id.clone()).collect(),
            overdue_task_ids,
            message,
            details,
        }
    }
}

/// Result of a generation or rescheduling run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutcome {
    /// Blocks ordered by start time
    pub blocks: Vec<StudyBlock>,
    pub diagnostics: ScheduleDiagnostics,
}

impl ScheduleOutcome {
    /// True when every eligible task received its full need.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.unscheduled_task_ids.is_empty()
    }

    /// Blocks belonging to `task_id`.
    pub fn blocks_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a StudyBlock> + 'a {
        self.blocks.iter().filter(move |b| b.task_id == task_id)
    }
}

/// Work queue entry: a task and the minutes still to place.
#[derive(Debug, Clone)]
struct PendingTask {
    task: Task,
    remaining: i64,
}

impl PendingTask {
    fn new(task: &Task, remaining: i64) -> Self {
        Self {
            task: task.clone(),
            remaining,
        }
    }
}

/// Study-block scheduler
#[derive(Debug, Clone)]
pub struct StudyScheduler {
    config: SchedulerConfig,
    energy: EnergyModel,
    seed: u64,
}

impl StudyScheduler {
    /// Create a scheduler; the config is sanitized on the way in.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config: config.sanitized(),
            energy: EnergyModel::new(),
            seed: 0,
        }
    }

    pub fn with_energy_model(mut self, energy: EnergyModel) -> Self {
        self.energy = energy;
        self
    }

    /// Seed for tie-breaking and block ids.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn energy_model(&self) -> &EnergyModel {
        &self.energy
    }

    /// Generate blocks for the whole horizon.
    ///
    /// # Arguments
    /// * `tasks` - Task snapshot
    /// * `busy` - Calendar events and pinned blocks to avoid
    /// * `horizon` - Range new blocks may occupy
    /// * `now` - Current time; overdue detection and urgency use it
    ///
    /// # Returns
    /// Blocks ordered by start time plus diagnostics for unplaced work
    pub fn generate(
        &self,
        tasks: &[Task],
        busy: &[BusyInterval],
        horizon: &Horizon,
        now: DateTime<Utc>,
    ) -> ScheduleOutcome {
        let mut rng = Mcg128Xsl64::seed_from_u64(self.seed);
        let busy = valid_busy(busy);

        let mut overdue = Vec::new();
        let mut pending = Vec::new();
        for task in tasks {
            if task.completed {
                continue;
            }
            if task.is_overdue(now) {
                debug!(task_id = %task.id, due = %task.due_at, "task overdue, excluded");
                overdue.push(task.id.clone());
                continue;
            }
            if task.due_at > horizon.end {
                debug!(task_id = %task.id, "task due after horizon, skipped");
                continue;
            }
            if task.estimated_minutes == 0 {
                continue;
            }
            pending.push(PendingTask::new(task, i64::from(task.estimated_minutes)));
        }

        if pending.is_empty() {
            return ScheduleOutcome {
                blocks: Vec::new(),
                diagnostics: ScheduleDiagnostics::from_pending(&[], overdue),
            };
        }

        PriorityCalculator::new(now).sort_by_priority_key(&mut pending, |p| &p.task);

        let from = horizon.start.max(now);
        let mut blocks = self.fill_days(&mut pending, &busy, &[], from, horizon.end, &mut rng);
        blocks.sort_by_key(|b| b.start_time);

        debug!(blocks = blocks.len(), "generation finished");
        ScheduleOutcome {
            blocks,
            diagnostics: ScheduleDiagnostics::from_pending(&pending, overdue),
        }
    }

    /// Day-by-day placement loop shared by generation and rescheduling.
    ///
    /// `carried` blocks are occupied time and count toward the same-task rules
    /// and the daily capacity. Returns only the new blocks.
    fn fill_days(
        &self,
        pending: &mut [PendingTask],
        busy: &[BusyInterval],
        carried: &[StudyBlock],
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        rng: &mut Mcg128Xsl64,
    ) -> Vec<StudyBlock> {
        let selector = SlotSelector::new(&self.config, &self.energy);
        let finder = FreeSlotFinder::new(self.config.min_free_slot_minutes());
        let capacity = self.config.daily_capacity_minutes();

        let mut known: Vec<StudyBlock> = carried.to_vec();
        let carried_len = known.len();

        for day in days_between(from, until) {
            let weekday = day.weekday().num_days_from_sunday();
            if !self.config.allows_study_on(weekday) {
                debug!(%day, "study not allowed, skipping day");
                continue;
            }
            let Some((day_start, day_end)) = self.config.day_window(day) else {
                continue;
            };
            let window_start = day_start.max(from);
            let window_end = day_end.min(until);
            if window_end <= window_start {
                continue;
            }

            let mut used: i64 = known
                .iter()
                .filter(|b| b.day() == day)
                .map(StudyBlock::duration_minutes)
                .sum();
            let mut state = DayState::ProcessingDay;

            for _ in 0..MAX_BLOCKS_PER_DAY {
                let capacity_left = capacity - used;
                if capacity_left <= 0 {
                    state = DayState::DayCapacityReached;
                    break;
                }

                let occupied: Vec<BusyInterval> = busy
                    .iter()
                    .copied()
                    .chain(known.iter().map(StudyBlock::as_busy))
                    .collect();
                let slots = finder.find_free_slots(window_start, window_end, &occupied);
                if slots.is_empty() {
                    state = DayState::NoSlotsFit;
                    break;
                }

                let placement = pending
                    .iter_mut()
                    .filter(|p| p.remaining > 0 && p.task.due_at > window_start)
                    .find_map(|p| {
                        selector
                            .best_slot_for(&p.task, p.remaining, &slots, &known, capacity_left, rng)
                            .map(|candidate| (p, candidate))
                    });

                let Some((entry, candidate)) = placement else {
                    state = DayState::NoSlotsFit;
                    break;
                };

                let block = StudyBlock::from_candidate(&entry.task, &candidate, rng);
                let minutes = block.duration_minutes();
                used += minutes;
                entry.remaining = if entry.task.splittable {
                    (entry.remaining - minutes).max(0)
                } else {
                    0
                };
                debug!(
                    task_id = %entry.task.id,
                    start = %block.start_time,
                    minutes,
                    score = block.confidence,
                    "placed study block"
                );
                known.push(block);
            }

            if used >= capacity {
                state = DayState::DayCapacityReached;
            }
            debug!(%day, ?state, used, capacity, "day processed");
        }

        known.split_off(carried_len)
    }
}

impl Default for StudyScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

/// Drop malformed busy intervals, logging each one.
fn valid_busy(busy: &[BusyInterval]) -> Vec<BusyInterval> {
    busy.iter()
        .filter(|b| {
            if !b.is_valid() {
                warn!(start = %b.start_time, end = %b.end_time, "dropping malformed busy interval");
            }
            b.is_valid()
        })
        .copied()
        .collect()
}

/// Calendar days whose midnight lies before `until`, starting at `from`'s day.
fn days_between(from: DateTime<Utc>, until: DateTime<Utc>) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = from.date_naive();
    while let Some(midnight) = day.and_hms_opt(0, 0, 0) {
        if midnight.and_utc() >= until {
            break;
        }
        days.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}
