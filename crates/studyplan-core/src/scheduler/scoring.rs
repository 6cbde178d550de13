//! Slot scoring and selection.
//!
//! For one task against a day's free slots, the selector sizes a candidate
//! block, enumerates start times inside every slot, scores each start on
//! seven weighted factors and returns the best placement. Every factor
//! returns a value in 0-100.

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::energy::EnergyModel;
use crate::scheduler::config::{PreferredTimes, SchedulerConfig};
use crate::scheduler::StudyBlock;
use crate::task::{Task, TaskType};
use crate::timeline::TimeSlot;

/// Scores within this distance of the best are treated as ties.
pub const TIE_EPSILON: f64 = 0.25;
/// Ties are broken among at most this many leading candidates.
const TIE_POOL: usize = 3;
/// Spacing between candidate starts inside a slot.
const START_STEP_MINUTES: i64 = 30;
const MAX_STARTS_PER_SLOT: usize = 48;
/// Other blocks closer than this count as clustered.
const CLUSTER_WINDOW_MINUTES: i64 = 120;

/// Factor weights; they sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub energy_match: f64,
    pub deadline_buffer: f64,
    pub time_preference: f64,
    pub type_affinity: f64,
    pub clustering: f64,
    pub variety: f64,
    pub daily_spread: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            energy_match: 0.23,
            deadline_buffer: 0.18,
            time_preference: 0.18,
            type_affinity: 0.12,
            clustering: 0.09,
            variety: 0.10,
            daily_spread: 0.10,
        }
    }
}

/// Per-factor breakdown of a candidate's score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScores {
    pub energy_match: f64,
    pub deadline_buffer: f64,
    pub time_preference: f64,
    pub type_affinity: f64,
    pub clustering: f64,
    pub variety: f64,
    pub daily_spread: f64,
}

impl FactorScores {
    pub fn weighted_total(&self, w: &ScoringWeights) -> f64 {
        self.energy_match * w.energy_match
            + self.deadline_buffer * w.deadline_buffer
            + self.time_preference * w.time_preference
            + self.type_affinity * w.type_affinity
            + self.clustering * w.clustering
            + self.variety * w.variety
            + self.daily_spread * w.daily_spread
    }
}

/// A scored placement for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCandidate {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub score: f64,
    pub factors: FactorScores,
    /// Ambient energy at the start hour
    pub ambient_energy: f64,
}

impl SlotCandidate {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Energy match: 100 minus the gap between required and ambient energy.
pub fn energy_match_score(required: f64, ambient: f64) -> f64 {
    (100.0 - (required - ambient).abs()).clamp(0.0, 100.0)
}

/// Deadline buffer: more margin between block end and due date scores higher.
///
/// Exams and quizzes need a full day of margin for full credit; other work
/// reaches full credit at two days.
pub fn deadline_buffer_score(task: &Task, end: DateTime<Utc>) -> f64 {
    let margin_hours = (task.due_at - end).num_minutes() as f64 / 60.0;
    if margin_hours < 0.0 {
        return 0.0;
    }

    if task.task_type.needs_long_lead() {
        if margin_hours >= 24.0 {
            100.0
        } else {
            margin_hours / 24.0 * 60.0
        }
    } else if margin_hours >= 48.0 {
        100.0
    } else {
        40.0 + margin_hours / 48.0 * 60.0
    }
}

/// User time preference: inside a declared window = 100, outside = 20,
/// no declared preference = neutral 50.
pub fn time_preference_score(prefs: &PreferredTimes, hour: u32) -> f64 {
    if !prefs.any() {
        50.0
    } else if prefs.contains_hour(hour) {
        100.0
    } else {
        20.0
    }
}

/// Task-type/time-of-day affinity.
pub fn type_affinity_score(task_type: TaskType, hour: u32) -> f64 {
    match task_type {
        TaskType::Exam | TaskType::Quiz => match hour {
            9..=11 => 100.0,
            12..=14 => 80.0,
            6..=8 | 15..=17 => 60.0,
            _ => 40.0,
        },
        TaskType::Reading => match hour {
            18..=21 => 100.0,
            14..=17 => 75.0,
            _ => 50.0,
        },
        TaskType::Project => match hour {
            13..=17 => 100.0,
            9..=12 => 85.0,
            18..=20 => 70.0,
            _ => 45.0,
        },
        TaskType::Assignment => match hour {
            10..=16 => 90.0,
            17..=20 => 75.0,
            _ => 50.0,
        },
        TaskType::Study => match hour {
            8..=11 => 90.0,
            14..=19 => 85.0,
            _ => 60.0,
        },
        TaskType::Break => 70.0,
    }
}

/// Clustering penalty: each block (of any task) on the same day within two
/// hours of the candidate costs 35 points.
pub fn clustering_score(placed: &[StudyBlock], start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let day = start.date_naive();
    let near = placed
        .iter()
        .filter(|b| b.start_time.date_naive() == day)
        .filter(|b| {
            let gap = (b.start_time - end).max(start - b.end_time);
            gap.num_minutes() < CLUSTER_WINDOW_MINUTES
        })
        .count();
    (100.0 - 35.0 * near as f64).max(0.0)
}

/// Variety: penalize reusing the same start hour for the same task.
pub fn variety_score(task: &Task, placed: &[StudyBlock], start: DateTime<Utc>) -> f64 {
    let hour = start.hour();
    let repeats = placed
        .iter()
        .filter(|b| b.task_id == task.id && b.start_time.hour() == hour)
        .count();
    (100.0 - 40.0 * repeats as f64).max(0.0)
}

/// Daily spread: a second same-day block for the same task is heavily
/// penalized unless the deadline is within a day.
pub fn daily_spread_score(task: &Task, placed: &[StudyBlock], start: DateTime<Utc>) -> f64 {
    let same_day = same_day_count(task, placed, start);
    if same_day == 0 {
        100.0
    } else if task.due_at - start <= Duration::hours(24) {
        60.0
    } else {
        10.0
    }
}

fn same_day_count(task: &Task, placed: &[StudyBlock], start: DateTime<Utc>) -> usize {
    let day = start.date_naive();
    placed
        .iter()
        .filter(|b| b.task_id == task.id && b.start_time.date_naive() == day)
        .count()
}

/// Next candidate start: the following half-hour boundary.
fn next_start(start: DateTime<Utc>) -> DateTime<Utc> {
    let minute_of_day = i64::from(start.hour() * 60 + start.minute());
    let aligned = (minute_of_day / START_STEP_MINUTES + 1) * START_STEP_MINUTES;
    start - Duration::minutes(minute_of_day) - Duration::seconds(i64::from(start.second()))
        - Duration::nanoseconds(i64::from(start.nanosecond()))
        + Duration::minutes(aligned)
}

/// Chooses the best placement of one task among free slots.
pub struct SlotSelector<'a> {
    config: &'a SchedulerConfig,
    energy: &'a EnergyModel,
    weights: ScoringWeights,
}

impl<'a> SlotSelector<'a> {
    /// `config` is expected to be sanitized.
    pub fn new(config: &'a SchedulerConfig, energy: &'a EnergyModel) -> Self {
        Self {
            config,
            energy,
            weights: ScoringWeights::default(),
        }
    }

    /// Best placement for `task` among `slots`, or `None` if nothing fits.
    ///
    /// # Arguments
    /// * `remaining_minutes` - Work still to place for the task
    /// * `placed` - Every block known so far (carried over and newly placed)
    /// * `capacity_left` - Minutes still available under the day's ceiling
    /// * `rng` - Seeded source used only to break near-ties
    pub fn best_slot_for<R: Rng>(
        &self,
        task: &Task,
        remaining_minutes: i64,
        slots: &[TimeSlot],
        placed: &[StudyBlock],
        capacity_left: i64,
        rng: &mut R,
    ) -> Option<SlotCandidate> {
        if remaining_minutes <= 0 || capacity_left <= 0 {
            return None;
        }

        let buffer = i64::from(self.config.buffer_minutes);
        let floor = self.config.session_floor(task);
        let mut candidates = Vec::new();

        for slot in slots {
            if slot.duration_minutes() < remaining_minutes.min(floor) + buffer {
                continue;
            }

            let lead = if slot.after_busy { buffer } else { 0 };
            let trail = if slot.before_busy { buffer } else { 0 };
            let earliest = slot.start_time + Duration::minutes(lead);
            let latest_end = (slot.end_time - Duration::minutes(trail)).min(task.due_at);
            if latest_end <= earliest {
                continue;
            }

            let available = (latest_end - earliest).num_minutes();
            let Some(duration) =
                self.candidate_duration(task, remaining_minutes, available, capacity_left)
            else {
                continue;
            };
            if duration <= 0 {
                continue;
            }
            let length = Duration::minutes(duration);

            let mut start = earliest;
            let mut tried = 0;
            while start + length <= latest_end && tried < MAX_STARTS_PER_SLOT {
                let end = start + length;
                if end > start && self.stacking_allows(task, placed, start) {
                    candidates.push(self.score(task, start, end, placed));
                }
                start = next_start(start);
                tried += 1;
            }
        }

        self.pick(candidates, rng)
    }

    /// Size of the block to propose, bounded by remaining need, preferred and
    /// maximum session length, available room and the day's capacity.
    fn candidate_duration(
        &self,
        task: &Task,
        remaining: i64,
        available: i64,
        capacity_left: i64,
    ) -> Option<i64> {
        let floor = self.config.session_floor(task);
        let room = available.min(capacity_left);

        // Atomic tasks and needs below the floor take the whole need at once.
        if !task.splittable || remaining < floor {
            return (remaining <= room).then_some(remaining);
        }

        let cap = i64::from(self.config.session_duration.max);
        let preferred = i64::from(self.config.session_duration.preferred);
        let mut duration = remaining.min(preferred).min(cap).min(room);

        if duration < floor {
            if floor > room {
                return None;
            }
            duration = floor;
        }

        // Never leave a remainder too small to schedule on its own.
        let rest = remaining - duration;
        if rest > 0 && rest < floor {
            if remaining <= room && remaining <= cap.max(floor) {
                duration = remaining;
            } else if remaining - floor >= floor {
                duration = remaining - floor;
            } else {
                return None;
            }
        }

        Some(duration)
    }

    /// Same-day stacking rule: one block per day while more than a day
    /// remains before the deadline, at most two inside the final day.
    fn stacking_allows(&self, task: &Task, placed: &[StudyBlock], start: DateTime<Utc>) -> bool {
        match same_day_count(task, placed, start) {
            0 => true,
            1 => task.due_at - start <= Duration::hours(24),
            _ => false,
        }
    }

    fn score(
        &self,
        task: &Task,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        placed: &[StudyBlock],
    ) -> SlotCandidate {
        let ambient = self.energy.energy_at_time(start).energy_level;
        let hour = start.hour();
        let factors = FactorScores {
            energy_match: energy_match_score(task.energy_required(), ambient),
            deadline_buffer: deadline_buffer_score(task, end),
            time_preference: time_preference_score(&self.config.preferred_times, hour),
            type_affinity: type_affinity_score(task.task_type, hour),
            clustering: clustering_score(placed, start, end),
            variety: variety_score(task, placed, start),
            daily_spread: daily_spread_score(task, placed, start),
        };

        SlotCandidate {
            start_time: start,
            end_time: end,
            score: factors.weighted_total(&self.weights),
            factors,
            ambient_energy: ambient,
        }
    }

    /// Highest score wins; near-ties among the leaders are broken by `rng`.
    fn pick<R: Rng>(
        &self,
        mut candidates: Vec<SlotCandidate>,
        rng: &mut R,
    ) -> Option<SlotCandidate> {
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.start_time.cmp(&b.start_time))
        });

        let best = candidates.first()?.score;
        let tied = candidates
            .iter()
            .take(TIE_POOL)
            .take_while(|c| best - c.score <= TIE_EPSILON)
            .count();
        let index = if tied > 1 { rng.gen_range(0..tied) } else { 0 };

        Some(candidates.swap_remove(index))
    }
}
