//! Scheduler configuration.
//!
//! Every section deserializes with defaults so partial TOML/JSON documents
//! are accepted. [`SchedulerConfig::sanitized`] replaces out-of-range values
//! with safe defaults before any duration math happens.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::energy::EnergyBand;
use crate::task::{Task, TaskType};

/// Absolute lower bound for any study block, in minutes.
pub const HARD_MIN_SESSION_MINUTES: u32 = 15;
/// Upper bound on placement iterations within one day.
pub const MAX_BLOCKS_PER_DAY: usize = 8;

const DEFAULT_WAKE_HOUR: u32 = 8;
const DEFAULT_BEDTIME_HOUR: u32 = 22;
const DEFAULT_WINDOW_HOURS: u32 = 14;
const DEFAULT_BUFFER_MINUTES: u32 = 10;
const MAX_BUFFER_MINUTES: u32 = 120;
const MAX_MIN_SESSION_MINUTES: u32 = 240;
const MAX_SESSION_CAP_MINUTES: u32 = 480;
const DEFAULT_RESCHEDULE_HORIZON_DAYS: u32 = 14;
const MAX_RESCHEDULE_HORIZON_DAYS: u32 = 365;

/// Daily study-hour bounds. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStudyHours {
    #[serde(default = "default_daily_min")]
    pub min: f64,
    #[serde(default = "default_daily_max")]
    pub max: f64,
    #[serde(default = "default_daily_preferred")]
    pub preferred: f64,
}

/// Break lengths in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakDurations {
    #[serde(default = "default_short_break")]
    pub short: u32,
    #[serde(default = "default_long_break")]
    pub long: u32,
}

/// Session length bounds in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDurations {
    #[serde(default = "default_session_min")]
    pub min: u32,
    #[serde(default = "default_session_max")]
    pub max: u32,
    #[serde(default = "default_session_preferred")]
    pub preferred: u32,
}

/// Energy thresholds used to classify readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyThresholds {
    #[serde(default = "default_energy_high")]
    pub high: f64,
    #[serde(default = "default_energy_medium")]
    pub medium: f64,
    #[serde(default = "default_energy_low")]
    pub low: f64,
}

impl EnergyThresholds {
    pub fn band(&self, level: f64) -> EnergyBand {
        EnergyBand::classify(level, self.high, self.medium, self.low)
    }

    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.high, self.medium, self.low)
    }
}

/// Waking window. `bedtime_hour` may be 24 (midnight).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSchedule {
    #[serde(default = "default_wake_hour")]
    pub wake_hour: u32,
    #[serde(default = "default_bedtime_hour")]
    pub bedtime_hour: u32,
}

/// Preferred time-of-day windows.
///
/// morning 06-12, afternoon 12-17, evening 17-21, night 21-06.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferredTimes {
    #[serde(default)]
    pub morning: bool,
    #[serde(default)]
    pub afternoon: bool,
    #[serde(default)]
    pub evening: bool,
    #[serde(default)]
    pub night: bool,
}

impl PreferredTimes {
    pub fn any(&self) -> bool {
        self.morning || self.afternoon || self.evening || self.night
    }

    /// Whether `hour` falls inside one of the selected windows.
    pub fn contains_hour(&self, hour: u32) -> bool {
        (self.morning && (6..12).contains(&hour))
            || (self.afternoon && (12..17).contains(&hour))
            || (self.evening && (17..21).contains(&hour))
            || (self.night && (hour >= 21 || hour < 6))
    }
}

/// Per-type default durations in minutes, used when a record has no estimate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDurations {
    #[serde(default)]
    pub exam: Option<u32>,
    #[serde(default)]
    pub quiz: Option<u32>,
    #[serde(default)]
    pub project: Option<u32>,
    #[serde(default)]
    pub assignment: Option<u32>,
    #[serde(default)]
    pub reading: Option<u32>,
    #[serde(default)]
    pub study: Option<u32>,
    #[serde(rename = "break", default)]
    pub break_time: Option<u32>,
}

impl TypeDurations {
    /// Configured duration for `task_type`, or its built-in default.
    pub fn for_type(&self, task_type: TaskType) -> u32 {
        let configured = match task_type {
            TaskType::Exam => self.exam,
            TaskType::Quiz => self.quiz,
            TaskType::Project => self.project,
            TaskType::Assignment => self.assignment,
            TaskType::Reading => self.reading,
            TaskType::Study => self.study,
            TaskType::Break => self.break_time,
        };
        configured
            .filter(|&m| m > 0)
            .unwrap_or_else(|| task_type.default_duration_minutes())
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub daily_study_hours: DailyStudyHours,
    #[serde(default)]
    pub break_durations: BreakDurations,
    #[serde(default)]
    pub session_duration: SessionDurations,
    /// Breathing room between a block and its neighbours (minutes)
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: u32,
    #[serde(default)]
    pub energy_thresholds: EnergyThresholds,
    #[serde(default)]
    pub sleep_schedule: SleepSchedule,
    #[serde(default)]
    pub preferred_times: PreferredTimes,
    /// Allowed study days (0=Sun ... 6=Sat). `None` allows every day.
    #[serde(default)]
    pub study_days: Option<Vec<u8>>,
    #[serde(default = "default_true")]
    pub allow_weekend_study: bool,
    /// Fraction of the waking window usable per day (0-1)
    #[serde(default = "default_capacity_limit")]
    pub capacity_limit: f64,
    #[serde(default)]
    pub type_durations: TypeDurations,
    /// Forward horizon of incremental rescheduling (days)
    #[serde(default = "default_reschedule_horizon_days")]
    pub reschedule_horizon_days: u32,
}

// Default functions
fn default_daily_min() -> f64 {
    1.0
}
fn default_daily_max() -> f64 {
    8.0
}
fn default_daily_preferred() -> f64 {
    4.0
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_session_min() -> u32 {
    25
}
fn default_session_max() -> u32 {
    120
}
fn default_session_preferred() -> u32 {
    50
}
fn default_buffer_minutes() -> u32 {
    DEFAULT_BUFFER_MINUTES
}
fn default_energy_high() -> f64 {
    70.0
}
fn default_energy_medium() -> f64 {
    50.0
}
fn default_energy_low() -> f64 {
    30.0
}
fn default_wake_hour() -> u32 {
    DEFAULT_WAKE_HOUR
}
fn default_bedtime_hour() -> u32 {
    DEFAULT_BEDTIME_HOUR
}
fn default_true() -> bool {
    true
}
fn default_capacity_limit() -> f64 {
    1.0
}
fn default_reschedule_horizon_days() -> u32 {
    DEFAULT_RESCHEDULE_HORIZON_DAYS
}

impl Default for DailyStudyHours {
    fn default() -> Self {
        Self {
            min: default_daily_min(),
            max: default_daily_max(),
            preferred: default_daily_preferred(),
        }
    }
}

impl Default for BreakDurations {
    fn default() -> Self {
        Self {
            short: default_short_break(),
            long: default_long_break(),
        }
    }
}

impl Default for SessionDurations {
    fn default() -> Self {
        Self {
            min: default_session_min(),
            max: default_session_max(),
            preferred: default_session_preferred(),
        }
    }
}

impl Default for EnergyThresholds {
    fn default() -> Self {
        Self {
            high: default_energy_high(),
            medium: default_energy_medium(),
            low: default_energy_low(),
        }
    }
}

impl Default for SleepSchedule {
    fn default() -> Self {
        Self {
            wake_hour: default_wake_hour(),
            bedtime_hour: default_bedtime_hour(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_study_hours: DailyStudyHours::default(),
            break_durations: BreakDurations::default(),
            session_duration: SessionDurations::default(),
            buffer_minutes: default_buffer_minutes(),
            energy_thresholds: EnergyThresholds::default(),
            sleep_schedule: SleepSchedule::default(),
            preferred_times: PreferredTimes::default(),
            study_days: None,
            allow_weekend_study: true,
            capacity_limit: default_capacity_limit(),
            type_durations: TypeDurations::default(),
            reschedule_horizon_days: default_reschedule_horizon_days(),
        }
    }
}

impl SchedulerConfig {
    /// Return a copy with every out-of-range value replaced by a safe default.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();

        let sleep = &mut c.sleep_schedule;
        if sleep.wake_hour > 23 {
            warn!(wake_hour = sleep.wake_hour, "wake hour out of range, using default");
            sleep.wake_hour = DEFAULT_WAKE_HOUR;
        }
        if sleep.bedtime_hour > 24 {
            sleep.bedtime_hour = 24;
        }
        if sleep.bedtime_hour <= sleep.wake_hour {
            warn!(
                wake_hour = sleep.wake_hour,
                bedtime_hour = sleep.bedtime_hour,
                "bedtime not after wake hour, extending window"
            );
            sleep.bedtime_hour = (sleep.wake_hour + DEFAULT_WINDOW_HOURS).min(24);
        }

        let session = &mut c.session_duration;
        if session.min > MAX_MIN_SESSION_MINUTES {
            session.min = default_session_min();
        }
        session.min = session.min.max(HARD_MIN_SESSION_MINUTES);
        session.max = session.max.clamp(session.min, MAX_SESSION_CAP_MINUTES.max(session.min));
        session.preferred = session.preferred.clamp(session.min, session.max);

        if c.buffer_minutes > MAX_BUFFER_MINUTES {
            warn!(buffer = c.buffer_minutes, "buffer time out of range, using default");
            c.buffer_minutes = DEFAULT_BUFFER_MINUTES;
        }

        if !c.capacity_limit.is_finite() || c.capacity_limit <= 0.0 || c.capacity_limit > 1.0 {
            warn!(capacity = c.capacity_limit, "capacity limit out of range, using 1.0");
            c.capacity_limit = default_capacity_limit();
        }

        if let Some(days) = c.study_days.as_mut() {
            days.retain(|&d| d < 7);
            days.sort_unstable();
            days.dedup();
        }

        if c.reschedule_horizon_days == 0 {
            c.reschedule_horizon_days = DEFAULT_RESCHEDULE_HORIZON_DAYS;
        }
        c.reschedule_horizon_days = c.reschedule_horizon_days.min(MAX_RESCHEDULE_HORIZON_DAYS);

        c
    }

    /// Whether study is allowed on `weekday` (0=Sun ... 6=Sat).
    pub fn allows_study_on(&self, weekday: u32) -> bool {
        let weekend = weekday == 0 || weekday == 6;
        if weekend && !self.allow_weekend_study {
            return false;
        }
        match &self.study_days {
            Some(days) => days.iter().any(|&d| u32::from(d) == weekday),
            None => true,
        }
    }

    /// Waking window of `day` as UTC timestamps.
    pub fn day_window(&self, day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let midnight = day.and_hms_opt(0, 0, 0)?.and_utc();
        let start = midnight + Duration::hours(i64::from(self.sleep_schedule.wake_hour));
        let end = midnight + Duration::hours(i64::from(self.sleep_schedule.bedtime_hour));
        (start < end).then_some((start, end))
    }

    /// Maximum minutes of new blocks per day.
    pub fn daily_capacity_minutes(&self) -> i64 {
        let window = i64::from(
            self.sleep_schedule
                .bedtime_hour
                .saturating_sub(self.sleep_schedule.wake_hour),
        ) * 60;
        (window as f64 * self.capacity_limit).floor() as i64
    }

    /// Smallest block `task` may receive.
    pub fn session_floor(&self, task: &Task) -> i64 {
        i64::from(
            self.session_duration
                .min
                .max(task.min_block_minutes)
                .max(HARD_MIN_SESSION_MINUTES),
        )
    }

    /// Shortest free slot worth reporting: the smallest session plus buffer.
    pub fn min_free_slot_minutes(&self) -> i64 {
        i64::from(self.session_duration.min.max(HARD_MIN_SESSION_MINUTES) + self.buffer_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.session_duration.min, 25);
        assert_eq!(config.buffer_minutes, 10);
        assert_eq!(config.daily_capacity_minutes(), 14 * 60);
        assert_eq!(config.min_free_slot_minutes(), 35);
    }

    #[test]
    fn test_energy_threshold_bands() {
        let thresholds = EnergyThresholds::default();
        assert_eq!(thresholds.band(85.0), EnergyBand::High);
        assert_eq!(thresholds.band(70.0), EnergyBand::High);
        assert_eq!(thresholds.band(49.9), EnergyBand::Low);
        assert_eq!(thresholds.band(12.0), EnergyBand::Depleted);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: SchedulerConfig = toml::from_str(
            r#"
            buffer_minutes = 15
            [sleep_schedule]
            wake_hour = 9
            [preferred_times]
            evening = true
            "#,
        )
        .unwrap();
        assert_eq!(config.buffer_minutes, 15);
        assert_eq!(config.sleep_schedule.wake_hour, 9);
        assert_eq!(config.sleep_schedule.bedtime_hour, 22);
        assert!(config.preferred_times.evening);
        assert!(!config.preferred_times.morning);
        assert_eq!(config.session_duration.preferred, 50);
    }

    #[test]
    fn test_sanitize_inverted_sleep_schedule() {
        let mut config = SchedulerConfig::default();
        config.sleep_schedule = SleepSchedule {
            wake_hour: 20,
            bedtime_hour: 6,
        };
        let fixed = config.sanitized();
        assert_eq!(fixed.sleep_schedule.wake_hour, 20);
        assert_eq!(fixed.sleep_schedule.bedtime_hour, 24);
    }

    #[test]
    fn test_sanitize_session_and_capacity() {
        let mut config = SchedulerConfig::default();
        config.session_duration = SessionDurations {
            min: 5,
            max: 3,
            preferred: 900,
        };
        config.capacity_limit = f64::NAN;
        config.buffer_minutes = 1_000;
        config.study_days = Some(vec![3, 1, 9, 1]);

        let fixed = config.sanitized();
        assert_eq!(fixed.session_duration.min, HARD_MIN_SESSION_MINUTES);
        assert_eq!(fixed.session_duration.max, HARD_MIN_SESSION_MINUTES);
        assert_eq!(fixed.session_duration.preferred, HARD_MIN_SESSION_MINUTES);
        assert_eq!(fixed.capacity_limit, 1.0);
        assert_eq!(fixed.buffer_minutes, 10);
        assert_eq!(fixed.study_days, Some(vec![1, 3]));
    }

    #[test]
    fn test_allowed_days() {
        let mut config = SchedulerConfig::default();
        assert!(config.allows_study_on(0));

        config.allow_weekend_study = false;
        assert!(!config.allows_study_on(0));
        assert!(!config.allows_study_on(6));
        assert!(config.allows_study_on(2));

        config.allow_weekend_study = true;
        config.study_days = Some(vec![1, 3, 5]);
        assert!(config.allows_study_on(3));
        assert!(!config.allows_study_on(4));
    }

    #[test]
    fn test_day_window_and_capacity_fraction() {
        let mut config = SchedulerConfig::default();
        config.sleep_schedule = SleepSchedule {
            wake_hour: 9,
            bedtime_hour: 21,
        };
        config.capacity_limit = 0.5;

        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let (start, end) = config.day_window(day).unwrap();
        assert_eq!((end - start).num_hours(), 12);
        assert_eq!(config.daily_capacity_minutes(), 360);
    }

    #[test]
    fn test_preferred_time_windows() {
        let prefs = PreferredTimes {
            afternoon: true,
            night: true,
            ..Default::default()
        };
        assert!(prefs.contains_hour(13));
        assert!(prefs.contains_hour(23));
        assert!(prefs.contains_hour(2));
        assert!(!prefs.contains_hour(9));
        assert!(!prefs.contains_hour(18));
    }

    #[test]
    fn test_type_durations_fallback() {
        let durations = TypeDurations {
            exam: Some(240),
            quiz: Some(0),
            ..Default::default()
        };
        assert_eq!(durations.for_type(TaskType::Exam), 240);
        assert_eq!(durations.for_type(TaskType::Quiz), 60);
        assert_eq!(durations.for_type(TaskType::Reading), 60);
    }
}
