//! Energy model types.
//!
//! The model is a fixed circadian curve scaled by a day-of-week multiplier.
//! Callers may pin explicit per-hour values that replace the computed level
//! on every day of the week.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Base energy per hour of day (0-100): low overnight, peaking mid-morning
/// and again in the early evening.
pub const BASE_ENERGY_CURVE: [f64; 24] = [
    20.0, 15.0, 10.0, 10.0, 10.0, 15.0, // 00-05
    30.0, 50.0, 70.0, 85.0, 90.0, 85.0, // 06-11
    75.0, 65.0, 60.0, 65.0, 70.0, 75.0, // 12-17
    80.0, 75.0, 65.0, 50.0, 40.0, 30.0, // 18-23
];

/// Day-of-week multipliers, Sunday first.
pub const DAY_MULTIPLIERS: [f64; 7] = [0.90, 0.85, 0.90, 0.95, 1.00, 1.05, 0.95];

/// Productivity is a fixed fraction of energy.
pub const PRODUCTIVITY_FACTOR: f64 = 0.9;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Energy and productivity at a given hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyReading {
    pub energy_level: f64,
    pub productivity: f64,
}

impl EnergyReading {
    fn from_level(level: f64) -> Self {
        let energy_level = level.clamp(0.0, 100.0);
        Self {
            energy_level,
            productivity: energy_level * PRODUCTIVITY_FACTOR,
        }
    }
}

/// Caller-supplied replacement for one hour of the curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyOverride {
    /// Hour of day (0-23)
    pub hour: u8,
    /// Energy level (0-100)
    pub energy_level: f64,
}

/// Coarse classification of an energy reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyBand {
    High,
    Medium,
    Low,
    Depleted,
}

impl EnergyBand {
    /// Classify `level` against high/medium/low thresholds.
    pub fn classify(level: f64, high: f64, medium: f64, low: f64) -> Self {
        if level >= high {
            Self::High
        } else if level >= medium {
            Self::Medium
        } else if level >= low {
            Self::Low
        } else {
            Self::Depleted
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Depleted => "depleted",
        }
    }

    fn indicator(self) -> &'static str {
        match self {
            Self::High => "●",
            Self::Medium => "○",
            Self::Low => "·",
            Self::Depleted => " ",
        }
    }
}

/// Energy model with an optional per-hour override table.
///
/// The model is a plain value: the scheduler receives it as an input and
/// never mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyModel {
    overrides: [Option<f64>; 24],
}

impl EnergyModel {
    /// Create a model with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from persisted overrides. Out-of-range entries are skipped.
    pub fn from_overrides(overrides: &[EnergyOverride]) -> Self {
        let mut model = Self::new();
        for o in overrides {
            if !model.set_override(o.hour, o.energy_level) {
                warn!(hour = o.hour, level = o.energy_level, "ignoring invalid energy override");
            }
        }
        model
    }

    /// Builder form of [`set_override`](Self::set_override).
    pub fn with_override(mut self, hour: u8, energy_level: f64) -> Self {
        self.set_override(hour, energy_level);
        self
    }

    /// Pin the energy for `hour` on every day. Returns false if rejected.
    pub fn set_override(&mut self, hour: u8, energy_level: f64) -> bool {
        if hour >= 24 || !energy_level.is_finite() {
            return false;
        }
        self.overrides[hour as usize] = Some(energy_level.clamp(0.0, 100.0));
        true
    }

    /// Remove the override for `hour`, returning whether one existed.
    pub fn clear_override(&mut self, hour: u8) -> bool {
        self.overrides
            .get_mut(hour as usize)
            .and_then(Option::take)
            .is_some()
    }

    /// Current overrides in hour order.
    pub fn overrides(&self) -> Vec<EnergyOverride> {
        self.overrides
            .iter()
            .enumerate()
            .filter_map(|(hour, level)| {
                level.map(|energy_level| EnergyOverride {
                    hour: hour as u8,
                    energy_level,
                })
            })
            .collect()
    }

    /// Energy at `hour` (0-23) on `day_of_week` (0-6, Sunday=0).
    pub fn energy_at(&self, hour: u32, day_of_week: u32) -> EnergyReading {
        let idx = hour as usize;
        if let Some(Some(level)) = self.overrides.get(idx) {
            return EnergyReading::from_level(*level);
        }
        let base = BASE_ENERGY_CURVE
            .get(idx)
            .copied()
            .unwrap_or(BASE_ENERGY_CURVE[0]);
        let multiplier = DAY_MULTIPLIERS
            .get(day_of_week as usize)
            .copied()
            .unwrap_or(1.0);
        EnergyReading::from_level(base * multiplier)
    }

    /// Energy at the hour containing `time`.
    pub fn energy_at_time(&self, time: DateTime<Utc>) -> EnergyReading {
        self.energy_at(time.hour(), time.weekday().num_days_from_sunday())
    }

    /// Hours of `day_of_week` whose energy is at least `min_energy`.
    pub fn peak_hours(&self, day_of_week: u32, min_energy: f64) -> Vec<u8> {
        (0u8..24)
            .filter(|&h| self.energy_at(u32::from(h), day_of_week).energy_level >= min_energy)
            .collect()
    }

    /// Render the curve for one day as an ASCII chart.
    pub fn render_ascii_chart(&self, day_of_week: u32, thresholds: (f64, f64, f64)) -> String {
        let (high, medium, low) = thresholds;
        let name = DAY_NAMES.get(day_of_week as usize).copied().unwrap_or("???");
        let mut output = format!("\n{name} Energy Curve:\n");
        output.push_str(&"─".repeat(50));
        output.push('\n');

        for hour in 0..24u32 {
            let reading = self.energy_at(hour, day_of_week);
            let bar_length = ((reading.energy_level / 100.0) * 30.0) as usize;
            let bar = "█".repeat(bar_length);
            let empty = " ".repeat(30 - bar_length.min(30));
            let band = EnergyBand::classify(reading.energy_level, high, medium, low);
            let pinned = if self.overrides[hour as usize].is_some() { "*" } else { " " };

            output.push_str(&format!(
                "{:02}:00 {}{}{}{} {:.0}%\n",
                hour,
                bar,
                empty,
                band.indicator(),
                pinned,
                reading.energy_level
            ));
        }

        output.push_str(&"─".repeat(50));
        output.push_str("\n● High  ○ Medium  · Low  * pinned\n");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_productivity_is_ninety_percent() {
        let model = EnergyModel::new();
        let reading = model.energy_at(10, 4);
        assert_eq!(reading.energy_level, 90.0);
        assert!((reading.productivity - 81.0).abs() < 1e-9);
    }

    #[test]
    fn test_day_multiplier_ordering() {
        let model = EnergyModel::new();
        let monday = model.energy_at(10, 1).energy_level;
        let wednesday = model.energy_at(10, 3).energy_level;
        let friday = model.energy_at(10, 5).energy_level;
        let saturday = model.energy_at(10, 6).energy_level;
        assert!(monday < wednesday);
        assert!(wednesday < friday);
        assert!(saturday < friday);
        for day in 0..7 {
            assert!(model.energy_at(10, day).energy_level >= monday);
        }
    }

    #[test]
    fn test_curve_peaks() {
        let model = EnergyModel::new();
        let night = model.energy_at(3, 4).energy_level;
        let morning = model.energy_at(10, 4).energy_level;
        let afternoon = model.energy_at(14, 4).energy_level;
        let evening = model.energy_at(18, 4).energy_level;
        assert!(night < afternoon);
        assert!(morning > afternoon);
        assert!(evening > afternoon);
    }

    #[test]
    fn test_override_applies_to_all_days() {
        let model = EnergyModel::new().with_override(14, 95.0);
        for day in 0..7 {
            assert_eq!(model.energy_at(14, day).energy_level, 95.0);
        }
        assert_eq!(model.overrides().len(), 1);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut model = EnergyModel::new();
        assert!(!model.set_override(24, 50.0));
        assert!(!model.set_override(5, f64::NAN));
        assert!(model.set_override(5, 250.0));
        assert_eq!(model.energy_at(5, 0).energy_level, 100.0);
        assert!(model.clear_override(5));
        assert!(!model.clear_override(5));
    }

    #[test]
    fn test_out_of_range_hour_falls_back_to_midnight() {
        let model = EnergyModel::new();
        let reading = model.energy_at(30, 4);
        assert_eq!(reading.energy_level, BASE_ENERGY_CURVE[0]);
    }

    #[test]
    fn test_peak_hours() {
        let model = EnergyModel::new();
        let peaks = model.peak_hours(4, 85.0);
        assert_eq!(peaks, vec![9, 10, 11]);
    }

    #[test]
    fn test_ascii_chart() {
        let model = EnergyModel::new().with_override(9, 40.0);
        let chart = model.render_ascii_chart(1, (70.0, 50.0, 30.0));
        assert!(chart.contains("Mon"));
        assert!(chart.contains("09:00"));
        assert!(chart.contains("40%"));
        assert!(chart.contains('*'));
    }

    #[test]
    fn test_band_classification() {
        assert_eq!(EnergyBand::classify(80.0, 70.0, 50.0, 30.0), EnergyBand::High);
        assert_eq!(EnergyBand::classify(55.0, 70.0, 50.0, 30.0), EnergyBand::Medium);
        assert_eq!(EnergyBand::classify(30.0, 70.0, 50.0, 30.0), EnergyBand::Low);
        assert_eq!(EnergyBand::classify(10.0, 70.0, 50.0, 30.0), EnergyBand::Depleted);
        assert_eq!(EnergyBand::Medium.label(), "medium");
    }
}
