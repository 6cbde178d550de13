//! Energy curve commands: chart, peak hours and personal overrides.

use chrono::{Datelike, Utc};
use clap::Subcommand;
use std::path::Path;

use super::{load_config, save_config};

#[derive(Subcommand)]
pub enum EnergyAction {
    /// Show the energy curve for a day
    Show {
        /// Day of week (0-6 or sun/mon/tue/wed/thu/fri/sat)
        #[arg(long)]
        day: Option<String>,
    },
    /// List hours at or above an energy level
    Peaks {
        /// Day of week (0-6 or sun/mon/tue/wed/thu/fri/sat)
        #[arg(long)]
        day: Option<String>,
        /// Minimum energy (defaults to the "high" threshold)
        #[arg(long)]
        min: Option<f64>,
    },
    /// Pin the energy level for an hour of day
    Set {
        /// Hour of day (0-23)
        hour: u8,
        /// Energy level (0-100)
        level: f64,
    },
    /// Remove the override for an hour of day
    Clear {
        /// Hour of day (0-23)
        hour: u8,
    },
}

pub fn run(action: EnergyAction, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        EnergyAction::Show { day } => show_energy_curve(day, path),
        EnergyAction::Peaks { day, min } => show_peaks(day, min, path),
        EnergyAction::Set { hour, level } => {
            let mut config = load_config(path)?;
            config.set_energy_override(hour, level)?;
            save_config(&config, path)?;
            println!("energy at {hour:02}:00 pinned to {level:.0}");
            Ok(())
        }
        EnergyAction::Clear { hour } => {
            let mut config = load_config(path)?;
            if config.clear_energy_override(hour) {
                save_config(&config, path)?;
                println!("override at {hour:02}:00 cleared");
            } else {
                println!("no override at {hour:02}:00");
            }
            Ok(())
        }
    }
}

fn parse_day(day_str: &str) -> Option<u32> {
    let lower = day_str.to_lowercase();
    match lower.as_str() {
        "0" | "sun" | "sunday" => Some(0),
        "1" | "mon" | "monday" => Some(1),
        "2" | "tue" | "tuesday" => Some(2),
        "3" | "wed" | "wednesday" => Some(3),
        "4" | "thu" | "thursday" => Some(4),
        "5" | "fri" | "friday" => Some(5),
        "6" | "sat" | "saturday" => Some(6),
        _ => None,
    }
}

fn resolve_day(day: Option<String>) -> Result<u32, String> {
    match day {
        Some(day_str) => parse_day(&day_str).ok_or_else(|| {
            format!("Invalid day: '{day_str}'. Use 0-6 or sun/mon/tue/wed/thu/fri/sat")
        }),
        // Default to today
        None => Ok(Utc::now().weekday().num_days_from_sunday()),
    }
}

fn show_energy_curve(
    day: Option<String>,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    let day_of_week = resolve_day(day)?;
    let model = config.energy_model();

    println!(
        "{}",
        model.render_ascii_chart(day_of_week, config.scheduler.energy_thresholds.as_tuple())
    );

    let overrides = model.overrides();
    if overrides.is_empty() {
        println!("No personal overrides (* marks pinned hours).");
    } else {
        println!("Overrides:");
        for o in overrides {
            println!("  {:02}:00  {:.0}", o.hour, o.energy_level);
        }
    }
    Ok(())
}

fn show_peaks(
    day: Option<String>,
    min: Option<f64>,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    let day_of_week = resolve_day(day)?;
    let min_energy = min.unwrap_or(config.scheduler.energy_thresholds.high);

    let thresholds = &config.scheduler.energy_thresholds;
    let model = config.energy_model();
    let hours = model.peak_hours(day_of_week, min_energy);
    if hours.is_empty() {
        println!("No hours at or above {min_energy:.0}");
    }
    for hour in hours {
        let level = model.energy_at(u32::from(hour), day_of_week).energy_level;
        println!("{hour:02}:00  {level:>3.0}%  {}", thresholds.band(level).label());
    }
    Ok(())
}
