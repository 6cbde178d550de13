//! Energy model.
//!
//! Provides the hour-by-hour energy and productivity estimate the slot scorer
//! matches against each task's energy requirement.

mod curve;

pub use curve::{
    EnergyBand, EnergyModel, EnergyOverride, EnergyReading, BASE_ENERGY_CURVE, DAY_MULTIPLIERS,
    PRODUCTIVITY_FACTOR,
};
