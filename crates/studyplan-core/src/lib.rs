//! # Studyplan Core Library
//!
//! This library places study blocks for academic tasks into free time.
//! Every operation is a pure computation over a caller-supplied snapshot;
//! the CLI binary is a thin layer that reads snapshots and prints results.
//!
//! ## Architecture
//!
//! - **Energy**: hour-of-day energy curve with day-of-week scaling and
//!   per-hour overrides
//! - **Timeline**: task priority ordering and free slot detection
//! - **Scheduler**: seven-factor slot scoring, day-by-day generation and
//!   incremental rescheduling
//! - **Adapter**: conversion between application records and scheduler entities
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`StudyScheduler`]: Schedule generator and rescheduler
//! - [`EnergyModel`]: Ambient energy estimate
//! - [`Config`]: Persisted planner configuration

pub mod adapter;
pub mod energy;
pub mod error;
pub mod scheduler;
pub mod storage;
pub mod task;
pub mod timeline;

pub use adapter::{EventRecord, PlanSnapshot, TaskRecord, TimeBlockRecord};
pub use energy::{EnergyBand, EnergyModel, EnergyOverride, EnergyReading};
pub use error::{ConfigError, CoreError, ValidationError};
pub use scheduler::{
    Horizon, ScheduleDiagnostics, ScheduleOutcome, SchedulerConfig, StudyBlock, StudyScheduler,
    UnscheduledDetail,
};
pub use storage::Config;
pub use task::{Task, TaskType};
pub use timeline::{BusyInterval, FreeSlotFinder, PriorityCalculator, TimeSlot};
