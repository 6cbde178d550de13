//! Timeline primitives shared by the scheduler.
//!
//! This module provides:
//! - Free slot detection between busy intervals
//! - Task priority scoring used to order the work queue

mod gap;
mod priority;

pub use gap::{find_free_slots, BusyInterval, FreeSlotFinder, TimeSlot};
pub use priority::{calculate_priority, PriorityCalculator, PriorityWeights};
