//! Free slot detection inside a day's waking window.
//!
//! Busy intervals (calendar events and already-placed blocks) are validated,
//! clamped to the window and walked in start order; the gaps between them
//! become candidate slots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// An externally fixed time range the scheduler must not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyInterval {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl BusyInterval {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// An interval is usable only if it has positive length.
    pub fn is_valid(&self) -> bool {
        self.start_time < self.end_time
    }

    /// Check if this interval overlaps a time range
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// A free interval between busy intervals.
///
/// The neighbour flags tell the slot selector whether a buffer must be kept
/// at either edge; window edges need none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// The slot starts where a busy interval ends
    pub after_busy: bool,
    /// The slot ends where a busy interval starts
    pub before_busy: bool,
}

impl TimeSlot {
    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Check if this slot can hold `minutes` of work
    pub fn can_fit(&self, minutes: i64) -> bool {
        self.duration_minutes() >= minutes
    }
}

/// Finder for free slots in a day window
#[derive(Debug, Clone)]
pub struct FreeSlotFinder {
    /// Minimum slot length to report (in minutes)
    min_slot_minutes: i64,
}

impl FreeSlotFinder {
    /// Create a finder that drops gaps shorter than `min_slot_minutes`.
    ///
    /// Callers pass the smallest session plus the inter-task buffer so every
    /// reported slot can host at least one schedulable unit.
    pub fn new(min_slot_minutes: i64) -> Self {
        Self {
            min_slot_minutes: min_slot_minutes.max(1),
        }
    }

    /// Find free slots inside `[window_start, window_end)`.
    ///
    /// Invalid busy intervals are dropped, the rest clamped to the window;
    /// intervals entirely outside it are ignored.
    ///
    /// # Returns
    /// Slots sorted by start time
    pub fn find_free_slots(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        busy: &[BusyInterval],
    ) -> Vec<TimeSlot> {
        if window_end <= window_start {
            return Vec::new();
        }

        let mut clamped: Vec<BusyInterval> = busy
            .iter()
            .filter(|b| {
                if !b.is_valid() {
                    warn!(start = %b.start_time, end = %b.end_time, "dropping invalid busy interval");
                }
                b.is_valid()
            })
            .filter_map(|b| {
                let start = b.start_time.max(window_start);
                let end = b.end_time.min(window_end);
                (start < end).then(|| BusyInterval::new(start, end))
            })
            .collect();
        clamped.sort_by_key(|b| b.start_time);

        let mut slots = Vec::new();
        let mut cursor = window_start;
        let mut after_busy = false;

        for interval in &clamped {
            // Already covered by an earlier interval
            if interval.end_time <= cursor {
                continue;
            }

            if interval.start_time > cursor {
                self.push_slot(&mut slots, cursor, interval.start_time, after_busy, true);
            }

            cursor = cursor.max(interval.end_time);
            after_busy = true;
        }

        if cursor < window_end {
            self.push_slot(&mut slots, cursor, window_end, after_busy, false);
        }

        slots
    }

    fn push_slot(
        &self,
        slots: &mut Vec<TimeSlot>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        after_busy: bool,
        before_busy: bool,
    ) {
        let slot = TimeSlot {
            start_time,
            end_time,
            after_busy,
            before_busy,
        };
        if slot.can_fit(self.min_slot_minutes) {
            slots.push(slot);
        }
    }
}

/// Convenience function to find free slots with a given minimum length
pub fn find_free_slots(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    busy: &[BusyInterval],
    min_slot_minutes: i64,
) -> Vec<TimeSlot> {
    FreeSlotFinder::new(min_slot_minutes).find_free_slots(window_start, window_end, busy)
}
