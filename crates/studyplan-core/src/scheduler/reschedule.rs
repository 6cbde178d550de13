//! Incremental rescheduling after task completion.
//!
//! Existing placements stay where they are. Only the blocks of completed
//! tasks are released, and only under-scheduled tasks receive new blocks
//! inside a bounded forward horizon.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use tracing::debug;

use super::{valid_busy, PendingTask, ScheduleDiagnostics, ScheduleOutcome, StudyBlock, StudyScheduler};
use crate::task::Task;
use crate::timeline::{BusyInterval, PriorityCalculator};

impl StudyScheduler {
    /// Update an existing schedule after tasks complete.
    ///
    /// # Arguments
    /// * `completed_task_ids` - Tasks whose blocks are released
    /// * `remaining_tasks` - Current task snapshot
    /// * `existing_blocks` - Blocks placed by an earlier run
    /// * `busy` - Calendar events and pinned blocks to avoid
    /// * `now` - Start of the forward horizon
    ///
    /// # Returns
    /// Retained and newly placed blocks, ordered by start time
    pub fn reschedule(
        &self,
        completed_task_ids: &[String],
        remaining_tasks: &[Task],
        existing_blocks: &[StudyBlock],
        busy: &[BusyInterval],
        now: DateTime<Utc>,
    ) -> ScheduleOutcome {
        let mut rng = Mcg128Xsl64::seed_from_u64(self.seed);
        let busy = valid_busy(busy);

        let released: HashSet<&str> = completed_task_ids
            .iter()
            .map(String::as_str)
            .chain(remaining_tasks.iter().filter(|t| t.completed).map(|t| t.id.as_str()))
            .collect();

        let mut placed: HashMap<&str, i64> = HashMap::new();
        for block in existing_blocks.iter().filter(|b| !released.contains(b.task_id.as_str())) {
            *placed.entry(block.task_id.as_str()).or_default() += block.duration_minutes();
        }
        let already = |task: &Task| placed.get(task.id.as_str()).copied().unwrap_or(0);

        // An atomic task's single block must cover it whole.
        let reshaped: HashSet<&str> = remaining_tasks
            .iter()
            .filter(|t| !t.splittable && !released.contains(t.id.as_str()) && !t.is_overdue(now))
            .filter(|t| {
                let minutes = already(*t);
                minutes > 0 && minutes < i64::from(t.estimated_minutes)
            })
            .map(|t| t.id.as_str())
            .collect();
        for task_id in &reshaped {
            debug!(task_id = %task_id, "atomic block shorter than estimate, re-placing whole");
        }

        let retained: Vec<StudyBlock> = existing_blocks
            .iter()
            .filter(|b| {
                let task_id = b.task_id.as_str();
                !released.contains(task_id) && !reshaped.contains(task_id)
            })
            .cloned()
            .collect();
        debug!(
            released = existing_blocks.len() - retained.len(),
            retained = retained.len(),
            "released blocks of completed tasks"
        );

        let mut overdue = Vec::new();
        let mut pending = Vec::new();
        for task in remaining_tasks {
            if released.contains(task.id.as_str()) {
                continue;
            }
            if task.is_overdue(now) {
                overdue.push(task.id.clone());
                continue;
            }

            let estimate = i64::from(task.estimated_minutes);
            let need = if task.splittable {
                estimate - already(task)
            } else if already(task) >= estimate {
                0
            } else {
                estimate
            };
            if need > 0 {
                pending.push(PendingTask::new(task, need));
            }
        }

        let mut blocks = retained.clone();
        if !pending.is_empty() {
            PriorityCalculator::new(now).sort_by_priority_key(&mut pending, |p| &p.task);

            let until = now + Duration::days(i64::from(self.config.reschedule_horizon_days));
            let added = self.fill_days(&mut pending, &busy, &retained, now, until, &mut rng);
            debug!(added = added.len(), "rescheduling placed new blocks");
            blocks.extend(added);
        }
        blocks.sort_by_key(|b| b.start_time);

        ScheduleOutcome {
            blocks,
            diagnostics: ScheduleDiagnostics::from_pending(&pending, overdue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Horizon, SchedulerConfig};
    use crate::task::TaskType;
    use chrono::TimeZone;

    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap()
    }

    fn scheduler() -> StudyScheduler {
        StudyScheduler::new(SchedulerConfig::default()).with_seed(11)
    }

    #[test]
    fn test_completed_task_blocks_released() {
        let now = monday();
        let a = Task::new("a", "Essay", TaskType::Assignment, now + Duration::days(4), 100);
        let b = Task::new("b", "Reading", TaskType::Reading, now + Duration::days(4), 60);
        let horizon = Horizon::days_from(now, 4).unwrap();
        let first = scheduler().generate(&[a.clone(), b.clone()], &[], &horizon, now);
        assert!(first.blocks.iter().any(|blk| blk.task_id == "a"));

        let outcome = scheduler().reschedule(&["a".to_string()], &[b], &first.blocks, &[], now);
        assert!(outcome.blocks.iter().all(|blk| blk.task_id != "a"));
        let b_before: Vec<_> = first.blocks.iter().filter(|blk| blk.task_id == "b").collect();
        let b_after: Vec<_> = outcome.blocks.iter().filter(|blk| blk.task_id == "b").collect();
        assert_eq!(b_before, b_after);
    }

    #[test]
    fn test_fully_scheduled_tasks_untouched() {
        let now = monday();
        let task = Task::new("t", "Study", TaskType::Study, now + Duration::days(5), 120);
        let horizon = Horizon::days_from(now, 5).unwrap();
        let first = scheduler().generate(&[task.clone()], &[], &horizon, now);
        assert!(first.is_complete());

        let outcome = scheduler().reschedule(&[], &[task], &first.blocks, &[], now);
        assert_eq!(outcome.blocks, first.blocks);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_under_scheduled_task_topped_up() {
        let now = monday();
        let task = Task::new("t", "Project", TaskType::Project, now + Duration::days(5), 150);
        let existing = StudyBlock {
            id: "kept".into(),
            task_id: "t".into(),
            task_type: TaskType::Project,
            start_time: now + Duration::hours(3),
            end_time: now + Duration::hours(4),
            energy_required: task.energy_required(),
            is_optimal: true,
            confidence: 70.0,
        };

        let outcome = scheduler().reschedule(&[], &[task], &[existing.clone()], &[], now);
        assert!(outcome.blocks.contains(&existing));
        let total: i64 = outcome.blocks_for("t").map(StudyBlock::duration_minutes).sum();
        assert_eq!(total, 150);
        for pair in outcome.blocks.windows(2) {
            assert!(pair[0].end_time <= pair[1].start_time);
        }
    }

    fn exam_block(exam: &Task, id: &str, start: DateTime<Utc>, minutes: i64) -> StudyBlock {
        StudyBlock {
            id: id.into(),
            task_id: exam.id.clone(),
            task_type: exam.task_type,
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            energy_required: exam.energy_required(),
            is_optimal: false,
            confidence: 40.0,
        }
    }

    #[test]
    fn test_non_splittable_with_full_block_is_kept() {
        let now = monday();
        let exam = Task::new("x", "Exam", TaskType::Exam, now + Duration::days(3), 120)
            .with_splittable(false);
        let existing = exam_block(&exam, "whole", now + Duration::hours(2), 120);

        let outcome = scheduler().reschedule(&[], &[exam], &[existing.clone()], &[], now);
        assert_eq!(outcome.blocks, vec![existing]);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_short_atomic_block_replaced_whole() {
        let now = monday();
        let exam = Task::new("x", "Exam", TaskType::Exam, now + Duration::days(3), 120)
            .with_splittable(false);
        let existing = exam_block(&exam, "short", now + Duration::hours(2), 60);

        let outcome = scheduler().reschedule(&[], &[exam], &[existing], &[], now);
        let blocks: Vec<_> = outcome.blocks_for("x").collect();
        assert_eq!(blocks.len(), 1);
        assert_ne!(blocks[0].id, "short");
        assert_eq!(blocks[0].duration_minutes(), 120);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_short_atomic_block_reported_when_no_room() {
        let now = monday();
        let exam = Task::new("x", "Exam", TaskType::Exam, now + Duration::hours(6), 120)
            .with_splittable(false);
        let existing = exam_block(&exam, "short", now + Duration::hours(2), 60);
        let busy = vec![BusyInterval::new(now, now + Duration::hours(6))];

        let outcome = scheduler().reschedule(&[], &[exam], &[existing], &busy, now);
        assert!(outcome.blocks.is_empty());
        assert_eq!(outcome.diagnostics.unscheduled_task_ids, vec!["x".to_string()]);
        assert_eq!(outcome.diagnostics.details[0].remaining_minutes, 120);
    }

    #[test]
    fn test_overdue_tasks_reported_not_placed() {
        let now = monday();
        let late = Task::new("late", "Late", TaskType::Assignment, now - Duration::hours(1), 60);
        let outcome = scheduler().reschedule(&[], &[late], &[], &[], now);
        assert!(outcome.blocks.is_empty());
        assert_eq!(outcome.diagnostics.overdue_task_ids, vec!["late".to_string()]);
    }
}
