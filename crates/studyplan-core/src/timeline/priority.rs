//! Task priority calculation module.
//!
//! Calculates task priority scores (0-100) based on:
//! - Urgency (time until the due date, as a step function)
//! - User-defined priority
//! - Difficulty
//! - Task type weight (exams highest, breaks lowest)
//!
//! The score is used purely for ordering; it never admits or rejects a slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Priority calculation weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityWeights {
    /// Weight for urgency (default 0.4)
    pub urgency_weight: f64,
    /// Weight for caller-supplied priority (default 0.3)
    pub importance_weight: f64,
    /// Weight for difficulty (default 0.2)
    pub difficulty_weight: f64,
    /// Weight for task type (default 0.1)
    pub type_weight: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            urgency_weight: 0.4,
            importance_weight: 0.3,
            difficulty_weight: 0.2,
            type_weight: 0.1,
        }
    }
}

/// Priority calculator for tasks
#[derive(Debug, Clone)]
pub struct PriorityCalculator {
    weights: PriorityWeights,
    as_of: DateTime<Utc>,
}

impl PriorityCalculator {
    /// Create a calculator evaluating urgency relative to `as_of`.
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            weights: PriorityWeights::default(),
            as_of,
        }
    }

    /// Calculate priority score for a task (0-100)
    pub fn calculate_priority(&self, task: &Task) -> f64 {
        let score = self.urgency_score(task) * self.weights.urgency_weight
            + f64::from(task.priority.min(100)) * self.weights.importance_weight
            + f64::from(task.difficulty.min(100)) * self.weights.difficulty_weight
            + task.task_type.weight() * self.weights.type_weight;

        score.clamp(0.0, 100.0)
    }

    /// Urgency score (0-100) from days until due.
    ///
    /// - 14+ days: 20
    /// - 7+ days: 40
    /// - 3+ days: 60
    /// - 1+ days: 80
    /// - due within a day: 95-100, rising as the deadline nears
    /// - overdue: 100
    pub fn urgency_score(&self, task: &Task) -> f64 {
        let days = task.due_at.signed_duration_since(self.as_of).num_minutes() as f64 / 1440.0;

        if days >= 14.0 {
            20.0
        } else if days >= 7.0 {
            40.0
        } else if days >= 3.0 {
            60.0
        } else if days >= 1.0 {
            80.0
        } else if days >= 0.0 {
            95.0 + 5.0 * (1.0 - days)
        } else {
            100.0
        }
    }

    /// Sort tasks by calculated priority (highest first).
    ///
    /// The sort is stable: equal scores keep their input order.
    pub fn sort_by_priority(&self, tasks: &mut [Task]) {
        self.sort_by_priority_key(tasks, |t| t);
    }

    /// Sort any items carrying a task by that task's priority (highest first).
    pub fn sort_by_priority_key<T, F>(&self, items: &mut [T], task_of: F)
    where
        F: Fn(&T) -> &Task,
    {
        items.sort_by(|a, b| {
            let priority_a = self.calculate_priority(task_of(a));
            let priority_b = self.calculate_priority(task_of(b));
            priority_b.total_cmp(&priority_a)
        });
    }
}

/// Convenience function to calculate priority for a single task
pub fn calculate_priority(task: &Task, as_of: DateTime<Utc>) -> f64 {
    PriorityCalculator::new(as_of).calculate_priority(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskType;
    use chrono::Duration;

    fn task_due_in(id: &str, due: Duration, now: DateTime<Utc>) -> Task {
        Task::new(id, format!("Task {id}"), TaskType::Assignment, now + due, 60)
    }

    #[test]
    fn test_urgency_steps() {
        let now = Utc::now();
        let calc = PriorityCalculator::new(now);
        assert_eq!(calc.urgency_score(&task_due_in("a", Duration::days(20), now)), 20.0);
        assert_eq!(calc.urgency_score(&task_due_in("a", Duration::days(14), now)), 20.0);
        assert_eq!(calc.urgency_score(&task_due_in("a", Duration::days(8), now)), 40.0);
        assert_eq!(calc.urgency_score(&task_due_in("a", Duration::days(3), now)), 60.0);
        assert_eq!(calc.urgency_score(&task_due_in("a", Duration::hours(30), now)), 80.0);

        let today = calc.urgency_score(&task_due_in("a", Duration::hours(12), now));
        assert!((95.0..=100.0).contains(&today), "got {today}");
        assert_eq!(calc.urgency_score(&task_due_in("a", Duration::hours(-2), now)), 100.0);
    }

    #[test]
    fn test_priority_weights() {
        let now = Utc::now();
        let task = task_due_in("a", Duration::days(20), now)
            .with_priority(50)
            .with_difficulty(50);
        // 20*0.4 + 50*0.3 + 50*0.2 + 65*0.1
        let expected = 8.0 + 15.0 + 10.0 + 6.5;
        assert!((calculate_priority(&task, now) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_exam_outranks_break() {
        let now = Utc::now();
        let exam = Task::new("e", "Exam", TaskType::Exam, now + Duration::days(5), 60);
        let rest = Task::new("b", "Break", TaskType::Break, now + Duration::days(5), 60);
        assert!(calculate_priority(&exam, now) > calculate_priority(&rest, now));
    }

    #[test]
    fn test_priority_bounds() {
        let now = Utc::now();
        let task = task_due_in("a", Duration::hours(-5), now)
            .with_priority(100)
            .with_difficulty(100);
        let priority = calculate_priority(&task, now);
        assert!(priority <= 100.0, "Priority should be at most 100, got {priority}");
    }

    #[test]
    fn test_sort_by_priority_is_stable() {
        let now = Utc::now();
        let mut tasks = vec![
            task_due_in("low", Duration::days(20), now).with_priority(10),
            task_due_in("tie-1", Duration::days(5), now),
            task_due_in("tie-2", Duration::days(5), now),
            task_due_in("urgent", Duration::hours(6), now),
        ];

        PriorityCalculator::new(now).sort_by_priority(&mut tasks);

        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["urgent", "tie-1", "tie-2", "low"]);
    }
}
