//! Task types consumed by the scheduler.
//!
//! A [`Task`] is the scheduler-internal view of a unit of academic work. Tasks
//! are read-only snapshots owned by the surrounding application; the scheduler
//! never mutates them and tracks remaining minutes on its own side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Default caller priority when a record does not supply one.
pub const DEFAULT_PRIORITY: u8 = 50;
/// Default difficulty when a record does not supply one.
pub const DEFAULT_DIFFICULTY: u8 = 50;
/// Default minimum viable block size in minutes.
pub const DEFAULT_MIN_BLOCK_MINUTES: u32 = 25;

/// Kind of academic work.
///
/// The set is closed; unknown kinds coming from external records are mapped
/// by the adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Exam,
    Quiz,
    Project,
    Assignment,
    Reading,
    Study,
    Break,
}

impl TaskType {
    /// Every task type, highest type weight first.
    pub const ALL: [TaskType; 7] = [
        TaskType::Exam,
        TaskType::Quiz,
        TaskType::Project,
        TaskType::Assignment,
        TaskType::Study,
        TaskType::Reading,
        TaskType::Break,
    ];

    /// Type weight used by the priority engine (0-100).
    pub fn weight(self) -> f64 {
        match self {
            TaskType::Exam => 100.0,
            TaskType::Quiz => 85.0,
            TaskType::Project => 75.0,
            TaskType::Assignment => 65.0,
            TaskType::Study => 50.0,
            TaskType::Reading => 40.0,
            TaskType::Break => 0.0,
        }
    }

    /// Baseline energy this kind of work demands (0-100).
    pub fn base_energy(self) -> f64 {
        match self {
            TaskType::Exam => 80.0,
            TaskType::Quiz => 70.0,
            TaskType::Project => 75.0,
            TaskType::Assignment => 65.0,
            TaskType::Study => 60.0,
            TaskType::Reading => 45.0,
            TaskType::Break => 20.0,
        }
    }

    /// Fallback duration when no estimate is available.
    pub fn default_duration_minutes(self) -> u32 {
        match self {
            TaskType::Exam => 180,
            TaskType::Quiz => 60,
            TaskType::Project => 240,
            TaskType::Assignment => 120,
            TaskType::Reading => 60,
            TaskType::Study => 90,
            TaskType::Break => 15,
        }
    }

    /// Assessments that should be prepared at least a day ahead.
    pub fn needs_long_lead(self) -> bool {
        matches!(self, TaskType::Exam | TaskType::Quiz)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Exam => "exam",
            TaskType::Quiz => "quiz",
            TaskType::Project => "project",
            TaskType::Assignment => "assignment",
            TaskType::Reading => "reading",
            TaskType::Study => "study",
            TaskType::Break => "break",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exam" | "test" | "midterm" | "final" => Ok(TaskType::Exam),
            "quiz" => Ok(TaskType::Quiz),
            "project" => Ok(TaskType::Project),
            "assignment" | "homework" | "discussion" => Ok(TaskType::Assignment),
            "reading" => Ok(TaskType::Reading),
            "study" | "review" => Ok(TaskType::Study),
            "break" => Ok(TaskType::Break),
            other => Err(ValidationError::InvalidValue {
                field: "type".to_string(),
                message: format!("unknown task type '{other}'"),
            }),
        }
    }
}

/// A unit of academic work with a deadline and an estimated time cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub course_id: Option<String>,
    pub task_type: TaskType,
    pub due_at: DateTime<Utc>,
    /// Estimated remaining work in minutes.
    pub estimated_minutes: u32,
    /// Caller-supplied priority (0-100)
    pub priority: u8,
    /// Difficulty (0-100)
    pub difficulty: u8,
    #[serde(default)]
    pub completed: bool,
    /// Whether the work may be spread over several non-contiguous blocks.
    pub splittable: bool,
    pub min_block_minutes: u32,
}

impl Task {
    /// Create a pending, splittable task with default priority and difficulty.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        task_type: TaskType,
        due_at: DateTime<Utc>,
        estimated_minutes: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            course_id: None,
            task_type,
            due_at,
            estimated_minutes,
            priority: DEFAULT_PRIORITY,
            difficulty: DEFAULT_DIFFICULTY,
            completed: false,
            splittable: true,
            min_block_minutes: DEFAULT_MIN_BLOCK_MINUTES,
        }
    }

    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.min(100);
        self
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty.min(100);
        self
    }

    pub fn with_splittable(mut self, splittable: bool) -> Self {
        self.splittable = splittable;
        self
    }

    pub fn with_min_block(mut self, minutes: u32) -> Self {
        self.min_block_minutes = minutes;
        self
    }

    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    /// A task is overdue once its due timestamp lies before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_at < now
    }

    /// Energy a block of this task requires (0-100), from type and difficulty.
    pub fn energy_required(&self) -> f64 {
        (self.task_type.base_energy() * 0.6 + f64::from(self.difficulty) * 0.4).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_parse_aliases() {
        assert_eq!("Exam".parse::<TaskType>().unwrap(), TaskType::Exam);
        assert_eq!("midterm".parse::<TaskType>().unwrap(), TaskType::Exam);
        assert_eq!(" homework ".parse::<TaskType>().unwrap(), TaskType::Assignment);
        assert!("lecture".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_task_type_weights_ordering() {
        assert!(TaskType::Exam.weight() > TaskType::Quiz.weight());
        assert!(TaskType::Reading.weight() > TaskType::Break.weight());
        assert_eq!(TaskType::Break.weight(), 0.0);
    }

    #[test]
    fn test_energy_required_blends_type_and_difficulty() {
        let due = Utc::now();
        let easy = Task::new("a", "Read ch. 3", TaskType::Reading, due, 60).with_difficulty(0);
        let hard = Task::new("b", "Final", TaskType::Exam, due, 60).with_difficulty(100);
        assert!((easy.energy_required() - 27.0).abs() < 1e-9);
        assert!((hard.energy_required() - 88.0).abs() < 1e-9);
    }

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let task = Task::new("a", "Late", TaskType::Assignment, now - chrono::Duration::minutes(1), 30);
        assert!(task.is_overdue(now));
        assert!(!task.is_overdue(now - chrono::Duration::hours(1)));
    }

    #[test]
    fn test_task_serialization_uses_camel_case() {
        let task = Task::new("t-1", "Essay", TaskType::Assignment, Utc::now(), 90).with_course("c-9");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["taskType"], "assignment");
        assert_eq!(json["courseId"], "c-9");
        let decoded: Task = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, task);
    }
}
