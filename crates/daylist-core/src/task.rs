use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::datetime;

pub type TaskId = u64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTask {
    #[error("task name is empty")]
    EmptyName,
    #[error("task finishes before it starts")]
    FinishBeforeStart,
}

/// A single row of the task table. `id` is `None` until the store has
/// persisted the task, and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: Option<TaskId>,
    pub date_start: NaiveDateTime,
    pub date_finish: NaiveDateTime,
    pub name: String,
    pub description: String,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        date_start: NaiveDateTime,
        date_finish: NaiveDateTime,
    ) -> Self {
        Self {
            id: None,
            date_start,
            date_finish,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Calendar day this task belongs to in day views.
    pub fn day(&self) -> NaiveDate {
        self.date_start.date()
    }

    pub fn validate(&self) -> Result<(), InvalidTask> {
        if self.name.trim().is_empty() {
            return Err(InvalidTask::EmptyName);
        }
        if self.date_finish < self.date_start {
            return Err(InvalidTask::FinishBeforeStart);
        }
        Ok(())
    }

    pub fn detail(&self) -> TaskDetail {
        TaskDetail {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            date_start: datetime::format_instant(self.date_start),
            date_finish: datetime::format_instant(self.date_finish),
        }
    }
}

/// Read-only snapshot handed across screens to a detail view. Dates are
/// already formatted as text; there is no path back to the store from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub id: Option<TaskId>,
    pub name: String,
    pub description: String,
    pub date_start: String,
    pub date_finish: String,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .expect("valid date")
            .and_hms_opt(hour, min, 0)
            .expect("valid time")
    }

    #[test]
    fn validate_accepts_well_formed_task() {
        let task = Task::new("Gym", "Leg day", at(1, 7, 0), at(1, 8, 0));
        assert_eq!(task.validate(), Ok(()));
        assert_eq!(task.id, None);
    }

    #[test]
    fn validate_rejects_blank_name() {
        let task = Task::new("   ", "", at(1, 7, 0), at(1, 8, 0));
        assert_eq!(task.validate(), Err(InvalidTask::EmptyName));
    }

    #[test]
    fn validate_rejects_finish_before_start() {
        let task = Task::new("Gym", "", at(1, 8, 0), at(1, 7, 0));
        assert_eq!(task.validate(), Err(InvalidTask::FinishBeforeStart));
    }

    #[test]
    fn validate_accepts_zero_length_task() {
        let task = Task::new("Ping", "", at(1, 7, 0), at(1, 7, 0));
        assert_eq!(task.validate(), Ok(()));
    }

    #[test]
    fn day_is_taken_from_date_start() {
        let task = Task::new("Late", "", at(1, 23, 30), at(2, 0, 30));
        assert_eq!(task.day(), NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"));
    }

    #[test]
    fn detail_formats_dates_as_text() {
        let mut task = Task::new("Gym", "Leg day", at(1, 7, 0), at(1, 8, 0));
        task.id = Some(3);

        let detail = task.detail();
        assert_eq!(detail.id, Some(3));
        assert_eq!(detail.name, "Gym");
        assert_eq!(detail.date_start, "2024-06-01 07:00");
        assert_eq!(detail.date_finish, "2024-06-01 08:00");
    }
}
