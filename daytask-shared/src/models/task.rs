/// Task model and owner-scoped database operations
///
/// Tasks are the user-owned resource of the system. Every operation here is
/// owner-scoped: the owner's id is part of the SQL filter itself, in the
/// same statement as the row id, so a task that exists but belongs to
/// someone else behaves exactly like a task that does not exist. Ownership
/// is immutable — no operation updates `user_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('active', 'completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     description TEXT NOT NULL,
///     due_date DATE,
///     effort_level SMALLINT NOT NULL DEFAULT 3,
///     status task_status NOT NULL DEFAULT 'active',
///     completed_at TIMESTAMPTZ,
///     priority BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Lowest allowed effort level
pub const EFFORT_MIN: i16 = 1;

/// Highest allowed effort level
pub const EFFORT_MAX: i16 = 5;

/// Effort level used when the client sends nothing usable
pub const EFFORT_DEFAULT: i16 = 3;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task is open
    Active,

    /// Task is done; `completed_at` records when
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
        }
    }

    /// Parses a client-supplied status string
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(TaskStatus::Active),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

/// Clamps a client-supplied effort value into the allowed range
pub fn clamp_effort(value: i64) -> i16 {
    value.clamp(EFFORT_MIN as i64, EFFORT_MAX as i64) as i16
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owner; immutable for the lifetime of the task
    pub user_id: Uuid,

    /// What needs doing; non-empty after trimming
    pub description: String,

    /// Optional calendar due date
    pub due_date: Option<NaiveDate>,

    /// Effort estimate, 1..=5
    pub effort_level: i16,

    /// Current lifecycle status
    pub status: TaskStatus,

    /// When the task was completed (None while active)
    pub completed_at: Option<DateTime<Utc>>,

    /// Independent priority flag ("big three" of the day)
    pub priority: bool,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
///
/// The owner is passed separately to [`Task::create`]; it comes from the
/// authenticated session, never from the request body.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub effort_level: i16,
    pub priority: bool,
}

/// Input for partially updating a task
///
/// Only non-None fields are written. `due_date` uses a nested Option so a
/// supplied empty value clears the date while an absent field leaves it
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub description: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub effort_level: Option<i16>,
    pub status: Option<TaskStatus>,
    pub priority: Option<bool>,
}

impl UpdateTask {
    /// True when no field would be written
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.due_date.is_none()
            && self.effort_level.is_none()
            && self.status.is_none()
            && self.priority.is_none()
    }
}

const TASK_COLUMNS: &str = "id, user_id, description, due_date, effort_level, status, \
     completed_at, priority, created_at, updated_at";

impl Task {
    /// Creates a task owned by `owner_id`
    ///
    /// Status starts `active`; the caller is expected to have validated the
    /// description and clamped the effort level.
    pub async fn create(pool: &PgPool, owner_id: Uuid, data: NewTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (user_id, description, due_date, effort_level, priority)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(owner_id)
        .bind(data.description)
        .bind(data.due_date)
        .bind(data.effort_level)
        .bind(data.priority)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Lists all tasks owned by `owner_id`, newest first
    ///
    /// No pagination: a personal task list stays small.
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        ))
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Applies a partial update to a task owned by `owner_id`
    ///
    /// The id and owner are matched in the same UPDATE statement — this is a
    /// single persisted operation, not a load-modify-save sequence, so there
    /// is no read-modify-write gap. Returns `None` when no owned row
    /// matched, whether the task is missing or owned by someone else.
    ///
    /// Transitioning status to `completed` stamps `completed_at`; back to
    /// `active` clears it.
    pub async fn update(
        pool: &PgPool,
        owner_id: Uuid,
        task_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build the SET list from the fields that are present.
        // Positional binds: $1 = task id, $2 = owner id, fields from $3.
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if data.effort_level.is_some() {
            bind_count += 1;
            query.push_str(&format!(", effort_level = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                ", status = ${n}, completed_at = CASE WHEN ${n} = 'completed'::task_status THEN NOW() ELSE NULL END",
                n = bind_count
            ));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND user_id = $2 RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(task_id).bind(owner_id);

        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(effort_level) = data.effort_level {
            q = q.bind(effort_level);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task owned by `owner_id`
    ///
    /// A single atomic DELETE with the owner in the filter; returns `false`
    /// when no owned row matched. Deletion is immediate and non-recoverable.
    pub async fn delete_owned(
        pool: &PgPool,
        owner_id: Uuid,
        task_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effort_is_clamped_into_range() {
        assert_eq!(clamp_effort(0), 1);
        assert_eq!(clamp_effort(-3), 1);
        assert_eq!(clamp_effort(1), 1);
        assert_eq!(clamp_effort(4), 4);
        assert_eq!(clamp_effort(5), 5);
        assert_eq!(clamp_effort(99), 5);
    }

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(TaskStatus::parse("active"), Some(TaskStatus::Active));
        assert_eq!(TaskStatus::parse("completed"), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::parse("done"), None);
        assert_eq!(TaskStatus::Active.as_str(), "active");
        assert_eq!(TaskStatus::Completed.as_str(), "completed");
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn task_serializes_camel_case() {
        let task = Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            description: "write spec".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            effort_level: 4,
            status: TaskStatus::Active,
            completed_at: None,
            priority: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["effortLevel"], 4);
        assert_eq!(json["status"], "active");
        assert_eq!(json["dueDate"], "2025-01-01");
        assert!(json.get("userId").is_some());
        assert!(json.get("effort_level").is_none());
    }

    #[test]
    fn update_task_default_is_empty() {
        let update = UpdateTask::default();
        assert!(update.is_empty());

        let update = UpdateTask {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    // Integration tests for database operations are in the API crate's
    // tests/ directory
}
