/// Task endpoints
///
/// Owner-scoped CRUD for the authenticated identity's tasks:
///
/// - `GET /tasks` - list owned tasks
/// - `POST /tasks` - create a task, respond with the full owned list
/// - `PUT /tasks/:id` - partial update
/// - `DELETE /tasks/:id` - delete
///
/// Every handler takes [`CurrentUser`]; the resolved id flows into the task
/// store as part of the SQL filter. A task that exists but belongs to a
/// different identity is reported exactly like a task that does not exist.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

use daytask_shared::models::task::{
    clamp_effort, NewTask, Task, TaskStatus, UpdateTask, EFFORT_DEFAULT,
};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::auth::CurrentUser,
    routes::auth::MessageResponse,
};

/// Create request
///
/// `effortLevel` is accepted as any JSON value; non-numeric input falls back
/// to the default instead of failing the request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub effort_level: Option<JsonValue>,
    pub priority: Option<bool>,
}

/// Partial update request
///
/// Absent fields are left untouched. An empty `dueDate` clears the date.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub effort_level: Option<JsonValue>,
    pub status: Option<String>,
    pub priority: Option<bool>,
}

/// Parses a client-supplied due date
///
/// Accepts a plain calendar date (`2025-01-01`) or an RFC 3339 datetime;
/// empty or whitespace-only input means "no due date".
fn parse_due_date(raw: &str) -> Result<Option<NaiveDate>, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(datetime.date_naive()));
    }

    Err(ApiError::BadRequest("Invalid due date".to_string()))
}

/// Coerces a client-supplied effort level into the allowed range
///
/// Numbers and numeric strings are clamped to 1..=5; anything else (absent,
/// null, booleans, garbage strings) yields the default.
fn effort_level(raw: Option<&JsonValue>) -> i16 {
    let parsed = match raw {
        Some(JsonValue::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(JsonValue::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.map(clamp_effort).unwrap_or(EFFORT_DEFAULT)
}

/// Lists the authenticated identity's tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Task>>> {
    let pool = state.db().await?;
    let tasks = Task::list_by_owner(&pool, user.id).await?;
    Ok(Json(tasks))
}

/// Creates a task and responds with the full owned list
///
/// Read-your-write consistency for the UI: the response is the list the
/// next `GET /tasks` would return.
///
/// # Errors
///
/// - `400 Bad Request`: empty description, unparseable due date
/// - `401 Unauthorized`: no live session
pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Task>>)> {
    let pool = state.db().await?;

    let description = req.description.as_deref().unwrap_or("").trim().to_string();
    if description.is_empty() {
        return Err(ApiError::BadRequest("Description is required".to_string()));
    }

    let due_date = match req.due_date.as_deref() {
        Some(raw) => parse_due_date(raw)?,
        None => None,
    };

    let task = Task::create(
        &pool,
        user.id,
        NewTask {
            description,
            due_date,
            effort_level: effort_level(req.effort_level.as_ref()),
            priority: req.priority.unwrap_or(false),
        },
    )
    .await?;

    info!(user_id = %user.id, task_id = %task.id, "task created");

    let tasks = Task::list_by_owner(&pool, user.id).await?;
    Ok((StatusCode::CREATED, Json(tasks)))
}

/// Applies a partial update to an owned task
///
/// # Errors
///
/// - `400 Bad Request`: invalid status or due date
/// - `404 Not Found`: no such owned task (missing and not-owned are
///   indistinguishable)
pub async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let pool = state.db().await?;

    let mut update = UpdateTask::default();

    if let Some(description) = req.description {
        let trimmed = description.trim().to_string();
        if !trimmed.is_empty() {
            update.description = Some(trimmed);
        }
    }

    if let Some(raw) = req.due_date {
        update.due_date = Some(parse_due_date(&raw)?);
    }

    if let Some(raw) = req.effort_level.as_ref() {
        update.effort_level = Some(effort_level(Some(raw)));
    }

    if let Some(raw) = req.status {
        let status = TaskStatus::parse(&raw)
            .ok_or_else(|| ApiError::BadRequest("Invalid status".to_string()))?;
        update.status = Some(status);
    }

    if let Some(priority) = req.priority {
        update.priority = Some(priority);
    }

    let task = Task::update(&pool, user.id, task_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Deletes an owned task
///
/// A single atomic removal; there is no recovery path.
///
/// # Errors
///
/// - `404 Not Found`: no such owned task
pub async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let pool = state.db().await?;

    if !Task::delete_owned(&pool, user.id, task_id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    info!(user_id = %user.id, task_id = %task_id, "task deleted");
    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn due_date_accepts_calendar_dates() {
        let parsed = parse_due_date("2025-01-01").unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2025, 1, 1));
    }

    #[test]
    fn due_date_accepts_rfc3339_datetimes() {
        let parsed = parse_due_date("2025-01-01T12:30:00Z").unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2025, 1, 1));
    }

    #[test]
    fn blank_due_date_means_none() {
        assert_eq!(parse_due_date("").unwrap(), None);
        assert_eq!(parse_due_date("   ").unwrap(), None);
    }

    #[test]
    fn garbage_due_date_is_rejected() {
        assert!(parse_due_date("next tuesday").is_err());
        assert!(parse_due_date("2025-13-40").is_err());
    }

    #[test]
    fn effort_level_clamps_numbers() {
        assert_eq!(effort_level(Some(&json!(4))), 4);
        assert_eq!(effort_level(Some(&json!(0))), 1);
        assert_eq!(effort_level(Some(&json!(99))), 5);
        assert_eq!(effort_level(Some(&json!(4.7))), 4);
    }

    #[test]
    fn effort_level_parses_numeric_strings() {
        assert_eq!(effort_level(Some(&json!("4"))), 4);
        assert_eq!(effort_level(Some(&json!(" 2 "))), 2);
    }

    #[test]
    fn effort_level_defaults_when_absent_or_non_numeric() {
        assert_eq!(effort_level(None), EFFORT_DEFAULT);
        assert_eq!(effort_level(Some(&json!(null))), EFFORT_DEFAULT);
        assert_eq!(effort_level(Some(&json!("high"))), EFFORT_DEFAULT);
        assert_eq!(effort_level(Some(&json!(true))), EFFORT_DEFAULT);
    }

    #[test]
    fn update_request_fields_are_all_optional() {
        let req: UpdateTaskRequest = serde_json::from_str("{}").unwrap();
        assert!(req.description.is_none());
        assert!(req.status.is_none());

        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(req.status.as_deref(), Some("completed"));
    }
}
