use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;

pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 10;
pub const DEFAULT_PRIORITY: i32 = 5;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// A user-owned task row as returned by the store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub scheduled_for: Option<NaiveDate>,

    /// Kept as the store's text so a malformed stored value never fails a read;
    /// use [`Task::time_of_day`] to interpret it.
    #[serde(default)]
    pub scheduled_time: Option<String>,

    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Task {
    /// Parsed `scheduled_time`, `None` when unset or malformed.
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        self.scheduled_time.as_deref().and_then(parse_time_of_day)
    }
}

/// Store ids may be integers or uuids depending on the table definition.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Accepts `HH:MM`, `HH:MM:SS` and `HH:MM:SS.ffffff`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

fn normalize_time(raw: &str) -> Result<String, ApiError> {
    parse_time_of_day(raw)
        .map(|t| t.format("%H:%M:%S").to_string())
        .ok_or_else(|| {
            ApiError::ValidationFailed(format!(
                "scheduled_time must be HH:MM or HH:MM:SS, got '{}'",
                raw
            ))
        })
}

fn check_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::ValidationFailed("Title must not be empty".to_string()));
    }
    Ok(())
}

fn check_priority(priority: i32) -> Result<(), ApiError> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(ApiError::ValidationFailed(format!(
            "Priority must be between {} and {}, got {}",
            MIN_PRIORITY, MAX_PRIORITY, priority
        )));
    }
    Ok(())
}

/// Client input for `POST /tasks`. Any `user_id`, `id` or timestamp the client
/// sends is dropped here.
#[derive(Debug, Deserialize)]
pub struct CreateTaskPayload {
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default = "default_priority")]
    pub priority: i32,
    pub scheduled_for: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
}

impl CreateTaskPayload {
    /// Validate and bind the row to its owner.
    pub fn into_row(self, user_id: &str) -> Result<NewTaskRow, ApiError> {
        check_title(&self.title)?;
        check_priority(self.priority)?;
        let scheduled_time = self.scheduled_time.as_deref().map(normalize_time).transpose()?;

        Ok(NewTaskRow {
            user_id: user_id.to_string(),
            title: self.title,
            status: self.status,
            priority: self.priority,
            scheduled_for: self.scheduled_for,
            scheduled_time,
        })
    }
}

/// Client input for `PUT /tasks/{id}`; absent fields are left untouched.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateTaskPayload {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i32>,
    pub scheduled_for: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
}

impl UpdateTaskPayload {
    pub fn into_changes(self, updated_at: String) -> Result<TaskChanges, ApiError> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(priority) = self.priority {
            check_priority(priority)?;
        }
        let scheduled_time = self.scheduled_time.as_deref().map(normalize_time).transpose()?;

        Ok(TaskChanges {
            title: self.title,
            status: self.status,
            priority: self.priority,
            scheduled_for: self.scheduled_for,
            scheduled_time,
            updated_at,
        })
    }
}

/// Insert body sent to the store.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NewTaskRow {
    pub user_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: i32,
    pub scheduled_for: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
}

/// Patch body sent to the store. Only set fields are serialized.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TaskChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    pub updated_at: String,
}

impl TaskChanges {
    /// True when the client supplied no field at all (`updated_at` is ours).
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.scheduled_for.is_none()
            && self.scheduled_time.is_none()
    }
}

/// Optional filters for `GET /tasks`. Unset filters are not sent to the store.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub scheduled_for: Option<NaiveDate>,
}

impl TaskFilters {
    /// Build from raw query-string values.
    pub fn from_query(status: Option<&str>, task_date: Option<&str>) -> Result<Self, ApiError> {
        let status = status
            .map(|s| {
                TaskStatus::parse(s).ok_or_else(|| {
                    ApiError::ValidationFailed(format!(
                        "status must be one of pending, in_progress, done; got '{}'",
                        s
                    ))
                })
            })
            .transpose()?;
        let scheduled_for = task_date
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| {
                    ApiError::ValidationFailed(format!("task_date must be YYYY-MM-DD, got '{}'", d))
                })
            })
            .transpose()?;

        Ok(TaskFilters {
            status,
            scheduled_for,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("09:30", Some((9, 30, 0)))]
    #[case("09:30:15", Some((9, 30, 15)))]
    #[case(" 23:59:59.123456 ", Some((23, 59, 59)))]
    #[case("9h30", None)]
    #[case("25:00", None)]
    #[case("", None)]
    fn parses_time_of_day(#[case] raw: &str, #[case] expected: Option<(u32, u32, u32)>) {
        use chrono::Timelike;
        let parsed = parse_time_of_day(raw).map(|t| (t.hour(), t.minute(), t.second()));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn create_payload_defaults() {
        let payload: CreateTaskPayload = serde_json::from_str(r#"{"title": "Write report"}"#).unwrap();
        let row = payload.into_row("user-1").unwrap();
        assert_eq!(row.status, TaskStatus::Pending);
        assert_eq!(row.priority, DEFAULT_PRIORITY);
        assert_eq!(row.scheduled_for, None);
        assert_eq!(row.scheduled_time, None);
    }

    #[test]
    fn create_payload_ignores_client_user_id() {
        let payload: CreateTaskPayload =
            serde_json::from_str(r#"{"title": "Sneaky", "user_id": "someone-else"}"#).unwrap();
        let row = payload.into_row("caller").unwrap();
        assert_eq!(row.user_id, "caller");
    }

    #[test]
    fn create_payload_normalizes_time() {
        let payload: CreateTaskPayload = serde_json::from_str(
            r#"{"title": "Standup", "scheduled_for": "2026-03-02", "scheduled_time": "09:15"}"#,
        )
        .unwrap();
        let row = payload.into_row("u").unwrap();
        assert_eq!(row.scheduled_time.as_deref(), Some("09:15:00"));
        assert_eq!(row.scheduled_for, NaiveDate::from_ymd_opt(2026, 3, 2));
    }

    #[rstest]
    #[case(r#"{"title": ""}"#)]
    #[case(r#"{"title": "   "}"#)]
    #[case(r#"{"title": "x", "priority": 0}"#)]
    #[case(r#"{"title": "x", "priority": 11}"#)]
    #[case(r#"{"title": "x", "scheduled_time": "noon"}"#)]
    fn create_payload_rejects_invalid(#[case] body: &str) {
        let payload: CreateTaskPayload = serde_json::from_str(body).unwrap();
        assert!(matches!(
            payload.into_row("u"),
            Err(ApiError::ValidationFailed(_))
        ));
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        let parsed: Result<CreateTaskPayload, _> =
            serde_json::from_str(r#"{"title": "x", "status": "blocked"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn empty_update_has_no_changes() {
        let changes = UpdateTaskPayload::default()
            .into_changes("2026-01-01T00:00:00Z".into())
            .unwrap();
        assert!(changes.is_empty());
        let body = serde_json::to_value(&changes).unwrap();
        assert_eq!(body, serde_json::json!({"updated_at": "2026-01-01T00:00:00Z"}));
    }

    #[test]
    fn update_serializes_only_supplied_fields() {
        let payload: UpdateTaskPayload =
            serde_json::from_str(r#"{"status": "done", "priority": 2}"#).unwrap();
        let changes = payload.into_changes("now".into()).unwrap();
        assert!(!changes.is_empty());
        let body = serde_json::to_value(&changes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "done", "priority": 2, "updated_at": "now"})
        );
    }

    #[test]
    fn update_rejects_out_of_range_priority() {
        let payload = UpdateTaskPayload {
            priority: Some(42),
            ..Default::default()
        };
        assert!(matches!(
            payload.into_changes("now".into()),
            Err(ApiError::ValidationFailed(_))
        ));
    }

    #[test]
    fn task_row_accepts_numeric_id_and_keeps_bad_time() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": 17,
            "user_id": "u",
            "title": "Legacy row",
            "status": "in_progress",
            "priority": 3,
            "scheduled_for": "2026-05-01",
            "scheduled_time": "not-a-time",
            "created_at": "2026-05-01T08:00:00+00:00",
            "updated_at": "2026-05-01T08:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(task.id, "17");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.time_of_day(), None);
    }

    #[rstest]
    #[case(Some("done"), None, Some(TaskStatus::Done), None)]
    #[case(None, Some("2026-10-19"), None, NaiveDate::from_ymd_opt(2026, 10, 19))]
    #[case(None, None, None, None)]
    fn filters_from_query(
        #[case] status: Option<&str>,
        #[case] date: Option<&str>,
        #[case] want_status: Option<TaskStatus>,
        #[case] want_date: Option<NaiveDate>,
    ) {
        let filters = TaskFilters::from_query(status, date).unwrap();
        assert_eq!(filters.status, want_status);
        assert_eq!(filters.scheduled_for, want_date);
    }

    #[test]
    fn filters_reject_garbage() {
        assert!(TaskFilters::from_query(Some("blocked"), None).is_err());
        assert!(TaskFilters::from_query(None, Some("19/10/2026")).is_err());
    }
}
