// models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How suggested slots should be rendered for participants. Stored with the
/// poll; the ranking layer that consumes it lives outside this backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimezoneMode {
    Local,
    Organizer,
    Utc,
}

impl TimezoneMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimezoneMode::Local => "local",
            TimezoneMode::Organizer => "organizer",
            TimezoneMode::Utc => "utc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(TimezoneMode::Local),
            "organizer" => Some(TimezoneMode::Organizer),
            "utc" => Some(TimezoneMode::Utc),
            _ => None,
        }
    }
}

impl Default for TimezoneMode {
    fn default() -> Self {
        TimezoneMode::Local
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Poll {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timezone_mode: TimezoneMode,
    pub fairness_mode: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One capability token for one poll. Possession of the token string grants
/// access to every operation on that poll; `active = false` revokes it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LinkToken {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub token: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Participant {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub poll_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub tz: String,
    pub quiet_start: Option<i32>,
    pub quiet_end: Option<i32>,
    pub invited_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AvailabilityBlock {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub poll_id: Uuid,
    pub participant_id: Uuid,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
}

// Store-facing rows, assembled by the handlers after validation.

#[derive(Debug, Clone)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timezone_mode: TimezoneMode,
    pub fairness_mode: bool,
}

/// Partial poll update; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default)]
pub struct PollPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub timezone_mode: Option<TimezoneMode>,
    pub fairness_mode: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub poll_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub tz: String,
}

#[derive(Debug, Clone)]
pub struct NewBlock {
    pub poll_id: Uuid,
    pub participant_id: Uuid,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
}

// Request payloads. Poll bodies use camelCase on the wire, participant and
// availability bodies snake_case.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub title: Option<String>,
    pub duration_minutes: Option<i64>,
    pub timezone_mode: Option<TimezoneMode>,
    pub fairness_mode: Option<bool>,
    pub quiet_hours: Option<QuietHours>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Hour-of-day window participants should not be scheduled into. Validated
/// at poll creation; persisted only as per-participant overrides.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuietHours {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i64>,
    pub timezone_mode: Option<TimezoneMode>,
    pub fairness_mode: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub tz: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAvailabilityRequest {
    pub participant_id: Uuid,
    pub blocks: Vec<BlockInput>,
    pub replace: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct BlockInput {
    pub start: String,
    pub end: String,
}
