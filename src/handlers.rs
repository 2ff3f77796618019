// handlers.rs
//
// The request-handling layer: every operation resolves path and query
// parameters, authorizes the link token where the operation is token-gated,
// validates the body, then delegates to the store. All failures funnel
// through `ApiError`.
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    CreatePollRequest, JoinRequest, NewBlock, NewParticipant, NewPoll, PollPatch,
    SubmitAvailabilityRequest, UpdatePollRequest,
};
use crate::validate::{self, FieldIssue};
use crate::{token, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct AccessQuery {
    /// Link token, passed as `?t=`.
    pub t: Option<String>,
    /// Caller-asserted participant id, passed as `&pid=` on block deletion.
    pub pid: Option<String>,
}

fn require_token(query: &AccessQuery) -> Result<&str, ApiError> {
    query.t.as_deref().ok_or(ApiError::Missing("Missing token"))
}

fn parse_id(raw: &str, message: &'static str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation {
        message,
        details: None,
    })
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::invalid(e.to_string()))
}

/// Create a poll and mint its link token
pub async fn create_poll(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let req: CreatePollRequest = parse_body(body)?;

    let mut issues = Vec::new();
    let duration_minutes = match req.duration_minutes {
        Some(d) if validate::duration_in_range(d) => d as i32,
        Some(_) => {
            issues.push(FieldIssue::new(
                "durationMinutes",
                "must be between 15 and 480",
            ));
            0
        }
        None => {
            issues.push(FieldIssue::new("durationMinutes", "is required"));
            0
        }
    };
    if let Some(quiet) = req.quiet_hours {
        if !validate::hour_of_day(quiet.start) {
            issues.push(FieldIssue::new("quietHours.start", "must be between 0 and 23"));
        }
        if !validate::hour_of_day(quiet.end) {
            issues.push(FieldIssue::new("quietHours.end", "must be between 0 and 23"));
        }
    }
    let start_date = parse_optional_date(req.start_date.as_deref(), "startDate", &mut issues);
    let end_date = parse_optional_date(req.end_date.as_deref(), "endDate", &mut issues);
    if req.start_date.is_some() != req.end_date.is_some() {
        issues.push(FieldIssue::new(
            "startDate",
            "startDate and endDate must be provided together",
        ));
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            issues.push(FieldIssue::new("endDate", "must not precede startDate"));
        }
    }
    if !issues.is_empty() {
        return Err(ApiError::invalid_fields(json!(issues)));
    }

    // Default poll window: today .. +7 days (UTC dates)
    let (start_date, end_date) = match (start_date, end_date) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            let today = Utc::now().date_naive();
            (today, today + Duration::days(7))
        }
    };

    let store = state.store()?;
    let poll = store
        .insert_poll(NewPoll {
            title: req.title.unwrap_or_default().trim().to_string(),
            description: None,
            duration_minutes,
            start_date,
            end_date,
            timezone_mode: req.timezone_mode.unwrap_or_default(),
            fairness_mode: req.fairness_mode.unwrap_or(false),
        })
        .await
        .map_err(|e| ApiError::store("Failed to create poll", e))?;

    let token = token::issue(store, poll.id)
        .await
        .map_err(|e| ApiError::store("Failed to create link token", e))?;
    tracing::info!(poll_id = %poll.id, "poll created");

    let link = format!("/p/{}?t={}", poll.id, token);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": poll.id, "token": token, "link": link })),
    ))
}

fn parse_optional_date(
    raw: Option<&str>,
    field: &'static str,
    issues: &mut Vec<FieldIssue>,
) -> Option<NaiveDate> {
    let raw = raw?;
    match validate::parse_date(raw) {
        Some(date) => Some(date),
        None => {
            issues.push(FieldIssue::new(field, "must be a YYYY-MM-DD date"));
            None
        }
    }
}

/// Token-gated snapshot: the poll plus everything submitted against it
pub async fn poll_snapshot(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Query(query): Query<AccessQuery>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let poll_id = parse_id(&poll_id, "Invalid poll id")?;
    let token = require_token(&query)?;
    let store = state.store()?;
    token::authorize(store, poll_id, token).await?;

    let poll = store
        .get_poll(poll_id)
        .await
        .map_err(|e| ApiError::store("Failed to load poll", e))?
        .ok_or(ApiError::NotFound("Poll not found"))?;
    let participants = store
        .list_participants(poll_id)
        .await
        .map_err(|e| ApiError::store("Failed to load participants", e))?;
    let availabilities = store
        .list_blocks(poll_id)
        .await
        .map_err(|e| ApiError::store("Failed to load availability", e))?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "poll": poll,
            "participants": participants,
            "availabilities": availabilities,
        })),
    ))
}

/// Partial poll update; only supplied fields are validated and overlaid.
/// Patching one of startDate/endDate does not re-verify the window order.
pub async fn update_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let poll_id = parse_id(&poll_id, "Invalid poll id")?;
    let req: UpdatePollRequest = parse_body(body)?;

    let mut issues = Vec::new();
    let duration_minutes = match req.duration_minutes {
        Some(d) if validate::duration_in_range(d) => Some(d as i32),
        Some(_) => {
            issues.push(FieldIssue::new(
                "durationMinutes",
                "must be between 15 and 480",
            ));
            None
        }
        None => None,
    };
    let start_date = parse_optional_date(req.start_date.as_deref(), "startDate", &mut issues);
    let end_date = parse_optional_date(req.end_date.as_deref(), "endDate", &mut issues);
    if !issues.is_empty() {
        return Err(ApiError::invalid_fields(json!(issues)));
    }

    let patch = PollPatch {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        duration_minutes,
        start_date,
        end_date,
        timezone_mode: req.timezone_mode,
        fairness_mode: req.fairness_mode,
    };
    let poll = state
        .store()?
        .update_poll(poll_id, patch)
        .await
        .map_err(|e| ApiError::store("Failed to update poll", e))?
        .ok_or(ApiError::NotFound("Poll not found"))?;

    Ok((StatusCode::OK, Json(json!({ "poll": poll }))))
}

/// Register a participant under a valid link token
pub async fn join_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Query(query): Query<AccessQuery>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let poll_id = parse_id(&poll_id, "Invalid poll id")?;
    let token = require_token(&query)?;
    let store = state.store()?;
    token::authorize(store, poll_id, token).await?;

    let req: JoinRequest = parse_body(body)?;
    let mut issues = Vec::new();
    let name = match req.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        Some(_) => {
            issues.push(FieldIssue::new("name", "must not be empty"));
            String::new()
        }
        None => {
            issues.push(FieldIssue::new("name", "is required"));
            String::new()
        }
    };
    // An empty email means "none given"
    let email = req.email.filter(|e| !e.is_empty());
    if let Some(email) = &email {
        if !validate::valid_email(email) {
            issues.push(FieldIssue::new("email", "must be a valid email address"));
        }
    }
    if !issues.is_empty() {
        return Err(ApiError::invalid_fields(json!(issues)));
    }
    let tz = match req.tz.filter(|tz| !tz.is_empty()) {
        Some(tz) => tz,
        None => "UTC".to_string(),
    };

    let participant = store
        .insert_participant(NewParticipant {
            poll_id,
            name,
            email,
            tz,
        })
        .await
        .map_err(|e| ApiError::store("Failed to create participant", e))?;
    tracing::info!(poll_id = %poll_id, participant_id = %participant.id, "participant joined");

    Ok((StatusCode::CREATED, Json(json!({ "participant": participant }))))
}

/// Submit a participant's availability, either replacing the stored set or
/// appending to it
pub async fn submit_availability(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Query(query): Query<AccessQuery>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let poll_id = parse_id(&poll_id, "Invalid poll id")?;
    let token = require_token(&query)?;
    let store = state.store()?;
    token::authorize(store, poll_id, token).await?;

    let req: SubmitAvailabilityRequest = parse_body(body)?;
    let parsed = validate::parse_blocks(&req.blocks)
        .map_err(|issues| ApiError::invalid_fields(json!(issues)))?;

    // Scope check before any mutation: the participant must belong to the
    // poll named in the path.
    let participant = store
        .find_participant(poll_id, req.participant_id)
        .await
        .map_err(|e| ApiError::store("Failed to validate participant", e))?;
    if participant.is_none() {
        return Err(ApiError::Scope("Participant does not belong to poll"));
    }

    // replace=true is a full overwrite. The delete and insert are separate
    // store calls; if the insert fails the delete is not rolled back and the
    // caller must resubmit the whole set.
    if req.replace.unwrap_or(true) {
        store
            .clear_blocks(poll_id, req.participant_id)
            .await
            .map_err(|e| ApiError::store("Failed to clear existing availability", e))?;
    }
    let rows = parsed
        .into_iter()
        .map(|(start_ts, end_ts)| NewBlock {
            poll_id,
            participant_id: req.participant_id,
            start_ts,
            end_ts,
        })
        .collect();
    let inserted = store
        .insert_blocks(rows)
        .await
        .map_err(|e| ApiError::store("Failed to save availability", e))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "inserted": inserted })),
    ))
}

/// Delete one availability block. The `pid` is caller-asserted and only
/// checked against the block's owning participant; it is not derived from
/// the token.
pub async fn delete_availability(
    State(state): State<AppState>,
    Path((poll_id, availability_id)): Path<(String, String)>,
    Query(query): Query<AccessQuery>,
) -> Result<StatusCode, ApiError> {
    let poll_id = parse_id(&poll_id, "Invalid poll id")?;
    let availability_id = parse_id(&availability_id, "Invalid availability id")?;
    let token = require_token(&query)?;
    let pid = query
        .pid
        .as_deref()
        .ok_or(ApiError::Missing("Missing participant id (pid)"))?;
    let participant_id = parse_id(pid, "Invalid participant id")?;

    let store = state.store()?;
    token::authorize(store, poll_id, token).await?;

    let block = store
        .get_block(availability_id)
        .await
        .map_err(|e| ApiError::store("Failed to load availability", e))?
        .ok_or(ApiError::NotFound("Availability not found"))?;
    if block.poll_id != poll_id {
        return Err(ApiError::Scope("Mismatched poll"));
    }
    if block.participant_id != participant_id {
        return Err(ApiError::Scope("Not allowed to delete this block"));
    }

    store
        .delete_block(availability_id)
        .await
        .map_err(|e| ApiError::store("Failed to delete availability", e))?;

    Ok(StatusCode::NO_CONTENT)
}
