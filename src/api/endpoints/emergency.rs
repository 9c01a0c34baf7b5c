//! Emergency lifecycle endpoints: trigger, status, resolve, step completion,
//! history and analytics.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{
    self, AnalyticsStats, HistoryFilter, HistoryItem, StatusSummary, StepCompletion,
};
use crate::models::contact::Contact;
use crate::models::emergency::{
    format_duration, EmergencyRecord, InstructionStep, LocationInfo,
};
use crate::models::enums::{EmergencyCategory, EmergencyStatus};
use crate::notify::{dispatcher, message};
use crate::pipeline::orchestrator::{analyze, IntakeAnalysis};
use crate::pipeline::types::{Classification, GuidanceBundle};

// ═══════════════════════════════════════════════════════════
// POST /api/emergency/trigger
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub user_id: Option<String>,
    pub text: Option<String>,
    pub location: Option<LocationPayload>,
    pub user_context: Option<String>,
}

/// Location as clients send it: either nested address fields or flat ones.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    #[serde(default)]
    pub coordinates: Vec<f64>,
    #[serde(default)]
    pub address: Option<AddressPayload>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl LocationPayload {
    fn into_location(self, captured_at: NaiveDateTime) -> LocationInfo {
        let address = self.address.unwrap_or_default();
        LocationInfo {
            longitude: self.coordinates.first().copied(),
            latitude: self.coordinates.get(1).copied(),
            street: address.street.or(self.street),
            city: address.city.or(self.city),
            state: address.state.or(self.state),
            zip_code: address.zip_code.or(self.zip_code),
            country: address.country.or(self.country),
            captured_at: Some(captured_at),
        }
    }
}

/// The analysis as reported back to the caller: the classification with the
/// gate's overrides applied, plus the guidance that was actually persisted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysisPayload {
    pub classification: Classification,
    pub guidance: GuidanceBundle,
    pub used_fallback: bool,
}

impl AiAnalysisPayload {
    fn from_analysis(analysis: &IntakeAnalysis) -> Self {
        let mut classification = analysis.classification.clone();
        classification.category = analysis.gated.category;
        classification.detected_subtype = analysis.gated.detected_subtype.clone();
        Self {
            classification,
            guidance: analysis.gated.guidance.clone(),
            used_fallback: analysis.gated.used_fallback,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub emergency: EmergencyRecord,
    pub ai_analysis: AiAnalysisPayload,
    pub contacts_count: usize,
    pub next_steps: Vec<String>,
}

/// `POST /api/emergency/trigger` — run the intake pipeline, persist the
/// record and fan alerts out to the user's contacts. Classification or
/// guidance failure degrades to the safe default; only persistence failure
/// fails the request.
pub async fn trigger(
    State(ctx): State<ApiContext>,
    Json(request): Json<TriggerRequest>,
) -> Result<(StatusCode, Json<TriggerResponse>), ApiError> {
    let user_id = request
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let text = request
        .text
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (Some(user_id), Some(text)) = (user_id, text) else {
        return Err(ApiError::BadRequest(
            "User ID and emergency text are required".into(),
        ));
    };

    // Provider calls happen before any lock is taken.
    let analysis = analyze(&ctx.model, text, request.user_context.as_deref()).await;

    let now = Utc::now().naive_utc();
    let record = EmergencyRecord {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        category: analysis.gated.category,
        severity: analysis.classification.risk_assessment,
        status: EmergencyStatus::Active,
        version: 1,
        location: request.location.map(|l| l.into_location(now)),
        ai_analysis: crate::pipeline::gate::summarize(&analysis.classification),
        instructions: analysis
            .gated
            .guidance
            .steps
            .iter()
            .map(|step| InstructionStep {
                step_number: step.step_number,
                title: step.title.clone(),
                description: step.description.clone(),
                estimated_secs: step.estimated_secs,
                priority: step.priority,
                safety_note: step.safety_note.clone(),
                completed: false,
                completed_at: None,
                ai_generated: !analysis.gated.used_fallback,
            })
            .collect(),
        notifications: vec![],
        resolved_at: None,
        resolution_notes: None,
        response_time_secs: None,
        created_at: now,
        updated_at: now,
    };

    let contacts = {
        let mut conn = crate::db::lock(&ctx.db)?;
        repository::insert_emergency(&mut conn, &record)?;
        repository::list_active_for_user(&conn, user_id)?
    };

    tracing::info!(
        emergency = %record.id,
        category = record.category.as_str(),
        used_fallback = analysis.gated.used_fallback,
        contacts = contacts.len(),
        "Emergency created, dispatching notifications"
    );

    // Fan-out outside the lock; failed sends are recorded, never fatal.
    let alert = message::alert_sms(&record);
    let dispatches =
        dispatcher::fan_out_sms(&ctx.channels.sms, &contacts, &alert, ctx.dispatch_concurrency)
            .await;
    let records = dispatcher::sms_records(&dispatches);

    let emergency = {
        let mut conn = crate::db::lock(&ctx.db)?;
        if !records.is_empty() {
            repository::append_notifications(&mut conn, record.id, &records, None)?;
        }
        repository::get_emergency(&conn, record.id)?
    };

    Ok((
        StatusCode::CREATED,
        Json(TriggerResponse {
            emergency,
            ai_analysis: AiAnalysisPayload::from_analysis(&analysis),
            contacts_count: contacts.len(),
            next_steps: vec![
                "Notifications sent to emergency contacts".into(),
                "Follow the provided instructions".into(),
                "Update status when situation changes".into(),
            ],
        }),
    ))
}

// ═══════════════════════════════════════════════════════════
// GET /api/emergency/:id/status
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub emergency: EmergencyRecord,
    /// Contacts referenced by the notification list, for display.
    pub contacts: Vec<Contact>,
}

pub async fn status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_emergency_id(&id)?;
    let conn = crate::db::lock(&ctx.db)?;
    let emergency = repository::get_emergency(&conn, id)?;

    let mut contact_ids: Vec<Uuid> = emergency
        .notifications
        .iter()
        .filter_map(|n| n.contact_id)
        .collect();
    contact_ids.sort();
    contact_ids.dedup();
    let contacts = repository::get_active_by_ids(&conn, &contact_ids)?;

    Ok(Json(StatusResponse {
        emergency,
        contacts,
    }))
}

// ═══════════════════════════════════════════════════════════
// PUT /api/emergency/:id/resolve
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub emergency: EmergencyRecord,
    pub response_time: String,
    pub duration: String,
}

pub async fn resolve(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    body: Option<Json<ResolveRequest>>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let id = parse_emergency_id(&id)?;
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let emergency = {
        let mut conn = crate::db::lock(&ctx.db)?;
        repository::resolve_emergency(&mut conn, id, request.resolution_notes.as_deref())?
    };

    let secs = emergency.response_time_secs.unwrap_or(0);
    tracing::info!(emergency = %id, response_time_secs = secs, "Emergency resolved");
    Ok(Json(ResolveResponse {
        response_time: format!("{secs} seconds"),
        duration: format_duration(secs),
        emergency,
    }))
}

// ═══════════════════════════════════════════════════════════
// POST /api/emergency/:id/step-complete
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCompleteRequest {
    pub step_number: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCompleteResponse {
    pub message: String,
    #[serde(flatten)]
    pub completion: StepCompletion,
}

pub async fn step_complete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(request): Json<StepCompleteRequest>,
) -> Result<Json<StepCompleteResponse>, ApiError> {
    let id = parse_emergency_id(&id)?;
    let Some(step_number) = request.step_number else {
        return Err(ApiError::BadRequest("Step number is required".into()));
    };

    let completion = {
        let mut conn = crate::db::lock(&ctx.db)?;
        repository::complete_step(&mut conn, id, step_number)?
    };

    let message = if completion.all_steps_completed {
        "All steps completed!".to_string()
    } else {
        "Step completed successfully".to_string()
    };
    Ok(Json(StepCompleteResponse {
        message,
        completion,
    }))
}

// ═══════════════════════════════════════════════════════════
// GET /api/emergency/history
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub emergency_type: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub data: Vec<HistoryItem>,
    pub pagination: Pagination,
    pub summary: StatusSummary,
}

pub async fn history(
    State(ctx): State<ApiContext>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Some(user_id) = query.user_id.filter(|u| !u.trim().is_empty()) else {
        return Err(ApiError::BadRequest("User ID is required".into()));
    };

    let category = match query.emergency_type.as_deref() {
        None | Some("all") | Some("") => None,
        Some(raw) => Some(raw.parse::<EmergencyCategory>().map_err(|_| {
            ApiError::BadRequest(format!("Unknown emergency type: {raw}"))
        })?),
    };
    let status = match query.status.as_deref() {
        None | Some("all") | Some("") => None,
        Some(raw) => Some(raw.parse::<EmergencyStatus>().map_err(|_| {
            ApiError::BadRequest(format!("Unknown status: {raw}"))
        })?),
    };

    let filter = HistoryFilter {
        user_id,
        start_date: query.start_date.as_deref().map(parse_date_bound).transpose()?,
        end_date: query
            .end_date
            .as_deref()
            .map(|raw| parse_date_bound(raw).map(end_of_day_if_date_only(raw)))
            .transpose()?,
        category,
        status,
        page: query.page.unwrap_or(1).max(1),
        limit: query.limit.unwrap_or(20).clamp(1, 100),
    };

    let conn = crate::db::lock(&ctx.db)?;
    let (data, total) = repository::list_history(&conn, &filter)?;
    let summary = repository::status_summary(&conn, &filter)?;

    let total_pages = (total + filter.limit - 1) / filter.limit;
    Ok(Json(HistoryResponse {
        data,
        pagination: Pagination {
            current_page: filter.page,
            total_pages,
            total_items: total,
            items_per_page: filter.limit,
        },
        summary,
    }))
}

// ═══════════════════════════════════════════════════════════
// GET /api/emergency/analytics/stats
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub user_id: Option<String>,
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: AnalyticsStats,
    pub period_days: i64,
}

pub async fn analytics_stats(
    State(ctx): State<ApiContext>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    let Some(user_id) = query.user_id.filter(|u| !u.trim().is_empty()) else {
        return Err(ApiError::BadRequest("User ID is required".into()));
    };
    let days = query.days.unwrap_or(30).clamp(1, 365);

    let conn = crate::db::lock(&ctx.db)?;
    let stats = repository::analytics_stats(&conn, &user_id, days)?;
    Ok(Json(StatsResponse {
        stats,
        period_days: days,
    }))
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

pub(crate) fn parse_emergency_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("Invalid emergency id: {raw}")))
}

/// Accept either a date-time or a bare date as a history bound.
fn parse_date_bound(raw: &str) -> Result<NaiveDateTime, ApiError> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        .map_err(|_| ApiError::BadRequest(format!("Invalid date: {raw}")))
}

/// A bare end date means "through that whole day".
fn end_of_day_if_date_only(raw: &str) -> impl Fn(NaiveDateTime) -> NaiveDateTime + '_ {
    move |dt| {
        if raw.len() == 10 {
            dt.date().and_hms_opt(23, 59, 59).unwrap_or(dt)
        } else {
            dt
        }
    }
}
