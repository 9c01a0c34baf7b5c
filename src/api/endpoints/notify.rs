//! Manual notification endpoints: re-send, delivery status, retry.

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::emergency::parse_emergency_id;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::contact::Contact;
use crate::models::emergency::NotificationRecord;
use crate::models::enums::{DeliveryStatus, EmergencyCategory, EmergencyStatus};
use crate::notify::tracker::{self, NotificationSummary, RetryReport};
use crate::notify::{dispatcher, message};

// ═══════════════════════════════════════════════════════════
// POST /api/notify/sms
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsRequest {
    pub emergency_id: Option<String>,
    #[serde(default)]
    pub contact_ids: Vec<String>,
    pub custom_message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResult {
    pub name: String,
    pub phone: String,
    pub status: DeliveryStatus,
    pub message_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSummary {
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsResponse {
    pub emergency_id: Uuid,
    pub provider: String,
    pub results: Vec<ContactResult>,
    pub summary: SendSummary,
}

/// `POST /api/notify/sms` — re-send the alert to specific contacts, or to
/// all the user's active contacts when none are named.
pub async fn send_sms(
    State(ctx): State<ApiContext>,
    Json(request): Json<SmsRequest>,
) -> Result<Json<SmsResponse>, ApiError> {
    let Some(raw_id) = request.emergency_id.as_deref() else {
        return Err(ApiError::BadRequest("Emergency ID is required".into()));
    };
    let emergency_id = parse_emergency_id(raw_id)?;

    let contact_ids = request
        .contact_ids
        .iter()
        .map(|raw| {
            Uuid::parse_str(raw)
                .map_err(|_| ApiError::BadRequest(format!("Invalid contact id: {raw}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (record, contacts) = {
        let conn = crate::db::lock(&ctx.db)?;
        let record = repository::get_emergency(&conn, emergency_id)?;
        let contacts = if contact_ids.is_empty() {
            repository::list_active_for_user(&conn, &record.user_id)?
        } else {
            repository::get_active_by_ids(&conn, &contact_ids)?
        };
        (record, contacts)
    };

    if contacts.is_empty() {
        return Err(ApiError::NotFound("No emergency contacts found".into()));
    }

    let text = request
        .custom_message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| message::alert_sms(&record));

    let dispatches =
        dispatcher::fan_out_sms(&ctx.channels.sms, &contacts, &text, ctx.dispatch_concurrency)
            .await;
    let records = dispatcher::sms_records(&dispatches);

    {
        let mut conn = crate::db::lock(&ctx.db)?;
        repository::append_notifications(&mut conn, emergency_id, &records, None)?;
    }

    let results: Vec<ContactResult> = dispatches
        .iter()
        .map(|d| ContactResult {
            name: d.contact.name.clone(),
            phone: d.contact.phone.clone(),
            status: d.outcome.status,
            message_id: d.outcome.message_id.clone(),
        })
        .collect();

    Ok(Json(SmsResponse {
        emergency_id,
        provider: ctx.channels.sms.provider_name().to_string(),
        summary: summarize_sends(results.iter().map(|r| r.status)),
        results,
    }))
}

// ═══════════════════════════════════════════════════════════
// POST /api/notify/push
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub emergency_id: Option<String>,
    #[serde(default)]
    pub device_tokens: Vec<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResult {
    /// Truncated for the response; tokens are secrets-adjacent.
    pub device_token: String,
    pub status: DeliveryStatus,
    pub message_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub emergency_id: Uuid,
    pub provider: String,
    pub results: Vec<DeviceResult>,
    pub summary: SendSummary,
}

/// `POST /api/notify/push` — push the alert to a set of device tokens.
pub async fn send_push(
    State(ctx): State<ApiContext>,
    Json(request): Json<PushRequest>,
) -> Result<Json<PushResponse>, ApiError> {
    let Some(raw_id) = request.emergency_id.as_deref() else {
        return Err(ApiError::BadRequest("Emergency ID is required".into()));
    };
    if request.device_tokens.is_empty() {
        return Err(ApiError::BadRequest(
            "Emergency ID and device tokens are required".into(),
        ));
    }
    let emergency_id = parse_emergency_id(raw_id)?;

    let record = {
        let conn = crate::db::lock(&ctx.db)?;
        repository::get_emergency(&conn, emergency_id)?
    };

    let (default_title, default_body) = message::alert_push(&record);
    let title = request.title.filter(|t| !t.trim().is_empty()).unwrap_or(default_title);
    let body = request.body.filter(|b| !b.trim().is_empty()).unwrap_or(default_body);
    let mut data = message::push_data(&record);
    if let (Some(base), Some(extra)) = (data.as_object_mut(), request.data.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }

    let dispatches = dispatcher::fan_out_push(
        &ctx.channels.push,
        &request.device_tokens,
        &title,
        &body,
        &data,
        ctx.dispatch_concurrency,
    )
    .await;
    let records = dispatcher::push_records(&dispatches);

    {
        let mut conn = crate::db::lock(&ctx.db)?;
        repository::append_notifications(&mut conn, emergency_id, &records, None)?;
    }

    let results: Vec<DeviceResult> = dispatches
        .iter()
        .map(|d| DeviceResult {
            device_token: truncate_token(&d.device_token),
            status: d.outcome.status,
            message_id: d.outcome.message_id.clone(),
        })
        .collect();

    Ok(Json(PushResponse {
        emergency_id,
        provider: ctx.channels.push.provider_name().to_string(),
        summary: summarize_sends(results.iter().map(|r| r.status)),
        results,
    }))
}

// ═══════════════════════════════════════════════════════════
// GET /api/notify/status/:emergency_id
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyStatusResponse {
    pub emergency_id: Uuid,
    pub emergency_type: EmergencyCategory,
    pub emergency_status: EmergencyStatus,
    pub notifications: Vec<NotificationRecord>,
    pub contacts: Vec<Contact>,
    pub summary: NotificationSummary,
    pub last_updated: NaiveDateTime,
}

pub async fn notification_status(
    State(ctx): State<ApiContext>,
    Path(emergency_id): Path<String>,
) -> Result<Json<NotifyStatusResponse>, ApiError> {
    let emergency_id = parse_emergency_id(&emergency_id)?;
    let conn = crate::db::lock(&ctx.db)?;
    let record = repository::get_emergency(&conn, emergency_id)?;

    let mut contact_ids: Vec<Uuid> = record
        .notifications
        .iter()
        .filter_map(|n| n.contact_id)
        .collect();
    contact_ids.sort();
    contact_ids.dedup();
    let contacts = repository::get_active_by_ids(&conn, &contact_ids)?;

    Ok(Json(NotifyStatusResponse {
        emergency_id,
        emergency_type: record.category,
        emergency_status: record.status,
        summary: tracker::summarize(&record.notifications),
        notifications: record.notifications,
        contacts,
        last_updated: record.updated_at,
    }))
}

// ═══════════════════════════════════════════════════════════
// POST /api/notify/retry/:emergency_id
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryResponse {
    pub emergency_id: Uuid,
    pub message: String,
    #[serde(flatten)]
    pub report: RetryReport,
}

pub async fn retry(
    State(ctx): State<ApiContext>,
    Path(emergency_id): Path<String>,
) -> Result<Json<RetryResponse>, ApiError> {
    let emergency_id = parse_emergency_id(&emergency_id)?;
    let report = tracker::retry_failed(&ctx.db, &ctx.channels, emergency_id).await?;

    let message = if report.summary.total_retried == 0 {
        "No failed notifications to retry".to_string()
    } else {
        format!("Retried {} notifications", report.summary.total_retried)
    };
    Ok(Json(RetryResponse {
        emergency_id,
        message,
        report,
    }))
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

fn summarize_sends(statuses: impl Iterator<Item = DeliveryStatus>) -> SendSummary {
    let mut summary = SendSummary {
        total: 0,
        delivered: 0,
        failed: 0,
    };
    for status in statuses {
        summary.total += 1;
        match status {
            DeliveryStatus::Sent | DeliveryStatus::Delivered => summary.delivered += 1,
            DeliveryStatus::Failed | DeliveryStatus::Pending => summary.failed += 1,
        }
    }
    summary
}

fn truncate_token(token: &str) -> String {
    if token.len() > 10 {
        format!("{}...", &token[..10])
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_summary_counts_sent_as_delivered() {
        let summary = summarize_sends(
            [
                DeliveryStatus::Sent,
                DeliveryStatus::Delivered,
                DeliveryStatus::Failed,
            ]
            .into_iter(),
        );
        assert_eq!(summary.total, 3);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn tokens_are_truncated_for_responses() {
        assert_eq!(truncate_token("short"), "short");
        assert_eq!(truncate_token("abcdefghijklmnop"), "abcdefghij...");
    }
}
