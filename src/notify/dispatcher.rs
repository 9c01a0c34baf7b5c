use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use uuid::Uuid;

use crate::models::contact::Contact;
use crate::models::emergency::NotificationRecord;
use crate::models::enums::NotificationMethod;

use super::adapter::{PushSender, SendOutcome, SmsSender};

/// Bounded fan-out width. Sends are independent, but unbounded dispatch
/// would saturate the outbound provider's rate limits.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Per-send deadline, on top of the adapter's own client timeout.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(8);

/// One per-contact SMS attempt.
#[derive(Debug, Clone)]
pub struct SmsDispatch {
    pub contact: Contact,
    pub outcome: SendOutcome,
}

/// One per-device push attempt.
#[derive(Debug, Clone)]
pub struct PushDispatch {
    pub device_token: String,
    pub outcome: SendOutcome,
}

/// Send one SMS per contact with bounded concurrency.
///
/// Completion order across contacts is arbitrary; the returned list is
/// re-sorted to ascending contact priority then input order, so appends to
/// the notification list are deterministic for auditing.
pub async fn fan_out_sms(
    sms: &SmsSender,
    contacts: &[Contact],
    message: &str,
    concurrency: usize,
) -> Vec<SmsDispatch> {
    let mut results: Vec<(usize, SmsDispatch)> =
        stream::iter(contacts.iter().cloned().enumerate())
            .map(|(idx, contact)| async move {
                let outcome = send_with_deadline(sms, &contact.phone, message).await;
                (idx, SmsDispatch { contact, outcome })
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

    results.sort_by_key(|(idx, d)| (d.contact.priority, *idx));
    results.into_iter().map(|(_, d)| d).collect()
}

async fn send_with_deadline(sms: &SmsSender, phone: &str, message: &str) -> SendOutcome {
    match tokio::time::timeout(SEND_TIMEOUT, sms.send(phone, message)).await {
        Ok(outcome) => outcome,
        Err(_) => SendOutcome::failed(sms.provider_name(), "send deadline exceeded"),
    }
}

/// Send one push per device token with bounded concurrency. Results come
/// back in input order.
pub async fn fan_out_push(
    push: &PushSender,
    device_tokens: &[String],
    title: &str,
    body: &str,
    data: &serde_json::Value,
    concurrency: usize,
) -> Vec<PushDispatch> {
    let mut results: Vec<(usize, PushDispatch)> =
        stream::iter(device_tokens.iter().cloned().enumerate())
            .map(|(idx, token)| async move {
                let outcome = match tokio::time::timeout(
                    SEND_TIMEOUT,
                    push.send(&token, title, body, data),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => SendOutcome::failed(push.provider_name(), "send deadline exceeded"),
                };
                (
                    idx,
                    PushDispatch {
                        device_token: token,
                        outcome,
                    },
                )
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, d)| d).collect()
}

/// Materialize SMS dispatch results as notification records. Positions are
/// batch-relative; the repository re-bases them on append.
pub fn sms_records(dispatches: &[SmsDispatch]) -> Vec<NotificationRecord> {
    let now = Utc::now().naive_utc();
    dispatches
        .iter()
        .enumerate()
        .map(|(i, d)| NotificationRecord {
            id: Uuid::new_v4(),
            contact_id: Some(d.contact.id),
            method: NotificationMethod::Sms,
            sent_at: now,
            status: d.outcome.status,
            provider: d.outcome.provider.clone(),
            message_id: d.outcome.message_id.clone(),
            retry_count: 0,
            device_token: None,
            position: i as i64,
        })
        .collect()
}

/// Materialize push dispatch results as notification records.
pub fn push_records(dispatches: &[PushDispatch]) -> Vec<NotificationRecord> {
    let now = Utc::now().naive_utc();
    dispatches
        .iter()
        .enumerate()
        .map(|(i, d)| NotificationRecord {
            id: Uuid::new_v4(),
            contact_id: None,
            method: NotificationMethod::Push,
            sent_at: now,
            status: d.outcome.status,
            provider: d.outcome.provider.clone(),
            message_id: d.outcome.message_id.clone(),
            retry_count: 0,
            device_token: Some(d.device_token.clone()),
            position: i as i64,
        })
        .collect()
}
