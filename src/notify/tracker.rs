use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::{
    get_contact, get_emergency, mark_retry_attempt, record_retry_outcome,
    retryable_notifications,
};
use crate::db::DatabaseError;
use crate::models::emergency::NotificationRecord;
use crate::models::enums::{DeliveryStatus, NotificationMethod};

use super::adapter::{NotificationChannels, SendOutcome};
use super::message;

// ═══════════════════════════════════════════════════════════
// Status aggregation (pure)
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MethodBreakdown {
    pub sms: i64,
    pub push: i64,
    pub email: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusBreakdown {
    pub sent: i64,
    pub delivered: i64,
    pub failed: i64,
    pub pending: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProviderBreakdown {
    pub twilio: i64,
    pub fcm: i64,
    pub simulation: i64,
}

/// Aggregate view over one emergency's notification list.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct NotificationSummary {
    pub total: i64,
    pub by_method: MethodBreakdown,
    pub by_status: StatusBreakdown,
    pub by_provider: ProviderBreakdown,
}

/// Pure aggregation — no I/O.
pub fn summarize(notifications: &[NotificationRecord]) -> NotificationSummary {
    let mut summary = NotificationSummary {
        total: notifications.len() as i64,
        ..Default::default()
    };
    for n in notifications {
        match n.method {
            NotificationMethod::Sms => summary.by_method.sms += 1,
            NotificationMethod::Push => summary.by_method.push += 1,
            NotificationMethod::Email => summary.by_method.email += 1,
        }
        match n.status {
            DeliveryStatus::Sent => summary.by_status.sent += 1,
            DeliveryStatus::Delivered => summary.by_status.delivered += 1,
            DeliveryStatus::Failed => summary.by_status.failed += 1,
            DeliveryStatus::Pending => summary.by_status.pending += 1,
        }
        match n.provider.as_str() {
            "twilio" => summary.by_provider.twilio += 1,
            "fcm" => summary.by_provider.fcm += 1,
            _ => summary.by_provider.simulation += 1,
        }
    }
    summary
}

// ═══════════════════════════════════════════════════════════
// Retry
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct RetryOutcome {
    pub notification_id: Uuid,
    pub method: NotificationMethod,
    pub retry_count: i64,
    pub new_status: DeliveryStatus,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrySummary {
    pub total_retried: i64,
    pub successful: i64,
    pub still_failed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryReport {
    pub outcomes: Vec<RetryOutcome>,
    pub summary: RetrySummary,
}

/// Retry every failed/pending notification that has attempts left.
///
/// Each selected record has its retry count persisted *before* the re-send,
/// so a crash mid-batch can never under-count attempts. A send that fails
/// again is recorded and the batch continues — one bad destination must not
/// starve the rest.
pub async fn retry_failed(
    db: &Mutex<Connection>,
    channels: &NotificationChannels,
    emergency_id: Uuid,
) -> Result<RetryReport, DatabaseError> {
    struct Planned {
        notification: NotificationRecord,
        phone: Option<String>,
        sms_text: String,
    }

    // Select under the record lock; sends happen outside it.
    let planned: Vec<Planned> = {
        let conn = crate::db::lock(db)?;
        let record = get_emergency(&conn, emergency_id)?;
        let sms_text = message::retry_sms(&record);
        retryable_notifications(&conn, emergency_id)?
            .into_iter()
            .map(|notification| {
                let phone = notification
                    .contact_id
                    .and_then(|cid| get_contact(&conn, cid).ok())
                    .map(|c| c.phone);
                Planned {
                    notification,
                    phone,
                    sms_text: sms_text.clone(),
                }
            })
            .collect()
    };

    let mut outcomes = Vec::with_capacity(planned.len());
    for plan in planned {
        let nid = plan.notification.id;

        let retry_count = {
            let conn = crate::db::lock(db)?;
            match mark_retry_attempt(&conn, emergency_id, nid) {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(notification = %nid, error = %e, "Skipping retry");
                    continue;
                }
            }
        };

        let outcome = resend(channels, &plan.notification, plan.phone.as_deref(), &plan.sms_text)
            .await;

        let (new_status, message_id) = if outcome.succeeded() {
            (outcome.status, Some(outcome.message_id.as_str()))
        } else {
            (DeliveryStatus::Failed, None)
        };

        {
            let conn = crate::db::lock(db)?;
            record_retry_outcome(
                &conn,
                emergency_id,
                nid,
                new_status,
                message_id,
                Utc::now().naive_utc(),
            )?;
        }

        outcomes.push(RetryOutcome {
            notification_id: nid,
            method: plan.notification.method,
            retry_count,
            new_status,
            success: outcome.succeeded(),
        });
    }

    let successful = outcomes.iter().filter(|o| o.success).count() as i64;
    let summary = RetrySummary {
        total_retried: outcomes.len() as i64,
        successful,
        still_failed: outcomes.len() as i64 - successful,
    };
    tracing::info!(
        emergency = %emergency_id,
        retried = summary.total_retried,
        successful = summary.successful,
        "Notification retry batch finished"
    );
    Ok(RetryReport { outcomes, summary })
}

async fn resend(
    channels: &NotificationChannels,
    notification: &NotificationRecord,
    phone: Option<&str>,
    sms_text: &str,
) -> SendOutcome {
    match notification.method {
        NotificationMethod::Sms => match phone {
            Some(phone) => channels.sms.send(phone, sms_text).await,
            None => SendOutcome::failed(
                channels.sms.provider_name(),
                "no contact phone for sms retry",
            ),
        },
        NotificationMethod::Push => match notification.device_token.as_deref() {
            Some(token) => {
                let (title, body) = message::retry_push();
                channels
                    .push
                    .send(token, &title, &body, &serde_json::json!({}))
                    .await
            }
            None => SendOutcome::failed(
                channels.push.provider_name(),
                "no device token for push retry",
            ),
        },
        NotificationMethod::Email => {
            SendOutcome::failed("simulation", "no email adapter configured")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{append_notifications, insert_contact, insert_emergency};
    use crate::db::sqlite::open_memory_database;
    use crate::models::contact::Contact;
    use crate::models::emergency::{
        ClassificationSummary, EmergencyRecord, InstructionStep, MAX_RETRY_COUNT,
    };
    use crate::models::enums::{
        EmergencyCategory, EmergencyStatus, Relationship, RiskLevel, StepPriority,
    };
    use crate::notify::adapter::{PushSender, ScriptedSender, SmsSender};

    fn make_record(user_id: &str) -> EmergencyRecord {
        let now = Utc::now().naive_utc();
        EmergencyRecord {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            category: EmergencyCategory::Fire,
            severity: RiskLevel::High,
            status: EmergencyStatus::Active,
            version: 1,
            location: None,
            ai_analysis: ClassificationSummary {
                confidence_score: 0.9,
                detected_subtype: "building_fire".into(),
                risk_assessment: RiskLevel::High,
                reasoning: "r".into(),
                captured_at: now,
            },
            instructions: vec![InstructionStep {
                step_number: 1,
                title: "Step 1".into(),
                description: "d".into(),
                estimated_secs: 30,
                priority: StepPriority::High,
                safety_note: None,
                completed: false,
                completed_at: None,
                ai_generated: true,
            }],
            notifications: vec![],
            resolved_at: None,
            resolution_notes: None,
            response_time_secs: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_contact(user_id: &str) -> Contact {
        let now = Utc::now().naive_utc();
        Contact {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            name: "Ada".into(),
            phone: "+15550100".into(),
            email: None,
            relationship: Relationship::Family,
            priority: 1,
            is_active: true,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sms_notification(contact_id: Option<Uuid>, status: DeliveryStatus) -> NotificationRecord {
        NotificationRecord {
            id: Uuid::new_v4(),
            contact_id,
            method: NotificationMethod::Sms,
            sent_at: Utc::now().naive_utc(),
            status,
            provider: "simulation".into(),
            message_id: format!("m_{}", Uuid::new_v4().simple()),
            retry_count: 0,
            device_token: None,
            position: 0,
        }
    }

    #[test]
    fn summarize_counts_all_dimensions() {
        let mut push = sms_notification(None, DeliveryStatus::Sent);
        push.method = NotificationMethod::Push;
        push.provider = "fcm".into();
        let mut twilio = sms_notification(None, DeliveryStatus::Delivered);
        twilio.provider = "twilio".into();
        let notifications = vec![
            sms_notification(None, DeliveryStatus::Failed),
            sms_notification(None, DeliveryStatus::Pending),
            push,
            twilio,
        ];

        let summary = summarize(&notifications);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.by_method.sms, 3);
        assert_eq!(summary.by_method.push, 1);
        assert_eq!(summary.by_status.failed, 1);
        assert_eq!(summary.by_status.pending, 1);
        assert_eq!(summary.by_status.sent, 1);
        assert_eq!(summary.by_status.delivered, 1);
        assert_eq!(summary.by_provider.simulation, 2);
        assert_eq!(summary.by_provider.fcm, 1);
        assert_eq!(summary.by_provider.twilio, 1);
    }

    #[test]
    fn summarize_empty_list() {
        assert_eq!(summarize(&[]), NotificationSummary::default());
    }

    #[tokio::test]
    async fn retry_targets_only_failed_and_increments_once() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1");
        insert_emergency(&mut conn, &record).unwrap();
        let contact = make_contact("user-1");
        insert_contact(&conn, &contact).unwrap();

        // Scenario: 3 sends, #2 failed.
        let batch = vec![
            sms_notification(Some(contact.id), DeliveryStatus::Delivered),
            sms_notification(Some(contact.id), DeliveryStatus::Failed),
            sms_notification(Some(contact.id), DeliveryStatus::Delivered),
        ];
        let appended = append_notifications(&mut conn, record.id, &batch, None).unwrap();
        let failed_id = appended[1].id;

        let script = ScriptedSender::new();
        script.push_delivered();
        let channels = NotificationChannels {
            sms: SmsSender::Scripted(script),
            push: PushSender::Simulation,
        };

        let db = Mutex::new(conn);
        let report = retry_failed(&db, &channels, record.id).await.unwrap();
        assert_eq!(report.summary.total_retried, 1);
        assert_eq!(report.summary.successful, 1);
        assert_eq!(report.outcomes[0].notification_id, failed_id);
        assert_eq!(report.outcomes[0].retry_count, 1);

        let conn = db.lock().unwrap();
        let loaded = get_emergency(&conn, record.id).unwrap();
        let retried = loaded
            .notifications
            .iter()
            .find(|n| n.id == failed_id)
            .unwrap();
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.status, DeliveryStatus::Delivered);
    }

    #[tokio::test]
    async fn failed_retry_is_recorded_not_thrown() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1");
        insert_emergency(&mut conn, &record).unwrap();
        let contact = make_contact("user-1");
        insert_contact(&conn, &contact).unwrap();

        let batch = vec![
            sms_notification(Some(contact.id), DeliveryStatus::Failed),
            sms_notification(Some(contact.id), DeliveryStatus::Failed),
        ];
        append_notifications(&mut conn, record.id, &batch, None).unwrap();

        let script = ScriptedSender::new();
        script.push_failed();
        script.push_delivered();
        let channels = NotificationChannels {
            sms: SmsSender::Scripted(script),
            push: PushSender::Simulation,
        };

        let db = Mutex::new(conn);
        let report = retry_failed(&db, &channels, record.id).await.unwrap();
        assert_eq!(report.summary.total_retried, 2);
        assert_eq!(report.summary.successful, 1);
        assert_eq!(report.summary.still_failed, 1);
    }

    #[tokio::test]
    async fn exhausted_notifications_are_excluded() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1");
        insert_emergency(&mut conn, &record).unwrap();

        let mut exhausted = sms_notification(None, DeliveryStatus::Failed);
        exhausted.retry_count = MAX_RETRY_COUNT;
        append_notifications(&mut conn, record.id, &[exhausted], None).unwrap();

        let channels = NotificationChannels::simulation();
        let db = Mutex::new(conn);
        let report = retry_failed(&db, &channels, record.id).await.unwrap();
        assert_eq!(report.summary.total_retried, 0);
    }

    #[tokio::test]
    async fn retry_count_never_exceeds_cap() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1");
        insert_emergency(&mut conn, &record).unwrap();
        let contact = make_contact("user-1");
        insert_contact(&conn, &contact).unwrap();

        let batch = vec![sms_notification(Some(contact.id), DeliveryStatus::Failed)];
        let appended = append_notifications(&mut conn, record.id, &batch, None).unwrap();
        let nid = appended[0].id;

        let script = ScriptedSender::new();
        for _ in 0..4 {
            script.push_failed();
        }
        let channels = NotificationChannels {
            sms: SmsSender::Scripted(script),
            push: PushSender::Simulation,
        };

        let db = Mutex::new(conn);
        // Three batches consume the three allowed retries...
        for expected in 1..=3 {
            let report = retry_failed(&db, &channels, record.id).await.unwrap();
            assert_eq!(report.summary.total_retried, 1);
            assert_eq!(report.outcomes[0].retry_count, expected);
        }
        // ...and a fourth batch selects nothing.
        let report = retry_failed(&db, &channels, record.id).await.unwrap();
        assert_eq!(report.summary.total_retried, 0);

        let conn = db.lock().unwrap();
        let loaded = get_emergency(&conn, record.id).unwrap();
        let n = loaded.notifications.iter().find(|n| n.id == nid).unwrap();
        assert_eq!(n.retry_count, MAX_RETRY_COUNT);
    }

    #[tokio::test]
    async fn retry_unknown_emergency_is_not_found() {
        let conn = open_memory_database().unwrap();
        let channels = NotificationChannels::simulation();
        let db = Mutex::new(conn);
        let err = retry_failed(&db, &channels, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
