use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{
    DeliveryStatus, EmergencyCategory, EmergencyStatus, NotificationMethod, RiskLevel,
    StepPriority,
};

/// Maximum automatic retries per notification.
pub const MAX_RETRY_COUNT: i64 = 3;

/// The persisted emergency aggregate: classification summary, instruction
/// checklist, notification history and resolution data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRecord {
    pub id: Uuid,
    pub user_id: String,
    pub category: EmergencyCategory,
    pub severity: RiskLevel,
    pub status: EmergencyStatus,
    /// Optimistic concurrency guard, bumped by every aggregate mutation.
    pub version: i64,
    pub location: Option<LocationInfo>,
    pub ai_analysis: ClassificationSummary,
    pub instructions: Vec<InstructionStep>,
    pub notifications: Vec<NotificationRecord>,
    pub resolved_at: Option<NaiveDateTime>,
    pub resolution_notes: Option<String>,
    pub response_time_secs: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Location captured at intake time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInfo {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
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
    #[serde(default)]
    pub captured_at: Option<NaiveDateTime>,
}

/// Snapshot of the classification that drove this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub confidence_score: f64,
    pub detected_subtype: String,
    pub risk_assessment: RiskLevel,
    pub reasoning: String,
    pub captured_at: NaiveDateTime,
}

/// One checklist entry derived from the gated guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionStep {
    pub step_number: i64,
    pub title: String,
    pub description: String,
    pub estimated_secs: i64,
    pub priority: StepPriority,
    pub safety_note: Option<String>,
    pub completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    /// false when the step came from the safe-default fallback.
    pub ai_generated: bool,
}

/// One notification attempt. Appended on dispatch; only
/// status/message_id/sent_at/retry_count change afterwards (retry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub contact_id: Option<Uuid>,
    pub method: NotificationMethod,
    pub sent_at: NaiveDateTime,
    pub status: DeliveryStatus,
    pub provider: String,
    pub message_id: String,
    pub retry_count: i64,
    pub device_token: Option<String>,
    /// Append order within the emergency, audit only.
    pub position: i64,
}

impl EmergencyRecord {
    pub fn completed_steps(&self) -> usize {
        self.instructions.iter().filter(|s| s.completed).count()
    }

    pub fn all_steps_completed(&self) -> bool {
        !self.instructions.is_empty() && self.instructions.iter().all(|s| s.completed)
    }

    pub fn find_step(&self, step_number: i64) -> Option<&InstructionStep> {
        self.instructions.iter().find(|s| s.step_number == step_number)
    }

    /// Step numbers must be 1..N with no gaps.
    pub fn instructions_contiguous(&self) -> bool {
        self.instructions
            .iter()
            .enumerate()
            .all(|(i, s)| s.step_number == i as i64 + 1)
    }
}

impl NotificationRecord {
    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable() && self.retry_count < MAX_RETRY_COUNT
    }
}

/// Human-readable duration for resolution summaries ("3 minutes 20 seconds").
pub fn format_duration(secs: i64) -> String {
    format!("{} minutes {} seconds", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn step(n: i64, completed: bool) -> InstructionStep {
        InstructionStep {
            step_number: n,
            title: format!("Step {n}"),
            description: "Do the thing".into(),
            estimated_secs: 30,
            priority: StepPriority::High,
            safety_note: None,
            completed,
            completed_at: completed.then(ts),
            ai_generated: true,
        }
    }

    fn record_with_steps(steps: Vec<InstructionStep>) -> EmergencyRecord {
        EmergencyRecord {
            id: Uuid::new_v4(),
            user_id: "user-1".into(),
            category: EmergencyCategory::Fire,
            severity: RiskLevel::High,
            status: EmergencyStatus::Active,
            version: 1,
            location: None,
            ai_analysis: ClassificationSummary {
                confidence_score: 0.92,
                detected_subtype: "building_fire".into(),
                risk_assessment: RiskLevel::High,
                reasoning: "Open flames reported".into(),
                captured_at: ts(),
            },
            instructions: steps,
            notifications: vec![],
            resolved_at: None,
            resolution_notes: None,
            response_time_secs: None,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    #[test]
    fn all_steps_completed_requires_every_step() {
        let record = record_with_steps(vec![step(1, true), step(2, false)]);
        assert!(!record.all_steps_completed());
        assert_eq!(record.completed_steps(), 1);

        let record = record_with_steps(vec![step(1, true), step(2, true)]);
        assert!(record.all_steps_completed());
    }

    #[test]
    fn all_steps_completed_false_for_empty_list() {
        let record = record_with_steps(vec![]);
        assert!(!record.all_steps_completed());
    }

    #[test]
    fn find_step_by_number() {
        let record = record_with_steps(vec![step(1, false), step(2, false)]);
        assert!(record.find_step(2).is_some());
        assert!(record.find_step(5).is_none());
    }

    #[test]
    fn contiguous_step_numbers() {
        let record = record_with_steps(vec![step(1, false), step(2, false), step(3, false)]);
        assert!(record.instructions_contiguous());

        let record = record_with_steps(vec![step(1, false), step(3, false)]);
        assert!(!record.instructions_contiguous());
    }

    #[test]
    fn retryable_notification_bounds() {
        let mut n = NotificationRecord {
            id: Uuid::new_v4(),
            contact_id: None,
            method: NotificationMethod::Sms,
            sent_at: ts(),
            status: DeliveryStatus::Failed,
            provider: "simulation".into(),
            message_id: "m1".into(),
            retry_count: 0,
            device_token: None,
            position: 0,
        };
        assert!(n.is_retryable());

        n.retry_count = MAX_RETRY_COUNT;
        assert!(!n.is_retryable());

        n.retry_count = 0;
        n.status = DeliveryStatus::Delivered;
        assert!(!n.is_retryable());
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(0), "0 minutes 0 seconds");
        assert_eq!(format_duration(59), "0 minutes 59 seconds");
        assert_eq!(format_duration(200), "3 minutes 20 seconds");
    }
}
