//! Alert message templates for contact notifications.

use crate::models::emergency::EmergencyRecord;

/// Default SMS alert for a freshly created emergency.
pub fn alert_sms(record: &EmergencyRecord) -> String {
    format!(
        "EMERGENCY ALERT: A {} emergency has been reported by someone who lists you \
         as a trusted contact. Severity: {}. Location: {}. Please check on them immediately.",
        record.category.as_str(),
        record.severity.as_str().to_uppercase(),
        location_label(record),
    )
}

/// Default push title/body for a freshly created emergency.
pub fn alert_push(record: &EmergencyRecord) -> (String, String) {
    (
        "Emergency Alert".to_string(),
        format!(
            "A {} emergency is in progress. Location: {}. Severity: {}",
            record.category.as_str(),
            location_label(record),
            record.severity.as_str().to_uppercase(),
        ),
    )
}

/// SMS text for a retried notification.
pub fn retry_sms(record: &EmergencyRecord) -> String {
    format!(
        "EMERGENCY ALERT (retry): The {} emergency is still ongoing. \
         Please respond immediately.",
        record.category.as_str(),
    )
}

/// Push title/body for a retried notification.
pub fn retry_push() -> (String, String) {
    (
        "Emergency Alert - Please Respond".to_string(),
        "This is a retry notification for an ongoing emergency.".to_string(),
    )
}

/// Structured payload attached to push notifications.
pub fn push_data(record: &EmergencyRecord) -> serde_json::Value {
    serde_json::json!({
        "emergencyType": record.category.as_str(),
        "emergencyId": record.id.to_string(),
        "severity": record.severity.as_str(),
        "userId": record.user_id,
    })
}

fn location_label(record: &EmergencyRecord) -> String {
    record
        .location
        .as_ref()
        .and_then(|l| l.city.clone())
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| "Unknown location".to_string())
}
