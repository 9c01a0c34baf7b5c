//! Confidence gate: decides whether AI output can drive instructions and
//! contact notification, or whether the fixed safe default must stand in.

use chrono::Utc;

use super::types::{Classification, GuidanceBundle, GuidanceStep};
use crate::models::enums::{EmergencyCategory, RiskLevel, StepPriority};
use crate::models::emergency::ClassificationSummary;

/// Below this, generated guidance is not trusted.
pub const CONFIDENCE_THRESHOLD: f64 = 0.70;

/// Subtype label used whenever the classification is not trusted.
pub const FALLBACK_SUBTYPE: &str = "emergency";

/// Outcome of gating one intake analysis.
#[derive(Debug, Clone)]
pub struct GatedAnalysis {
    pub category: EmergencyCategory,
    pub detected_subtype: String,
    pub guidance: GuidanceBundle,
    /// True when the safe default replaced generated output.
    pub used_fallback: bool,
}

/// Classification used when the provider is unavailable or untrusted.
pub fn fallback_classification() -> Classification {
    Classification {
        category: EmergencyCategory::Other,
        detected_subtype: FALLBACK_SUBTYPE.to_string(),
        confidence_score: 0.5,
        risk_assessment: RiskLevel::Medium,
        reasoning: "AI analysis unavailable".to_string(),
        immediate_actions: vec![
            "Call emergency services".to_string(),
            "Ensure personal safety".to_string(),
        ],
    }
}

/// The fixed safe-default guidance: call emergency services, stay calm,
/// wait for help. Never generated, never empty.
pub fn fallback_guidance() -> GuidanceBundle {
    GuidanceBundle {
        category: EmergencyCategory::Other,
        detected_subtype: FALLBACK_SUBTYPE.to_string(),
        steps: vec![GuidanceStep {
            step_number: 1,
            title: "Call Emergency Services".to_string(),
            description: "Dial local emergency number (911/112/100)".to_string(),
            estimated_secs: 30,
            priority: StepPriority::Critical,
            safety_note: Some("Provide clear location and situation details".to_string()),
        }],
        services_contact: "Dial your local emergency number immediately".to_string(),
        precautions: vec![
            "Stay calm".to_string(),
            "Ensure personal safety first".to_string(),
        ],
        monitoring: "Wait for professional help to arrive".to_string(),
        knowledge_base_used: false,
        standard_procedures: vec![],
    }
}

/// Apply the gate. Pure: no I/O, no clock beyond what the caller passes in
/// via the classification itself.
///
/// Low confidence forces category `other` / subtype "emergency" and swaps in
/// the safe default so an uncertain guess can neither produce dangerous
/// instructions nor alert contacts under the wrong pretext. An empty bundle
/// is replaced regardless of confidence.
pub fn gate(classification: &Classification, guidance: GuidanceBundle) -> GatedAnalysis {
    if classification.confidence_score < CONFIDENCE_THRESHOLD {
        tracing::warn!(
            confidence = classification.confidence_score,
            "Low classification confidence, substituting safe default guidance"
        );
        return GatedAnalysis {
            category: EmergencyCategory::Other,
            detected_subtype: FALLBACK_SUBTYPE.to_string(),
            guidance: fallback_guidance(),
            used_fallback: true,
        };
    }

    if guidance.is_empty() {
        tracing::warn!("Generated guidance was empty, substituting safe default");
        return GatedAnalysis {
            category: classification.category,
            detected_subtype: classification.detected_subtype.clone(),
            guidance: fallback_guidance(),
            used_fallback: true,
        };
    }

    GatedAnalysis {
        category: classification.category,
        detected_subtype: classification.detected_subtype.clone(),
        guidance,
        used_fallback: false,
    }
}

/// Snapshot a classification for persistence on the emergency record.
pub fn summarize(classification: &Classification) -> ClassificationSummary {
    ClassificationSummary {
        confidence_score: classification.confidence_score,
        detected_subtype: classification.detected_subtype.clone(),
        risk_assessment: classification.risk_assessment,
        reasoning: classification.reasoning.clone(),
        captured_at: Utc::now().naive_utc(),
    }
}
