use serde::{Deserialize, Serialize};

use crate::models::enums::{EmergencyCategory, RiskLevel, StepPriority};

/// Structured classification of a free-text emergency report.
/// Produced once per intake call; immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: EmergencyCategory,
    pub detected_subtype: String,
    /// Provider-reported certainty in [0, 1].
    pub confidence_score: f64,
    pub risk_assessment: RiskLevel,
    pub reasoning: String,
    pub immediate_actions: Vec<String>,
}

/// One actionable guidance step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceStep {
    pub step_number: i64,
    pub title: String,
    pub description: String,
    pub estimated_secs: i64,
    pub priority: StepPriority,
    pub safety_note: Option<String>,
}

/// Ordered guidance produced for one emergency, plus surrounding advice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceBundle {
    pub category: EmergencyCategory,
    pub detected_subtype: String,
    pub steps: Vec<GuidanceStep>,
    pub services_contact: String,
    pub precautions: Vec<String>,
    pub monitoring: String,
    pub knowledge_base_used: bool,
    /// Standard procedures that seeded the generation prompt.
    pub standard_procedures: Vec<String>,
}

impl GuidanceBundle {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
