use serde::Deserialize;

use super::types::{Classification, GuidanceBundle, GuidanceStep};
use super::ProviderError;
use crate::models::enums::{EmergencyCategory, RiskLevel, StepPriority};

/// Strip Markdown code-fence markers the model sometimes wraps around JSON.
/// This is the only recovery applied to provider output; anything that still
/// fails to parse is rejected, never patched up.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Locate the JSON object within the response text.
fn extract_json_object(text: &str) -> Result<&str, ProviderError> {
    let start = text
        .find('{')
        .ok_or_else(|| ProviderError::MalformedResponse("no JSON object in response".into()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| ProviderError::MalformedResponse("unterminated JSON object".into()))?;
    if end < start {
        return Err(ProviderError::MalformedResponse(
            "unterminated JSON object".into(),
        ));
    }
    Ok(&text[start..=end])
}

/// Parse the classification response. Strict: every field must be present
/// and well-formed — partial classifications are rejected so downstream code
/// never guesses at missing fields.
pub fn parse_classification(response: &str) -> Result<Classification, ProviderError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawClassification {
        emergency_type: String,
        detected_emergency_type: String,
        confidence_score: f64,
        reasoning: String,
        risk_assessment: String,
        immediate_actions: Vec<String>,
    }

    let cleaned = strip_code_fences(response);
    let json = extract_json_object(&cleaned)?;
    let raw: RawClassification = serde_json::from_str(json)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let category: EmergencyCategory = raw
        .emergency_type
        .parse()
        .map_err(|_| ProviderError::MalformedResponse(format!(
            "unknown emergency type: {}",
            raw.emergency_type
        )))?;
    let risk: RiskLevel = raw
        .risk_assessment
        .parse()
        .map_err(|_| ProviderError::MalformedResponse(format!(
            "unknown risk level: {}",
            raw.risk_assessment
        )))?;

    if !(0.0..=1.0).contains(&raw.confidence_score) {
        return Err(ProviderError::MalformedResponse(format!(
            "confidence score out of range: {}",
            raw.confidence_score
        )));
    }

    Ok(Classification {
        category,
        detected_subtype: raw.detected_emergency_type,
        confidence_score: raw.confidence_score,
        risk_assessment: risk,
        reasoning: raw.reasoning,
        immediate_actions: raw.immediate_actions,
    })
}

/// Parse the guidance response into a bundle. Steps are renumbered 1..N
/// regardless of what the model produced; missing per-step fields fall back
/// to conservative defaults. A missing or empty steps array yields an empty
/// bundle — the caller substitutes the safe default.
pub fn parse_guidance(
    response: &str,
    category: EmergencyCategory,
    subtype: &str,
) -> Result<GuidanceBundle, ProviderError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawGuidance {
        #[serde(default)]
        steps: Vec<RawStep>,
        #[serde(default)]
        emergency_services_contact: Option<String>,
        #[serde(default)]
        precautions: Vec<String>,
        #[serde(default)]
        monitoring_instructions: Option<String>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawStep {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        estimated_time: Option<i64>,
        #[serde(default)]
        priority: Option<String>,
        #[serde(default)]
        safety_note: Option<String>,
    }

    let cleaned = strip_code_fences(response);
    let json = extract_json_object(&cleaned)?;
    let raw: RawGuidance = serde_json::from_str(json)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let steps = raw
        .steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| {
            let number = i as i64 + 1;
            GuidanceStep {
                step_number: number,
                title: step
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| format!("Step {number}")),
                description: step
                    .description
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| "Follow instructions carefully".to_string()),
                estimated_secs: step.estimated_time.filter(|t| *t >= 0).unwrap_or(30),
                priority: step
                    .priority
                    .and_then(|p| p.parse::<StepPriority>().ok())
                    .unwrap_or(StepPriority::Medium),
                safety_note: step.safety_note.filter(|n| !n.trim().is_empty()),
            }
        })
        .collect();

    Ok(GuidanceBundle {
        category,
        detected_subtype: subtype.to_string(),
        steps,
        services_contact: raw
            .emergency_services_contact
            .unwrap_or_else(|| "Call your local emergency number (911/112/100)".to_string()),
        precautions: raw.precautions,
        monitoring: raw
            .monitoring_instructions
            .unwrap_or_else(|| "Monitor the situation until help arrives".to_string()),
        knowledge_base_used: false,
        standard_procedures: vec![],
    })
}
