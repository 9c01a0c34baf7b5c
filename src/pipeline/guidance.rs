use super::gate::fallback_guidance;
use super::knowledge;
use super::parser::parse_guidance;
use super::prompt::{guidance_prompt, GUIDANCE_SYSTEM};
use super::provider::ModelClient;
use super::types::GuidanceBundle;
use super::ProviderError;
use crate::models::enums::EmergencyCategory;

/// Generate step-by-step guidance for a classified emergency.
///
/// Retrieval first: the (category, subtype) knowledge-base lookup is pure
/// and infallible; absence only means the prompt runs unseeded. A provider
/// response with zero steps is patched with the single-step safe default —
/// guidance is never empty.
pub async fn generate(
    model: &ModelClient,
    category: EmergencyCategory,
    subtype: &str,
    user_context: Option<&str>,
) -> Result<GuidanceBundle, ProviderError> {
    let procedures: Vec<String> = knowledge::lookup(category, subtype)
        .iter()
        .map(|s| s.to_string())
        .collect();

    let prompt = guidance_prompt(category, subtype, &procedures, user_context);
    let response = model.generate(GUIDANCE_SYSTEM, &prompt).await?;
    let mut bundle = parse_guidance(&response, category, subtype)?;

    if bundle.is_empty() {
        tracing::warn!(
            category = category.as_str(),
            subtype,
            "Provider returned zero guidance steps, substituting default step"
        );
        bundle.steps = fallback_guidance().steps;
    }

    bundle.knowledge_base_used = !procedures.is_empty();
    bundle.standard_procedures = procedures;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::provider::MockModelClient;

    const VALID_RESPONSE: &str = r#"{
        "emergencyType": "fire",
        "detectedEmergencyType": "building_fire",
        "steps": [
            {"stepNumber": 1, "title": "Evacuate", "description": "Leave now", "estimatedTime": 60, "priority": "critical"}
        ],
        "emergencyServicesContact": "Call 911 once safe",
        "precautions": ["Stay low"],
        "monitoringInstructions": "Watch for smoke"
    }"#;

    #[tokio::test]
    async fn generates_bundle_with_knowledge_base() {
        let model = ModelClient::Mock(MockModelClient::with_response(VALID_RESPONSE));
        let bundle = generate(&model, EmergencyCategory::Fire, "building_fire", None)
            .await
            .unwrap();
        assert!(bundle.knowledge_base_used);
        assert!(!bundle.standard_procedures.is_empty());
        assert_eq!(bundle.steps.len(), 1);
    }

    #[tokio::test]
    async fn unknown_subtype_generates_unseeded() {
        let model = ModelClient::Mock(MockModelClient::with_response(VALID_RESPONSE));
        let bundle = generate(&model, EmergencyCategory::Fire, "wildfire", None)
            .await
            .unwrap();
        assert!(!bundle.knowledge_base_used);
        assert!(bundle.standard_procedures.is_empty());
    }

    #[tokio::test]
    async fn zero_steps_substitutes_default() {
        let model = ModelClient::Mock(MockModelClient::with_response(r#"{"steps": []}"#));
        let bundle = generate(&model, EmergencyCategory::Medical, "heart_attack", None)
            .await
            .unwrap();
        assert_eq!(bundle.steps.len(), 1);
        assert_eq!(bundle.steps[0].title, "Call Emergency Services");
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let mock = MockModelClient::new();
        mock.push_err(ProviderError::UpstreamUnavailable("down".into()));
        let model = ModelClient::Mock(mock);
        let err = generate(&model, EmergencyCategory::Fire, "building_fire", None)
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
