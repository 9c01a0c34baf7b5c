use super::parser::parse_classification;
use super::prompt::{classification_prompt, CLASSIFICATION_SYSTEM};
use super::provider::ModelClient;
use super::types::Classification;
use super::ProviderError;

/// Classify a free-text emergency report.
///
/// No retries and no fallback here — the orchestrator owns that policy.
/// Malformed provider output is rejected rather than partially accepted.
pub async fn classify(
    model: &ModelClient,
    text: &str,
) -> Result<Classification, ProviderError> {
    if text.trim().is_empty() {
        return Err(ProviderError::EmptyInput);
    }

    let prompt = classification_prompt(text);
    let response = model.generate(CLASSIFICATION_SYSTEM, &prompt).await?;
    let classification = parse_classification(&response)?;

    tracing::debug!(
        category = classification.category.as_str(),
        subtype = %classification.detected_subtype,
        confidence = classification.confidence_score,
        "Classified emergency report"
    );
    Ok(classification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::EmergencyCategory;
    use crate::pipeline::provider::MockModelClient;

    const VALID_RESPONSE: &str = r#"{
        "emergencyType": "medical",
        "detectedEmergencyType": "heart_attack",
        "confidenceScore": 0.88,
        "reasoning": "Chest pain and shortness of breath reported",
        "riskAssessment": "critical",
        "immediateActions": ["Call 911", "Help them sit down"]
    }"#;

    #[tokio::test]
    async fn classifies_valid_response() {
        let model = ModelClient::Mock(MockModelClient::with_response(VALID_RESPONSE));
        let c = classify(&model, "severe chest pain, can't breathe").await.unwrap();
        assert_eq!(c.category, EmergencyCategory::Medical);
        assert_eq!(c.detected_subtype, "heart_attack");
    }

    #[tokio::test]
    async fn empty_text_rejected_before_any_call() {
        let model = ModelClient::Mock(MockModelClient::new());
        let err = classify(&model, "   ").await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyInput));
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let mock = MockModelClient::new();
        mock.push_err(ProviderError::UpstreamUnavailable("timeout".into()));
        let model = ModelClient::Mock(mock);
        let err = classify(&model, "help").await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn malformed_response_propagates() {
        let model = ModelClient::Mock(MockModelClient::with_response("not json at all"));
        let err = classify(&model, "help").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}
