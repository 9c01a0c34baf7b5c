//! Intake orchestration: classification → knowledge-seeded guidance →
//! confidence gate. Designed to always produce a usable analysis — provider
//! failures degrade to the safe default instead of failing the caller, who
//! is in the middle of a real emergency.

use super::classify::classify;
use super::gate::{fallback_classification, fallback_guidance, gate, GatedAnalysis};
use super::guidance::generate;
use super::provider::ModelClient;
use super::types::Classification;

/// Full analysis result for one intake call.
#[derive(Debug, Clone)]
pub struct IntakeAnalysis {
    pub classification: Classification,
    pub gated: GatedAnalysis,
}

impl IntakeAnalysis {
    fn from_fallback() -> Self {
        let classification = fallback_classification();
        Self {
            gated: GatedAnalysis {
                category: classification.category,
                detected_subtype: classification.detected_subtype.clone(),
                guidance: fallback_guidance(),
                used_fallback: true,
            },
            classification,
        }
    }
}

/// Analyze a free-text emergency report. Never fails: every provider
/// failure mode collapses into the safe-default analysis.
pub async fn analyze(
    model: &ModelClient,
    text: &str,
    user_context: Option<&str>,
) -> IntakeAnalysis {
    let classification = match classify(model, text).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "Classification failed, using safe default analysis");
            return IntakeAnalysis::from_fallback();
        }
    };

    let (guidance, guidance_failed) = match generate(
        model,
        classification.category,
        &classification.detected_subtype,
        user_context,
    )
    .await
    {
        Ok(bundle) => (bundle, false),
        Err(e) => {
            tracing::warn!(error = %e, "Guidance generation failed, using safe default bundle");
            (fallback_guidance(), true)
        }
    };

    // The gate still enforces the confidence threshold on the classification
    // even when guidance already fell back.
    let mut gated = gate(&classification, guidance);
    if guidance_failed {
        gated.used_fallback = true;
    }
    IntakeAnalysis {
        classification,
        gated,
    }
}
