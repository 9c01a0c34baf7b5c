use crate::models::enums::EmergencyCategory;

/// System instruction for the classification call.
pub const CLASSIFICATION_SYSTEM: &str = "You are an emergency response AI specialist. \
Analyze user input to determine the type of emergency and provide appropriate guidance.";

/// System instruction for the guidance call.
pub const GUIDANCE_SYSTEM: &str = "You are an emergency procedures expert. \
Provide step-by-step instructions for emergency situations based on established protocols.";

/// Build the classification prompt. The model must answer with a single JSON
/// object; anything else is rejected by the parser.
pub fn classification_prompt(text: &str) -> String {
    format!(
        r#"Analyze this emergency situation and classify it. Return ONLY a JSON object with this exact structure:
{{
  "emergencyType": "medical|fire|police|natural_disaster|accident|other",
  "detectedEmergencyType": "specific type like heart_attack, building_fire, etc.",
  "confidenceScore": 0.0-1.0,
  "reasoning": "brief explanation of classification",
  "riskAssessment": "low|medium|high|critical",
  "immediateActions": ["array of 2-3 immediate actions"]
}}

User input: "{text}"

Emergency types:
- medical: health emergencies, injuries, medical conditions
- fire: fires, smoke, burns
- police: crimes, safety threats, suspicious activities
- natural_disaster: earthquakes, floods, storms
- accident: car crashes, falls, industrial accidents
- other: anything else

Respond with ONLY the JSON object, no other text."#
    )
}

/// Build the guidance prompt, seeding the model with the knowledge-base
/// procedures retrieved for this (category, subtype) pair.
pub fn guidance_prompt(
    category: EmergencyCategory,
    subtype: &str,
    procedures: &[String],
    user_context: Option<&str>,
) -> String {
    let category = category.as_str();
    let context_line = match user_context {
        Some(ctx) if !ctx.trim().is_empty() => format!("Additional context: {ctx}\n\n"),
        _ => String::new(),
    };

    format!(
        r#"Provide emergency guidance for a {subtype} situation ({category} emergency).

{context_line}Available standard procedures: {procedures}

Generate comprehensive step-by-step instructions including:
1. Immediate life-saving actions
2. Safety precautions for responder
3. When to call emergency services
4. What information to provide to dispatcher
5. Ongoing monitoring instructions

Return ONLY a JSON object with this structure:
{{
  "emergencyType": "{category}",
  "detectedEmergencyType": "{subtype}",
  "steps": [
    {{
      "stepNumber": 1,
      "title": "Clear action title",
      "description": "Detailed instruction",
      "estimatedTime": 30,
      "priority": "critical|high|medium|low",
      "safetyNote": "Important safety warning if any"
    }}
  ],
  "emergencyServicesContact": "When and how to contact emergency services",
  "precautions": ["Array of safety precautions"],
  "monitoringInstructions": "What to monitor while waiting for help"
}}

Respond with ONLY the JSON object, no other text."#,
        procedures = procedures.join(" | "),
    )
}
