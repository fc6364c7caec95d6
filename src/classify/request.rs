//! Builds the single prompt + output contract sent to the collaborator.

use crate::ingest::LogRecord;
use serde_json::{json, Value};

const ANALYST_INSTRUCTION: &str = "You are a cybersecurity expert specializing in login anomaly \
detection. Analyze login logs and identify suspicious patterns.";

/// Anomaly categories the collaborator is asked to look for.
pub const ANOMALY_CATEGORIES: &[&str] = &[
    "Unusual login times (late night/early morning)",
    "New or unrecognized IP addresses",
    "Login attempts from unexpected geographic locations",
    "Multiple failed login attempts (brute force indicators)",
    "Credential stuffing patterns",
    "Unusual device/browser combinations",
];

const OUTPUT_SHAPE: &str = r#"{
    "overall_risk_score": "LOW|MEDIUM|HIGH",
    "risk_summary": "Brief summary of findings",
    "log_analysis": [
        {
            "log_index": 0,
            "risk_level": "LOW|MEDIUM|HIGH",
            "risk_factors": ["factor1", "factor2"],
            "explanation": "Detailed explanation of why this is risky"
        }
    ],
    "recommendations": ["recommendation1", "recommendation2"]
}"#;

/// One self-contained request to the classification collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRequest {
    pub system_instruction: String,
    pub prompt: String,
    /// Structured-output contract. `None` for free-text exchanges.
    pub response_schema: Option<Value>,
}

impl ClassificationRequest {
    /// Build the analysis request for a normalized batch. Records appear in
    /// index order so `log_index` in the answer lines up with our positions.
    pub fn for_records(records: &[LogRecord]) -> Self {
        let records_json = serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());

        let mut prompt = String::new();
        prompt.push_str("Analyze these login logs for security anomalies and suspicious patterns.\n");
        prompt.push_str("Each entry's log_index is its zero-based position in this list.\n\n");
        prompt.push_str(&records_json);
        prompt.push_str("\n\nPlease provide a detailed analysis covering:\n\n");
        prompt.push_str("1. Risk Assessment: Categorize each log entry as LOW, MEDIUM, or HIGH risk\n");
        prompt.push_str("2. Anomaly Detection: Identify patterns like:\n");
        for category in ANOMALY_CATEGORIES {
            prompt.push_str("   - ");
            prompt.push_str(category);
            prompt.push('\n');
        }
        prompt.push_str("3. Overall Risk Summary: Provide a general assessment of the security posture\n");
        prompt.push_str("4. Recommendations: Suggest specific actions to mitigate identified risks\n\n");
        prompt.push_str("Respond in the following JSON format:\n");
        prompt.push_str(OUTPUT_SHAPE);
        prompt.push('\n');

        Self {
            system_instruction: ANALYST_INSTRUCTION.to_string(),
            prompt,
            response_schema: Some(response_schema()),
        }
    }

    /// Minimal exchange used to verify reachability and credentials.
    pub fn connectivity_check() -> Self {
        Self {
            system_instruction: "You are a helpful assistant.".to_string(),
            prompt: "Say 'Classifier is working correctly!' and nothing else.".to_string(),
            response_schema: None,
        }
    }
}

/// JSON schema (OpenAPI subset, as accepted by Gemini `responseSchema`) for
/// the expected result.
pub fn response_schema() -> Value {
    let level = json!({ "type": "STRING", "enum": ["LOW", "MEDIUM", "HIGH"] });
    json!({
        "type": "OBJECT",
        "properties": {
            "overall_risk_score": level,
            "risk_summary": { "type": "STRING" },
            "log_analysis": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "log_index": { "type": "INTEGER" },
                        "risk_level": level,
                        "risk_factors": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "explanation": { "type": "STRING" }
                    },
                    "required": ["log_index", "risk_level", "risk_factors", "explanation"]
                }
            },
            "recommendations": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["overall_risk_score", "risk_summary", "log_analysis", "recommendations"]
    })
}
