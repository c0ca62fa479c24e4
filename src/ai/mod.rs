//! AI gateway for remark refinement and project list extraction.
//!
//! The [`AiGateway`] trait is the only thing the rest of the crate sees.
//! [`GeminiGateway`] implements it against the Gemini `generateContent`
//! REST endpoint.

use crate::models::ParsedProjectEntry;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

/// Gemini API base URL
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Remarks sent for refinement when the reviewer left the field empty
pub const EMPTY_REMARKS: &str = "No initial remarks provided.";

const DISABLED_MESSAGE: &str =
    "AI features are disabled. Please set the KEYSTONE_API_KEY environment variable.";

const REFINE_FAILED_MESSAGE: &str =
    "An error occurred while fetching AI suggestions. Run with KS_LOG=debug for details.";

/// Remote text capabilities used by review and import commands.
pub trait AiGateway {
    /// Rewrite reviewer remarks into fuller feedback.
    ///
    /// Never fails: when the gateway is unusable the returned text is a
    /// human-readable placeholder instead.
    fn refine_remarks(&self, remarks: &str) -> String;

    /// Extract one entry per student row from pasted text.
    fn extract_entries(&self, raw_text: &str) -> crate::Result<Vec<ParsedProjectEntry>>;
}

/// Errors that can occur while talking to the model.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No API key configured
    #[error("AI features are disabled. Please set the KEYSTONE_API_KEY environment variable.")]
    MissingCredentials,

    /// Network or HTTP status error
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Response body or model output was not the expected JSON
    #[error("Failed to parse the response from the AI. The format was invalid: {0}")]
    Parse(String),

    /// Model output parsed but was not a list
    #[error("AI response was not a JSON array.")]
    NotAnArray,
}

impl From<GatewayError> for crate::Error {
    fn from(e: GatewayError) -> Self {
        crate::Error::Extraction(e.to_string())
    }
}

/// Gemini-backed gateway.
pub struct GeminiGateway {
    api_key: Option<String>,
    model: String,
    base_url: String,
    agent: ureq::Agent,
}

impl GeminiGateway {
    pub fn new(api_key: Option<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            agent,
        }
    }

    /// Point the gateway at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, body: Value) -> Result<String, GatewayError> {
        let key = self.api_key.as_deref().ok_or(GatewayError::MissingCredentials)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .agent
            .post(&url)
            .query("key", key)
            .set("Content-Type", "application/json")
            .send_json(body);

        match response {
            Ok(resp) => {
                let parsed: GenerateResponse = resp
                    .into_json()
                    .map_err(|e| GatewayError::Parse(e.to_string()))?;
                parsed
                    .text()
                    .ok_or_else(|| GatewayError::Parse("response contained no text".to_string()))
            }
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(GatewayError::Http(format!("HTTP {}: {}", code, body)))
            }
            Err(e) => Err(GatewayError::Http(e.to_string())),
        }
    }
}

impl AiGateway for GeminiGateway {
    fn refine_remarks(&self, remarks: &str) -> String {
        if !self.is_enabled() {
            return DISABLED_MESSAGE.to_string();
        }

        let body = json!({
            "contents": [{ "parts": [{ "text": refine_prompt(remarks) }] }],
        });
        match self.generate(body) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "error fetching AI feedback");
                REFINE_FAILED_MESSAGE.to_string()
            }
        }
    }

    fn extract_entries(&self, raw_text: &str) -> crate::Result<Vec<ParsedProjectEntry>> {
        let body = json!({
            "contents": [{ "parts": [{ "text": extract_prompt(raw_text) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": entry_schema(),
            },
        });
        let text = self.generate(body).inspect_err(|e| {
            tracing::error!(error = %e, "error parsing project list with AI");
        })?;
        Ok(parse_entries(&text)?)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Parse model output into entries. The output must be a JSON array.
pub fn parse_entries(text: &str) -> Result<Vec<ParsedProjectEntry>, GatewayError> {
    let value: Value =
        serde_json::from_str(text.trim()).map_err(|e| GatewayError::Parse(e.to_string()))?;
    if !value.is_array() {
        return Err(GatewayError::NotAnArray);
    }
    serde_json::from_value(value).map_err(|e| GatewayError::Parse(e.to_string()))
}

fn refine_prompt(remarks: &str) -> String {
    let remarks = if remarks.trim().is_empty() {
        EMPTY_REMARKS
    } else {
        remarks
    };
    format!(
        r#"You are an expert project reviewer for final year computer engineering students.
A fellow reviewer has written some initial remarks for a student's project.
Your task is to refine and expand upon these remarks to provide more comprehensive, constructive, and encouraging feedback.
Maintain a professional and supportive tone.

Initial Remarks from reviewer: "{}"

Generate improved feedback below:"#,
        remarks
    )
}

fn extract_prompt(raw_text: &str) -> String {
    format!(
        r#"Parse the following text, which contains a list of final year engineering project groups.
Extract the information for each student entry into a structured JSON array.
Each entry in the text represents one student. Group students together based on their 'Project Grp No.'.
The 'Domain of Project' should be treated as the project's title.

Identify the following fields for each student row:
- grpNo: The project group number (e.g., "P1", "P2").
- studentName: The full name of the student.
- projectDomain: The domain or title of the project. This will be the same for all students in a group.
- guide: The name of the main guide for the project. This will be the same for all students in a group.
- coGuide: The name of the co-guide for the project. This will be the same for all students in a group.

Here is the text to parse:
---
{}
---"#,
        raw_text
    )
}

fn entry_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "grpNo": { "type": "STRING" },
                "studentName": { "type": "STRING" },
                "projectDomain": { "type": "STRING" },
                "guide": { "type": "STRING" },
                "coGuide": { "type": "STRING" },
            },
            "required": ["grpNo", "studentName", "projectDomain", "guide", "coGuide"],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled() -> GeminiGateway {
        GeminiGateway::new(None, DEFAULT_MODEL, Duration::from_secs(1))
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let gateway = GeminiGateway::new(Some(String::new()), DEFAULT_MODEL, Duration::from_secs(1));
        assert!(!gateway.is_enabled());
    }

    #[test]
    fn test_refine_without_key_returns_placeholder() {
        let text = disabled().refine_remarks("Good work");
        assert!(text.contains("AI features are disabled"));
    }

    #[test]
    fn test_extract_without_key_is_extraction_error() {
        let err = disabled().extract_entries("P1 Ann IoT").unwrap_err();
        assert!(matches!(err, crate::Error::Extraction(ref m) if m.contains("disabled")));
    }

    #[test]
    fn test_refine_transport_failure_returns_placeholder() {
        let gateway = GeminiGateway::new(Some("k".into()), DEFAULT_MODEL, Duration::from_secs(1))
            .with_base_url("http://127.0.0.1:9");
        let text = gateway.refine_remarks("Good work");
        assert_eq!(text, REFINE_FAILED_MESSAGE);
    }

    #[test]
    fn test_parse_entries_array() {
        let text = r#"
            [
              {"grpNo": "P1", "studentName": "Ann", "projectDomain": "IoT", "guide": "Rao", "coGuide": ""},
              {"grpNo": "P1", "studentName": "Bob", "projectDomain": "IoT", "guide": "Rao", "coGuide": ""}
            ]
        "#;
        let entries = parse_entries(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].student_name, "Bob");
        assert_eq!(entries[0].grp_no, "P1");
    }

    #[test]
    fn test_parse_entries_rejects_object() {
        let err = parse_entries(r#"{"grpNo": "P1"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::NotAnArray));
    }

    #[test]
    fn test_parse_entries_rejects_non_json() {
        let err = parse_entries("Sure! Here are the groups:").unwrap_err();
        assert!(matches!(err, GatewayError::Parse(_)));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "[" }, { "text": "]" }] } }]
        }))
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("[]"));

        let empty: GenerateResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn test_refine_prompt_defaults_empty_remarks() {
        assert!(refine_prompt("  ").contains(EMPTY_REMARKS));
        assert!(refine_prompt("Needs work").contains("\"Needs work\""));
    }
}
