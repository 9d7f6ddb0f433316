//! LLM request/response envelope (spec.md §6).
//!
//! A `contents`/`parts` document with an optional `tools` array of
//! `functionDeclarations`, and a response walked as
//! `candidates[0].content.parts[0]`. This shape (not the OpenAI
//! `choices[0].message.tool_calls` shape the teacher's
//! `agent/src/llm/client.rs` uses against Groq) is what spec.md §6
//! specifies verbatim, so the envelope here is hand-rolled to match it
//! exactly rather than reused from the teacher's client.

use crate::types::LlmReply;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("response had no candidates")]
    NoCandidates,
    #[error("candidate had no content parts")]
    NoParts,
    #[error("malformed function call: {0}")]
    MalformedFunctionCall(String),
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ToolDeclaration {
    #[serde(rename = "functionDeclarations")]
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
pub struct LlmRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDeclaration>>,
}

impl LlmRequest {
    pub fn text_prompt(prompt: impl Into<String>) -> Self {
        LlmRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt.into() }],
            }],
            tools: None,
        }
    }

    pub fn with_tools(mut self, declarations: Vec<FunctionDeclaration>) -> Self {
        self.tools = Some(vec![ToolDeclaration {
            function_declarations: declarations,
        }]);
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    candidates: Option<Vec<RawCandidate>>,
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    content: Option<RawContent>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    parts: Option<Vec<RawPart>>,
}

#[derive(Debug, Deserialize)]
struct RawPart {
    text: Option<String>,
    #[serde(rename = "functionCall")]
    function_call: Option<RawFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct RawFunctionCall {
    name: String,
    args: Value,
}

/// Parses `candidates[0].content.parts[0]` into an `LlmReply`: a
/// `functionCall` field yields `ToolCall`, otherwise `text` yields
/// `Text` (spec.md §6).
pub fn parse_reply(body: &str) -> Result<LlmReply, EnvelopeError> {
    let raw: RawResponse =
        serde_json::from_str(body).map_err(|e| EnvelopeError::MalformedFunctionCall(e.to_string()))?;

    let candidate = raw
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or(EnvelopeError::NoCandidates)?;
    let part = candidate
        .content
        .and_then(|c| c.parts)
        .and_then(|p| p.into_iter().next())
        .ok_or(EnvelopeError::NoParts)?;

    if let Some(call) = part.function_call {
        return Ok(LlmReply::ToolCall {
            name: call.name,
            arguments: call.args,
        });
    }

    Ok(LlmReply::Text(part.text.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_reply() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"hello there"}]}}]}"#;
        match parse_reply(body).unwrap() {
            LlmReply::Text(t) => assert_eq!(t, "hello there"),
            _ => panic!("expected text reply"),
        }
    }

    #[test]
    fn parses_function_call_reply() {
        let body = r#"{"candidates":[{"content":{"parts":[
            {"functionCall":{"name":"get_temperature","args":{}}}
        ]}}]}"#;
        match parse_reply(body).unwrap() {
            LlmReply::ToolCall { name, .. } => assert_eq!(name, "get_temperature"),
            _ => panic!("expected tool call reply"),
        }
    }

    #[test]
    fn missing_candidates_is_an_error() {
        let body = r#"{"candidates":[]}"#;
        assert!(matches!(parse_reply(body), Err(EnvelopeError::NoCandidates)));
    }

    #[test]
    fn request_serializes_contents_and_tools() {
        let req = LlmRequest::text_prompt("what time is it").with_tools(vec![FunctionDeclaration {
            name: "get_time".to_string(),
            description: "returns the time".to_string(),
            parameters: None,
        }]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "what time is it");
        assert_eq!(json["tools"][0]["functionDeclarations"][0]["name"], "get_time");
    }
}
