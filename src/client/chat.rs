//! Chat completions: example sentences and tutoring feedback.

use super::{ApiClient, ClientError, ExampleGenerator, ExamplePair, Tutor};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

pub const EXAMPLE_SYSTEM_PROMPT: &str = "You are helping A1/A2 French learners. \
Given a French expression, you will produce exactly one simple, natural French sentence \
using that expression, and its English translation. \
Use present, passé composé, or futur proche only. \
No slang, no complex tenses. \
Respond in strict JSON with keys 'french' and 'english'.";

pub const TUTOR_SYSTEM_PROMPT: &str = "You are a friendly, encouraging French pronunciation tutor.
Compare what the student said with what they were trying to say.
Provide brief, specific, and encouraging feedback.

Guidelines:
- Keep feedback to 2-3 sentences maximum
- Start with something positive if possible
- Point out specific pronunciation differences
- Give a concrete tip for improvement
- Use simple language, avoid technical phonetic terms
- Be warm and encouraging, never critical or harsh
- If they were close, emphasize what they did well

Example good feedback:
\"Good effort! You said 'le shat' but it should be 'le chat'. The 'ch' in French makes a 'sh' sound, like in 'shoe'. Try saying it again with that softer 'sh' sound!\"";

const TUTOR_TEMPERATURE: f32 = 0.7;
const TUTOR_MAX_TOKENS: u32 = 150;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatResponse {
    fn into_content(self) -> Result<String, ClientError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ClientError::Malformed("chat response has no content".into()))
    }
}

/// Decode the model's `{"french": ..., "english": ...}` reply, trimming both
/// fields. Missing fields decode as empty strings. A reply wrapped in a
/// Markdown code fence is unwrapped first.
pub fn parse_example_pair(content: &str) -> Result<ExamplePair, ClientError> {
    let pair: ExamplePair = serde_json::from_str(strip_code_fence(content))?;
    Ok(ExamplePair {
        french: pair.french.trim().to_string(),
        english: pair.english.trim().to_string(),
    })
}

fn strip_code_fence(content: &str) -> &str {
    let content = content.trim();
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    // Drop the info string ("json") up to the end of the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn example_user_prompt(expression: &str) -> String {
    format!("Expression: {expression}\n\nReturn JSON like:\n{{ \"french\": \"…\", \"english\": \"…\" }}")
}

fn tutor_user_prompt(expected: &str, heard: &str) -> String {
    format!(
        "Expected: \"{expected}\"\nStudent said: \"{heard}\"\n\nProvide brief, encouraging pronunciation feedback."
    )
}

impl ExampleGenerator for ApiClient {
    fn generate_example(&self, expression: &str) -> Result<ExamplePair, ClientError> {
        let user = example_user_prompt(expression);
        let payload = json!({
            "model": self.models.examples_model,
            "response_format": { "type": "json_object" },
            "messages": [
                ChatMessage { role: "system", content: EXAMPLE_SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &user },
            ],
        });
        let response: ChatResponse = self.post_json("chat/completions", &payload)?;
        let content = response.into_content()?;
        debug!(expression, content = %content, "example generated");
        parse_example_pair(&content)
    }
}

impl Tutor for ApiClient {
    fn pronunciation_feedback(&self, expected: &str, heard: &str) -> Result<String, ClientError> {
        let user = tutor_user_prompt(expected, heard);
        let payload = json!({
            "model": self.models.tutor_model,
            "temperature": TUTOR_TEMPERATURE,
            "max_tokens": TUTOR_MAX_TOKENS,
            "messages": [
                ChatMessage { role: "system", content: TUTOR_SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &user },
            ],
        });
        let response: ChatResponse = self.post_json("chat/completions", &payload)?;
        Ok(response.into_content()?.trim().to_string())
    }
}
