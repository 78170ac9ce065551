//! Response normalization.
//!
//! Backends answer in different shapes. Anything that already carries a
//! well-formed `choices` array is passed through, gaining an `id` and
//! `created` only if it lacks them; everything else has its text extracted
//! and wrapped in a synthesized chat completion.

use serde_json::{Map, Value};

use super::ProviderError;
use crate::api_types::{
    ChatCompletionResponse, Choice, ChoiceMessage,
    chat_completion::{default_model, default_object, default_role},
};

/// Convert a provider's raw JSON body into the canonical response shape.
///
/// Text is located by probing, in order: `message` (a string, or an object
/// with a string `content`), `output`, `text`, `choices[0].message.content`.
/// The first non-empty match wins; if nothing matches the content is empty.
pub fn normalize_chat_response(
    provider: &str,
    body: Value,
) -> Result<ChatCompletionResponse, ProviderError> {
    let Value::Object(fields) = body else {
        return Err(ProviderError::InvalidResponse(format!(
            "{provider} returned a non-object JSON body"
        )));
    };

    if fields.get("choices").is_some_and(Value::is_array)
        && let Ok(mut response) =
            serde_json::from_value::<ChatCompletionResponse>(Value::Object(fields.clone()))
    {
        // Compatible bodies may still omit the envelope fields
        if response.id.is_empty() {
            response.id = synthesized_id();
        }
        if !fields.get("created").is_some_and(Value::is_i64) {
            response.created = chrono::Utc::now().timestamp();
        }
        return Ok(response);
    }

    let content = extract_text(&fields).unwrap_or_default();

    let id = fields
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(synthesized_id);
    let created = fields
        .get("created")
        .and_then(Value::as_i64)
        .unwrap_or_else(|| chrono::Utc::now().timestamp());
    let model = fields
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(default_model);

    tracing::debug!(
        provider,
        content_len = content.len(),
        "Normalized non-standard provider response"
    );

    Ok(ChatCompletionResponse {
        id,
        object: default_object(),
        created,
        model,
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: default_role(),
                content: Some(content),
                extra: Map::new(),
            },
            finish_reason: Some("stop".to_string()),
            extra: Map::new(),
        }],
        extra: Map::new(),
    })
}

fn synthesized_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4())
}

fn extract_text(fields: &Map<String, Value>) -> Option<String> {
    let message = fields.get("message").and_then(|message| match message {
        Value::String(text) => Some(text.as_str()),
        Value::Object(inner) => inner.get("content").and_then(Value::as_str),
        _ => None,
    });
    let output = fields.get("output").and_then(Value::as_str);
    let text = fields.get("text").and_then(Value::as_str);
    let choice = fields
        .get("choices")
        .and_then(|choices| choices.pointer("/0/message/content"))
        .and_then(Value::as_str);

    [message, output, text, choice]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.is_empty())
        .map(str::to_string)
}
