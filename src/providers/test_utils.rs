//! Test utilities for provider and router testing.
//!
//! - [`SequentialResponder`]: a wiremock responder that plays back a list of
//!   responses and counts calls
//! - [`ScriptedProvider`]: an in-process [`Provider`] with scripted outcomes,
//!   for router tests that don't need HTTP
//!
//! # Example
//!
//! ```ignore
//! let mock_server = MockServer::start().await;
//! let responder = SequentialResponder::fail_then_succeed(2, chat_completion_response("ok"));
//! mount_chat_completions(&mock_server, responder.clone()).await;
//!
//! // ... test logic
//! assert_eq!(responder.call_count(), 3);
//! ```

// Not every helper is used by every test module.
#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    },
    time::Duration,
};

use async_trait::async_trait;
use http::StatusCode;
use parking_lot::Mutex;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use super::{Provider, ProviderError, response::normalize_chat_response};
use crate::{
    api_types::{ChatCompletionResponse, ChatRequest},
    config::ProviderType,
};

/// A complete OpenAI-style chat completion body.
pub fn chat_completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

pub fn chat_completion_response(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/json")
        .set_body_json(chat_completion_body(content))
}

pub fn server_error_response() -> ResponseTemplate {
    ResponseTemplate::new(500)
        .insert_header("content-type", "application/json")
        .set_body_json(json!({
            "error": {
                "type": "server_error",
                "message": "Internal server error. Please try again later.",
                "code": "internal_error"
            }
        }))
}

/// Mount `responder` on `POST /chat/completions`.
pub async fn mount_chat_completions(server: &MockServer, responder: SequentialResponder) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(responder)
        .mount(server)
        .await;
}

/// Internal state for SequentialResponder, wrapped in Arc for sharing.
struct SequentialResponderState {
    responses: Vec<ResponseTemplate>,
    call_count: AtomicUsize,
}

/// A wiremock responder that returns different responses on successive calls.
///
/// This type is Clone and can be shared to track call counts after mounting.
#[derive(Clone)]
pub struct SequentialResponder {
    state: Arc<SequentialResponderState>,
}

impl SequentialResponder {
    /// Each call returns the next response in order. After exhausting the
    /// list, it repeats the last response.
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(
            !responses.is_empty(),
            "SequentialResponder requires at least one response"
        );
        Self {
            state: Arc::new(SequentialResponderState {
                responses,
                call_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Fail `fail_count` times with a 500 error, then return `success_response`.
    pub fn fail_then_succeed(fail_count: usize, success_response: ResponseTemplate) -> Self {
        let mut responses = Vec::with_capacity(fail_count + 1);
        for _ in 0..fail_count {
            responses.push(server_error_response());
        }
        responses.push(success_response);
        Self::new(responses)
    }

    pub fn always_fail() -> Self {
        Self::new(vec![server_error_response()])
    }

    pub fn always_succeed(content: &str) -> Self {
        Self::new(vec![chat_completion_response(content)])
    }

    /// Respond successfully but only after `delay`, longer than any attempt
    /// timeout a test configures.
    pub fn always_hang(delay: Duration) -> Self {
        Self::new(vec![chat_completion_response("too late").set_delay(delay)])
    }

    /// Get the number of times this responder has been called.
    pub fn call_count(&self) -> usize {
        self.state.call_count.load(AtomicOrdering::SeqCst)
    }
}

impl wiremock::Respond for SequentialResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let count = self.state.call_count.fetch_add(1, AtomicOrdering::SeqCst);
        let idx = count.min(self.state.responses.len() - 1);
        self.state.responses[idx].clone()
    }
}

/// One scripted outcome for [`ScriptedProvider`].
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Succeed with a normalized `{"text": ...}` body.
    Ok(String),
    Timeout,
    ServerError,
    MissingCredential,
    /// Never complete; only cancellation ends the attempt.
    Hang,
}

/// In-process provider that plays back scripted outcomes and counts calls.
///
/// After the script is exhausted the last outcome repeats.
#[derive(Clone)]
pub struct ScriptedProvider {
    name: String,
    script: Arc<Mutex<VecDeque<Outcome>>>,
    calls: Arc<AtomicUsize>,
    call_times: Arc<Mutex<Vec<tokio::time::Instant>>>,
}

impl ScriptedProvider {
    pub fn new(name: &str, script: impl IntoIterator<Item = Outcome>) -> Self {
        let script: VecDeque<_> = script.into_iter().collect();
        assert!(!script.is_empty(), "ScriptedProvider requires an outcome");
        Self {
            name: name.to_string(),
            script: Arc::new(Mutex::new(script)),
            calls: Arc::new(AtomicUsize::new(0)),
            call_times: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always(name: &str, outcome: Outcome) -> Self {
        Self::new(name, [outcome])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Gaps between consecutive calls, in milliseconds.
    pub fn call_gaps_ms(&self) -> Vec<u128> {
        self.call_times
            .lock()
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_millis())
            .collect()
    }

    fn next_outcome(&self) -> Outcome {
        let mut script = self.script.lock();
        if script.len() > 1 {
            script.pop_front().unwrap_or(Outcome::ServerError)
        } else {
            script.front().cloned().unwrap_or(Outcome::ServerError)
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::GenericHttp
    }

    async fn chat_completion(
        &self,
        _client: &reqwest::Client,
        _request: &ChatRequest,
        timeout: Duration,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.call_times.lock().push(tokio::time::Instant::now());
        match self.next_outcome() {
            Outcome::Ok(text) => normalize_chat_response(&self.name, json!({ "text": text })),
            Outcome::Timeout => Err(ProviderError::Timeout(timeout)),
            Outcome::ServerError => Err(ProviderError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Internal server error".into(),
            }),
            Outcome::MissingCredential => Err(ProviderError::Configuration(format!(
                "credential for provider '{}' is not set",
                self.name
            ))),
            Outcome::Hang => std::future::pending().await,
        }
    }
}
