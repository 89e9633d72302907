//! Shared fixtures: a chat-completions style adapter and a scripted transport.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use genai_engine::client::{ApiErrorResponse, ChunkProcessor, GenRequest, GenResponse, ProviderAdapter};
use genai_engine::pipeline::StreamTotals;
use genai_engine::transport::{HttpRequest, HttpResponse, Transport};
use genai_engine::types::{
    FinishReason, Fragment, GenOptions, GenerationResult, Message, MessageRole, RateLimit,
    RateLimitPeriod, Reply, ToolCall, Usage,
};
use genai_engine::utils::headers::ratelimit_headers;
use genai_engine::utils::ToolCallAssembler;
use genai_engine::{Orchestrator, OrchestratorBuilder, PipeResult, Strictness, UnsupportedOptions};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ---- adapter -------------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
pub struct AcmeRequest {
    pub model: String,
    pub messages: Vec<AcmeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<AcmeTool>,
    pub stream: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct AcmeMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Default, Serialize)]
pub struct AcmeTool {
    pub name: String,
    pub parameters: serde_json::Value,
}

impl GenRequest for AcmeRequest {
    fn init(
        &mut self,
        messages: &[Message],
        options: &GenOptions,
        model: &str,
    ) -> genai_engine::Result<Option<UnsupportedOptions>> {
        self.model = model.to_string();
        if !options.system_prompt.is_empty() {
            self.messages.push(AcmeMessage {
                role: "system".to_string(),
                content: options.system_prompt.clone(),
            });
        }
        for m in messages {
            let role = match m.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            };
            self.messages.push(AcmeMessage {
                role: role.to_string(),
                content: m.text(),
            });
        }
        self.temperature = options.temperature;
        self.max_tokens = options.max_tokens;
        self.tools = options
            .tools
            .iter()
            .map(|t| AcmeTool {
                name: t.name.clone(),
                parameters: t.parameters.clone(),
            })
            .collect();

        let mut unsupported = UnsupportedOptions::default();
        if options.seed.is_some() {
            unsupported.push("seed");
        }
        if options.top_k.is_some() {
            unsupported.push("top_k");
        }
        Ok(Some(unsupported))
    }

    fn set_stream(&mut self, stream: bool) {
        self.stream = stream;
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AcmeUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl AcmeUsage {
    fn to_usage(&self) -> Usage {
        Usage {
            input_tokens: self.prompt_tokens,
            output_tokens: self.completion_tokens,
            total_tokens: self.total_tokens,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AcmeFunction {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AcmeToolCall {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub function: AcmeFunction,
}

impl AcmeToolCall {
    fn to_tool_call(&self) -> ToolCall {
        ToolCall::new(
            self.id.clone(),
            self.function.name.clone(),
            self.function.arguments.clone(),
        )
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AcmeOutput {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<AcmeToolCall>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AcmeChoice {
    #[serde(default)]
    pub message: AcmeOutput,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub finish_reason: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AcmeResponse {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<AcmeChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<AcmeUsage>,
}

impl GenResponse for AcmeResponse {
    fn to_result(&self) -> genai_engine::Result<GenerationResult> {
        let mut result = GenerationResult::default();
        let Some(choice) = self.choices.first() else {
            return Ok(result);
        };
        if !choice.message.reasoning.is_empty() {
            result.replies.push(Reply::Reasoning {
                text: choice.message.reasoning.clone(),
                opaque: Default::default(),
            });
        }
        if !choice.message.content.is_empty() {
            result.replies.push(Reply::text(choice.message.content.clone()));
        }
        for tc in &choice.message.tool_calls {
            result.replies.push(Reply::ToolCall(tc.to_tool_call()));
        }
        if let Some(u) = &self.usage {
            result.usage = u.to_usage();
        }
        if !choice.finish_reason.is_empty() {
            result.usage.finish_reason = Some(FinishReason::from_raw(
                &choice.finish_reason,
                Strictness::Lenient,
            )?);
        }
        Ok(result)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AcmeDeltaChoice {
    #[serde(default)]
    pub delta: AcmeOutput,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub finish_reason: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AcmeChunk {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<AcmeDeltaChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<AcmeUsage>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AcmeErrorDetail {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AcmeErrorResponse {
    #[serde(default)]
    pub error: AcmeErrorDetail,
}

impl ApiErrorResponse for AcmeErrorResponse {
    fn message(&self) -> String {
        self.error.message.clone()
    }

    fn code(&self) -> Option<String> {
        Some(self.error.kind.clone()).filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Default)]
pub struct AcmeProcessor {
    calls: ToolCallAssembler,
}

impl ChunkProcessor<AcmeChunk> for AcmeProcessor {
    fn process(
        &mut self,
        chunk: AcmeChunk,
        totals: &mut StreamTotals,
    ) -> genai_engine::Result<Vec<Fragment>> {
        let mut out = Vec::new();
        if let Some(u) = &chunk.usage {
            totals.report_usage(&u.to_usage());
        }
        for choice in chunk.choices {
            let delta = choice.delta;
            let has_content = !delta.reasoning.is_empty() || !delta.content.is_empty();
            let done = self.calls.push_chunk(
                delta.tool_calls.iter().map(AcmeToolCall::to_tool_call),
                has_content,
            )?;
            out.extend(done.into_iter().map(Fragment::tool_call));
            if !delta.reasoning.is_empty() {
                out.push(Fragment::reasoning(delta.reasoning));
            }
            if !delta.content.is_empty() {
                out.push(Fragment::text(delta.content));
            }
            if !choice.finish_reason.is_empty() {
                if let Some(done) = self.calls.flush() {
                    out.push(Fragment::tool_call(done));
                }
                totals.set_finish_reason(FinishReason::from_raw(
                    &choice.finish_reason,
                    Strictness::Lenient,
                )?);
            }
        }
        Ok(out)
    }

    fn finish(&mut self, _totals: &mut StreamTotals) -> genai_engine::Result<Vec<Fragment>> {
        Ok(self.calls.flush().map(Fragment::tool_call).into_iter().collect())
    }
}

#[derive(Debug, Default)]
pub struct Acme;

impl ProviderAdapter for Acme {
    type Request = AcmeRequest;
    type Response = AcmeResponse;
    type Chunk = AcmeChunk;
    type ErrorResponse = AcmeErrorResponse;
    type Processor = AcmeProcessor;

    fn chunk_processor(&self) -> AcmeProcessor {
        AcmeProcessor::default()
    }

    fn rate_limits(&self, headers: &HeaderMap) -> Vec<RateLimit> {
        ratelimit_headers(headers, RateLimitPeriod::Minute)
    }
}

// ---- transport -----------------------------------------------------------------------------

/// Sets a flag when the response body is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// One canned response.
pub struct Scripted {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub parts: Vec<String>,
    /// Keep the body open after the last part.
    pub endless: bool,
    pub request_id: Option<String>,
    pub dropped: Arc<AtomicBool>,
}

impl Scripted {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            parts: vec![body.to_string()],
            endless: false,
            request_id: None,
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// SSE body with one `data:` event per chunk.
    pub fn sse(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_string(), "text/event-stream".to_string())],
            parts: chunks.iter().map(|c| format!("data: {}\n\n", c)).collect(),
            endless: false,
            request_id: None,
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn endless(mut self) -> Self {
        self.endless = true;
        self
    }

    pub fn request_id(mut self, id: &str) -> Self {
        self.request_id = Some(id.to_string());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn into_response(self) -> HttpResponse {
        let mut headers = HeaderMap::new();
        for (k, v) in &self.headers {
            if let (Ok(k), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(k, v);
            }
        }
        let guard = DropFlag(self.dropped);
        let parts: Vec<PipeResult<Bytes>> =
            self.parts.into_iter().map(|p| Ok(Bytes::from(p))).collect();
        let tail: futures::stream::BoxStream<'static, PipeResult<Bytes>> = if self.endless {
            futures::stream::pending().boxed()
        } else {
            futures::stream::empty().boxed()
        };
        let body = futures::stream::iter(parts).chain(tail).map(move |item| {
            let _keep = &guard;
            item
        });
        HttpResponse {
            status: self.status,
            headers,
            request_id: self.request_id,
            body: Box::pin(body),
        }
    }
}

/// Transport that replays canned responses in order and records requests.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, i: usize) -> HttpRequest {
        self.requests.lock().unwrap()[i].clone()
    }

    pub fn request_json(&self, i: usize) -> serde_json::Value {
        let req = self.request(i);
        serde_json::from_slice(req.body.as_deref().unwrap_or(&b"null"[..])).unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn round_trip(&self, req: HttpRequest) -> genai_engine::Result<HttpResponse> {
        self.requests.lock().unwrap().push(req);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(s) => Ok(s.into_response()),
            None => Ok(Scripted::json(500, "{\"error\":{\"message\":\"script exhausted\"}}")
                .into_response()),
        }
    }
}

// ---- helpers -------------------------------------------------------------------------------

pub const URL: &str = "https://api.acme.test/v1/chat/completions";

pub fn builder(transport: Arc<MockTransport>) -> OrchestratorBuilder<Acme> {
    Orchestrator::builder(Acme)
        .model("acme-large")
        .sync_url(URL)
        .transport(transport)
}

pub fn orchestrator(transport: Arc<MockTransport>) -> Orchestrator<Acme> {
    builder(transport).build().unwrap()
}

pub fn hello() -> Vec<Message> {
    vec![Message::user("Say hello")]
}

pub fn text_response(text: &str, finish: &str) -> String {
    serde_json::json!({
        "id": "resp-1",
        "choices": [{"message": {"content": text}, "finish_reason": finish}],
        "usage": {"prompt_tokens": 7, "completion_tokens": 2, "total_tokens": 9}
    })
    .to_string()
}

pub fn delta_text(text: &str) -> String {
    serde_json::json!({"choices": [{"delta": {"content": text}}]}).to_string()
}

pub fn delta_tool(id: &str, name: &str, args: &str) -> String {
    serde_json::json!({
        "choices": [{"delta": {"tool_calls": [{"id": id, "function": {"name": name, "arguments": args}}]}}]
    })
    .to_string()
}

/// A chunk carrying both text and a tool-call delta.
pub fn delta_text_and_tool(text: &str, id: &str, args: &str) -> String {
    serde_json::json!({
        "choices": [{"delta": {"content": text, "tool_calls": [{"id": id, "function": {"arguments": args}}]}}]
    })
    .to_string()
}

pub fn delta_finish(reason: &str) -> String {
    serde_json::json!({"choices": [{"delta": {}, "finish_reason": reason}]}).to_string()
}

pub fn usage_chunk(input: u64, output: u64) -> String {
    serde_json::json!({
        "usage": {"prompt_tokens": input, "completion_tokens": output, "total_tokens": input + output}
    })
    .to_string()
}
