use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_stream::{stream, try_stream};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::{ContentProducer, FragmentStream};
use crate::types::{ChatMessage, Role};

/// Persona and guardrails sent ahead of every conversation
pub const PERSONA_PROMPT: &str = "\
Eres el asistente virtual de Goland, una empresa uruguaya de alimentos a base de cáñamo.
Responde siempre en español, con un tono cercano y profesional, en pocas frases.
Usa únicamente la información del contexto de referencia y de la conversación.
Si no conoces la respuesta, dilo con honestidad y sugiere contactar al equipo de Goland.
No des consejos médicos ni inventes precios, stock o plazos de entrega.";

/// Bound on establishing the upstream connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upstream connection settings (OpenAI-compatible API)
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    /// Downgrade upstream failures to a visible trailing fragment
    pub degrade_errors: bool,
}

impl CompletionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: None,
            degrade_errors: true,
        }
    }
}

/// Streaming chat-completion adapter
pub struct CompletionAdapter {
    config: CompletionConfig,
    client: Client,
    context: Arc<str>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<UpstreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<Delta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: String,
}

/// One parsed SSE line of the upstream body
#[derive(Debug, PartialEq)]
enum SseLine {
    Skip,
    Delta { content: String, finished: bool },
    Done,
}

impl CompletionAdapter {
    pub fn new(config: CompletionConfig, context: Arc<str>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("failed to build completion HTTP client")?;
        Ok(Self {
            config,
            client,
            context,
        })
    }

    /// System preamble: persona block followed by the reference context
    pub fn system_prompt(&self) -> String {
        if self.context.trim().is_empty() {
            PERSONA_PROMPT.to_string()
        } else {
            format!(
                "{}\n\n## Contexto de referencia\n\n{}",
                PERSONA_PROMPT, self.context
            )
        }
    }

    fn build_messages(&self, history: &[ChatMessage]) -> Vec<Message> {
        let mut messages = vec![Message {
            role: "system",
            content: self.system_prompt(),
        }];
        messages.extend(
            history
                .iter()
                .filter(|m| m.role != Role::Other && !m.text().is_empty())
                .map(|m| Message {
                    role: m.role.as_str(),
                    content: m.text().to_string(),
                }),
        );
        messages
    }

    /// Fragments of the upstream completion for `history`
    pub fn stream(&self, history: &[ChatMessage]) -> FragmentStream {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: self.build_messages(history),
            stream: true,
            temperature: self.config.temperature,
        };
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "opening completion stream"
        );
        let upstream = upstream_fragments(
            self.client.clone(),
            format!("{}/chat/completions", self.base_url()),
            self.config.api_key.clone(),
            request,
        );
        if self.config.degrade_errors {
            Box::pin(degrade_errors(upstream))
        } else {
            Box::pin(upstream)
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

#[async_trait]
impl ContentProducer for CompletionAdapter {
    fn name(&self) -> &str {
        "completion"
    }

    fn produce(&self, history: &[ChatMessage]) -> FragmentStream {
        self.stream(history)
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url()))
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            anyhow::bail!("completion API health check failed: {}", response.status())
        }
    }
}

/// Visible fragment reporting an upstream failure
pub fn error_fragment(err: &anyhow::Error) -> String {
    format!("\n\n[Error: {}]", err)
}

/// Turn the first failure into a final error fragment and end the stream.
/// Empty fragments are dropped.
pub fn degrade_errors<S>(inner: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<String>> + Send + 'static,
{
    stream! {
        let mut inner = Box::pin(inner);
        while let Some(item) = inner.next().await {
            match item {
                Ok(fragment) if fragment.is_empty() => {}
                Ok(fragment) => {
                    yield Ok(fragment);
                }
                Err(err) => {
                    warn!(error = %err, "completion stream failed, reporting as content");
                    yield Ok(error_fragment(&err));
                    break;
                }
            }
        }
    }
}

fn upstream_fragments(
    client: Client,
    url: String,
    api_key: String,
    request: CompletionRequest,
) -> impl Stream<Item = Result<String>> + Send {
    try_stream! {
        let response = client
            .post(&url)
            .bearer_auth(&api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            Err::<(), _>(anyhow!("completion API returned {}: {}", status, body.trim()))?;
        } else {
            let mut fragments = Box::pin(sse_fragments(response.bytes_stream()));
            while let Some(fragment) = fragments.next().await {
                yield fragment?;
            }
        }
    }
}

/// Parse an OpenAI-style SSE body into content fragments.
///
/// Lines may arrive split across chunks. The stream ends on `[DONE]`, on a
/// `finish_reason`, or when the body ends.
pub(crate) fn sse_fragments<S, E>(body: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    try_stream! {
        let mut body = Box::pin(body);
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;

        'body: while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                match parse_sse_line(&String::from_utf8_lossy(&raw))? {
                    SseLine::Skip => {}
                    SseLine::Delta { content, finished: done } => {
                        if !content.is_empty() {
                            trace!(fragment = %content, "completion fragment");
                            yield content;
                        }
                        if done {
                            finished = true;
                            break 'body;
                        }
                    }
                    SseLine::Done => {
                        finished = true;
                        break 'body;
                    }
                }
            }
        }

        // trailing line without a newline
        if !finished && !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer).into_owned();
            if let SseLine::Delta { content, .. } = parse_sse_line(&line)? {
                if !content.is_empty() {
                    yield content;
                }
            }
        }
    }
}

fn parse_sse_line(line: &str) -> Result<SseLine> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!(error = %e, "skipping unparseable completion chunk");
            return Ok(SseLine::Skip);
        }
    };
    if let Some(error) = chunk.error {
        return Err(anyhow!("completion API error: {}", error.message));
    }

    let mut content = String::new();
    let mut finished = false;
    for choice in chunk.choices {
        if let Some(text) = choice.delta.and_then(|d| d.content) {
            content.push_str(&text);
        }
        finished |= choice.finish_reason.is_some();
    }
    Ok(SseLine::Delta { content, finished })
}
