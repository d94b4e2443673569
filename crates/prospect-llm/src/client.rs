// Claude API streaming client for prospect intel, using reqwest-eventsource.
//
// Sends one Messages API request with `stream: true` and the server-side web
// search tool enabled, accumulates text deltas and consulted sources, and
// optionally forwards them as `IntelEvent`s for live display.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use prospect_core::config::Config;

use crate::extract::{extract_intel, IntelResult, IntelSource};
use crate::prompt::{build_intel_prompt, system_prompt, IntelSubject};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const WEB_SEARCH_TOOL_TYPE: &str = "web_search_20250305";

const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_WEB_SEARCH_MAX_USES: u32 = 3;

// ---------------------------------------------------------------------------
// Errors and events
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum IntelError {
    #[error("intel lookups are disabled (no API key configured)")]
    Disabled,

    #[error("failed to build intel request: {0}")]
    Request(String),

    #[error("API returned status {status}")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Transport(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("stream ended without any content")]
    EmptyResponse,
}

impl IntelError {
    /// Whether retrying the same lookup later might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            IntelError::Disabled | IntelError::Request(_) => false,
            IntelError::Status { status } => *status == 429 || *status >= 500,
            IntelError::Transport(_) | IntelError::Stream(_) | IntelError::EmptyResponse => true,
        }
    }
}

/// Incremental output of a streaming lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum IntelEvent {
    Token(String),
    Source(IntelSource),
}

/// Everything collected from one streamed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutput {
    pub full_text: String,
    pub sources: Vec<IntelSource>,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl StreamOutput {
    fn push_source(&mut self, source: IntelSource) -> bool {
        if self.sources.iter().any(|s| s.url == source.url) {
            return false;
        }
        self.sources.push(source);
        true
    }
}

// ---------------------------------------------------------------------------
// ClaudeClient
// ---------------------------------------------------------------------------

/// Low-level Claude API streaming client.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
    max_tokens: u32,
    web_search_max_uses: u32,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            api_url: ANTHROPIC_API_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            web_search_max_uses: DEFAULT_WEB_SEARCH_MAX_USES,
        }
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_limits(mut self, max_tokens: u32, web_search_max_uses: u32) -> Self {
        self.max_tokens = max_tokens;
        self.web_search_max_uses = web_search_max_uses;
        self
    }

    fn request_body(&self, system: &str, user_content: &str) -> Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "stream": true,
            "system": system,
            "messages": [{ "role": "user", "content": user_content }],
            "tools": [{
                "type": WEB_SEARCH_TOOL_TYPE,
                "name": "web_search",
                "max_uses": self.web_search_max_uses,
            }]
        })
    }

    /// Stream one message and collect its text and sources.
    ///
    /// When `tx` is given, tokens and newly seen sources are forwarded as they
    /// arrive. A dropped receiver does not abort the stream.
    pub async fn stream_message(
        &self,
        system: &str,
        user_content: &str,
        tx: Option<&mpsc::Sender<IntelEvent>>,
    ) -> Result<StreamOutput, IntelError> {
        if self.api_key.is_empty() {
            return Err(IntelError::Disabled);
        }

        let request = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.request_body(system, user_content));

        let mut es = request
            .eventsource()
            .map_err(|e| IntelError::Request(e.to_string()))?;

        let mut out = StreamOutput::default();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => debug!("SSE connection opened"),
                Ok(Event::Message(msg)) => match msg.event.as_str() {
                    "message_start" => {
                        match parse_input_tokens(&msg.data) {
                            Some(n) => out.input_tokens = n,
                            None => warn!("failed to parse input_tokens from message_start"),
                        }
                        debug!(input_tokens = out.input_tokens, "message_start");
                    }
                    "content_block_start" => {
                        for source in parse_search_results(&msg.data) {
                            if out.push_source(source.clone()) {
                                forward(tx, IntelEvent::Source(source)).await;
                            }
                        }
                    }
                    "content_block_delta" => {
                        if let Some(text) = parse_delta_text(&msg.data) {
                            out.full_text.push_str(&text);
                            forward(tx, IntelEvent::Token(text)).await;
                        } else if let Some(source) = parse_citation(&msg.data) {
                            if out.push_source(source.clone()) {
                                forward(tx, IntelEvent::Source(source)).await;
                            }
                        }
                    }
                    "message_delta" => {
                        match parse_output_tokens(&msg.data) {
                            Some(n) => out.output_tokens = n,
                            None => warn!("failed to parse output_tokens from message_delta"),
                        }
                        debug!(output_tokens = out.output_tokens, "message_delta");
                    }
                    "message_stop" => {
                        debug!("message_stop, streaming complete");
                        es.close();
                        return Ok(out);
                    }
                    "error" => {
                        es.close();
                        let message = parse_stream_error(&msg.data)
                            .unwrap_or_else(|| "unknown stream error".to_string());
                        return Err(IntelError::Stream(message));
                    }
                    event_type => debug!(event_type, "ignoring SSE event"),
                },
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!("SSE stream ended");
                    break;
                }
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    es.close();
                    return Err(map_stream_error(err));
                }
            }
        }

        es.close();
        // Ended without message_stop; keep whatever text arrived.
        if out.full_text.is_empty() {
            Err(IntelError::EmptyResponse)
        } else {
            Ok(out)
        }
    }

    /// Run a full intel lookup for `subject`.
    pub async fn lookup(
        &self,
        subject: &IntelSubject,
        tx: Option<&mpsc::Sender<IntelEvent>>,
    ) -> Result<IntelResult, IntelError> {
        info!("intel lookup for '{}' ({})", subject.name, subject.league);
        let out = self
            .stream_message(&system_prompt(), &build_intel_prompt(subject), tx)
            .await?;
        info!(
            input_tokens = out.input_tokens,
            output_tokens = out.output_tokens,
            sources = out.sources.len(),
            "intel lookup complete"
        );
        Ok(extract_intel(&out.full_text, out.sources))
    }
}

async fn forward(tx: Option<&mpsc::Sender<IntelEvent>>, event: IntelEvent) {
    if let Some(tx) = tx {
        if tx.send(event).await.is_err() {
            debug!("intel event receiver dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// Oracle trait and client wrapper
// ---------------------------------------------------------------------------

/// Anything that can answer an intel lookup.
#[async_trait]
pub trait IntelOracle: Send + Sync {
    async fn fetch_intel(
        &self,
        subject: &IntelSubject,
        tx: Option<mpsc::Sender<IntelEvent>>,
    ) -> Result<IntelResult, IntelError>;
}

#[async_trait]
impl IntelOracle for ClaudeClient {
    async fn fetch_intel(
        &self,
        subject: &IntelSubject,
        tx: Option<mpsc::Sender<IntelEvent>>,
    ) -> Result<IntelResult, IntelError> {
        self.lookup(subject, tx.as_ref()).await
    }
}

/// Either a configured Claude client or disabled.
pub enum IntelClient {
    Active(ClaudeClient),
    Disabled,
}

impl IntelClient {
    /// `Active` when credentials carry a non-empty API key.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.anthropic_api_key {
            Some(key) if !key.is_empty() => IntelClient::Active(
                ClaudeClient::new(key.clone(), config.llm.model.clone())
                    .with_limits(config.llm.max_tokens, config.llm.web_search_max_uses),
            ),
            _ => IntelClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, IntelClient::Active(_))
    }
}

#[async_trait]
impl IntelOracle for IntelClient {
    async fn fetch_intel(
        &self,
        subject: &IntelSubject,
        tx: Option<mpsc::Sender<IntelEvent>>,
    ) -> Result<IntelResult, IntelError> {
        match self {
            IntelClient::Active(client) => client.fetch_intel(subject, tx).await,
            IntelClient::Disabled => Err(IntelError::Disabled),
        }
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// `message.usage.input_tokens` from a `message_start` event.
pub(crate) fn parse_input_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("message")?
        .get("usage")?
        .get("input_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// `delta.text` from a `text_delta` content block delta.
pub(crate) fn parse_delta_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    let delta = v.get("delta")?;
    if delta.get("type").and_then(Value::as_str) != Some("text_delta") {
        return None;
    }
    delta.get("text")?.as_str().map(|s| s.to_string())
}

/// `usage.output_tokens` from a `message_delta` event.
pub(crate) fn parse_output_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("usage")?
        .get("output_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

fn source_from(v: &Value) -> Option<IntelSource> {
    let url = v.get("url")?.as_str()?.to_string();
    let title = v
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or(&url)
        .to_string();
    Some(IntelSource { title, url })
}

/// Results from a `web_search_tool_result` content block start.
///
/// Expected shape: `{ "content_block": { "type": "web_search_tool_result",
/// "content": [{ "type": "web_search_result", "title": "...", "url": "..." }] } }`
pub(crate) fn parse_search_results(data: &str) -> Vec<IntelSource> {
    let Ok(v) = serde_json::from_str::<Value>(data) else {
        return Vec::new();
    };
    let Some(block) = v.get("content_block") else {
        return Vec::new();
    };
    if block.get("type").and_then(Value::as_str) != Some("web_search_tool_result") {
        return Vec::new();
    }
    block
        .get("content")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter(|r| r.get("type").and_then(Value::as_str) == Some("web_search_result"))
                .filter_map(source_from)
                .collect()
        })
        .unwrap_or_default()
}

/// Cited page from a `citations_delta` content block delta.
pub(crate) fn parse_citation(data: &str) -> Option<IntelSource> {
    let v: Value = serde_json::from_str(data).ok()?;
    let delta = v.get("delta")?;
    if delta.get("type").and_then(Value::as_str) != Some("citations_delta") {
        return None;
    }
    source_from(delta.get("citation")?)
}

/// `error.message` from an in-stream `error` event.
fn parse_stream_error(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

fn map_stream_error(err: reqwest_eventsource::Error) -> IntelError {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _response) => IntelError::Status {
            status: status.as_u16(),
        },
        reqwest_eventsource::Error::Transport(e) => IntelError::Transport(e.to_string()),
        other => IntelError::Stream(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use prospect_core::config::{CredentialsConfig, DataPaths, LlmConfig};
    use std::path::PathBuf;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // -- SSE JSON parsing --

    #[test]
    fn parse_message_start_input_tokens() {
        let data = r#"{"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":42,"output_tokens":0}}}"#;
        assert_eq!(parse_input_tokens(data), Some(42));
        assert_eq!(parse_input_tokens("{}"), None);
    }

    #[test]
    fn parse_text_delta_only() {
        let text = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#;
        assert_eq!(parse_delta_text(text).as_deref(), Some("Hello"));

        let json = r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"q"}}"#;
        assert_eq!(parse_delta_text(json), None);
    }

    #[test]
    fn parse_message_delta_output_tokens() {
        let data = r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":7}}"#;
        assert_eq!(parse_output_tokens(data), Some(7));
    }

    #[test]
    fn parse_web_search_results() {
        let data = r#"{"type":"content_block_start","index":1,"content_block":{"type":"web_search_tool_result","tool_use_id":"srvtoolu_1","content":[
            {"type":"web_search_result","title":"Demidov stats","url":"https://example.com/a","page_age":"1 day"},
            {"type":"web_search_result","title":"","url":"https://example.com/b"}
        ]}}"#;
        let sources = parse_search_results(data);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "Demidov stats");
        assert_eq!(sources[1].title, "https://example.com/b");

        let text_block = r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#;
        assert!(parse_search_results(text_block).is_empty());
    }

    #[test]
    fn parse_citation_delta() {
        let data = r#"{"type":"content_block_delta","index":2,"delta":{"type":"citations_delta","citation":{"type":"web_search_result_location","url":"https://example.com/c","title":"Report","cited_text":"..."}}}"#;
        assert_eq!(
            parse_citation(data),
            Some(IntelSource {
                title: "Report".into(),
                url: "https://example.com/c".into()
            })
        );
    }

    #[test]
    fn request_body_enables_web_search() {
        let client = ClaudeClient::new("k".into(), "m".into()).with_limits(512, 5);
        let body = client.request_body("sys", "user");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["tools"][0]["type"], WEB_SEARCH_TOOL_TYPE);
        assert_eq!(body["tools"][0]["max_uses"], 5);
        assert_eq!(body["messages"][0]["content"], "user");
    }

    // -- Errors --

    #[test]
    fn retryable_classification() {
        assert!(!IntelError::Disabled.is_retryable());
        assert!(!IntelError::Status { status: 401 }.is_retryable());
        assert!(IntelError::Status { status: 429 }.is_retryable());
        assert!(IntelError::Status { status: 529 }.is_retryable());
        assert!(IntelError::Transport("reset".into()).is_retryable());
        assert!(IntelError::EmptyResponse.is_retryable());
    }

    // -- Client wrapper --

    fn make_test_config(api_key: Option<String>) -> Config {
        Config {
            data: DataPaths {
                players: "data/players.csv".into(),
                leagues: "data/leagues.csv".into(),
            },
            db_path: PathBuf::from("test.db"),
            llm: LlmConfig {
                model: "claude-sonnet-4-5".into(),
                max_tokens: 1024,
                web_search_max_uses: 2,
            },
            credentials: CredentialsConfig {
                anthropic_api_key: api_key,
            },
        }
    }

    #[test]
    fn from_config_selects_variant() {
        assert!(IntelClient::from_config(&make_test_config(Some("sk-ant-test".into()))).is_active());
        assert!(!IntelClient::from_config(&make_test_config(None)).is_active());
        assert!(!IntelClient::from_config(&make_test_config(Some(String::new()))).is_active());
    }

    #[tokio::test]
    async fn disabled_client_errors_without_network() {
        let subject = IntelSubject::new("A", "OHL", "CAN");
        let err = IntelClient::Disabled.fetch_intel(&subject, None).await.unwrap_err();
        assert!(matches!(err, IntelError::Disabled));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn empty_api_key_is_disabled() {
        let client = ClaudeClient::new(String::new(), "model".into());
        let err = client.stream_message("s", "u", None).await.unwrap_err();
        assert!(matches!(err, IntelError::Disabled));
    }

    // -- Mock SSE server --

    /// Serve one canned HTTP response on a local port; returns the URL.
    async fn mock_server(response: &'static str) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        });
        (format!("http://{addr}"), task)
    }

    const SSE_RESPONSE: &str = concat!(
        "HTTP/1.1 200 OK\r\n",
        "Content-Type: text/event-stream\r\n",
        "Cache-Control: no-cache\r\n",
        "\r\n",
        "event: message_start\r\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":15}}}\r\n",
        "\r\n",
        "event: content_block_start\r\n",
        "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"web_search_tool_result\",\"content\":[{\"type\":\"web_search_result\",\"title\":\"Elite Prospects\",\"url\":\"https://example.com/ep\"}]}}\r\n",
        "\r\n",
        "event: content_block_delta\r\n",
        "data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hot streak.\\n\"}}\r\n",
        "\r\n",
        "event: content_block_delta\r\n",
        "data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"```json\\n{\\\"stats\\\":{\\\"GP\\\":20,\\\"G\\\":10,\\\"A\\\":15,\\\"P\\\":25}}\\n```\"}}\r\n",
        "\r\n",
        "event: message_delta\r\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":9}}\r\n",
        "\r\n",
        "event: message_stop\r\n",
        "data: {\"type\":\"message_stop\"}\r\n",
        "\r\n",
    );

    #[tokio::test]
    async fn mock_sse_server_full_lookup() {
        let (url, server) = mock_server(SSE_RESPONSE).await;
        let client = ClaudeClient::new("sk-ant-test".into(), "test".into()).with_api_url(url);
        let (tx, mut rx) = mpsc::channel(32);

        let result = client
            .lookup(&IntelSubject::new("Zayne Parekh", "OHL", "CAN"), Some(&tx))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(result.text, "Hot streak.");
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].url, "https://example.com/ep");
        assert_eq!(result.found_stats.map(|s| (s.gp, s.p)), Some((20, 25)));
        assert!(result.suggested_skills.is_none());

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 3, "1 source + 2 tokens");
        assert!(matches!(events[0], IntelEvent::Source(_)));
        assert_eq!(events[1], IntelEvent::Token("Hot streak.\n".into()));

        let _ = server.await;
    }

    #[tokio::test]
    async fn mock_sse_server_error_status() {
        let (url, server) = mock_server(concat!(
            "HTTP/1.1 401 Unauthorized\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: 69\r\n",
            "\r\n",
            "{\"error\":{\"message\":\"Invalid API key\",\"type\":\"authentication_error\"}}",
        ))
        .await;
        let client = ClaudeClient::new("sk-ant-bad".into(), "test".into()).with_api_url(url);

        let err = client.stream_message("s", "u", None).await.unwrap_err();
        match &err {
            IntelError::Status { status } => assert_eq!(*status, 401),
            other => panic!("expected Status error, got: {other}"),
        }
        assert!(!err.is_retryable());

        let _ = server.await;
    }

    #[tokio::test]
    async fn mock_sse_server_overloaded_is_retryable() {
        let (url, server) = mock_server(concat!(
            "HTTP/1.1 529 Overloaded\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: 2\r\n",
            "\r\n",
            "{}",
        ))
        .await;
        let client = ClaudeClient::new("sk-ant-test".into(), "test".into()).with_api_url(url);

        let err = client.stream_message("s", "u", None).await.unwrap_err();
        assert!(err.is_retryable(), "got {err}");

        let _ = server.await;
    }
}
