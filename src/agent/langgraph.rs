//! LangGraph server client.
//!
//! Speaks the LangGraph HTTP API:
//! - `POST /threads` creates a conversation thread
//! - `POST /threads/{id}/runs/stream` starts a run and streams SSE events
//! - `POST /threads/{id}/runs/{run_id}/cancel` stops it
//!
//! Runs are started with `stream_mode = ["values", "updates"]`: `updates`
//! drive the activity timeline, `values` carry the message list.

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use super::backend::{BackendError, ResearchBackend, RunInput};
use super::types::{Message, ResearchProgress, StreamEvent};

pub const DEFAULT_ASSISTANT_ID: &str = "pro-search-agent";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Deserialize, Debug)]
struct ThreadResponse {
    thread_id: String,
}

#[derive(Serialize, Debug)]
struct RunStreamRequest<'a> {
    assistant_id: &'a str,
    input: RunStateInput<'a>,
    stream_mode: [&'static str; 2],
}

#[derive(Serialize, Debug)]
struct RunStateInput<'a> {
    messages: Vec<InputMessage<'a>>,
    initial_search_query_count: u32,
    max_research_loops: u32,
    reasoning_model: &'a str,
}

#[derive(Serialize, Debug)]
struct InputMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    content: &'a str,
    id: &'a str,
}

#[derive(Deserialize, Debug)]
struct RunMetadata {
    run_id: String,
}

#[derive(Deserialize, Debug)]
struct ValuesPayload {
    #[serde(default)]
    messages: Option<Vec<Message>>,
    #[serde(default)]
    research_loop_count: Option<u32>,
    #[serde(default)]
    is_sufficient: Option<bool>,
}

impl ValuesPayload {
    fn into_events(self) -> Vec<StreamEvent> {
        let progress = (self.research_loop_count.is_some() || self.is_sufficient.is_some())
            .then(|| ResearchProgress {
                loops_completed: self.research_loop_count.unwrap_or(0),
                is_sufficient: self.is_sufficient.unwrap_or(false),
            });
        self.messages
            .map(StreamEvent::Messages)
            .into_iter()
            .chain(progress.map(StreamEvent::Progress))
            .collect()
    }
}

fn build_run_request<'a>(assistant_id: &'a str, input: &RunInput<'a>) -> RunStreamRequest<'a> {
    let (initial_search_query_count, max_research_loops) = input.effort.search_budget();
    RunStreamRequest {
        assistant_id,
        input: RunStateInput {
            messages: vec![InputMessage {
                kind: "human",
                content: input.query,
                id: input.message_id,
            }],
            initial_search_query_count,
            max_research_loops,
            reasoning_model: input.model,
        },
        stream_mode: ["values", "updates"],
    }
}

// ============================================================================
// SSE Decoding
// ============================================================================

/// Incremental SSE decoder. Feed it raw bytes as they arrive; it yields one
/// `(event, data)` pair per blank-line-terminated frame.
///
/// Bytes are buffered until a full line is available, so a multi-byte
/// character split across network chunks is decoded intact.
#[derive(Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<(String, String)> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(frame) = self.process_line(&String::from_utf8_lossy(&line)) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Flush whatever the connection left behind when it closed: a last
    /// line without `\n` and a frame without its blank terminator.
    pub fn finish(&mut self) -> Option<(String, String)> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            if let Some(frame) = self.process_line(&String::from_utf8_lossy(&rest)) {
                return Some(frame);
            }
        }
        self.take_frame()
    }

    fn process_line(&mut self, line: &str) -> Option<(String, String)> {
        let line = line.trim_end_matches(['\n', '\r']);

        if line.is_empty() {
            return self.take_frame();
        }
        if line.starts_with(':') {
            return None; // comment / keep-alive
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => debug!("Ignoring SSE field '{}'", field),
        }
        None
    }

    fn take_frame(&mut self) -> Option<(String, String)> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let event = self.event.take().unwrap_or_else(|| "message".to_string());
        let data = std::mem::take(&mut self.data).join("\n");
        Some((event, data))
    }
}

/// Translate one SSE frame into zero or more stream events.
pub fn decode_frame(event: &str, data: &str) -> Result<Vec<StreamEvent>, BackendError> {
    let parse = |e: serde_json::Error| BackendError::Parse(format!("{event} event: {e}"));

    match event {
        "metadata" => {
            let meta: RunMetadata = serde_json::from_str(data).map_err(parse)?;
            Ok(vec![StreamEvent::Metadata {
                run_id: meta.run_id,
            }])
        }
        "updates" => {
            let value: serde_json::Value = serde_json::from_str(data).map_err(parse)?;
            let serde_json::Value::Object(nodes) = value else {
                return Ok(Vec::new());
            };
            Ok(nodes
                .into_iter()
                .map(|(node, output)| StreamEvent::Update { node, output })
                .collect())
        }
        "values" => {
            let payload: ValuesPayload = serde_json::from_str(data).map_err(parse)?;
            Ok(payload.into_events())
        }
        "error" => {
            let message = serde_json::from_str::<serde_json::Value>(data)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| data.to_string());
            Ok(vec![StreamEvent::Error(message)])
        }
        "end" => Ok(vec![StreamEvent::End]),
        other => {
            debug!("Unrecognized event type '{}' with data: {}", other, data);
            Ok(Vec::new())
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for a LangGraph deployment (local `langgraph dev` or hosted).
pub struct LangGraphClient {
    base_url: String,
    assistant_id: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LangGraphClient {
    pub fn new(base_url: String, assistant_id: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            assistant_id,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        warn!("LangGraph API error: {} - {}", status, message);
        Err(BackendError::Api { status, message })
    }
}

#[async_trait]
impl ResearchBackend for LangGraphClient {
    fn name(&self) -> &str {
        "langgraph"
    }

    async fn create_thread(&self) -> Result<String, BackendError> {
        let response = self
            .post("/threads")
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let thread: ThreadResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        info!("Created thread {}", thread.thread_id);
        Ok(thread.thread_id)
    }

    async fn stream_run(
        &self,
        input: RunInput<'_>,
        sender: Sender<StreamEvent>,
    ) -> Result<(), BackendError> {
        if self.assistant_id.is_empty() {
            return Err(BackendError::Config("assistant id is empty".to_string()));
        }

        let body = build_run_request(&self.assistant_id, &input);
        info!(
            "Starting run: thread={}, assistant={}, effort={:?}, model={}",
            input.thread_id, self.assistant_id, input.effort, input.model
        );

        let response = self
            .post(&format!("/threads/{}/runs/stream", input.thread_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();
        let mut event_count = 0usize;

        let mut frames: Vec<(String, String)> = Vec::new();
        let mut closed = false;
        loop {
            for (event, data) in frames.drain(..) {
                debug!("SSE frame {}: {} bytes", event, data.len());
                for stream_event in decode_frame(&event, &data)? {
                    event_count += 1;
                    let is_end = stream_event == StreamEvent::End;
                    if sender.send(stream_event).await.is_err() {
                        warn!("Stream event send failed: receiver dropped");
                        return Err(BackendError::ChannelClosed);
                    }
                    if is_end {
                        info!("Run stream ended after {} events", event_count);
                        return Ok(());
                    }
                }
            }

            if closed {
                break;
            }

            match stream.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(|e| BackendError::Network(e.to_string()))?;
                    frames = decoder.push(&chunk);
                }
                None => {
                    closed = true;
                    frames.extend(decoder.finish());
                }
            }
        }

        info!("Run stream closed after {} events", event_count);
        Ok(())
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), BackendError> {
        info!("Cancelling run {} on thread {}", run_id, thread_id);
        let response = self
            .post(&format!("/threads/{thread_id}/runs/{run_id}/cancel"))
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Effort;

    #[test]
    fn sse_decoder_splits_frames_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: metadata\nda").is_empty());
        let frames = decoder.push(b"ta: {\"run_id\":\"r1\"}\n\nevent: end\n");
        assert_eq!(
            frames,
            vec![("metadata".to_string(), "{\"run_id\":\"r1\"}".to_string())]
        );
        assert_eq!(decoder.finish(), Some(("end".to_string(), String::new())));
    }

    #[test]
    fn sse_decoder_joins_multiline_data_and_skips_comments() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": ping\r\nevent: values\r\ndata: {\"a\":\r\ndata: 1}\r\n\r\n");
        assert_eq!(frames, vec![("values".to_string(), "{\"a\":\n1}".to_string())]);
    }

    #[test]
    fn sse_decoder_finish_keeps_unterminated_last_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: metadata\ndata: {\"run_id\":\"r3\"}").is_empty());
        assert_eq!(
            decoder.finish(),
            Some(("metadata".to_string(), "{\"run_id\":\"r3\"}".to_string()))
        );
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn sse_decoder_finish_on_clean_close_is_empty() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(b"event: end\ndata: null\n\n").len(), 1);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn sse_decoder_keeps_multibyte_char_split_across_chunks() {
        let frame = "event: values\ndata: {\"text\":\"café Источники\"}\n\n".as_bytes();
        let split = frame
            .iter()
            .position(|&b| b == 0xC3)
            .expect("é starts with 0xC3")
            + 1;

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&frame[..split]).is_empty());
        let frames = decoder.push(&frame[split..]);
        assert_eq!(
            frames,
            vec![(
                "values".to_string(),
                "{\"text\":\"café Источники\"}".to_string()
            )]
        );
    }

    #[test]
    fn decode_updates_yields_one_event_per_node() {
        let events =
            decode_frame("updates", r#"{"generate_query":{"search_query":["a","b"]}}"#).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Update { node, output } => {
                assert_eq!(node, "generate_query");
                assert_eq!(output["search_query"][1], "b");
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn decode_values_without_messages_is_empty() {
        assert!(decode_frame("values", r#"{"search_query":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn decode_values_reports_research_progress_after_messages() {
        let events = decode_frame(
            "values",
            r#"{"messages":[{"type":"ai","id":"a1","content":"done"}],"research_loop_count":2,"is_sufficient":true}"#,
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Messages(m) if m.len() == 1));
        assert_eq!(
            events[1],
            StreamEvent::Progress(ResearchProgress {
                loops_completed: 2,
                is_sufficient: true,
            })
        );
    }

    #[test]
    fn decode_error_prefers_message_field() {
        let events = decode_frame("error", r#"{"error":"ValueError","message":"boom"}"#).unwrap();
        assert_eq!(events, vec![StreamEvent::Error("boom".to_string())]);
    }

    #[test]
    fn decode_bad_metadata_is_parse_error() {
        assert!(matches!(
            decode_frame("metadata", "not json"),
            Err(BackendError::Parse(_))
        ));
    }

    #[test]
    fn run_request_carries_effort_budget_and_model() {
        let input = RunInput {
            thread_id: "t1",
            message_id: "m1",
            query: "climate policy",
            effort: Effort::Medium,
            model: "gemini-1.5-flash-latest",
        };
        let value = serde_json::to_value(build_run_request("pro-search-agent", &input)).unwrap();
        assert_eq!(value["assistant_id"], "pro-search-agent");
        assert_eq!(value["input"]["messages"][0]["type"], "human");
        assert_eq!(value["input"]["messages"][0]["id"], "m1");
        assert_eq!(value["input"]["initial_search_query_count"], 3);
        assert_eq!(value["input"]["max_research_loops"], 3);
        assert_eq!(value["input"]["reasoning_model"], "gemini-1.5-flash-latest");
        assert_eq!(value["stream_mode"], serde_json::json!(["values", "updates"]));
    }
}
