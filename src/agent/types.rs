use serde::{Deserialize, Deserializer, Serialize};

/// Model identifiers offered when the config file doesn't list its own.
pub const SUPPORTED_MODELS: [&str; 2] = ["gemini-1.5-pro-latest", "gemini-1.5-flash-latest"];

/// Who authored a transcript entry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Human,
    Ai,
    /// Tool, system and remove messages. Kept so snapshots deserialize, never rendered.
    #[serde(other)]
    Other,
}

/// One transcript entry as the LangGraph server reports it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(deserialize_with = "content_as_text")]
    pub content: String,
}

impl Message {
    pub fn human(id: String, content: String) -> Self {
        Self {
            id: Some(id),
            kind: MessageType::Human,
            content,
        }
    }

    pub fn ai(id: Option<String>, content: String) -> Self {
        Self {
            id,
            kind: MessageType::Ai,
            content,
        }
    }

    pub fn is_ai(&self) -> bool {
        self.kind == MessageType::Ai
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.kind, MessageType::Human | MessageType::Ai)
    }
}

/// Message content is either a plain string or a list of typed parts.
/// Only the `text` of each part survives; images and tool stubs are dropped.
fn content_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Content {
        Text(String),
        Parts(Vec<serde_json::Value>),
    }

    Ok(match Content::deserialize(deserializer)? {
        Content::Text(s) => s,
        Content::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                serde_json::Value::String(s) => Some(s.as_str()),
                other => other.get("text").and_then(|t| t.as_str()),
            })
            .collect::<Vec<_>>()
            .join(""),
    })
}

/// One entry of the agent's progress log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEvent {
    pub title: String,
    pub data: String,
}

impl ProcessedEvent {
    pub fn new(title: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            data: data.into(),
        }
    }
}

/// How hard the agent should research before answering.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    #[default]
    Low,
    Medium,
    High,
}

impl Effort {
    /// Cycles to the next effort level (wraps around)
    pub fn next(self) -> Effort {
        match self {
            Effort::Low => Effort::Medium,
            Effort::Medium => Effort::High,
            Effort::High => Effort::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Effort::Low => "Low",
            Effort::Medium => "Medium",
            Effort::High => "High",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Effort::Low => "low",
            Effort::Medium => "medium",
            Effort::High => "high",
        }
    }

    /// `(initial_search_query_count, max_research_loops)` sent to the graph.
    pub fn search_budget(self) -> (u32, u32) {
        match self {
            Effort::Low => (1, 1),
            Effort::Medium => (3, 3),
            Effort::High => (5, 10),
        }
    }
}

/// Everything needed to start one research turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// `None` until the first turn has created a server thread.
    pub thread_id: Option<String>,
    pub message_id: String,
    pub query: String,
    pub effort: Effort,
    pub model: String,
}

/// How far the graph's research loop got, as reported in `values` snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResearchProgress {
    pub loops_completed: u32,
    /// The reflection step judged the gathered material sufficient.
    pub is_sufficient: bool,
}

/// Events decoded from the run's SSE stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Server acknowledged the run.
    Metadata { run_id: String },
    /// One graph node finished; `node` is its name, `output` what it returned.
    Update {
        node: String,
        output: serde_json::Value,
    },
    /// Full message list after a step.
    Messages(Vec<Message>),
    /// Research loop counters from the same snapshot.
    Progress(ResearchProgress),
    Error(String),
    End,
}
