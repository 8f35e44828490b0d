//! # Activity Mapping
//!
//! Turns the research graph's per-node `updates` into timeline entries.
//!
//! ```text
//! generate_query   →  "Generating Search Queries"  (the queries)
//! web_research     →  "Web Research"               (source count + labels)
//! reflection       →  "Reflection"                 (done, or follow-ups)
//! finalize_answer  →  "Finalizing Answer"
//! ```
//!
//! Any other node yields nothing.

use serde_json::Value;

use crate::agent::ProcessedEvent;

/// Number of distinct source labels listed under a web research step.
const MAX_SOURCE_LABELS: usize = 3;

pub fn processed_event(node: &str, output: &Value) -> Option<ProcessedEvent> {
    match node {
        "generate_query" => Some(ProcessedEvent::new(
            "Generating Search Queries",
            string_list(output, "search_query").join(", "),
        )),
        "web_research" => {
            let sources = output
                .get("sources_gathered")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut labels: Vec<&str> = Vec::new();
            for label in sources.iter().filter_map(|s| s.get("label")?.as_str()) {
                if !label.is_empty() && !labels.contains(&label) {
                    labels.push(label);
                }
            }
            labels.truncate(MAX_SOURCE_LABELS);

            let mut data = format!("Gathered {} sources.", sources.len());
            if !labels.is_empty() {
                data.push_str(&format!(" Related to: {}.", labels.join(", ")));
            }
            Some(ProcessedEvent::new("Web Research", data))
        }
        "reflection" => {
            let sufficient = output
                .get("is_sufficient")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let data = if sufficient {
                "Search successful, generating final answer.".to_string()
            } else {
                format!(
                    "Need more information, searching for {}",
                    string_list(output, "follow_up_queries").join(", ")
                )
            };
            Some(ProcessedEvent::new("Reflection", data))
        }
        "finalize_answer" => Some(ProcessedEvent::new(
            "Finalizing Answer",
            "Composing and presenting the final answer.",
        )),
        _ => None,
    }
}

fn string_list<'a>(output: &'a Value, key: &str) -> Vec<&'a str> {
    output
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
