use serde::{Deserialize, Deserializer, Serialize};

/// The `args.data.type` value that marks the simulated user interaction in a trace.
pub const INTERACTION_MARKER_TYPE: &str = "click";

/// A single event from a captured rendering trace.
///
/// Only the fields used by the analysis are modelled. Anything else the trace producer emits is
/// ignored when deserializing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraceEvent {
    /// The rendering pipeline phase, or any other event name the browser emits.
    #[serde(default)]
    pub name: String,
    /// Free-form event arguments. The interaction marker is found under `args.data.type`.
    #[serde(default)]
    pub args: serde_json::Value,
    /// Start timestamp in microseconds.
    ///
    /// Monotonic within one trace but with no meaningful origin across traces.
    #[serde(default, deserialize_with = "micros")]
    pub ts: i64,
    /// Duration in microseconds, zero for instant events.
    #[serde(default, deserialize_with = "micros")]
    pub dur: i64,
}

impl TraceEvent {
    pub fn new(name: impl Into<String>, ts: i64, dur: i64) -> Self {
        Self {
            name: name.into(),
            args: serde_json::Value::Null,
            ts,
            dur,
        }
    }

    /// Set `args.data.type`, replacing any existing arguments.
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.args = serde_json::json!({ "data": { "type": data_type.into() } });
        self
    }

    /// The `args.data.type` sub-classifier, if the event carries one.
    pub fn data_type(&self) -> Option<&str> {
        self.args.get("data")?.get("type")?.as_str()
    }

    pub fn is_interaction_marker(&self) -> bool {
        self.data_type() == Some(INTERACTION_MARKER_TYPE)
    }

    pub fn phase(&self) -> RenderPhase {
        RenderPhase::from_name(&self.name)
    }
}

/// The rendering pipeline phases the analysis knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPhase {
    Layout,
    UpdateLayoutTree,
    Paint,
    /// The browser committed a composited frame.
    CompositeLayers,
    Unclassified,
}

impl RenderPhase {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Layout" => RenderPhase::Layout,
            "UpdateLayoutTree" => RenderPhase::UpdateLayoutTree,
            "Paint" => RenderPhase::Paint,
            "CompositeLayers" => RenderPhase::CompositeLayers,
            _ => RenderPhase::Unclassified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderPhase::Layout => "Layout",
            RenderPhase::UpdateLayoutTree => "UpdateLayoutTree",
            RenderPhase::Paint => "Paint",
            RenderPhase::CompositeLayers => "CompositeLayers",
            RenderPhase::Unclassified => "Unclassified",
        }
    }
}

impl std::fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Trace producers disagree on whether timestamps are integers, so accept either and truncate.
fn micros<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(match value {
        None => 0,
        Some(n) => match n.as_i64() {
            Some(v) => v,
            None => n.as_f64().map(|v| v.trunc() as i64).unwrap_or_default(),
        },
    })
}
