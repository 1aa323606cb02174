use crate::event::TraceEvent;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

const TRACE_FILE_PREFIX: &str = "trace.";
const TRACE_FILE_SUFFIX: &str = ".json";

/// The on-disk shape of a captured trace, `{ "traceEvents": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraceFile {
    #[serde(rename = "traceEvents")]
    pub trace_events: Vec<TraceEvent>,
}

#[derive(Error, Debug)]
pub enum TraceParseError {
    #[error("Failed to read trace file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Trace is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Trace has no `traceEvents`")]
    MissingTraceEvents,
}

// `traceEvents` is optional here so that a missing or null key gets its own error.
#[derive(Deserialize)]
struct RawTraceFile {
    #[serde(rename = "traceEvents", default)]
    trace_events: Option<Vec<TraceEvent>>,
}

/// Parse a trace artifact from a reader.
pub fn parse_trace<R: Read>(reader: R) -> Result<TraceFile, TraceParseError> {
    let raw: RawTraceFile = serde_json::from_reader(std::io::BufReader::new(reader))?;
    let trace_events = raw
        .trace_events
        .ok_or(TraceParseError::MissingTraceEvents)?;

    Ok(TraceFile { trace_events })
}

/// Load a trace artifact from a file.
pub fn load_trace_file(path: &Path) -> Result<TraceFile, TraceParseError> {
    let file = std::fs::File::open(path).map_err(|source| TraceParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(file)
}

/// The artifact file name for an element identifier, `trace.<id>.json`.
pub fn trace_file_name(element_id: &str) -> String {
    format!("{TRACE_FILE_PREFIX}{element_id}{TRACE_FILE_SUFFIX}")
}

/// Recover the element identifier from an artifact file name.
///
/// Returns `None` for names that don't follow the `trace.<id>.json` convention. Identifiers may
/// themselves contain dots.
pub fn element_id_from_file_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(TRACE_FILE_PREFIX)?
        .strip_suffix(TRACE_FILE_SUFFIX)
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_trace_events() {
        let trace = parse_trace(
            r#"{"traceEvents":[{"name":"CompositeLayers","ts":10,"dur":2}],"metadata":{}}"#
                .as_bytes(),
        )
        .unwrap();

        assert_eq!(
            TraceFile {
                trace_events: vec![TraceEvent::new("CompositeLayers", 10, 2)]
            },
            trace
        );
    }

    #[test]
    fn missing_trace_events_is_an_error() {
        let err = parse_trace(r#"{"metadata":{}}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, TraceParseError::MissingTraceEvents));

        let err = parse_trace(r#"{"traceEvents":null}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, TraceParseError::MissingTraceEvents));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = parse_trace("{\"traceEvents\":[".as_bytes()).unwrap_err();
        assert!(matches!(err, TraceParseError::Json(_)));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(trace_file_name("2nd"));
        std::fs::write(&path, r#"{"traceEvents":[]}"#).unwrap();

        assert_eq!(TraceFile::default(), load_trace_file(&path).unwrap());

        let err = load_trace_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, TraceParseError::Read { .. }));
    }

    #[test]
    fn file_names_map_back_to_identifiers() {
        assert_eq!("trace.2nd.json", trace_file_name("2nd"));
        assert_eq!(Some("2nd"), element_id_from_file_name("trace.2nd.json"));
        assert_eq!(
            Some("menu.open"),
            element_id_from_file_name(&trace_file_name("menu.open"))
        );
        assert_eq!(None, element_id_from_file_name("trace..json"));
        assert_eq!(None, element_id_from_file_name("notes.txt"));
        assert_eq!(None, element_id_from_file_name("trace.2nd.json.tmp"));
    }
}
