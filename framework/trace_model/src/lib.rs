//! Model of a captured rendering trace and the analysis that reduces it to a click to final paint
//! timing.

mod analyze;
mod artifact;
mod event;

pub use analyze::{analyze, TimingSummary};
pub use artifact::{
    element_id_from_file_name, load_trace_file, parse_trace, trace_file_name, TraceFile,
    TraceParseError,
};
pub use event::{RenderPhase, TraceEvent, INTERACTION_MARKER_TYPE};
