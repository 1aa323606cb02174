mod cli;
mod config;
mod driver;
mod evaluate;
mod executor;
mod init;
mod interrupt;
mod progress;
mod report;
mod run;
mod types;
mod workdir;

pub mod prelude {
    pub use crate::cli::RenderTunnelCli;
    pub use crate::config::{ConfigError, RunConfig, ThresholdMap, ThrottleSetting, Viewport};
    pub use crate::driver::{element_selector, BrowserDriver, CaptureOptions, CaptureOutcome};
    pub use crate::evaluate::{
        evaluate, threshold_for, ElementResult, MissingThresholdError, RunStatus, Status,
    };
    pub use crate::init::init;
    pub use crate::report::{append_run_report, load_run_reports, RunReport, SkippedElement};
    pub use crate::run::{RunOutcome, RunPhase, TraceRunner};
    pub use crate::types::RenderTunnelResult;
    pub use crate::workdir::WorkDir;

    /// Re-export for implementing [BrowserDriver].
    pub use async_trait::async_trait;

    pub use render_tunnel_core::prelude::*;
    pub use render_tunnel_trace_model::{
        analyze, element_id_from_file_name, trace_file_name, TimingSummary, TraceEvent, TraceFile,
    };
}
