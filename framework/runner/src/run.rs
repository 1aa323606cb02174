use std::path::Path;

use anyhow::Context;
use itertools::Itertools;
use render_tunnel_core::prelude::{InterruptHandle, InterruptListener, SkipElementError};
use render_tunnel_trace_model::{analyze, element_id_from_file_name, load_trace_file, trace_file_name};

use crate::config::RunConfig;
use crate::driver::{element_selector, BrowserDriver, CaptureOptions, CaptureOutcome};
use crate::evaluate::{evaluate, threshold_for, ElementResult, RunStatus};
use crate::executor::Executor;
use crate::interrupt::start_interrupt_listener;
use crate::progress::CaptureProgress;
use crate::report::{append_run_report, print_report, RunReport, SkippedElement};
use crate::workdir::WorkDir;

/// The stages a run moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RunPhase {
    Idle,
    ValidatingConfig,
    PreparingWorkspace,
    DiscoveringElements,
    CapturingTraces,
    AnalyzingTraces,
    Reporting,
    CleaningUp,
    Terminal,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: String,
    pub results: Vec<ElementResult>,
    pub skipped: Vec<SkipElementError>,
    /// The error that ended the run early, if any.
    pub error: Option<anyhow::Error>,
    /// The phases the run went through, ending with [RunPhase::Terminal].
    pub phases: Vec<RunPhase>,
}

impl RunOutcome {
    /// Failed if the run ended with an error or any element missed its threshold.
    pub fn status(&self) -> RunStatus {
        if self.error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::from_results(&self.results)
        }
    }

    /// The process exit code for this run, `0` only if every measured element met its threshold.
    pub fn exit_code(&self) -> u8 {
        self.status().exit_code()
    }
}

struct RunState {
    run_id: String,
    started_at: i64,
    phase: RunPhase,
    phases: Vec<RunPhase>,
    results: Vec<ElementResult>,
    skipped: Vec<SkipElementError>,
}

impl RunState {
    fn new() -> Self {
        Self {
            run_id: nanoid::nanoid!(),
            started_at: chrono::Utc::now().timestamp(),
            phase: RunPhase::Idle,
            phases: vec![RunPhase::Idle],
            results: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        log::debug!("Run {} moving from {} to {}", self.run_id, self.phase, phase);
        self.phase = phase;
        self.phases.push(phase);
    }

    fn skip(&mut self, err: SkipElementError) {
        log::error!("{err}");
        self.skipped.push(err);
    }
}

/// Measures click to final paint for every marked element on a page.
///
/// Elements are captured one at a time, each in a fresh browser session, and then every trace in
/// the working directory is analyzed and compared against its threshold.
pub struct TraceRunner<D: BrowserDriver> {
    config: RunConfig,
    driver: D,
    interrupt: InterruptHandle,
    // Subscribed up front so that an interrupt sent before the run starts is not missed.
    interrupt_listener: InterruptListener,
    listen_for_ctrl_c: bool,
}

impl<D: BrowserDriver> TraceRunner<D> {
    pub fn new(config: RunConfig, driver: D) -> Self {
        let interrupt = InterruptHandle::default();
        let interrupt_listener = interrupt.new_listener();

        Self {
            config,
            driver,
            interrupt,
            interrupt_listener,
            listen_for_ctrl_c: false,
        }
    }

    /// Stop the run cleanly when the process receives Ctrl-C.
    pub fn with_ctrl_c_listener(mut self) -> Self {
        self.listen_for_ctrl_c = true;
        self
    }

    /// A handle that can be used to stop the run before the next element is captured.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the run.
    ///
    /// This never returns an error. Failures are captured in the [RunOutcome] and reflected in its
    /// [RunOutcome::exit_code]. The working directory is released before this returns, whether or
    /// not the run succeeded.
    pub fn run(mut self) -> RunOutcome {
        let mut state = RunState::new();
        log::info!("Starting run {} against {}", state.run_id, self.config.host);

        let error = match self.execute(&mut state) {
            Ok(()) => None,
            Err(e) => {
                log::error!("Run {} failed: {e:?}", state.run_id);
                Some(e)
            }
        };
        state.enter(RunPhase::Terminal);

        let outcome = RunOutcome {
            run_id: state.run_id,
            results: state.results,
            skipped: state.skipped,
            error,
            phases: state.phases,
        };
        log::info!(
            "Run {} finished: {} with exit code {}",
            outcome.run_id,
            outcome.status(),
            outcome.exit_code()
        );

        outcome
    }

    fn execute(&mut self, state: &mut RunState) -> anyhow::Result<()> {
        state.enter(RunPhase::ValidatingConfig);
        self.config.validate()?;

        let executor = Executor::new()?;
        if self.listen_for_ctrl_c {
            start_interrupt_listener(&executor, self.interrupt.clone());
        }

        state.enter(RunPhase::PreparingWorkspace);
        let work_dir = WorkDir::create(
            &self.config.working_dir,
            self.config.keep_working_dir,
            self.config.trash_dir.as_deref(),
            &state.run_id,
        )?;

        // If anything in here panics, dropping the guard still releases the directory.
        let result = self.execute_in_work_dir(&executor, work_dir.path(), state);

        state.enter(RunPhase::CleaningUp);
        let released = work_dir.release();

        finish_with_cleanup(result, released)
    }

    fn execute_in_work_dir(
        &mut self,
        executor: &Executor,
        work_dir: &Path,
        state: &mut RunState,
    ) -> anyhow::Result<()> {
        let options = CaptureOptions::from(&self.config);

        state.enter(RunPhase::DiscoveringElements);
        let element_ids = executor
            .execute_in_place(self.driver.discover_elements(&self.config.host, &options))
            .context("Failed to discover interactive elements")?;
        log::info!(
            "Discovered {} elements with the [{}] attribute",
            element_ids.len(),
            self.config.marker_attribute
        );

        // Every discovered element needs a threshold, even one that later ends up skipped.
        for element_id in &element_ids {
            threshold_for(element_id, &self.config.thresholds)?;
        }

        state.enter(RunPhase::CapturingTraces);
        self.capture_traces(executor, work_dir, &element_ids, &options, state)?;

        state.enter(RunPhase::AnalyzingTraces);
        self.analyze_traces(work_dir, state)?;

        state.enter(RunPhase::Reporting);
        print_report(&state.results, &state.skipped);
        if let Some(report_path) = &self.config.report_path {
            let report = RunReport::new(
                state.run_id.clone(),
                &self.config,
                state.started_at,
                state.results.clone(),
                state.skipped.iter().map(SkippedElement::from).collect(),
            );
            append_run_report(&report, report_path).with_context(|| {
                format!("Failed to write run report to {}", report_path.display())
            })?;
        }

        Ok(())
    }

    fn capture_traces(
        &mut self,
        executor: &Executor,
        work_dir: &Path,
        element_ids: &[String],
        options: &CaptureOptions,
        state: &mut RunState,
    ) -> anyhow::Result<()> {
        let progress = CaptureProgress::start(element_ids.len(), !self.config.no_progress);

        for element_id in element_ids {
            if self.interrupt_listener.is_interrupted() {
                anyhow::bail!("Run interrupted before capturing [{element_id}]");
            }

            match self.capture_element(executor, work_dir, element_id, options) {
                Ok(()) => {}
                Err(e) => match e.downcast::<SkipElementError>() {
                    Ok(skip) => state.skip(skip),
                    Err(e) => return Err(e),
                },
            }

            progress.element_done(element_id);
        }

        progress.finish();

        Ok(())
    }

    fn capture_element(
        &self,
        executor: &Executor,
        work_dir: &Path,
        element_id: &str,
        options: &CaptureOptions,
    ) -> anyhow::Result<()> {
        if element_id.is_empty() || element_id.contains(['/', '\\']) {
            return Err(SkipElementError::new(
                element_id,
                "identifier cannot be used as a trace file name",
            )
            .into());
        }

        let sink = work_dir.join(trace_file_name(element_id));
        let selector = element_selector(&self.config.marker_attribute, element_id);

        let outcome = executor
            .execute_in_place(self.driver.capture_interaction_trace(
                &self.config.host,
                &selector,
                &sink,
                options,
            ))
            .with_context(|| format!("Failed to capture trace for [{element_id}]"))?;

        match outcome {
            CaptureOutcome::Captured => {
                log::info!("Captured trace for [{element_id}]");
                Ok(())
            }
            CaptureOutcome::NotFound => Err(SkipElementError::new(
                element_id,
                format!(
                    "selector {selector} did not appear within {}ms",
                    options.selector_timeout.as_millis()
                ),
            )
            .into()),
        }
    }

    fn analyze_traces(&self, work_dir: &Path, state: &mut RunState) -> anyhow::Result<()> {
        let mut trace_files = Vec::new();
        for entry in std::fs::read_dir(work_dir)
            .with_context(|| format!("Failed to read working directory {}", work_dir.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                trace_files.push(entry.path());
            }
        }

        for path in trace_files.into_iter().sorted() {
            let Some(element_id) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(element_id_from_file_name)
                .map(str::to_string)
            else {
                log::warn!("Ignoring unexpected file {} in working directory", path.display());
                continue;
            };

            match self.analyze_trace(&element_id, &path) {
                Ok(result) => state.results.push(result),
                Err(e) => match e.downcast::<SkipElementError>() {
                    Ok(skip) => state.skip(skip),
                    Err(e) => return Err(e),
                },
            }
        }

        Ok(())
    }

    fn analyze_trace(&self, element_id: &str, path: &Path) -> anyhow::Result<ElementResult> {
        threshold_for(element_id, &self.config.thresholds)?;

        let trace = load_trace_file(path).map_err(|e| {
            SkipElementError::new(element_id, format!("failed to parse trace: {e}"))
        })?;

        let summary = analyze(&trace.trace_events);
        if summary.marker_count == 0 {
            return Err(SkipElementError::new(element_id, "no interaction marker in trace").into());
        }
        if summary.composite_count == 0 {
            return Err(SkipElementError::new(element_id, "no composite event in trace").into());
        }
        if !summary.has_final_composite() {
            return Err(SkipElementError::new(
                element_id,
                "no composite event with a positive timestamp in trace",
            )
            .into());
        }
        if summary.marker_count > 1 {
            log::warn!(
                "Trace for [{element_id}] has {} interaction markers, measuring from the last one",
                summary.marker_count
            );
        }

        let total_duration_ms = summary.total_duration_ms().ok_or_else(|| {
            SkipElementError::new(element_id, "trace timestamps overflow the latency calculation")
        })?;
        log::debug!("Summary for [{element_id}]: {summary:?}, total {total_duration_ms}ms");

        let result = evaluate(element_id, total_duration_ms, &self.config.thresholds)?;

        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("Failed to remove analyzed trace {}: {e}", path.display());
        }

        Ok(result)
    }
}

/// The run error takes precedence over a cleanup error, which is logged so that it isn't lost.
fn finish_with_cleanup<T>(
    result: anyhow::Result<()>,
    released: anyhow::Result<T>,
) -> anyhow::Result<()> {
    match (result, released) {
        (Ok(()), released) => {
            released.context("Failed to clean up working directory")?;
            Ok(())
        }
        (Err(e), Err(cleanup)) => {
            log::error!("Failed to clean up working directory after run error: {cleanup:?}");
            Err(e)
        }
        (Err(e), Ok(_)) => Err(e),
    }
}
