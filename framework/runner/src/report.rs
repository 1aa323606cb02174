mod results_table;

use std::io::{BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tabled::settings::Style;
use tabled::Table;

use crate::config::{RunConfig, ThrottleSetting};
use crate::evaluate::{ElementResult, RunStatus};
use crate::report::results_table::{ResultRow, SkippedRow};
use render_tunnel_core::prelude::SkipElementError;

/// An element that was discovered but could not be measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedElement {
    pub name: String,
    pub reason: String,
}

impl From<&SkipElementError> for SkippedElement {
    fn from(err: &SkipElementError) -> Self {
        Self {
            name: err.element().to_string(),
            reason: err.reason().to_string(),
        }
    }
}

/// Record of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run.
    pub run_id: String,
    /// The page that was tested
    pub host: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    pub throttle: ThrottleSetting,
    pub status: RunStatus,
    pub results: Vec<ElementResult>,
    /// Elements that were discovered but produced no result
    pub skipped: Vec<SkippedElement>,
}

impl RunReport {
    pub fn new(
        run_id: String,
        config: &RunConfig,
        started_at: i64,
        results: Vec<ElementResult>,
        skipped: Vec<SkippedElement>,
    ) -> Self {
        Self {
            run_id,
            host: config.host.clone(),
            started_at,
            throttle: config.throttle,
            status: RunStatus::from_results(&results),
            results,
            skipped,
        }
    }
}

/// Print the results of a run to the console.
pub(crate) fn print_report(results: &[ElementResult], skipped: &[SkipElementError]) {
    println!("\nClick to final paint");
    let mut table = Table::new(results.iter().map(ResultRow::from));
    table.with(Style::modern());
    println!("{}", table);

    if !skipped.is_empty() {
        eprintln!("\nSkipped elements");
        let mut table = Table::new(skipped.iter().map(|s| SkippedRow {
            name: s.element().to_string(),
            reason: s.reason().to_string(),
        }));
        table.with(Style::modern());
        eprintln!("{}", table);
    }
}

/// Append the run report to a file
///
/// The report will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_report(run_report: &RunReport, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    serde_json::to_writer(&mut file, run_report)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Load run reports from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_report].
pub fn load_run_reports(path: &Path) -> anyhow::Result<Vec<RunReport>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut reports = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        reports.push(serde_json::from_str(&line)?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdMap;
    use crate::evaluate::Status;
    use pretty_assertions::assert_eq;

    fn sample_report(run_id: &str, actual: f64) -> RunReport {
        let config = RunConfig::new(
            "http://localhost:8000",
            ThresholdMap::from([("2nd".to_string(), 400.0)]),
            "traces".into(),
        );
        let status = if actual < 400.0 {
            Status::Passed
        } else {
            Status::Failed
        };
        RunReport::new(
            run_id.to_string(),
            &config,
            1_700_000_000,
            vec![ElementResult {
                name: "2nd".to_string(),
                status,
                threshold: 400.0,
                actual,
            }],
            vec![SkippedElement {
                name: "3rd".to_string(),
                reason: "selector did not appear".to_string(),
            }],
        )
    }

    #[test]
    fn report_status_follows_results() {
        assert_eq!(RunStatus::Passed, sample_report("a", 120.0).status);
        assert_eq!(RunStatus::Failed, sample_report("b", 401.0).status);
    }

    #[test]
    fn append_and_load_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_report.jsonl");

        let first = sample_report("first", 120.0);
        let second = sample_report("second", 480.0);
        append_run_report(&first, &path).unwrap();
        append_run_report(&second, &path).unwrap();

        assert_eq!(vec![first, second], load_run_reports(&path).unwrap());
    }

    #[test]
    fn skipped_element_from_error() {
        let err = SkipElementError::new("3rd", "no composite event in trace");
        assert_eq!(
            SkippedElement {
                name: "3rd".to_string(),
                reason: "no composite event in trace".to_string()
            },
            SkippedElement::from(&err)
        );
    }
}
