use serde::{Deserialize, Serialize};

use crate::config::ThresholdMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Passed,
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Passed => f.write_str("Passed"),
            Status::Failed => f.write_str("Failed"),
        }
    }
}

/// The verdict for a single element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementResult {
    /// The element identifier.
    pub name: String,
    pub status: Status,
    /// The configured threshold, in milliseconds.
    pub threshold: f64,
    /// The measured click to final paint latency, in milliseconds.
    pub actual: f64,
}

/// No usable threshold is configured for a discovered element.
///
/// This is a configuration problem rather than a test failure. A run that hits it has incomplete
/// coverage by construction, so it fails the run instead of skipping the element.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq)]
#[display("No threshold configured for element [{name}]")]
pub struct MissingThresholdError {
    pub name: String,
}

/// The usable threshold for an element. A threshold of `0` or NaN is treated as missing.
pub fn threshold_for(name: &str, thresholds: &ThresholdMap) -> Result<f64, MissingThresholdError> {
    thresholds
        .get(name)
        .copied()
        .filter(|t| *t != 0.0 && !t.is_nan())
        .ok_or_else(|| MissingThresholdError {
            name: name.to_string(),
        })
}

/// Compare a measured latency against the element's threshold.
///
/// The element passes only if it is strictly faster than its threshold. A threshold of `0` or NaN
/// is treated as missing.
pub fn evaluate(
    name: &str,
    total_duration_ms: f64,
    thresholds: &ThresholdMap,
) -> Result<ElementResult, MissingThresholdError> {
    let threshold = threshold_for(name, thresholds)?;

    let status = if total_duration_ms < threshold {
        Status::Passed
    } else {
        Status::Failed
    };

    Ok(ElementResult {
        name: name.to_string(),
        status,
        threshold,
        actual: total_duration_ms,
    })
}

/// The overall verdict for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Passed,
    Failed,
}

impl RunStatus {
    /// A run fails if any one of its results failed.
    pub fn from_results(results: &[ElementResult]) -> Self {
        results
            .iter()
            .fold(RunStatus::Passed, |status, result| match result.status {
                Status::Passed => status,
                Status::Failed => RunStatus::Failed,
            })
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            RunStatus::Passed => 0,
            RunStatus::Failed => 1,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Passed => f.write_str("Passed"),
            RunStatus::Failed => f.write_str("Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn thresholds() -> ThresholdMap {
        ThresholdMap::from([
            ("2nd".to_string(), 400.0),
            ("3rd".to_string(), 500.0),
            ("zero".to_string(), 0.0),
        ])
    }

    #[test]
    fn slower_than_threshold_fails() {
        let result = evaluate("2nd", 401.0, &thresholds()).unwrap();
        assert_eq!(Status::Failed, result.status);
    }

    #[test]
    fn faster_than_threshold_passes() {
        let result = evaluate("3rd", 499.0, &thresholds()).unwrap();
        assert_eq!(
            ElementResult {
                name: "3rd".to_string(),
                status: Status::Passed,
                threshold: 500.0,
                actual: 499.0,
            },
            result
        );
    }

    #[test]
    fn equal_to_threshold_fails() {
        let result = evaluate("3rd", 500.0, &thresholds()).unwrap();
        assert_eq!(Status::Failed, result.status);
    }

    #[test]
    fn missing_threshold_is_an_error() {
        for name in ["1st", "4th", ""] {
            assert_eq!(
                Err(MissingThresholdError {
                    name: name.to_string()
                }),
                evaluate(name, 10.0, &thresholds())
            );
        }
    }

    #[test]
    fn zero_threshold_counts_as_missing() {
        let err = evaluate("zero", 10.0, &thresholds()).unwrap_err();
        assert_eq!("No threshold configured for element [zero]", err.to_string());
    }

    #[test]
    fn threshold_lookup() {
        assert_eq!(Ok(400.0), threshold_for("2nd", &thresholds()));
        assert!(threshold_for("zero", &thresholds()).is_err());
        assert!(threshold_for("4th", &thresholds()).is_err());

        let nan = ThresholdMap::from([("nan".to_string(), f64::NAN)]);
        assert_eq!(
            Err(MissingThresholdError {
                name: "nan".to_string()
            }),
            threshold_for("nan", &nan)
        );
    }

    #[test]
    fn run_fails_if_any_result_failed() {
        let passed = evaluate("3rd", 100.0, &thresholds()).unwrap();
        let failed = evaluate("2nd", 900.0, &thresholds()).unwrap();

        assert_eq!(RunStatus::Passed, RunStatus::from_results(&[]));
        assert_eq!(
            RunStatus::Passed,
            RunStatus::from_results(&[passed.clone(), passed.clone()])
        );
        assert_eq!(
            RunStatus::Failed,
            RunStatus::from_results(&[passed.clone(), failed, passed])
        );
    }
}
