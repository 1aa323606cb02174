use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{RunConfig, ThrottleSetting, Viewport};

/// What happened when capturing a trace for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The element was clicked and the trace written to the sink.
    Captured,
    /// The element never became selectable within the selector timeout.
    NotFound,
}

/// Browser options passed through to the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    pub marker_attribute: String,
    pub headless: bool,
    pub viewport: Viewport,
    pub cpu_throttle: ThrottleSetting,
    pub page_load_await: Duration,
    pub selector_timeout: Duration,
}

impl From<&RunConfig> for CaptureOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            marker_attribute: config.marker_attribute.clone(),
            headless: config.headless,
            viewport: config.viewport,
            cpu_throttle: config.throttle,
            page_load_await: config.page_load_await(),
            selector_timeout: config.selector_timeout(),
        }
    }
}

/// Drives a browser on behalf of the runner.
///
/// Each call is expected to launch and dispose of its own browser session so that captures don't
/// influence each other.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to `url` and return the value of [CaptureOptions::marker_attribute] for every
    /// element carrying it, in document order.
    async fn discover_elements(
        &self,
        url: &str,
        options: &CaptureOptions,
    ) -> anyhow::Result<Vec<String>>;

    /// Navigate to `url`, wait for `selector`, then click it while recording a rendering trace to
    /// `sink` as `{ "traceEvents": [...] }`.
    ///
    /// Return [CaptureOutcome::NotFound] rather than an error if the selector doesn't appear in
    /// time, errors are treated as fatal to the run.
    async fn capture_interaction_trace(
        &self,
        url: &str,
        selector: &str,
        sink: &Path,
        options: &CaptureOptions,
    ) -> anyhow::Result<CaptureOutcome>;
}

/// CSS attribute selector for the element with the given identifier, `[attr="id"]`.
pub fn element_selector(marker_attribute: &str, element_id: &str) -> String {
    let escaped = element_id.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[{marker_attribute}=\"{escaped}\"]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn selector_for_plain_identifier() {
        assert_eq!("[data-click=\"2nd\"]", element_selector("data-click", "2nd"));
    }

    #[test]
    fn selector_escapes_quotes_and_backslashes() {
        assert_eq!(
            r#"[data-click="say \"hi\" \\ bye"]"#,
            element_selector("data-click", r#"say "hi" \ bye"#)
        );
    }

    #[test]
    fn options_follow_config() {
        let config = RunConfig {
            throttle: ThrottleSetting::FourX,
            page_load_await_ms: 250,
            selector_timeout_ms: 5000,
            ..Default::default()
        };

        let options = CaptureOptions::from(&config);
        assert_eq!(ThrottleSetting::FourX, options.cpu_throttle);
        assert_eq!(Duration::from_millis(250), options.page_load_await);
        assert_eq!(Duration::from_secs(5), options.selector_timeout);
        assert_eq!("data-click", options.marker_attribute);
    }
}
