use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetCpuThrottlingRateParams, SetDeviceMetricsOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::tracing::{
    EndParams, EventDataCollected, EventTracingComplete, StartParams, TraceConfig,
};
use chromiumoxide::Page;
use futures::{FutureExt, StreamExt};
use render_tunnel_runner::prelude::{
    async_trait, BrowserDriver, CaptureOptions, CaptureOutcome, RenderTunnelResult, Viewport,
};
use tokio::task::JoinHandle;

use crate::chrome_path::chrome_path;

/// Trace categories recorded during a capture. These match the defaults used by DevTools
/// performance recordings so the rendering pipeline events are included.
pub const TRACE_CATEGORIES: [&str; 11] = [
    "-*",
    "devtools.timeline",
    "v8.execute",
    "disabled-by-default-devtools.timeline",
    "disabled-by-default-devtools.timeline.frame",
    "toplevel",
    "blink.console",
    "blink.user_timing",
    "latencyInfo",
    "disabled-by-default-devtools.timeline.stack",
    "disabled-by-default-v8.cpu_profiler",
];

const LAUNCH_ARGS: [&str; 5] = [
    "--incognito",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--no-zygote",
];

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to keep draining trace chunks once tracing has been stopped.
const TRACE_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// A [BrowserDriver] backed by a locally installed Chrome or Chromium.
#[derive(Debug, Clone, Default)]
pub struct ChromeDriver {
    executable: Option<PathBuf>,
}

impl ChromeDriver {
    /// Find the browser binary, see [chrome_path].
    pub fn new() -> RenderTunnelResult<Self> {
        Ok(Self {
            executable: chrome_path()?,
        })
    }

    pub fn with_executable(executable: PathBuf) -> Self {
        Self {
            executable: Some(executable),
        }
    }

    async fn launch(&self, options: &CaptureOptions) -> RenderTunnelResult<ChromeSession> {
        let Viewport { width, height } = options.viewport;

        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .args(LAUNCH_ARGS);
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(anyhow::Error::msg)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser connection closed: {e:?}");
                    break;
                }
            }
        });

        Ok(ChromeSession { browser, handler })
    }
}

/// A browser launched for a single operation.
struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    async fn open(&self, url: &str, options: &CaptureOptions) -> anyhow::Result<Page> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to open page")?;

        page.execute(
            SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(options.viewport.width))
                .height(i64::from(options.viewport.height))
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(anyhow::Error::msg)?,
        )
        .await
        .context("Failed to set viewport")?;

        let cpu_rate = options.cpu_throttle.cpu_rate();
        if cpu_rate > 1.0 {
            page.execute(SetCpuThrottlingRateParams::new(cpu_rate))
                .await
                .context("Failed to throttle CPU")?;
        }

        page.goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {url}"))?;
        tokio::time::sleep(options.page_load_await).await;

        Ok(page)
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            log::warn!("Failed to close browser: {e:?}");
        }
        if let Err(e) = self.browser.wait().await {
            log::debug!("Failed to wait for browser to exit: {e:?}");
        }
        self.handler.abort();
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn discover_elements(
        &self,
        url: &str,
        options: &CaptureOptions,
    ) -> anyhow::Result<Vec<String>> {
        let session = self.launch(options).await?;
        let result = discover(&session, url, options).await;
        session.close().await;

        result
    }

    async fn capture_interaction_trace(
        &self,
        url: &str,
        selector: &str,
        sink: &Path,
        options: &CaptureOptions,
    ) -> anyhow::Result<CaptureOutcome> {
        let session = self.launch(options).await?;
        let result = capture(&session, url, selector, sink, options).await;
        session.close().await;

        result
    }
}

async fn discover(
    session: &ChromeSession,
    url: &str,
    options: &CaptureOptions,
) -> anyhow::Result<Vec<String>> {
    let page = session.open(url, options).await?;

    let attribute = serde_json::to_string(&options.marker_attribute)?;
    let script = format!(
        "[...document.querySelectorAll('[' + {attribute} + ']')].map((el) => el.getAttribute({attribute}))"
    );

    let element_ids: Vec<String> = page
        .evaluate(script)
        .await
        .context("Failed to query interactive elements")?
        .into_value()
        .context("Interactive element identifiers were not strings")?;

    Ok(element_ids)
}

async fn capture(
    session: &ChromeSession,
    url: &str,
    selector: &str,
    sink: &Path,
    options: &CaptureOptions,
) -> anyhow::Result<CaptureOutcome> {
    let page = session.open(url, options).await?;

    let deadline = tokio::time::Instant::now() + options.selector_timeout;
    let element = loop {
        match page.find_element(selector).await {
            Ok(element) => break element,
            Err(e) if tokio::time::Instant::now() >= deadline => {
                log::debug!("Gave up waiting for {selector}: {e:?}");
                return Ok(CaptureOutcome::NotFound);
            }
            Err(_) => tokio::time::sleep(SELECTOR_POLL_INTERVAL).await,
        }
    };

    let mut data = page.event_listener::<EventDataCollected>().await?;
    let mut complete = page.event_listener::<EventTracingComplete>().await?;

    page.execute(
        StartParams::builder()
            .trace_config(
                TraceConfig::builder()
                    .included_categories(TRACE_CATEGORIES.iter().copied())
                    .build(),
            )
            .build(),
    )
    .await
    .context("Failed to start tracing")?;

    element
        .click()
        .await
        .with_context(|| format!("Failed to click {selector}"))?;

    page.execute(EndParams::default())
        .await
        .context("Failed to stop tracing")?;

    let mut trace_events = Vec::new();
    let drained = tokio::time::timeout(TRACE_DRAIN_TIMEOUT, async {
        loop {
            tokio::select! {
                biased;
                Some(chunk) = data.next() => trace_events.extend(chunk.value.iter().cloned()),
                _ = complete.next() => break,
            }
        }
    })
    .await;
    if drained.is_err() {
        anyhow::bail!("Timed out waiting for trace data for {selector}");
    }

    // Chunks can still be queued behind the completion event.
    while let Some(Some(chunk)) = data.next().now_or_never() {
        trace_events.extend(chunk.value.iter().cloned());
    }

    log::debug!("Collected {} trace events for {selector}", trace_events.len());

    write_trace(sink, trace_events)?;

    Ok(CaptureOutcome::Captured)
}

/// Write collected events to `sink` as `{ "traceEvents": [...] }`.
fn write_trace(sink: &Path, trace_events: Vec<serde_json::Value>) -> RenderTunnelResult<()> {
    let file = std::fs::File::create(sink)
        .with_context(|| format!("Failed to create trace file {}", sink.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer(&mut writer, &serde_json::json!({ "traceEvents": trace_events }))
        .with_context(|| format!("Failed to write trace file {}", sink.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush trace file {}", sink.display()))?;

    Ok(())
}
