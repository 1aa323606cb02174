use std::path::PathBuf;

use clap::Parser;

use crate::config::{RunConfig, ThrottleSetting};

#[derive(Parser, Debug, Default)]
#[command(about, long_about = None)]
pub struct RenderTunnelCli {
    /// Path to a TOML config file. Flags given on the command line override values from the file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// URL of the page under test
    #[arg(long)]
    pub host: Option<String>,

    /// Directory to create for this run's trace artifacts. It must not already exist.
    #[arg(long)]
    pub working_dir: Option<PathBuf>,

    /// Set the threshold for an element in the format `identifier=milliseconds`. For example
    /// `--threshold=open-menu=250`.
    ///
    /// You can specify multiple thresholds by using the flag multiple times. For example
    /// `--threshold=open-menu=250 --threshold=submit=400`.
    #[arg(long, short, value_parser = parse_threshold)]
    pub threshold: Vec<(String, f64)>,

    /// Throttle the browser's CPU while capturing
    #[arg(long, value_enum)]
    pub throttle: Option<ThrottleSetting>,

    /// Keep the working directory after the run, helpful for debugging
    #[arg(long, default_value = "false")]
    pub keep_working_dir: bool,

    /// Milliseconds to wait for the page to settle after navigation
    #[arg(long)]
    pub page_load_await_ms: Option<u64>,

    /// Milliseconds to wait for each element to become selectable before skipping it
    #[arg(long)]
    pub selector_timeout_ms: Option<u64>,

    /// Show the browser window instead of running headless
    #[arg(long, default_value = "false")]
    pub headful: bool,

    /// Append a JSON line describing the run to this file
    #[arg(long)]
    pub report_path: Option<PathBuf>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[arg(long, default_value = "false")]
    pub no_progress: bool,
}

impl RenderTunnelCli {
    /// Build the run configuration from the config file, if any, with command line overrides applied.
    pub fn into_config(self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_toml_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(working_dir) = self.working_dir {
            config.working_dir = working_dir;
        }
        config.thresholds.extend(self.threshold);
        if let Some(throttle) = self.throttle {
            config.throttle = throttle;
        }
        if let Some(page_load_await_ms) = self.page_load_await_ms {
            config.page_load_await_ms = page_load_await_ms;
        }
        if let Some(selector_timeout_ms) = self.selector_timeout_ms {
            config.selector_timeout_ms = selector_timeout_ms;
        }
        if let Some(report_path) = self.report_path {
            config.report_path = Some(report_path);
        }
        config.keep_working_dir |= self.keep_working_dir;
        config.no_progress |= self.no_progress;
        if self.headful {
            config.headless = false;
        }

        Ok(config)
    }
}

fn parse_threshold(s: &str) -> anyhow::Result<(String, f64)> {
    let (name, value) = s
        .rsplit_once('=')
        .ok_or(anyhow::anyhow!("Expected `identifier=milliseconds`, got [{s}]"))?;
    if name.is_empty() {
        anyhow::bail!("No identifier specified for threshold [{s}]");
    }

    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| anyhow::anyhow!("Invalid threshold for [{name}]: {e}"))?;

    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_threshold_pairs() {
        assert_eq!(
            ("open-menu".to_string(), 250.0),
            parse_threshold("open-menu=250").unwrap()
        );
        assert_eq!(
            ("a=b".to_string(), 1.5),
            parse_threshold("a=b=1.5").unwrap()
        );
        assert!(parse_threshold("open-menu").is_err());
        assert!(parse_threshold("=250").is_err());
        assert!(parse_threshold("open-menu=fast").is_err());
    }

    #[test]
    fn command_line_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("render-tunnel.toml");
        std::fs::write(
            &config_path,
            r#"
            host = "http://localhost:8000"
            working_dir = "traces"

            [thresholds]
            2nd = 400
            3rd = 500
            "#,
        )
        .unwrap();

        let cli = RenderTunnelCli::try_parse_from([
            "click_to_paint",
            "--config",
            config_path.to_str().unwrap(),
            "--host",
            "http://127.0.0.1:9000",
            "--threshold",
            "3rd=650",
            "--throttle",
            "4X",
            "--no-progress",
        ])
        .unwrap();

        let config = cli.into_config().unwrap();
        assert_eq!("http://127.0.0.1:9000", config.host);
        assert_eq!(PathBuf::from("traces"), config.working_dir);
        assert_eq!(Some(&400.0), config.thresholds.get("2nd"));
        assert_eq!(Some(&650.0), config.thresholds.get("3rd"));
        assert_eq!(ThrottleSetting::FourX, config.throttle);
        assert!(config.no_progress);
        assert!(config.headless);
    }

    #[test]
    fn config_without_file() {
        let cli = RenderTunnelCli::try_parse_from([
            "click_to_paint",
            "--host",
            "http://localhost:8000",
            "--working-dir",
            "traces",
            "-t",
            "submit=300",
            "--headful",
        ])
        .unwrap();

        let config = cli.into_config().unwrap();
        assert_eq!(Some(&300.0), config.thresholds.get("submit"));
        assert!(!config.headless);
        assert_eq!(1000, config.page_load_await_ms);
    }
}
