use render_tunnel_chrome::prelude::*;
use std::process::ExitCode;

fn main() -> RenderTunnelResult<ExitCode> {
    let cli = init();
    let config = cli.into_config()?;

    let driver = ChromeDriver::new()?;
    log::info!(
        "Measuring click to final paint for [{}] elements on {}",
        config.marker_attribute,
        config.host
    );

    let outcome = TraceRunner::new(config, driver).with_ctrl_c_listener().run();
    if let Some(e) = &outcome.error {
        eprintln!("Run failed: {e:#}");
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
