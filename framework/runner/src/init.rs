use crate::cli::RenderTunnelCli;
use clap::Parser;

/// Initialise the CLI and logging for the render tunnel runner.
pub fn init() -> RenderTunnelCli {
    env_logger::init();

    RenderTunnelCli::parse()
}
