/// Result type for a `main` function that drives a [crate::run::TraceRunner] and for
/// [crate::driver::BrowserDriver] implementations.
pub type RenderTunnelResult<T> = anyhow::Result<T>;
