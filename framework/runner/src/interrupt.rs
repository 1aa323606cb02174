use render_tunnel_core::prelude::InterruptHandle;
use tokio::signal;

use crate::executor::Executor;

/// Forward Ctrl-C to the run's interrupt handle.
pub(crate) fn start_interrupt_listener(executor: &Executor, handle: InterruptHandle) {
    executor.spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("Received interrupt, stopping after the current element...");
                handle.interrupt();
            }
            Err(e) => {
                log::warn!("Failed to listen for Ctrl-C, the run cannot be interrupted: {e:?}");
            }
        }
    });
}
