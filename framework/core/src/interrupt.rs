use tokio::sync::broadcast::{error::TryRecvError, Receiver, Sender};

/// Broadcasts a request to stop the run.
///
/// Interrupts are cooperative. Nothing already in flight is cancelled; the runner checks for an
/// interrupt between element captures and winds down from there, so cleanup always happens.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    sender: Sender<()>,
}

impl Default for InterruptHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn interrupt(&self) {
        if let Err(e) = self.sender.send(()) {
            // Nobody is listening, so there is no run left to stop.
            log::warn!("Failed to send interrupt signal: {e:?}");
        }
    }

    pub fn new_listener(&self) -> InterruptListener {
        InterruptListener {
            receiver: self.sender.subscribe(),
            interrupted: false,
        }
    }
}

#[derive(Debug)]
pub struct InterruptListener {
    receiver: Receiver<()>,
    interrupted: bool,
}

impl InterruptListener {
    /// Point in time check for an interrupt. Once this has returned true it keeps returning true.
    pub fn is_interrupted(&mut self) -> bool {
        if self.interrupted {
            return true;
        }

        self.interrupted = match self.receiver.try_recv() {
            Ok(()) | Err(TryRecvError::Lagged(_)) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
        };

        self.interrupted
    }
}
