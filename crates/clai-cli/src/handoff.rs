//! One-shot channel carrying the final output from the interactive loop to
//! the host process once the terminal has been restored.

use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvError;
use std::sync::mpsc::SyncSender;

pub struct HandoffSender {
    tx: SyncSender<String>,
}

pub struct HandoffReceiver {
    rx: Receiver<String>,
}

pub fn channel() -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = mpsc::sync_channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

impl HandoffSender {
    /// Consumes the sender; a gone receiver is not an error.
    pub fn send(self, output: String) {
        if self.tx.try_send(output).is_err() {
            tracing::debug!("handoff receiver already gone");
        }
    }
}

impl HandoffReceiver {
    /// Blocks until the loop hands off, or fails if the sender was dropped unused.
    pub fn recv(self) -> Result<String, RecvError> {
        self.rx.recv()
    }
}
