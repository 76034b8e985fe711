use std::sync::Mutex;
use std::sync::PoisonError;

use crate::contracts::ClipboardSink;
use crate::error::ExecError;

pub const COPY_CONFIRMATION: &str = "Command copied to clipboard!";

/// System clipboard backed by `arboard`.
///
/// The handle is opened on the first copy and kept for as long as this value
/// lives, so the copied text stays served until the owner is dropped. Dropping
/// it hands the text to a running clipboard manager on X11; without one the
/// text is gone once the process exits.
#[derive(Default)]
pub struct SystemClipboard {
    owner: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn holds_selection(&self) -> bool {
        self.owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl ClipboardSink for SystemClipboard {
    fn copy(&self, text: &str) -> Result<String, ExecError> {
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        if owner.is_none() {
            let opened =
                arboard::Clipboard::new().map_err(|err| ExecError::Clipboard(err.to_string()))?;
            *owner = Some(opened);
        }
        let Some(clipboard) = owner.as_mut() else {
            return Err(ExecError::Clipboard("clipboard unavailable".to_string()));
        };
        if let Err(err) = clipboard.set_text(text.to_string()) {
            *owner = None;
            return Err(ExecError::Clipboard(err.to_string()));
        }
        tracing::debug!(bytes = text.len(), "copied to clipboard");
        Ok(COPY_CONFIRMATION.to_string())
    }
}
