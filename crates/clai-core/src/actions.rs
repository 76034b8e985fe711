use std::time::Duration;

use super::history::HistoryEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    InputChar(char),
    InputPaste(String),
    Backspace,
    Submit,
    ViewHistory,
    Run,
    Explain,
    Modify,
    Copy,
    Back,
    Save,
    Cancel,
    HistoryMoveUp,
    HistoryMoveDown,
    SelectEntry,
    Exit,
}

/// Result events reported by dispatched effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeAction {
    CodeRequestFinished {
        result: Result<String, String>,
        elapsed: Duration,
    },
    ExplanationFinished {
        result: Result<String, String>,
        elapsed: Duration,
    },
    ShellRunFinished {
        result: Result<String, String>,
        elapsed: Duration,
    },
    ClipboardFinished {
        result: Result<String, String>,
    },
    HistoryLoaded {
        entries: Vec<HistoryEntry>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RequestCode {
        prompt: String,
    },
    RequestExplanation {
        command: String,
    },
    RunShell {
        command: String,
    },
    CopyToClipboard {
        text: String,
    },
    LoadHistory,
    AppendHistory {
        prompt_text: String,
        response_code: String,
    },
    PatchLastHistory {
        explanation: String,
    },
}

impl Effect {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RequestCode { .. } => "code-request",
            Self::RequestExplanation { .. } => "explanation-request",
            Self::RunShell { .. } => "shell-run",
            Self::CopyToClipboard { .. } => "clipboard-copy",
            Self::LoadHistory => "history-load",
            Self::AppendHistory { .. } => "history-append",
            Self::PatchLastHistory { .. } => "history-patch-last",
        }
    }

    /// History effects touch the shared store file and must run in dispatch order.
    pub fn is_history(&self) -> bool {
        matches!(
            self,
            Self::LoadHistory | Self::AppendHistory { .. } | Self::PatchLastHistory { .. }
        )
    }
}
