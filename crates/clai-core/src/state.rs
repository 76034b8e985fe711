use std::collections::BTreeMap;
use std::time::Duration;

use super::history::HistoryEntry;

pub const EMPTY_PROMPT_ERROR: &str = "Prompt cannot be empty";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Screen {
    #[default]
    Prompt,
    Response,
    Running,
    Edit,
    History,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::Prompt,
        Screen::Response,
        Screen::Running,
        Screen::Edit,
        Screen::History,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Prompt => "Your prompt",
            Self::Response => "Result",
            Self::Running => "Running command",
            Self::Edit => "Edit the result command",
            Self::History => "Your past queries",
        }
    }
}

/// Effect kinds that may only have one request pending at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedEffect {
    CodeRequest,
    ExplanationRequest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlight {
    code_request: bool,
    explanation_request: bool,
}

impl InFlight {
    pub fn is_active(&self, kind: TrackedEffect) -> bool {
        match kind {
            TrackedEffect::CodeRequest => self.code_request,
            TrackedEffect::ExplanationRequest => self.explanation_request,
        }
    }

    pub fn set(&mut self, kind: TrackedEffect, active: bool) {
        match kind {
            TrackedEffect::CodeRequest => self.code_request = active,
            TrackedEffect::ExplanationRequest => self.explanation_request = active,
        }
    }

    pub fn any(&self) -> bool {
        self.code_request || self.explanation_request
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenErrors {
    by_screen: BTreeMap<Screen, String>,
}

impl ScreenErrors {
    pub fn get(&self, screen: Screen) -> Option<&str> {
        self.by_screen.get(&screen).map(String::as_str)
    }

    pub fn set(&mut self, screen: Screen, message: impl Into<String>) {
        self.by_screen.insert(screen, message.into());
    }

    pub fn clear(&mut self, screen: Screen) {
        self.by_screen.remove(&screen);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub screen: Screen,
    pub prompt_text: String,
    pub response_code: String,
    pub edit_buffer: String,
    pub explanation_text: String,
    /// True while `response_code` came from this session's own code request,
    /// i.e. it is the most recently appended history entry.
    pub response_is_latest_entry: bool,
    pub in_flight: InFlight,
    pub errors: ScreenErrors,
    /// Newest entry first.
    pub history_cache: Vec<HistoryEntry>,
    pub history_selected: usize,
    pub last_elapsed: Option<Duration>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_error(&self) -> Option<&str> {
        self.errors.get(self.screen)
    }

    pub fn selected_history_entry(&self) -> Option<&HistoryEntry> {
        self.history_cache.get(self.history_selected)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn in_flight_flags_are_independent() {
        let mut flags = InFlight::default();
        flags.set(TrackedEffect::CodeRequest, true);

        assert!(flags.is_active(TrackedEffect::CodeRequest));
        assert!(!flags.is_active(TrackedEffect::ExplanationRequest));
        assert!(flags.any());

        flags.set(TrackedEffect::CodeRequest, false);
        assert!(!flags.any());
    }

    #[test]
    fn new_session_starts_on_prompt() {
        let session = Session::new();
        assert_eq!(session.screen, Screen::Prompt);
        assert_eq!(session.active_error(), None);
    }

    #[test]
    fn screen_errors_are_scoped_per_screen() {
        let mut errors = ScreenErrors::default();
        errors.set(Screen::Prompt, "boom");

        assert_eq!(errors.get(Screen::Prompt), Some("boom"));
        assert_eq!(errors.get(Screen::Response), None);

        errors.clear(Screen::Prompt);
        assert_eq!(errors, ScreenErrors::default());
    }
}
