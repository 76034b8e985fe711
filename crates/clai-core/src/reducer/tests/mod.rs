use std::time::Duration;

use chrono::TimeZone;
use chrono::Utc;
use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use super::Transition;
pub(super) use super::FAREWELL;
pub(super) use crate::actions::Effect;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::SessionEvent;
pub(super) use crate::actions::UserAction;
pub(super) use crate::history::HistoryEntry;
pub(super) use crate::state::Screen;
pub(super) use crate::state::Session;
pub(super) use crate::state::TrackedEffect;
pub(super) use crate::state::EMPTY_PROMPT_ERROR;

mod history_screen;

fn session() -> Session {
    Session::new()
}

fn user(session: &mut Session, action: UserAction) -> Transition {
    reduce(session, SessionEvent::User(action))
}

fn runtime(session: &mut Session, action: RuntimeAction) -> Transition {
    reduce(session, SessionEvent::Runtime(action))
}

fn type_text(session: &mut Session, text: &str) {
    for ch in text.chars() {
        assert_eq!(user(session, UserAction::InputChar(ch)), Transition::Idle);
    }
}

fn elapsed() -> Duration {
    Duration::from_millis(1500)
}

fn code_ok(code: &str) -> RuntimeAction {
    RuntimeAction::CodeRequestFinished {
        result: Ok(code.to_string()),
        elapsed: elapsed(),
    }
}

fn explanation_ok(text: &str) -> RuntimeAction {
    RuntimeAction::ExplanationFinished {
        result: Ok(text.to_string()),
        elapsed: elapsed(),
    }
}

fn history_entry(minute: u32, prompt: &str, code: &str, explanation: &str) -> HistoryEntry {
    let created_at = Utc
        .with_ymd_and_hms(2024, 5, 1, 9, minute, 0)
        .single()
        .expect("valid timestamp");
    let mut entry = HistoryEntry::new(created_at, prompt, code);
    entry.response_explanation = explanation.to_string();
    entry
}

/// Session sitting on the Response screen for `code`, reached through a
/// successful code request for `prompt`.
fn response_session(prompt: &str, code: &str) -> Session {
    let mut session = session();
    type_text(&mut session, prompt);
    let submitted = user(&mut session, UserAction::Submit);
    assert!(matches!(submitted, Transition::Dispatch(Effect::RequestCode { .. })));
    let appended = runtime(&mut session, code_ok(code));
    assert!(matches!(appended, Transition::Dispatch(Effect::AppendHistory { .. })));
    assert_eq!(session.screen, Screen::Response);
    session
}
