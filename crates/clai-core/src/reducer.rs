use std::time::Duration;

use super::actions::Effect;
use super::actions::RuntimeAction;
use super::actions::SessionEvent;
use super::actions::UserAction;
use super::state::Screen;
use super::state::Session;
use super::state::TrackedEffect;
use super::state::EMPTY_PROMPT_ERROR;

pub const FAREWELL: &str = "Bye!";

/// What the program loop must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Idle,
    Dispatch(Effect),
    /// Stop the interactive loop and hand this text to the host process.
    Exit(String),
}

impl Transition {
    pub fn effect(&self) -> Option<&Effect> {
        match self {
            Self::Dispatch(effect) => Some(effect),
            Self::Idle | Self::Exit(_) => None,
        }
    }
}

pub fn reduce(session: &mut Session, event: SessionEvent) -> Transition {
    match event {
        SessionEvent::User(UserAction::Exit) => Transition::Exit(FAREWELL.to_string()),
        SessionEvent::User(action) => match session.screen {
            Screen::Prompt => reduce_prompt(session, action),
            Screen::Response => reduce_response(session, action),
            Screen::Edit => reduce_edit(session, action),
            Screen::History => reduce_history(session, action),
            Screen::Running => Transition::Idle,
        },
        SessionEvent::Runtime(action) => match session.screen {
            Screen::Prompt => reduce_prompt_runtime(session, action),
            Screen::Response => reduce_response_runtime(session, action),
            Screen::Running => reduce_running_runtime(session, action),
            Screen::History => reduce_history_runtime(session, action),
            Screen::Edit => Transition::Idle,
        },
    }
}

fn reduce_prompt(session: &mut Session, action: UserAction) -> Transition {
    // The prompt is frozen while its request is pending so the history entry
    // records exactly what was sent.
    if session.in_flight.is_active(TrackedEffect::CodeRequest) {
        return Transition::Idle;
    }

    match action {
        UserAction::InputChar(ch) => {
            session.prompt_text.push(ch);
            session.errors.clear(Screen::Prompt);
            Transition::Idle
        }
        UserAction::InputPaste(text) => {
            session.prompt_text.push_str(&text);
            session.errors.clear(Screen::Prompt);
            Transition::Idle
        }
        UserAction::Backspace => {
            session.prompt_text.pop();
            session.errors.clear(Screen::Prompt);
            Transition::Idle
        }
        UserAction::Submit => {
            if session.prompt_text.trim().is_empty() {
                session.errors.set(Screen::Prompt, EMPTY_PROMPT_ERROR);
                return Transition::Idle;
            }
            session.errors.clear(Screen::Prompt);
            session.in_flight.set(TrackedEffect::CodeRequest, true);
            Transition::Dispatch(Effect::RequestCode {
                prompt: session.prompt_text.clone(),
            })
        }
        UserAction::ViewHistory => {
            session.screen = Screen::History;
            session.history_cache.clear();
            session.history_selected = 0;
            Transition::Dispatch(Effect::LoadHistory)
        }
        _ => Transition::Idle,
    }
}

fn reduce_prompt_runtime(session: &mut Session, action: RuntimeAction) -> Transition {
    match action {
        RuntimeAction::CodeRequestFinished { result, elapsed } => {
            session.in_flight.set(TrackedEffect::CodeRequest, false);
            session.last_elapsed = Some(elapsed);
            match result {
                Ok(code) => {
                    session.response_code = code;
                    session.explanation_text.clear();
                    session.response_is_latest_entry = true;
                    session.errors.clear(Screen::Prompt);
                    session.errors.clear(Screen::Response);
                    session.screen = Screen::Response;
                    Transition::Dispatch(Effect::AppendHistory {
                        prompt_text: session.prompt_text.clone(),
                        response_code: session.response_code.clone(),
                    })
                }
                Err(err) => {
                    session.errors.set(Screen::Prompt, err);
                    Transition::Idle
                }
            }
        }
        _ => Transition::Idle,
    }
}

fn reduce_response(session: &mut Session, action: UserAction) -> Transition {
    let explaining = session
        .in_flight
        .is_active(TrackedEffect::ExplanationRequest);

    match action {
        UserAction::Run => {
            session.errors.clear(Screen::Response);
            session.screen = Screen::Running;
            Transition::Dispatch(Effect::RunShell {
                command: session.response_code.clone(),
            })
        }
        UserAction::Explain if !explaining => {
            session.errors.clear(Screen::Response);
            session
                .in_flight
                .set(TrackedEffect::ExplanationRequest, true);
            Transition::Dispatch(Effect::RequestExplanation {
                command: session.response_code.clone(),
            })
        }
        // Leaving Response while an explanation is pending would drop its
        // result and strand the in-flight flag.
        UserAction::Modify if !explaining => {
            session.edit_buffer = session.response_code.clone();
            session.screen = Screen::Edit;
            Transition::Idle
        }
        UserAction::Copy => {
            session.errors.clear(Screen::Response);
            Transition::Dispatch(Effect::CopyToClipboard {
                text: session.response_code.clone(),
            })
        }
        UserAction::Back if !explaining => {
            session.prompt_text.clear();
            session.response_code.clear();
            session.explanation_text.clear();
            session.response_is_latest_entry = false;
            session.errors.clear(Screen::Response);
            session.screen = Screen::Prompt;
            Transition::Idle
        }
        _ => Transition::Idle,
    }
}

fn reduce_response_runtime(session: &mut Session, action: RuntimeAction) -> Transition {
    match action {
        RuntimeAction::ExplanationFinished { result, elapsed } => {
            session
                .in_flight
                .set(TrackedEffect::ExplanationRequest, false);
            session.last_elapsed = Some(elapsed);
            match result {
                Ok(explanation) => {
                    session.explanation_text = explanation;
                    session.errors.clear(Screen::Response);
                    if session.response_is_latest_entry {
                        Transition::Dispatch(Effect::PatchLastHistory {
                            explanation: session.explanation_text.clone(),
                        })
                    } else {
                        Transition::Idle
                    }
                }
                Err(err) => {
                    session.errors.set(Screen::Response, err);
                    Transition::Idle
                }
            }
        }
        RuntimeAction::ClipboardFinished { result } => match result {
            Ok(confirmation) => Transition::Exit(confirmation),
            Err(err) => {
                session.errors.set(Screen::Response, err);
                Transition::Idle
            }
        },
        _ => Transition::Idle,
    }
}

fn reduce_edit(session: &mut Session, action: UserAction) -> Transition {
    match action {
        UserAction::InputChar(ch) => {
            session.edit_buffer.push(ch);
            Transition::Idle
        }
        UserAction::InputPaste(text) => {
            session.edit_buffer.push_str(&text);
            Transition::Idle
        }
        UserAction::Backspace => {
            session.edit_buffer.pop();
            Transition::Idle
        }
        UserAction::Save => {
            let edited = std::mem::take(&mut session.edit_buffer);
            if edited != session.response_code {
                session.response_code = edited;
                session.explanation_text.clear();
            }
            session.screen = Screen::Response;
            Transition::Idle
        }
        UserAction::Cancel => {
            session.edit_buffer.clear();
            session.screen = Screen::Response;
            Transition::Idle
        }
        _ => Transition::Idle,
    }
}

fn reduce_running_runtime(session: &mut Session, action: RuntimeAction) -> Transition {
    match action {
        RuntimeAction::ShellRunFinished { result, elapsed } => {
            session.last_elapsed = Some(elapsed);
            Transition::Exit(run_report(&session.response_code, elapsed, &result))
        }
        _ => Transition::Idle,
    }
}

fn reduce_history(session: &mut Session, action: UserAction) -> Transition {
    match action {
        UserAction::HistoryMoveUp => {
            session.history_selected = session.history_selected.saturating_sub(1);
            Transition::Idle
        }
        UserAction::HistoryMoveDown => {
            if session.history_selected + 1 < session.history_cache.len() {
                session.history_selected += 1;
            }
            Transition::Idle
        }
        UserAction::SelectEntry => {
            let Some(entry) = session.selected_history_entry().cloned() else {
                return Transition::Idle;
            };
            session.response_code = entry.response_code;
            session.explanation_text = entry.response_explanation;
            session.response_is_latest_entry = false;
            session.errors.clear(Screen::Response);
            session.screen = Screen::Response;
            Transition::Idle
        }
        _ => Transition::Idle,
    }
}

fn reduce_history_runtime(session: &mut Session, action: RuntimeAction) -> Transition {
    match action {
        RuntimeAction::HistoryLoaded { entries } => {
            session.history_cache = entries;
            session.history_selected = 0;
            Transition::Idle
        }
        _ => Transition::Idle,
    }
}

/// Final text printed after a run: the command, its timing, then its output.
pub fn run_report(command: &str, elapsed: Duration, result: &Result<String, String>) -> String {
    let took = format!("Took {:.1}s", elapsed.as_secs_f64());
    match result {
        Ok(stdout) => format!("\n\n{command}\n\n{took}\n\n{stdout}"),
        Err(err) => format!("\n\n{command}\n\n{took}\n\nCommand failed: {err}"),
    }
}

#[cfg(test)]
mod tests;
