use super::*;
use pretty_assertions::assert_eq;

fn loaded_history() -> Session {
    let mut session = session();
    user(&mut session, UserAction::ViewHistory);
    runtime(
        &mut session,
        RuntimeAction::HistoryLoaded {
            entries: vec![
                history_entry(3, "current dir", "pwd", ""),
                history_entry(2, "disk usage", "du -sh .", "- du: disk usage"),
                history_entry(1, "list files", "ls -la", ""),
            ],
        },
    );
    session
}

#[test]
fn load_result_populates_cache() {
    let session = loaded_history();

    assert_eq!(session.screen, Screen::History);
    assert_eq!(session.history_cache.len(), 3);
    assert_eq!(session.history_selected, 0);
    assert_eq!(
        session.selected_history_entry().map(|e| e.response_code.as_str()),
        Some("pwd")
    );
}

#[test]
fn selection_moves_within_bounds() {
    let mut session = loaded_history();

    user(&mut session, UserAction::HistoryMoveUp);
    assert_eq!(session.history_selected, 0);

    for _ in 0..5 {
        user(&mut session, UserAction::HistoryMoveDown);
    }
    assert_eq!(session.history_selected, 2);
}

#[test]
fn selecting_entry_loads_code_and_explanation() {
    let mut session = loaded_history();
    user(&mut session, UserAction::HistoryMoveDown);

    assert_eq!(user(&mut session, UserAction::SelectEntry), Transition::Idle);

    assert_eq!(session.screen, Screen::Response);
    assert_eq!(session.response_code, "du -sh .");
    assert_eq!(session.explanation_text, "- du: disk usage");
    assert!(!session.response_is_latest_entry);
}

#[test]
fn selecting_from_empty_history_is_noop() {
    let mut session = session();
    user(&mut session, UserAction::ViewHistory);
    runtime(&mut session, RuntimeAction::HistoryLoaded { entries: Vec::new() });
    let before = session.clone();

    assert_eq!(user(&mut session, UserAction::SelectEntry), Transition::Idle);
    assert_eq!(session, before);
}

#[test]
fn explaining_an_older_entry_does_not_patch_history() {
    let mut session = loaded_history();
    user(&mut session, UserAction::HistoryMoveDown);
    user(&mut session, UserAction::HistoryMoveDown);
    user(&mut session, UserAction::SelectEntry);
    user(&mut session, UserAction::Explain);

    let transition = runtime(&mut session, explanation_ok("- ls: list"));

    assert_eq!(transition, Transition::Idle);
    assert_eq!(session.explanation_text, "- ls: list");
}

#[test]
fn revisiting_history_drops_the_stale_list() {
    let mut session = loaded_history();
    user(&mut session, UserAction::SelectEntry);
    user(&mut session, UserAction::Back);
    assert_eq!(session.screen, Screen::Prompt);

    let transition = user(&mut session, UserAction::ViewHistory);

    assert_eq!(transition, Transition::Dispatch(Effect::LoadHistory));
    assert!(session.history_cache.is_empty());
    assert_eq!(user(&mut session, UserAction::SelectEntry), Transition::Idle);
    assert_eq!(session.screen, Screen::History);
}
