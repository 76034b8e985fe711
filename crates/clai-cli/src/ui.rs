use std::io;
use std::sync::mpsc::Receiver;
use std::sync::OnceLock;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use chrono::Local;
use crossterm::event::DisableBracketedPaste;
use crossterm::event::EnableBracketedPaste;
use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::event;
use crossterm::execute;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use ratatui::backend::Backend;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Constraint;
use ratatui::layout::Direction;
use ratatui::layout::Layout;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::List;
use ratatui::widgets::ListItem;
use ratatui::widgets::ListState;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Wrap;
use ratatui::Frame;
use ratatui::Terminal;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;

use clai_core::reduce;
use clai_core::RuntimeAction;
use clai_core::Screen;
use clai_core::Session;
use clai_core::SessionEvent;
use clai_core::TrackedEffect;
use clai_core::Transition;
use clai_core::UserAction;

use crate::dispatch::EffectDispatcher;
use crate::handoff::HandoffSender;

const POLL_INTERVAL: Duration = Duration::from_millis(16);
const CODE_THEME: &str = "base16-ocean.dark";

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

fn get_syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn get_theme_set() -> &'static ThemeSet {
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

struct TuiGuard;

impl Drop for TuiGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            LeaveAlternateScreen,
            DisableBracketedPaste,
            crossterm::cursor::Show
        );
    }
}

#[derive(Clone, Copy)]
struct UiPalette {
    accent: Color,
    danger: Color,
    muted: Color,
    border: Color,
    selected_bg: Color,
}

const PALETTE: UiPalette = UiPalette {
    accent: Color::Cyan,
    danger: Color::Red,
    muted: Color::DarkGray,
    border: Color::Gray,
    selected_bg: Color::Rgb(40, 44, 52),
};

/// Runs the interactive session until it produces its final output, then
/// restores the terminal and hands the output over.
pub fn run(
    dispatcher: EffectDispatcher,
    results: Receiver<RuntimeAction>,
    handoff: HandoffSender,
) -> io::Result<()> {
    let output = {
        enable_raw_mode()?;
        let _guard = TuiGuard;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableBracketedPaste,
            crossterm::cursor::Hide
        )?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        let mut session = Session::new();
        run_app(&mut terminal, &mut session, &dispatcher, &results)?
    };

    tracing::info!("session finished");
    handoff.send(output);
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    session: &mut Session,
    dispatcher: &EffectDispatcher,
    results: &Receiver<RuntimeAction>,
) -> io::Result<String> {
    loop {
        while let Ok(action) = results.try_recv() {
            if let Some(output) = apply(session, SessionEvent::Runtime(action), dispatcher) {
                return Ok(output);
            }
        }

        terminal.draw(|f| draw(f, session))?;

        if event::poll(POLL_INTERVAL)? {
            let action = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => map_key(session.screen, key),
                Event::Paste(text) => Some(UserAction::InputPaste(text)),
                _ => None,
            };
            if let Some(action) = action {
                if let Some(output) = apply(session, SessionEvent::User(action), dispatcher) {
                    return Ok(output);
                }
            }
        }
    }
}

fn apply(session: &mut Session, event: SessionEvent, dispatcher: &EffectDispatcher) -> Option<String> {
    match reduce(session, event) {
        Transition::Idle => None,
        Transition::Dispatch(effect) => {
            drop(dispatcher.dispatch(effect));
            None
        }
        Transition::Exit(output) => Some(output),
    }
}

fn map_key(screen: Screen, key: KeyEvent) -> Option<UserAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(UserAction::Exit);
    }

    match screen {
        Screen::Prompt => match key.code {
            KeyCode::Char('s') if ctrl => Some(UserAction::Submit),
            KeyCode::Char('h') if ctrl => Some(UserAction::ViewHistory),
            KeyCode::Enter => Some(UserAction::Submit),
            KeyCode::Backspace => Some(UserAction::Backspace),
            KeyCode::Char(ch) if !ctrl => Some(UserAction::InputChar(ch)),
            _ => None,
        },
        Screen::Response => match key.code {
            KeyCode::Enter => Some(UserAction::Run),
            KeyCode::Char('e') => Some(UserAction::Explain),
            KeyCode::Char('m') => Some(UserAction::Modify),
            KeyCode::Char('c') => Some(UserAction::Copy),
            KeyCode::Esc => Some(UserAction::Back),
            _ => None,
        },
        Screen::Edit => match key.code {
            KeyCode::Enter => Some(UserAction::Save),
            KeyCode::Esc => Some(UserAction::Cancel),
            KeyCode::Backspace => Some(UserAction::Backspace),
            KeyCode::Char(ch) if !ctrl => Some(UserAction::InputChar(ch)),
            _ => None,
        },
        Screen::History => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(UserAction::HistoryMoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(UserAction::HistoryMoveDown),
            KeyCode::Enter => Some(UserAction::SelectEntry),
            _ => None,
        },
        Screen::Running => None,
    }
}

fn footer_hint(screen: Screen) -> &'static str {
    match screen {
        Screen::Prompt => "Enter/Ctrl+S submit | Ctrl+H history | Ctrl+C quit",
        Screen::Response => "Enter run | e explain | m modify | c copy | Esc back | Ctrl+C quit",
        Screen::Running => "Ctrl+C quit",
        Screen::Edit => "Enter save | Esc cancel | Ctrl+C quit",
        Screen::History => "Up/k Down/j move | Enter select | Ctrl+C quit",
    }
}

fn get_spinner() -> &'static str {
    let frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    frames[(millis / 100) as usize % frames.len()]
}

fn draw(f: &mut Frame, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    match session.screen {
        Screen::Prompt => render_prompt(f, chunks[0], session),
        Screen::Response => render_response(f, chunks[0], session),
        Screen::Running => render_running(f, chunks[0], session),
        Screen::Edit => render_edit(f, chunks[0], session),
        Screen::History => render_history(f, chunks[0], session),
    }

    let footer = Paragraph::new(footer_hint(session.screen))
        .style(Style::default().fg(PALETTE.muted));
    f.render_widget(footer, chunks[1]);
}

fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PALETTE.border))
        .title(Span::styled(
            format!(" {title} "),
            Style::default()
                .fg(PALETTE.accent)
                .add_modifier(Modifier::BOLD),
        ))
}

fn input_line(text: &str, show_cursor: bool) -> Line<'static> {
    let mut spans = vec![Span::raw(text.to_string())];
    if show_cursor {
        spans.push(Span::styled("_", Style::default().fg(PALETTE.accent)));
    }
    Line::from(spans)
}

/// Error first, then a pending-request spinner, then the last timing.
fn status_line(session: &Session, pending: Option<&str>, show_timing: bool) -> Line<'static> {
    if let Some(error) = session.active_error() {
        return Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(PALETTE.danger),
        ));
    }
    if let Some(label) = pending {
        return Line::from(Span::styled(
            format!("{} {label}", get_spinner()),
            Style::default().fg(PALETTE.accent),
        ));
    }
    match session.last_elapsed.filter(|_| show_timing) {
        Some(elapsed) => Line::from(Span::styled(
            took_label(elapsed),
            Style::default().fg(PALETTE.muted),
        )),
        None => Line::default(),
    }
}

fn took_label(elapsed: Duration) -> String {
    format!("Took {:.1}s", elapsed.as_secs_f64())
}

fn render_prompt(f: &mut Frame, area: Rect, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let requesting = session.in_flight.is_active(TrackedEffect::CodeRequest);
    let input = Paragraph::new(input_line(&session.prompt_text, !requesting))
        .block(titled_block(Screen::Prompt.label()))
        .wrap(Wrap { trim: false });
    f.render_widget(input, chunks[0]);

    let pending = requesting.then_some("Making request...");
    f.render_widget(
        Paragraph::new(status_line(session, pending, false)),
        chunks[1],
    );
}

fn render_response(f: &mut Frame, area: Rect, session: &Session) {
    let code_lines = highlight_command(&session.response_code);
    let code_height = code_lines.len() as u16 + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(code_height),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let code = Paragraph::new(code_lines)
        .block(titled_block(Screen::Response.label()))
        .wrap(Wrap { trim: false });
    f.render_widget(code, chunks[0]);

    let explaining = session
        .in_flight
        .is_active(TrackedEffect::ExplanationRequest);
    let pending = explaining.then_some("Explaining...");
    f.render_widget(Paragraph::new(status_line(session, pending, true)), chunks[1]);

    if !session.explanation_text.is_empty() {
        let explanation = Paragraph::new(session.explanation_text.clone())
            .block(titled_block("Explanation"))
            .wrap(Wrap { trim: false });
        f.render_widget(explanation, chunks[2]);
    }
}

fn render_running(f: &mut Frame, area: Rect, session: &Session) {
    let code_lines = highlight_command(&session.response_code);
    let code_height = code_lines.len() as u16 + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(code_height),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let code = Paragraph::new(code_lines)
        .block(titled_block(Screen::Running.label()))
        .wrap(Wrap { trim: false });
    f.render_widget(code, chunks[0]);

    let spinner = Line::from(Span::styled(
        format!("{} Running command...", get_spinner()),
        Style::default().fg(PALETTE.accent),
    ));
    f.render_widget(Paragraph::new(spinner), chunks[1]);
}

fn render_edit(f: &mut Frame, area: Rect, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let input = Paragraph::new(input_line(&session.edit_buffer, true))
        .block(titled_block(Screen::Edit.label()))
        .wrap(Wrap { trim: false });
    f.render_widget(input, chunks[0]);
}

fn render_history(f: &mut Frame, area: Rect, session: &Session) {
    let block = titled_block(Screen::History.label());
    if session.history_cache.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No past queries yet",
            Style::default().fg(PALETTE.muted),
        ))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = session
        .history_cache
        .iter()
        .map(|entry| {
            let stamp = entry
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string();
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!("{stamp}  "), Style::default().fg(PALETTE.muted)),
                    Span::raw(entry.prompt_text.clone()),
                ]),
                Line::from(Span::styled(
                    format!("  {}", entry.response_code),
                    Style::default().fg(PALETTE.accent),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(PALETTE.selected_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(session.history_selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn highlight_command(command: &str) -> Vec<Line<'static>> {
    let ps = get_syntax_set();
    let ts = get_theme_set();
    let Some(theme) = ts.themes.get(CODE_THEME) else {
        return command
            .lines()
            .map(|line| Line::from(line.to_string()))
            .collect();
    };
    let syntax = ps
        .find_syntax_by_extension("sh")
        .unwrap_or_else(|| ps.find_syntax_plain_text());
    let mut h = HighlightLines::new(syntax, theme);

    command
        .lines()
        .map(|line| {
            let ranges: Vec<(syntect::highlighting::Style, &str)> =
                h.highlight_line(line, ps).unwrap_or_default();
            if ranges.is_empty() {
                return Line::from(line.to_string());
            }
            let spans: Vec<Span<'static>> = ranges
                .into_iter()
                .map(|(style, text)| {
                    let fg = Color::Rgb(style.foreground.r, style.foreground.g, style.foreground.b);
                    Span::styled(text.to_string(), Style::default().fg(fg))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;
    use clai_core::HistoryEntry;
    use pretty_assertions::assert_eq;
    use ratatui::backend::TestBackend;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn rendered(session: &Session) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 16)).expect("terminal");
        terminal.draw(|f| draw(f, session)).expect("draw");
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn ctrl_c_exits_from_every_screen() {
        for screen in Screen::ALL {
            assert_eq!(map_key(screen, ctrl('c')), Some(UserAction::Exit));
        }
    }

    #[test]
    fn prompt_keys() {
        assert_eq!(
            map_key(Screen::Prompt, key(KeyCode::Char('l'))),
            Some(UserAction::InputChar('l'))
        );
        assert_eq!(map_key(Screen::Prompt, ctrl('s')), Some(UserAction::Submit));
        assert_eq!(
            map_key(Screen::Prompt, key(KeyCode::Enter)),
            Some(UserAction::Submit)
        );
        assert_eq!(
            map_key(Screen::Prompt, ctrl('h')),
            Some(UserAction::ViewHistory)
        );
        assert_eq!(map_key(Screen::Prompt, ctrl('x')), None);
    }

    #[test]
    fn response_letters_are_commands_not_text() {
        assert_eq!(
            map_key(Screen::Response, key(KeyCode::Char('e'))),
            Some(UserAction::Explain)
        );
        assert_eq!(
            map_key(Screen::Response, key(KeyCode::Char('m'))),
            Some(UserAction::Modify)
        );
        assert_eq!(
            map_key(Screen::Response, key(KeyCode::Char('c'))),
            Some(UserAction::Copy)
        );
        assert_eq!(
            map_key(Screen::Response, key(KeyCode::Enter)),
            Some(UserAction::Run)
        );
        assert_eq!(
            map_key(Screen::Response, key(KeyCode::Esc)),
            Some(UserAction::Back)
        );
        assert_eq!(map_key(Screen::Response, key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn edit_and_history_keys() {
        assert_eq!(
            map_key(Screen::Edit, key(KeyCode::Char('e'))),
            Some(UserAction::InputChar('e'))
        );
        assert_eq!(map_key(Screen::Edit, key(KeyCode::Enter)), Some(UserAction::Save));
        assert_eq!(map_key(Screen::Edit, key(KeyCode::Esc)), Some(UserAction::Cancel));
        assert_eq!(
            map_key(Screen::History, key(KeyCode::Char('j'))),
            Some(UserAction::HistoryMoveDown)
        );
        assert_eq!(
            map_key(Screen::History, key(KeyCode::Up)),
            Some(UserAction::HistoryMoveUp)
        );
        assert_eq!(
            map_key(Screen::History, key(KeyCode::Enter)),
            Some(UserAction::SelectEntry)
        );
        assert_eq!(map_key(Screen::Running, key(KeyCode::Enter)), None);
    }

    #[test]
    fn prompt_screen_shows_error() {
        let mut session = Session::new();
        session.errors.set(Screen::Prompt, "Prompt cannot be empty");

        let text = rendered(&session);
        assert!(text.contains("Your prompt"));
        assert!(text.contains("Prompt cannot be empty"));
    }

    #[test]
    fn prompt_screen_shows_pending_request() {
        let mut session = Session::new();
        session.prompt_text = "list files".to_string();
        session.in_flight.set(TrackedEffect::CodeRequest, true);

        let text = rendered(&session);
        assert!(text.contains("list files"));
        assert!(text.contains("Making request..."));
    }

    #[test]
    fn response_screen_shows_command_timing_and_explanation() {
        let mut session = Session::new();
        session.screen = Screen::Response;
        session.response_code = "ls -la".to_string();
        session.explanation_text = "- `-la` long listing".to_string();
        session.last_elapsed = Some(Duration::from_millis(1234));

        let text = rendered(&session);
        assert!(text.contains("ls -la"));
        assert!(text.contains("Took 1.2s"));
        assert!(text.contains("long listing"));
        assert!(text.contains("e explain"));
    }

    #[test]
    fn history_screen_lists_entries() {
        let mut session = Session::new();
        session.screen = Screen::History;
        let at = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("timestamp");
        session.history_cache = vec![HistoryEntry::new(at, "show disk usage", "du -sh .")];

        let text = rendered(&session);
        assert!(text.contains("show disk usage"));
        assert!(text.contains("du -sh ."));
    }

    #[test]
    fn empty_history_has_placeholder() {
        let mut session = Session::new();
        session.screen = Screen::History;
        assert!(rendered(&session).contains("No past queries yet"));
    }

    #[test]
    fn highlighted_command_keeps_text() {
        let lines = highlight_command("find . -name '*.rs'\necho done");
        let flattened: Vec<String> = lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect();
        assert_eq!(flattened, vec!["find . -name '*.rs'", "echo done"]);
    }
}
