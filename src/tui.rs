//! TUI (Terminal User Interface) for NBA Mantle
//!
//! This module provides an interactive terminal interface using Ratatui.
//!
//! # Layout
//! - Title with the current mode
//! - Guess input with the suggestion dropdown beneath it
//! - Ranked guess history, or the answer and similar players once a round ends
//! - Status line and key help
//!
//! Drawing only happens when the controller's revision moves or the terminal
//! is resized. Input is polled with a short timeout so responses arriving from
//! the network show up without a key press.

use crate::cli::{reveal_message, win_message};
use crate::game_state::{GameInterface, UserAction};
use crate::session::{Phase, SessionController};
use crate::suggestions::NavKey;
use crate::{debug_log, info_log};
use crossterm::{
    cursor,
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io;
use std::time::Duration;

const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(50);
const ASCII_CONTROL_CHAR_THRESHOLD: u32 = 32;
const NAME_COLUMN_WIDTH: usize = 26;

// Style constants for consistent UI
const HEADER_STYLE: Style = Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD);
const ERROR_STYLE: Style = Style::new().fg(Color::Red);
const SUCCESS_STYLE: Style = Style::new().fg(Color::Green).add_modifier(Modifier::BOLD);
const INFO_STYLE: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);
const SELECTED_STYLE: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
const DIM_STYLE: Style = Style::new().fg(Color::Gray);

fn score_color(score: u8) -> Color {
    match score {
        100 => Color::Green,
        70..=99 => Color::LightGreen,
        40..=69 => Color::Yellow,
        _ => Color::Red,
    }
}

/// Map a key press to an action given the current game state.
pub fn key_action(key: KeyEvent, controller: &SessionController) -> Option<UserAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    match key.code {
        KeyCode::Char('c' | 'q') if ctrl => return Some(UserAction::Exit),
        KeyCode::F(2) => return Some(UserAction::NewGame),
        KeyCode::F(3) => return Some(UserAction::ToggleMode),
        KeyCode::F(4) => return Some(UserAction::Reveal),
        _ => {}
    }

    if controller.phase().is_finished() {
        return match key.code {
            KeyCode::Char('n' | 'N') => Some(UserAction::NewGame),
            KeyCode::Char('m' | 'M') => Some(UserAction::ToggleMode),
            KeyCode::Esc => Some(UserAction::Exit),
            _ => None,
        };
    }

    let input = controller.suggestions().input();
    match key.code {
        KeyCode::Esc if controller.suggestions().is_open() => Some(UserAction::Key(NavKey::Escape)),
        KeyCode::Esc => Some(UserAction::Exit),
        KeyCode::Up => Some(UserAction::Key(NavKey::Up)),
        KeyCode::Down => Some(UserAction::Key(NavKey::Down)),
        KeyCode::Enter => Some(UserAction::Key(NavKey::Enter)),
        KeyCode::Backspace if !input.is_empty() => {
            let mut text = input.to_string();
            text.pop();
            Some(UserAction::Edit(text))
        }
        KeyCode::Char(c) if !ctrl && !alt => Some(UserAction::Edit(format!("{input}{c}"))),
        _ => None,
    }
}

/// Index of the suggestion under the pointer, if any.
pub fn suggestion_at(panel: Rect, column: u16, row: u16) -> Option<usize> {
    let inner = Block::default().borders(Borders::ALL).inner(panel);
    let inside = column >= inner.x
        && column < inner.x + inner.width
        && row >= inner.y
        && row < inner.y + inner.height;
    inside.then(|| usize::from(row - inner.y))
}

fn status_text(controller: &SessionController) -> String {
    let session = controller.session();
    let target = session.target.as_deref().unwrap_or("?");
    match session.phase {
        Phase::Loading => "Loading players...".to_string(),
        Phase::Won => win_message(target, session.guess_count),
        Phase::Revealed => reveal_message(target),
        Phase::Active if session.pending => "Waiting for the server...".to_string(),
        Phase::Active => match session.history.best() {
            Some(best) => format!(
                "Guesses: {} | Best: {} ({})",
                session.guess_count, best.matched_name, best.score
            ),
            None => format!("Guesses: 0 | {} players to choose from", controller.roster().len()),
        },
    }
}

fn instructions(phase: Phase) -> &'static str {
    match phase {
        Phase::Won | Phase::Revealed => "N/F2: New Game | M/F3: Switch Mode | ESC: Quit",
        _ => "Type a name | ↑↓: Select | ENTER: Guess | F2: New Game | F3: Switch Mode | F4: Give Up | ESC: Quit",
    }
}

/// Draw the whole screen. Returns the suggestion panel area when it is shown.
pub fn draw_frame(f: &mut Frame, controller: &SessionController) -> Option<Rect> {
    let engine = controller.suggestions();
    let panel_height = if engine.is_open() {
        u16::try_from(engine.suggestions().len().max(1)).unwrap_or(u16::MAX).saturating_add(2)
    } else {
        0
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Title
            Constraint::Length(3),            // Input
            Constraint::Length(panel_height), // Suggestions
            Constraint::Min(6),               // History or results
            Constraint::Length(3),            // Status
            Constraint::Length(3),            // Instructions
        ])
        .split(f.area());

    render_title(f, chunks[0], controller);
    render_input(f, chunks[1], controller);
    let panel = engine.is_open().then(|| {
        render_suggestions(f, chunks[2], controller);
        chunks[2]
    });
    render_body(f, chunks[3], controller);
    render_status(f, chunks[4], controller);
    render_instructions(f, chunks[5], controller.phase());
    panel
}

fn render_title(f: &mut Frame, area: Rect, controller: &SessionController) {
    let title = Paragraph::new(format!("NBA MANTLE - {}", controller.mode().label()))
        .style(HEADER_STYLE)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn render_input(f: &mut Frame, area: Rect, controller: &SessionController) {
    let input = controller.suggestions().input();
    let accepting = controller.phase() == Phase::Active && !controller.session().pending;
    let line = if accepting {
        Line::from(vec![Span::raw(input.to_string()), Span::styled("_", INFO_STYLE)])
    } else {
        Line::from(Span::styled(input.to_string(), DIM_STYLE))
    };
    let paragraph =
        Paragraph::new(line).block(Block::default().title("Guess a player").borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn render_suggestions(f: &mut Frame, area: Rect, controller: &SessionController) {
    let engine = controller.suggestions();
    let lines: Vec<Line> = if engine.suggestions().is_empty() {
        vec![Line::from(Span::styled("No matching players", DIM_STYLE))]
    } else {
        engine
            .suggestions()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if engine.selected() == Some(i) {
                    Line::from(Span::styled(format!("> {name}"), SELECTED_STYLE))
                } else {
                    Line::from(format!("  {name}"))
                }
            })
            .collect()
    };
    let paragraph =
        Paragraph::new(lines).block(Block::default().title("Suggestions").borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, area: Rect, controller: &SessionController) {
    let session = controller.session();
    let mut lines = Vec::new();

    if let Some(advisory) = &session.advisory {
        lines.push(Line::from(Span::styled(advisory.clone(), ERROR_STYLE)));
        lines.push(Line::from(""));
    }

    if session.phase.is_finished() {
        let target = session.target.as_deref().unwrap_or("?");
        let message = if session.phase == Phase::Won {
            win_message(target, session.guess_count)
        } else {
            reveal_message(target)
        };
        lines.push(Line::from(Span::styled(message, SUCCESS_STYLE)));
        lines.push(Line::from(""));
        if !session.similar.is_empty() {
            lines.push(Line::from(Span::styled("Most similar players:", HEADER_STYLE)));
            for (rank, entity) in session.similar.iter().enumerate() {
                lines.push(Line::from(vec![
                    Span::raw(format!("  {}. {:<width$} ", rank + 1, entity.name, width = NAME_COLUMN_WIDTH)),
                    Span::styled(format!("{:>3}", entity.score), Style::default().fg(score_color(entity.score))),
                ]));
            }
            lines.push(Line::from(""));
        }
    }

    if !session.history.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Your guesses ({}):", session.guess_count),
            INFO_STYLE,
        )));
        for (rank, entry) in session.history.entries().iter().enumerate() {
            let mut spans = vec![
                Span::raw(format!("{:>3}. {:<width$} ", rank + 1, entry.matched_name, width = NAME_COLUMN_WIDTH)),
                Span::styled(
                    format!("{:>3}", entry.score),
                    Style::default().fg(score_color(entry.score)).add_modifier(Modifier::BOLD),
                ),
            ];
            let factors: Vec<String> = entry
                .contributing_factors()
                .map(|(name, value)| format!("{} {value:.0}", name.replace('_', " ")))
                .collect();
            if !factors.is_empty() {
                spans.push(Span::styled(format!("  {}", factors.join(" · ")), DIM_STYLE));
            }
            lines.push(Line::from(spans));
        }
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title("Guesses").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_status(f: &mut Frame, area: Rect, controller: &SessionController) {
    let paragraph = Paragraph::new(status_text(controller))
        .style(HEADER_STYLE)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(paragraph, area);
}

fn render_instructions(f: &mut Frame, area: Rect, phase: Phase) {
    let paragraph = Paragraph::new(instructions(phase))
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

/// Main TUI interface component.
///
/// Owns the terminal; raw mode, mouse capture and focus reporting are turned
/// off again on drop.
pub struct TuiInterface {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    suggestion_panel: Option<Rect>,
    drawn_revision: Option<u64>,
}

impl TuiInterface {
    pub fn new() -> Result<Self, io::Error> {
        info_log!("TuiInterface::new() - Initializing TUI");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableFocusChange,
            cursor::Hide
        )?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        info_log!("Terminal setup complete: alternate screen, mouse capture, focus events");

        Ok(Self {
            terminal,
            suggestion_panel: None,
            drawn_revision: None,
        })
    }

    pub fn cleanup(&mut self) -> Result<(), io::Error> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            DisableFocusChange,
            DisableMouseCapture,
            LeaveAlternateScreen,
            cursor::Show
        )?;
        Ok(())
    }

    fn draw(&mut self, controller: &SessionController) -> Result<(), io::Error> {
        let mut panel = None;
        self.terminal.draw(|f| {
            panel = draw_frame(f, controller);
        })?;
        self.suggestion_panel = panel;
        Ok(())
    }

    fn handle_event(&mut self, event: Event, controller: &SessionController) -> Option<UserAction> {
        match event {
            Event::Key(key) => {
                // Only process Press events, ignore Release and Repeat to avoid double input
                if key.kind != KeyEventKind::Press {
                    return None;
                }
                // Garbage from escape sequences when alt-tabbing
                if let KeyCode::Char(c) = key.code
                    && (c == '\u{FFFD}' || (c as u32) < ASCII_CONTROL_CHAR_THRESHOLD)
                {
                    debug_log!("handle_event() - Ignoring invalid character {:?}", c);
                    return None;
                }
                key_action(key, controller)
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => self
                    .suggestion_panel
                    .and_then(|panel| suggestion_at(panel, mouse.column, mouse.row))
                    .map(UserAction::PickSuggestion),
                _ => None,
            },
            Event::FocusLost => Some(UserAction::Blur),
            Event::Paste(text) if controller.phase() == Phase::Active => {
                let pasted: String = text.chars().filter(|c| !c.is_control()).collect();
                Some(UserAction::Edit(format!("{}{pasted}", controller.suggestions().input())))
            }
            Event::Resize(_, _) => {
                self.drawn_revision = None;
                None
            }
            Event::FocusGained | Event::Paste(_) => None,
        }
    }
}

impl GameInterface for TuiInterface {
    fn render(&mut self, controller: &SessionController) {
        if self.drawn_revision == Some(controller.revision()) {
            return;
        }
        match self.draw(controller) {
            Ok(()) => self.drawn_revision = Some(controller.revision()),
            Err(e) => log::error!("Draw error: {e}"),
        }
    }

    fn next_action(&mut self, controller: &SessionController) -> Option<UserAction> {
        let event = match event::poll(EVENT_POLL_TIMEOUT) {
            Ok(false) => return None,
            Ok(true) => event::read(),
            Err(e) => Err(e),
        };
        match event {
            Ok(event) => {
                debug_log!("next_action() - Event received: {:?}", event);
                self.handle_event(event, controller)
            }
            Err(e) => {
                log::error!("Failed to read terminal input: {e}");
                Some(UserAction::Exit)
            }
        }
    }
}

impl Drop for TuiInterface {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
