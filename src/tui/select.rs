/// File selection sub-flow — a checkbox list over the changed files,
/// run before the commit workflow session is created.
use std::io;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers};
use futures_util::StreamExt;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
};

// ── State ─────────────────────────────────────────────────────────────────────

pub struct SelectState {
    pub files: Vec<String>,
    pub selected: Vec<bool>,
    pub cursor: usize,
}

impl SelectState {
    pub fn new(files: Vec<String>) -> Self {
        let n = files.len();
        Self {
            files,
            selected: vec![false; n],
            cursor: 0,
        }
    }

    fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    fn move_down(&mut self) {
        if self.cursor + 1 < self.files.len() {
            self.cursor += 1;
        }
    }

    fn toggle_current(&mut self) {
        if let Some(flag) = self.selected.get_mut(self.cursor) {
            *flag = !*flag;
        }
    }

    /// 'a' — select all, or clear all if everything is already selected.
    fn toggle_all(&mut self) {
        let all = self.selected.iter().all(|s| *s);
        for flag in &mut self.selected {
            *flag = !all;
        }
    }

    fn chosen(&self) -> Vec<String> {
        self.files
            .iter()
            .zip(&self.selected)
            .filter(|(_, sel)| **sel)
            .map(|(f, _)| f.clone())
            .collect()
    }
}

// ── Event loop ────────────────────────────────────────────────────────────────

/// Run the selector. Returns the chosen paths, or None if the user quit.
/// An empty selection confirmed with enter also comes back as Some(vec![])
/// so the caller can print its own notice.
pub async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    files: Vec<String>,
) -> Result<Option<Vec<String>>> {
    let mut state = SelectState::new(files);
    let mut events = EventStream::new();

    terminal.draw(|f| draw(f, &state))?;

    while let Some(Ok(ev)) = events.next().await {
        if let Event::Key(key) = ev {
            match apply_key(&mut state, key) {
                SelectOutcome::Continue => {}
                SelectOutcome::Quit => return Ok(None),
                SelectOutcome::Confirm => return Ok(Some(state.chosen())),
            }
        }
        terminal.draw(|f| draw(f, &state))?;
    }

    Ok(None)
}

#[derive(Debug, PartialEq, Eq)]
enum SelectOutcome {
    Continue,
    Quit,
    Confirm,
}

fn apply_key(state: &mut SelectState, key: KeyEvent) -> SelectOutcome {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return SelectOutcome::Quit;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => SelectOutcome::Quit,
        KeyCode::Enter => SelectOutcome::Confirm,
        KeyCode::Up | KeyCode::Char('k') => {
            state.move_up();
            SelectOutcome::Continue
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.move_down();
            SelectOutcome::Continue
        }
        KeyCode::Char(' ') => {
            state.toggle_current();
            SelectOutcome::Continue
        }
        KeyCode::Char('a') => {
            state.toggle_all();
            SelectOutcome::Continue
        }
        _ => SelectOutcome::Continue,
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn draw(f: &mut ratatui::Frame, state: &SelectState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Min(0),    // file list
            Constraint::Length(1), // hints
        ])
        .split(f.area());

    let count = state.selected.iter().filter(|s| **s).count();
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                "Select files to commit",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  ({count}/{} selected)", state.files.len()),
                Style::default().fg(Color::DarkGray),
            ),
        ])),
        chunks[0],
    );

    let items: Vec<ListItem> = state
        .files
        .iter()
        .zip(&state.selected)
        .map(|(file, sel)| {
            let mark = if *sel { "[x]" } else { "[ ]" };
            let style = if *sel {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(format!(" {mark} {file}"), style)))
        })
        .collect();

    let list = List::new(items)
        .highlight_style(Style::default().bg(Color::Rgb(40, 40, 50)).add_modifier(Modifier::BOLD))
        .highlight_symbol("▸");

    let mut list_state = ListState::default();
    list_state.select(Some(state.cursor));
    f.render_stateful_widget(list, chunks[1], &mut list_state);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            " ↑↓/jk move · space toggle · a all · enter confirm · q quit",
            Style::default().fg(Color::DarkGray),
        ))),
        chunks[2],
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn state() -> SelectState {
        SelectState::new(vec!["a.rs".to_string(), "b.rs".to_string(), "c.rs".to_string()])
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut s = state();
        s.move_up();
        assert_eq!(s.cursor, 0);
        s.move_down();
        s.move_down();
        s.move_down();
        assert_eq!(s.cursor, 2);
    }

    #[test]
    fn test_toggle_and_chosen() {
        let mut s = state();
        apply_key(&mut s, key(' '));
        apply_key(&mut s, key('j'));
        apply_key(&mut s, key('j'));
        apply_key(&mut s, key(' '));
        assert_eq!(s.chosen(), vec!["a.rs", "c.rs"]);
    }

    #[test]
    fn test_toggle_all_flips_everything() {
        let mut s = state();
        apply_key(&mut s, key('a'));
        assert_eq!(s.chosen().len(), 3);
        apply_key(&mut s, key('a'));
        assert!(s.chosen().is_empty());
    }

    #[test]
    fn test_quit_and_confirm_outcomes() {
        let mut s = state();
        assert_eq!(apply_key(&mut s, key('q')), SelectOutcome::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(apply_key(&mut s, ctrl_c), SelectOutcome::Quit);
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(apply_key(&mut s, enter), SelectOutcome::Confirm);
    }
}
