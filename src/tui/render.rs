/// Ratatui views for the commit workflow — one screen per state.
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};

use super::App;
use super::flow::State;

pub const SPINNER_GLYPHS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// ── Main draw entry point ─────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title bar
            Constraint::Min(0),    // state view
            Constraint::Length(1), // key hints
        ])
        .split(f.area());

    draw_title_bar(f, app, chunks[0]);

    match app.session.state {
        State::Generating => draw_spinner_view(f, app, chunks[1], "Generating commit message..."),
        State::Committing => draw_spinner_view(f, app, chunks[1], "Committing changes..."),
        State::Pushing => draw_spinner_view(f, app, chunks[1], "Pushing changes..."),
        State::Generated => draw_message_view(f, app, chunks[1], "AI commit message suggestion:"),
        State::Committed => draw_message_view(f, app, chunks[1], "Committed successfully:"),
        State::Pushed => draw_message_view(f, app, chunks[1], "Pushed successfully:"),
        State::Error => draw_error_view(f, app, chunks[1]),
        State::SecurityWarning => draw_warning_view(f, app, chunks[1]),
    }

    draw_hints(f, app, chunks[2]);
}

fn draw_title_bar(f: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" aicommit ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("· {} · {} file(s)", app.session.provider.name(), app.session.files.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

// ── State views ───────────────────────────────────────────────────────────────

fn draw_spinner_view(f: &mut Frame, app: &App, area: Rect, label: &str) {
    let glyph = SPINNER_GLYPHS[(app.spinner_tick as usize) % SPINNER_GLYPHS.len()];
    let lines = vec![
        Line::default(),
        Line::from(vec![
            Span::styled(format!(" {glyph} "), Style::default().fg(Color::Cyan)),
            Span::raw(label.to_string()),
        ]),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_message_view(f: &mut Frame, app: &App, area: Rect, header: &str) {
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            format!(" {header}"),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    for msg_line in app.session.commit_message.lines() {
        lines.push(Line::from(Span::raw(format!("   {msg_line}"))));
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn draw_error_view(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            " Commit failed:",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    for err_line in app.session.err_msg.lines() {
        lines.push(Line::from(Span::styled(
            format!("   {err_line}"),
            Style::default().fg(Color::Red),
        )));
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn draw_warning_view(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            " Warning, potential sensitive data detected in added lines:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    for finding_line in app.session.err_msg.lines() {
        lines.push(Line::from(Span::styled(
            format!("   {finding_line}"),
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::raw(" Do you wish to continue?")));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

// ── Key hints ─────────────────────────────────────────────────────────────────

fn draw_hints(f: &mut Frame, app: &App, area: Rect) {
    let hints = match app.session.state {
        State::Generating | State::Committing | State::Pushing => " [x] cancel · [q] quit",
        State::Generated => " [c] commit · [x] cancel · [q] quit",
        State::Committed => " [p] push · [x] cancel · [q] quit",
        State::Pushed => " [q] quit",
        State::Error => " [x] cancel · [q] quit",
        State::SecurityWarning => " [Y] yes · [n] no · [q] quit",
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            hints,
            Style::default().fg(Color::DarkGray),
        ))),
        area,
    );
}
