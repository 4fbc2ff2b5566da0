/// Ratatui-based interactive commit flow.
///
/// Architecture:
///   main task:        event loop — crossterm keyboard events + mpsc FlowEvent drain
///   background task:  tokio::spawn — at most one in flight, reports exactly one
///                     FlowEvent back via UnboundedSender, guarded by a oneshot
///                     cancel channel so a stale completion can never land
///
/// The state machine itself lives in `flow.rs` and never blocks; all
/// suspension points are inside the dispatched tasks.
pub mod flow;
pub mod render;
pub mod select;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::{mpsc, oneshot};

use crate::config::ResolvedConfig;
use crate::git;
use crate::provider::Generator;
use crate::security;
use self::flow::{FlowEvent, Session, State, Task};

// ── App — session plus loop-side handles ──────────────────────────────────────

pub struct App {
    pub session: Session,
    /// Incremented every 120ms while a task runs, drives the spinner
    pub spinner_tick: u32,
    /// Cancel handle for the in-flight task; None when idle
    cancel_tx: Option<oneshot::Sender<()>>,
}

/// How the interactive flow ended — reported after terminal teardown.
enum FlowOutcome {
    /// 'q'/ctrl+c, nothing to report
    Quit,
    /// Selector confirmed with nothing chosen
    NoSelection,
    /// 'x' — show the cancellation notice instead of any state view
    Cancelled,
    /// Push succeeded; carries the commit message for the final printout
    Pushed(String),
}

// ── Entry point ───────────────────────────────────────────────────────────────

pub async fn run(resolved: ResolvedConfig) -> Result<()> {
    let files = git::changed_files()?;
    if files.is_empty() {
        println!("No changed files to commit.");
        return Ok(());
    }

    let mut terminal = setup_terminal()?;

    // Panic hook — restore terminal before printing panic
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        orig_hook(info);
    }));

    let result = run_flows(&mut terminal, resolved, files).await;

    restore_terminal(&mut terminal);

    match result? {
        FlowOutcome::Quit => {}
        FlowOutcome::NoSelection => println!("No files selected."),
        FlowOutcome::Cancelled => println!("Commit cancelled."),
        FlowOutcome::Pushed(message) => {
            println!("Pushed successfully:");
            println!("{message}");
        }
    }
    Ok(())
}

async fn run_flows(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    resolved: ResolvedConfig,
    files: Vec<String>,
) -> Result<FlowOutcome> {
    let Some(selected) = select::run(terminal, files).await? else {
        return Ok(FlowOutcome::Quit);
    };
    if selected.is_empty() {
        return Ok(FlowOutcome::NoSelection);
    }

    event_loop(terminal, resolved, selected).await
}

// ── Event loop ────────────────────────────────────────────────────────────────

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    resolved: ResolvedConfig,
    files: Vec<String>,
) -> Result<FlowOutcome> {
    let generator = Arc::new(Generator::new(&resolved));
    let keywords: Arc<Vec<String>> = Arc::new(resolved.keywords.clone());

    let mut app = App {
        session: Session::new(files, resolved.provider),
        spinner_tick: 0,
        cancel_tx: None,
    };

    // Channel: background tasks → loop
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<FlowEvent>();

    // Session starts in Generating — kick off the first task right away
    dispatch(Task::Generate, &mut app, &generator, &keywords, &ui_tx);

    let mut crossterm_events = EventStream::new();
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_millis(120));

    terminal.draw(|f| render::draw(f, &app))?;

    let outcome = loop {
        tokio::select! {
            // ── Animation tick ────────────────────────────────────────────────
            _ = ticker.tick() => {
                if app.session.busy() {
                    app.spinner_tick = app.spinner_tick.wrapping_add(1);
                    terminal.draw(|f| render::draw(f, &app))?;
                }
            }

            // ── Task completions ──────────────────────────────────────────────
            Some(ev) = ui_rx.recv() => {
                app.cancel_tx = None;
                app.session.apply_event(ev);
                terminal.draw(|f| render::draw(f, &app))?;
                if app.session.state == State::Pushed {
                    break FlowOutcome::Pushed(app.session.commit_message.clone());
                }
            }

            // ── Keyboard events ───────────────────────────────────────────────
            Some(Ok(ev)) = crossterm_events.next() => {
                if let Event::Key(key) = ev {
                    let out = app.session.handle_key(key);
                    if let Some(task) = out.dispatch {
                        dispatch(task, &mut app, &generator, &keywords, &ui_tx);
                    }
                    if out.exit {
                        break if app.session.cancelled {
                            FlowOutcome::Cancelled
                        } else {
                            FlowOutcome::Quit
                        };
                    }
                }
                terminal.draw(|f| render::draw(f, &app))?;
            }
        }
    };

    // Stop any in-flight task — it must not touch anything after we leave
    if let Some(tx) = app.cancel_tx.take() {
        let _ = tx.send(());
    }

    Ok(outcome)
}

// ── Task orchestration ────────────────────────────────────────────────────────

/// Launch one background operation. The session only requests a task from
/// a state with no outstanding work, so at most one is ever in flight.
fn dispatch(
    task: Task,
    app: &mut App,
    generator: &Arc<Generator>,
    keywords: &Arc<Vec<String>>,
    ui_tx: &mpsc::UnboundedSender<FlowEvent>,
) {
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    app.cancel_tx = Some(cancel_tx);

    let generator = generator.clone();
    let keywords = keywords.clone();
    let ui_tx = ui_tx.clone();
    let files = app.session.files.clone();
    let message = app.session.commit_message.clone();

    tokio::spawn(async move {
        tokio::select! {
            ev = run_task(task, &generator, &keywords, &files, &message) => {
                let _ = ui_tx.send(ev);
            }
            // Resolves on send or on drop of the sender at loop exit
            _ = cancel_rx => {}
        }
    });
}

/// Execute one operation to completion, mapping every outcome — success or
/// failure — to exactly one completion event.
async fn run_task(
    task: Task,
    generator: &Generator,
    keywords: &[String],
    files: &[String],
    message: &str,
) -> FlowEvent {
    match task {
        Task::Generate => {
            let diff = match git::diff_for_files(files).await {
                Ok(d) => d,
                Err(e) => return FlowEvent::GenerateFailed(e.to_string()),
            };
            let status = match git::status_for_files(files).await {
                Ok(s) => s,
                Err(e) => return FlowEvent::GenerateFailed(e.to_string()),
            };

            match security::scan(&diff, keywords) {
                Ok(findings) if !findings.is_empty() => FlowEvent::SecurityWarning {
                    report: security::render_findings(&findings),
                    diff,
                    status,
                },
                Ok(_) => generate_event(generator, &diff, &status).await,
                Err(e) => FlowEvent::GenerateFailed(e.to_string()),
            }
        }
        // The user confirmed the warning — reuse the saved pair, no re-fetch
        Task::ResumeGenerate { diff, status } => generate_event(generator, &diff, &status).await,
        Task::Commit => FlowEvent::CommitDone(
            git::commit(files, message).await.err().map(|e| e.to_string()),
        ),
        Task::Push => FlowEvent::PushDone(git::push().await.err().map(|e| e.to_string())),
    }
}

async fn generate_event(generator: &Generator, diff: &str, status: &str) -> FlowEvent {
    match generator.generate(diff, status).await {
        Ok(message) => FlowEvent::Generated(message),
        Err(e) => FlowEvent::GenerateFailed(e.to_string()),
    }
}

// ── Terminal setup/teardown ───────────────────────────────────────────────────

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) {
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();
}
