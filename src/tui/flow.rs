/// Workflow state machine for the commit flow.
///
/// Pure state + transition logic: `apply_event` consumes background task
/// completions, `handle_key` consumes keystrokes and says which task (if
/// any) to dispatch next. No IO happens here — the event loop in `mod.rs`
/// owns the spawning, which is what keeps at most one task in flight: a
/// task is only ever requested from a state with no outstanding work.
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::provider::Provider;

// ── States ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for diff fetch + security scan + AI generation
    Generating,
    /// Message ready; user may commit
    Generated,
    /// Commit running
    Committing,
    /// Commit succeeded; user may push
    Committed,
    /// Push running
    Pushing,
    /// Push succeeded; program exits after showing this
    Pushed,
    /// Terminal-ish failure; only quit/cancel leave it
    Error,
    /// Sensitive data found in the diff; user must confirm or decline
    SecurityWarning,
}

// ── Completion events ─────────────────────────────────────────────────────────

/// Exactly one of these is delivered per dispatched task.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    Generated(String),
    GenerateFailed(String),
    /// Scan hit: the rendered findings plus the diff/status pair to resume
    /// from if the user confirms (avoids a re-fetch).
    SecurityWarning {
        report: String,
        diff: String,
        status: String,
    },
    /// None = success, Some = error text
    CommitDone(Option<String>),
    PushDone(Option<String>),
}

// ── Dispatch requests ─────────────────────────────────────────────────────────

/// A background operation the event loop should launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Generate,
    ResumeGenerate { diff: String, status: String },
    Commit,
    Push,
}

#[derive(Debug, Default)]
pub struct KeyOutcome {
    pub exit: bool,
    pub dispatch: Option<Task>,
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct Session {
    /// Selected files, fixed for the session's lifetime
    pub files: Vec<String>,
    pub commit_message: String,
    pub state: State,
    pub err_msg: String,
    /// Set by 'x' — the exit view shows a cancellation notice instead
    pub cancelled: bool,
    pub provider: Provider,
    /// Saved diff/status pair, populated only while in SecurityWarning
    saved_diff: String,
    saved_status: String,
}

impl Session {
    /// Create a session for a non-empty file selection. Starts in
    /// Generating — the caller dispatches `Task::Generate` immediately.
    pub fn new(files: Vec<String>, provider: Provider) -> Self {
        Self {
            files,
            commit_message: String::new(),
            state: State::Generating,
            err_msg: String::new(),
            cancelled: false,
            provider,
            saved_diff: String::new(),
            saved_status: String::new(),
        }
    }

    // ── Task completions ──────────────────────────────────────────────────────

    pub fn apply_event(&mut self, ev: FlowEvent) {
        match ev {
            FlowEvent::Generated(message) => {
                self.commit_message = message;
                self.state = State::Generated;
            }
            FlowEvent::GenerateFailed(e) => {
                self.state = State::Error;
                self.err_msg = e;
            }
            FlowEvent::SecurityWarning { report, diff, status } => {
                // Save the pair so a confirmed resume skips the re-fetch
                self.saved_diff = diff;
                self.saved_status = status;
                self.state = State::SecurityWarning;
                self.err_msg = report;
            }
            FlowEvent::CommitDone(None) => {
                self.state = State::Committed;
                self.err_msg.clear();
            }
            FlowEvent::CommitDone(Some(e)) => {
                self.state = State::Error;
                self.err_msg = e;
            }
            FlowEvent::PushDone(None) => {
                self.state = State::Pushed;
                self.err_msg.clear();
            }
            FlowEvent::PushDone(Some(e)) => {
                self.state = State::Error;
                self.err_msg = e;
            }
        }
    }

    // ── Keystrokes ────────────────────────────────────────────────────────────

    /// Interpret one keystroke in the current state. Keys that don't apply
    /// to the current state are no-ops: no transition, no error.
    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return KeyOutcome { exit: true, dispatch: None };
        }

        match key.code {
            KeyCode::Char('q') => KeyOutcome { exit: true, dispatch: None },
            KeyCode::Char('x') => {
                self.cancelled = true;
                KeyOutcome { exit: true, dispatch: None }
            }
            KeyCode::Char('y') | KeyCode::Enter if self.state == State::SecurityWarning => {
                self.state = State::Generating;
                self.err_msg.clear();
                let diff = std::mem::take(&mut self.saved_diff);
                let status = std::mem::take(&mut self.saved_status);
                KeyOutcome {
                    exit: false,
                    dispatch: Some(Task::ResumeGenerate { diff, status }),
                }
            }
            KeyCode::Char('n') if self.state == State::SecurityWarning => {
                self.state = State::Error;
                self.err_msg = "Commit cancelled by user due to security findings".to_string();
                self.saved_diff.clear();
                self.saved_status.clear();
                KeyOutcome::default()
            }
            KeyCode::Char('c')
                if self.state == State::Generated && !self.commit_message.is_empty() =>
            {
                self.state = State::Committing;
                self.err_msg.clear();
                KeyOutcome { exit: false, dispatch: Some(Task::Commit) }
            }
            KeyCode::Char('p') if self.state == State::Committed => {
                self.state = State::Pushing;
                self.err_msg.clear();
                KeyOutcome { exit: false, dispatch: Some(Task::Push) }
            }
            _ => KeyOutcome::default(),
        }
    }

    /// True while a dispatched task is outstanding (spinner states).
    pub fn busy(&self) -> bool {
        matches!(self.state, State::Generating | State::Committing | State::Pushing)
    }

    #[cfg(test)]
    fn saved_pair(&self) -> (&str, &str) {
        (&self.saved_diff, &self.saved_status)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn enter() -> KeyEvent {
        KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)
    }

    fn session() -> Session {
        Session::new(vec!["src/main.rs".to_string()], Provider::Ollama)
    }

    fn warning_event() -> FlowEvent {
        FlowEvent::SecurityWarning {
            report: "- file:///r/src/main.rs:2:1: password = 1\n".to_string(),
            diff: "DIFF".to_string(),
            status: "STATUS".to_string(),
        }
    }

    #[test]
    fn test_generation_success_stores_message() {
        let mut s = session();
        s.apply_event(FlowEvent::Generated("fix: thing".to_string()));
        assert_eq!(s.state, State::Generated);
        assert_eq!(s.commit_message, "fix: thing");
    }

    #[test]
    fn test_generation_failure_stores_error() {
        let mut s = session();
        s.apply_event(FlowEvent::GenerateFailed("API key not set".to_string()));
        assert_eq!(s.state, State::Error);
        assert_eq!(s.err_msg, "API key not set");
    }

    #[test]
    fn test_findings_always_warn_never_generate() {
        let mut s = session();
        s.apply_event(warning_event());
        assert_eq!(s.state, State::SecurityWarning);
        assert!(s.commit_message.is_empty());
        assert_eq!(s.saved_pair(), ("DIFF", "STATUS"));
        assert!(s.err_msg.contains("password"));
    }

    #[test]
    fn test_confirm_resumes_with_saved_pair() {
        let mut s = session();
        s.apply_event(warning_event());

        let out = s.handle_key(key('y'));
        assert!(!out.exit);
        assert_eq!(
            out.dispatch,
            Some(Task::ResumeGenerate {
                diff: "DIFF".to_string(),
                status: "STATUS".to_string(),
            })
        );
        assert_eq!(s.state, State::Generating);
        assert!(s.err_msg.is_empty());
        // Saved pair is consumed — non-empty iff in SecurityWarning
        assert_eq!(s.saved_pair(), ("", ""));
    }

    #[test]
    fn test_enter_confirms_like_y() {
        let mut s = session();
        s.apply_event(warning_event());
        let out = s.handle_key(enter());
        assert!(matches!(out.dispatch, Some(Task::ResumeGenerate { .. })));
        assert_eq!(s.state, State::Generating);
    }

    #[test]
    fn test_decline_moves_to_error() {
        let mut s = session();
        s.apply_event(warning_event());
        let out = s.handle_key(key('n'));
        assert!(!out.exit);
        assert!(out.dispatch.is_none());
        assert_eq!(s.state, State::Error);
        assert_eq!(s.err_msg, "Commit cancelled by user due to security findings");
        assert_eq!(s.saved_pair(), ("", ""));
    }

    #[test]
    fn test_commit_dispatches_from_generated() {
        let mut s = session();
        s.apply_event(FlowEvent::Generated("msg".to_string()));
        let out = s.handle_key(key('c'));
        assert_eq!(out.dispatch, Some(Task::Commit));
        assert_eq!(s.state, State::Committing);
    }

    #[test]
    fn test_commit_with_empty_message_is_noop() {
        let mut s = session();
        s.state = State::Generated;
        s.commit_message.clear();
        let out = s.handle_key(key('c'));
        assert!(out.dispatch.is_none());
        assert_eq!(s.state, State::Generated);
    }

    #[test]
    fn test_commit_success_and_push_flow() {
        let mut s = session();
        s.apply_event(FlowEvent::Generated("msg".to_string()));
        s.handle_key(key('c'));

        // "nothing to commit" arrives as success from the git layer
        s.apply_event(FlowEvent::CommitDone(None));
        assert_eq!(s.state, State::Committed);

        let out = s.handle_key(key('p'));
        assert_eq!(out.dispatch, Some(Task::Push));
        assert_eq!(s.state, State::Pushing);

        s.apply_event(FlowEvent::PushDone(None));
        assert_eq!(s.state, State::Pushed);
    }

    #[test]
    fn test_commit_failure_stores_error() {
        let mut s = session();
        s.apply_event(FlowEvent::Generated("msg".to_string()));
        s.handle_key(key('c'));
        s.apply_event(FlowEvent::CommitDone(Some("git commit failed: hook".to_string())));
        assert_eq!(s.state, State::Error);
        assert_eq!(s.err_msg, "git commit failed: hook");
    }

    #[test]
    fn test_push_failure_stores_literal_error() {
        let mut s = session();
        s.state = State::Pushing;
        s.apply_event(FlowEvent::PushDone(Some(
            "git push failed: no upstream branch".to_string(),
        )));
        assert_eq!(s.state, State::Error);
        assert_eq!(s.err_msg, "git push failed: no upstream branch");
    }

    #[test]
    fn test_out_of_state_keys_are_noops() {
        let mut s = session();

        // 'p' while Generating
        let out = s.handle_key(key('p'));
        assert!(!out.exit);
        assert!(out.dispatch.is_none());
        assert_eq!(s.state, State::Generating);

        // 'c' while Generating
        assert!(s.handle_key(key('c')).dispatch.is_none());

        // 'y'/'n' outside SecurityWarning
        assert!(s.handle_key(key('y')).dispatch.is_none());
        assert!(s.handle_key(key('n')).dispatch.is_none());
        assert_eq!(s.state, State::Generating);

        // unrecognized key
        assert!(s.handle_key(key('z')).dispatch.is_none());
    }

    #[test]
    fn test_quit_keys_exit_from_any_state() {
        for state in [
            State::Generating,
            State::Generated,
            State::Committed,
            State::Error,
            State::SecurityWarning,
        ] {
            let mut s = session();
            s.state = state;
            assert!(s.handle_key(key('q')).exit);

            let mut s = session();
            s.state = state;
            let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
            assert!(s.handle_key(ctrl_c).exit, "ctrl+c must exit from {state:?}");
        }
    }

    #[test]
    fn test_cancel_sets_flag_and_exits() {
        let mut s = session();
        s.apply_event(FlowEvent::Generated("msg".to_string()));
        let out = s.handle_key(key('x'));
        assert!(out.exit);
        assert!(s.cancelled);
    }

    #[test]
    fn test_busy_states() {
        let mut s = session();
        assert!(s.busy());
        s.apply_event(FlowEvent::Generated("m".to_string()));
        assert!(!s.busy());
        s.handle_key(key('c'));
        assert!(s.busy());
        s.apply_event(FlowEvent::CommitDone(None));
        assert!(!s.busy());
    }
}
