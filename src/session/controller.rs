//! Hash session controller.
//!
//! Owns per-invocation state (supersession token, cancellation handle,
//! pre-session snapshot), runs the digest engine on a blocking worker,
//! and translates worker events into the observable state machine the
//! surrounding shell binds to.
//!
//! The token is a single-writer atomic counter: only `start` bumps it,
//! and every worker event re-validates its captured token against the
//! current value before any shared state is touched. A result from a
//! superseded session is discarded entirely, regardless of delivery
//! order relative to the newer session's events.

use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Receiver;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::notify::{Change, Notifier, Terminal};
use super::progress::Progress;
use crate::digest::{CancelHandle, DigestEngine, DigestError, HashResult};

/// Observable controller state. Terminal outcomes are reported as
/// [`Change::Terminal`] notifications; the state itself always returns
/// to `Idle` before the next start is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Hashing,
    /// Cancellation requested, awaiting engine acknowledgment.
    Cancelling,
}

/// Event from the digest worker, tagged with the session token that
/// produced it.
#[derive(Debug)]
enum WorkerEvent {
    Progress { token: u64, processed: u64 },
    Done { token: u64, outcome: Result<HashResult, DigestError> },
}

/// Displayed fields captured at session start, restored verbatim when
/// the session is cancelled or fails.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    hex: String,
    base64: String,
    last_result: Option<HashResult>,
}

pub struct HashController {
    engine: DigestEngine,
    token: AtomicU64,
    state: SessionState,
    cancel: Option<CancelHandle>,

    path_input: String,
    previous_path_before_hash: Option<String>,
    last_completed_path: Option<String>,

    hex_output: String,
    base64_output: String,
    uppercase: bool,
    auto_hash: bool,
    last_result: Option<HashResult>,
    error: Option<String>,
    progress: Progress,
    snapshot: Snapshot,

    notifier: Notifier,
    events_tx: UnboundedSender<WorkerEvent>,
    events_rx: UnboundedReceiver<WorkerEvent>,
}

impl HashController {
    pub fn new() -> Self {
        Self::with_engine(DigestEngine::new())
    }

    pub fn with_engine(engine: DigestEngine) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            engine,
            token: AtomicU64::new(0),
            state: SessionState::Idle,
            cancel: None,
            path_input: String::new(),
            previous_path_before_hash: None,
            last_completed_path: None,
            hex_output: String::new(),
            base64_output: String::new(),
            uppercase: false,
            auto_hash: false,
            last_result: None,
            error: None,
            progress: Progress::default(),
            snapshot: Snapshot::default(),
            notifier: Notifier::default(),
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a session is active (hashing or awaiting cancellation).
    pub fn is_hashing(&self) -> bool {
        matches!(self.state, SessionState::Hashing | SessionState::Cancelling)
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn progress_fraction(&self) -> f64 {
        self.progress.fraction()
    }

    pub fn has_result(&self) -> bool {
        self.last_result.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn hex_output(&self) -> &str {
        &self.hex_output
    }

    pub fn base64_output(&self) -> &str {
        &self.base64_output
    }

    pub fn last_result(&self) -> Option<&HashResult> {
        self.last_result.as_ref()
    }

    pub fn path_input(&self) -> &str {
        &self.path_input
    }

    /// Handle for the active session, if any. Lets an outer shell wire a
    /// signal handler without borrowing the controller.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.cancel.clone()
    }

    /// Register an observer for field-change notifications.
    pub fn subscribe(&mut self) -> Receiver<Change> {
        self.notifier.subscribe()
    }

    /// Toggle uppercase hex display. A pure display transform: the
    /// digest is never recomputed.
    pub fn set_uppercase(&mut self, uppercase: bool) {
        if self.uppercase == uppercase {
            return;
        }
        self.uppercase = uppercase;
        if !self.hex_output.is_empty() {
            self.hex_output = if uppercase {
                self.hex_output.to_uppercase()
            } else {
                self.hex_output.to_lowercase()
            };
            self.notifier.emit(Change::Output);
        }
    }

    pub fn uppercase(&self) -> bool {
        self.uppercase
    }

    /// When enabled, setting the path input to an existing file starts a
    /// session automatically.
    pub fn set_auto_hash(&mut self, auto_hash: bool) {
        self.auto_hash = auto_hash;
    }

    /// Update the path input, remembering the previous value so a
    /// cancelled session can restore it.
    pub fn set_path_input(&mut self, path: impl Into<String>) {
        let path = path.into();
        if self.path_input == path {
            return;
        }
        if !self.path_input.is_empty() {
            self.last_completed_path = Some(self.path_input.clone());
        }
        self.path_input = path;
        self.notifier.emit(Change::PathInput);

        if self.auto_hash && !self.is_hashing() && PathBuf::from(&self.path_input).is_file() {
            self.start_current();
        }
    }

    /// Start hashing `path`. Silently a no-op while a session is active
    /// or when the path does not name an existing file. Returns whether
    /// a session was started. Must be called within a tokio runtime.
    pub fn start(&mut self, path: impl Into<String>) -> bool {
        if self.is_hashing() {
            return false;
        }
        let path = path.into();
        if self.path_input != path {
            if !self.path_input.is_empty() {
                self.last_completed_path = Some(self.path_input.clone());
            }
            self.path_input = path;
            self.notifier.emit(Change::PathInput);
        }
        self.start_current()
    }

    fn start_current(&mut self) -> bool {
        if self.is_hashing() {
            return false;
        }
        let path = PathBuf::from(&self.path_input);
        if !path.is_file() {
            return false;
        }

        // Snapshot displayed fields so cancel or failure can restore
        // them verbatim.
        self.snapshot = Snapshot {
            hex: self.hex_output.clone(),
            base64: self.base64_output.clone(),
            last_result: self.last_result.take(),
        };
        self.previous_path_before_hash = self.last_completed_path.clone();

        self.error = None;
        self.hex_output.clear();
        self.base64_output.clear();
        let total = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        self.progress = Progress::new(total);

        let token = self.token.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancelHandle::new();
        self.cancel = Some(cancel.clone());
        self.state = SessionState::Hashing;

        self.notifier.emit(Change::Error);
        self.notifier.emit(Change::Output);
        self.notifier.emit(Change::LastResult);
        self.notifier.emit(Change::Progress(self.progress));
        self.notifier.emit(Change::State(SessionState::Hashing));
        debug!(path = %path.display(), token, total, "session started");

        let engine = self.engine.clone();
        let tx = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let progress_tx = tx.clone();
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                engine.compute(
                    &path,
                    |processed| {
                        let _ = progress_tx.send(WorkerEvent::Progress { token, processed });
                    },
                    &cancel,
                )
            }))
            .unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "digest worker panicked".to_string());
                Err(DigestError::Unexpected { message })
            });
            let _ = tx.send(WorkerEvent::Done { token, outcome });
        });
        true
    }

    /// Request cooperative cancellation of the active session. No-op
    /// unless currently hashing.
    pub fn cancel(&mut self) {
        if self.state != SessionState::Hashing {
            return;
        }
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
        self.state = SessionState::Cancelling;
        self.notifier.emit(Change::State(SessionState::Cancelling));
    }

    /// Reset path input, outputs, error, and progress. Valid only while
    /// idle.
    pub fn clear(&mut self) {
        if self.is_hashing() {
            return;
        }
        self.path_input.clear();
        self.hex_output.clear();
        self.base64_output.clear();
        self.error = None;
        self.last_result = None;
        self.progress = Progress::default();
        self.notifier.emit(Change::PathInput);
        self.notifier.emit(Change::Output);
        self.notifier.emit(Change::LastResult);
        self.notifier.emit(Change::Error);
        self.notifier.emit(Change::Progress(self.progress));
    }

    /// Drain and apply pending worker events without blocking.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
        }
    }

    /// Await and apply the next worker event. Returns false when the
    /// worker channel is closed.
    pub async fn process_next(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Drive the active session to its terminal state.
    pub async fn run_until_idle(&mut self) {
        while self.state != SessionState::Idle {
            if !self.process_next().await {
                break;
            }
        }
    }

    fn apply(&mut self, event: WorkerEvent) {
        if self.state == SessionState::Idle {
            // No active session; a late duplicate carries nothing.
            return;
        }
        let current = self.token.load(Ordering::SeqCst);
        match event {
            WorkerEvent::Progress { token, processed } => {
                if token != current {
                    return;
                }
                if processed > self.progress.processed {
                    self.progress.processed = processed;
                    self.notifier.emit(Change::Progress(self.progress));
                }
            }
            WorkerEvent::Done { token, outcome } => {
                if token != current {
                    debug!(token, current, "discarding superseded session outcome");
                    return;
                }
                match outcome {
                    Ok(result) => self.complete(result),
                    Err(err) if err.is_cancelled() => self.restore_after_cancel(),
                    Err(err) => self.fail(err),
                }
                self.cancel = None;
                self.state = SessionState::Idle;
                self.notifier.emit(Change::State(SessionState::Idle));
            }
        }
    }

    fn complete(&mut self, result: HashResult) {
        self.progress = Progress { processed: result.bytes, total: result.bytes };
        self.hex_output = if self.uppercase {
            result.hex.to_uppercase()
        } else {
            result.hex.clone()
        };
        self.base64_output = result.base64.clone();
        self.last_completed_path = Some(result.path.display().to_string());
        debug!(path = %result.path.display(), bytes = result.bytes, "session completed");
        self.last_result = Some(result);
        self.snapshot = Snapshot::default();

        self.notifier.emit(Change::Progress(self.progress));
        self.notifier.emit(Change::Output);
        self.notifier.emit(Change::LastResult);
        self.notifier.emit(Change::Terminal(Terminal::Completed));
    }

    fn restore_after_cancel(&mut self) {
        // Put back exactly what was displayed before this session
        // started, including the path that triggered it.
        let snapshot = std::mem::take(&mut self.snapshot);
        self.hex_output = snapshot.hex;
        self.base64_output = snapshot.base64;
        self.last_result = snapshot.last_result;
        if let Some(previous) = self.previous_path_before_hash.take() {
            self.path_input = previous;
            self.notifier.emit(Change::PathInput);
        }
        debug!("session cancelled, previous output restored");

        self.notifier.emit(Change::Output);
        self.notifier.emit(Change::LastResult);
        self.notifier.emit(Change::Terminal(Terminal::Cancelled));
    }

    fn fail(&mut self, err: DigestError) {
        // A failure must not clobber previously displayed output, so the
        // snapshot comes back; only the error field is new.
        warn!(error = %err, "session failed");
        let snapshot = std::mem::take(&mut self.snapshot);
        self.hex_output = snapshot.hex;
        self.base64_output = snapshot.base64;
        self.last_result = snapshot.last_result;
        self.error = Some(err.to_string());

        self.notifier.emit(Change::Output);
        self.notifier.emit(Change::LastResult);
        self.notifier.emit(Change::Error);
        self.notifier.emit(Change::Terminal(Terminal::Failed));
    }
}

impl Default for HashController {
    fn default() -> Self {
        Self::new()
    }
}
