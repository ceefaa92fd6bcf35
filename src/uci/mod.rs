//! Universal Chess Interface (UCI) protocol front end.
//!
//! A single control thread reads commands in input order and dispatches
//! them against an explicit [`Session`] value; there is no process-wide
//! state. While a search runs on its worker thread the session is in the
//! Searching state, represented by the active `SearchJob`; `stop` and
//! `quit` trip the job's stop flag and join the worker, so `bestmove` is
//! always emitted before the next command is processed.

use std::fmt;
use std::io::{self, BufRead};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{error, warn};

use crate::rules::{FenError, MoveError, Position};
use crate::search::Searcher;
use crate::sync::{StopFlag, SyncOut};
use crate::time::derive_budget;

pub mod command;
pub mod print;

pub use command::{parse_command, parse_go, parse_position, UciCommand};

/// Error type for UCI position command parsing.
#[derive(Debug, Clone)]
pub enum UciError {
    /// Invalid FEN string.
    InvalidFen(FenError),
    /// Invalid move in the move list.
    InvalidMove { move_str: String, error: MoveError },
    /// Missing required parts in the command.
    MissingParts,
}

impl fmt::Display for UciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciError::InvalidFen(e) => write!(f, "{e}"),
            UciError::InvalidMove { move_str, error } => {
                write!(f, "invalid move '{move_str}': {error}")
            }
            UciError::MissingParts => write!(f, "missing required parts in position command"),
        }
    }
}

impl std::error::Error for UciError {}

/// Result of processing one command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Keep reading commands.
    Continue,
    /// Engine should quit.
    Quit,
}

/// Handle to an in-flight search worker.
struct SearchJob {
    stop: StopFlag,
    handle: JoinHandle<()>,
}

impl SearchJob {
    /// Signal stop and wait for the worker to emit its `bestmove`.
    fn stop_and_wait(self) {
        self.stop.stop();
        let _ = self.handle.join();
    }
}

/// Per-process protocol session: the current position plus whatever is
/// needed to answer `stop` and `ucinewgame`.
pub struct Session {
    position: Position,
    out: Arc<SyncOut>,
    job: Option<SearchJob>,
    /// Fixed root-shuffle seed; `None` draws a fresh seed per search.
    shuffle_seed: Option<u64>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Session {
            position: Position::startpos(),
            out: Arc::new(SyncOut::new()),
            job: None,
            shuffle_seed: None,
        }
    }

    /// Create a session whose searches shuffle with a fixed seed, so a
    /// scripted run is reproducible.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        let mut session = Session::new();
        session.shuffle_seed = Some(seed);
        session
    }

    /// Whether a search worker is still running. Finished workers are
    /// reaped here so a completed `go` returns the session to the
    /// awaiting-command state.
    pub fn is_searching(&mut self) -> bool {
        if self.job.as_ref().is_some_and(|job| job.handle.is_finished()) {
            if let Some(job) = self.job.take() {
                let _ = job.handle.join();
            }
        }
        self.job.is_some()
    }

    /// Process one command line.
    pub fn dispatch(&mut self, line: &str) -> CommandResult {
        let Some(cmd) = parse_command(line) else {
            return CommandResult::Continue;
        };

        match cmd {
            UciCommand::Uci => print::identify(&self.out),
            UciCommand::IsReady => print::ready(&self.out),
            UciCommand::UciNewGame => {
                self.stop_search();
                self.position = Position::startpos();
            }
            UciCommand::Position(parts) => self.handle_position(&parts),
            UciCommand::Go(parts) => self.handle_go(&parts),
            UciCommand::Stop => self.stop_search(),
            // No options are supported; the command is accepted so GUIs
            // that always send it keep working.
            UciCommand::SetOption => {}
            UciCommand::Display => self.out.line(&self.position.to_string()),
            UciCommand::Perft(depth) => self.handle_perft(depth),
            UciCommand::Help => print::help(&self.out),
            UciCommand::Unknown(line) => print::unknown(&self.out, &line),
            UciCommand::Quit => {
                self.stop_search();
                return CommandResult::Quit;
            }
        }

        CommandResult::Continue
    }

    /// Read commands from stdin until `quit` or end-of-input. Internal
    /// failures are logged and the loop continues; an unresponsive
    /// engine process is worse than one that reports an error.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    break;
                }
            };
            if self.dispatch(&line) == CommandResult::Quit {
                return;
            }
        }
        // End-of-input behaves like quit so a dying GUI cannot leave a
        // search running.
        self.stop_search();
    }

    /// Execute a single command and wait for any search it started.
    /// Used for one-shot command-line invocation.
    pub fn run_once(&mut self, command: &str) {
        let _ = self.dispatch(command);
        if let Some(job) = self.job.take() {
            let _ = job.handle.join();
        }
    }

    fn handle_position(&mut self, parts: &[String]) {
        if self.is_searching() {
            print::notice(&self.out, "cannot set position while searching");
            return;
        }
        if let Err(e) = parse_position(&mut self.position, parts) {
            print::notice(&self.out, &format!("error: {e}"));
        }
    }

    fn handle_go(&mut self, parts: &[String]) {
        if self.is_searching() {
            print::notice(&self.out, "search already in progress");
            return;
        }

        let params = parse_go(&self.position, parts);
        let budget = derive_budget(&params, self.position.side_to_move(), Instant::now());
        let stop = StopFlag::new();
        let seed = self.shuffle_seed.unwrap_or_else(rand::random);

        let out = Arc::clone(&self.out);
        let worker_stop = stop.clone();
        let mut pos = self.position.clone();

        let handle = thread::Builder::new()
            .name("search".to_string())
            .spawn(move || {
                let mut searcher = Searcher::with_seed(worker_stop, seed);

                let root = pos.clone();
                let info_out = Arc::clone(&out);
                searcher.set_info_callback(Some(Arc::new(move |info| {
                    print::iteration(&info_out, info, &root.format_move(info.best_move));
                })));

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    searcher.search(&mut pos, &params, &budget)
                }));
                match outcome {
                    Ok(result) => {
                        let text = result.best_move.map(|mv| pos.format_move(mv));
                        print::bestmove(&out, text.as_deref());
                    }
                    Err(_) => {
                        error!("search worker panicked; reporting null move");
                        print::bestmove(&out, None);
                    }
                }
            })
            .expect("failed to spawn search thread");

        self.job = Some(SearchJob { stop, handle });
    }

    fn handle_perft(&mut self, depth: u32) {
        if self.is_searching() {
            print::notice(&self.out, "cannot run perft while searching");
            return;
        }
        let start = Instant::now();
        let nodes = self.position.perft(depth);
        print::perft_report(&self.out, depth, nodes, start.elapsed());
    }

    /// Cancel any in-flight search. A no-op when nothing is in flight.
    fn stop_search(&mut self) {
        if let Some(job) = self.job.take() {
            job.stop_and_wait();
        }
    }

    /// The session's current position, for tests and diagnostics.
    #[must_use]
    pub fn position(&self) -> &Position {
        &self.position
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
