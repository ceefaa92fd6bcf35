//! Search budget derivation.
//!
//! Translates the constraints accumulated from a `go` command into a
//! concrete budget: a depth cap, an optional wall-clock deadline, and an
//! optional node cap. The search polls deadline and node cap itself.

use std::time::{Duration, Instant};

use cozy_chess::{Color, Move};

use crate::eval::MAX_PLY;

/// Reserve for communication latency when spending clock time.
pub const MOVE_OVERHEAD_MS: u64 = 50;

/// Moves-to-go estimate when the GUI does not send one.
pub const DEFAULT_MOVES_TO_GO: u64 = 30;

/// Never spend more than this fraction of the remaining clock on one move.
const MAX_CLOCK_FRACTION: u64 = 2;

/// Request-scoped parameters parsed from a `go` command.
///
/// Built fresh per request, consumed by one search, then discarded.
#[derive(Debug, Clone, Default)]
pub struct GoParams {
    /// Remaining clock time per side, milliseconds.
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    /// Per-move increment per side, milliseconds.
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    /// Moves until the next time control.
    pub movestogo: Option<u64>,
    /// Fixed search depth in plies.
    pub depth: Option<u32>,
    /// Fixed node budget.
    pub nodes: Option<u64>,
    /// Fixed time for this move, milliseconds.
    pub movetime: Option<u64>,
    /// Search for a mate in this many full moves.
    pub mate: Option<u32>,
    /// Search until an explicit stop.
    pub infinite: bool,
    /// Ponder on the opponent's time; cancellable like infinite.
    pub ponder: bool,
    /// Restrict the root to these moves. Empty means unrestricted.
    pub search_moves: Vec<Move>,
}

impl GoParams {
    /// Remaining time and increment for the given side.
    #[must_use]
    pub fn clock_for(&self, side: Color) -> (Option<u64>, u64) {
        match side {
            Color::White => (self.wtime, self.winc.unwrap_or(0)),
            Color::Black => (self.btime, self.binc.unwrap_or(0)),
        }
    }
}

/// Concrete resource budget for one search invocation.
#[derive(Debug, Clone, Copy)]
pub struct SearchBudget {
    /// Iterative deepening stops after this depth.
    pub max_depth: u32,
    /// Hard wall-clock deadline, if any.
    pub deadline: Option<Instant>,
    /// Maximum nodes to visit, if any.
    pub node_cap: Option<u64>,
}

impl SearchBudget {
    /// A budget with no limits beyond the ply ceiling. Only an explicit
    /// stop ends such a search.
    #[must_use]
    pub fn unlimited() -> Self {
        SearchBudget {
            max_depth: MAX_PLY,
            deadline: None,
            node_cap: None,
        }
    }

    /// Fixed-depth budget with no clock or node limit.
    #[must_use]
    pub fn depth(depth: u32) -> Self {
        SearchBudget {
            max_depth: depth.clamp(1, MAX_PLY),
            deadline: None,
            node_cap: None,
        }
    }

    /// Deadline-only budget.
    #[must_use]
    pub fn until(deadline: Instant) -> Self {
        SearchBudget {
            max_depth: MAX_PLY,
            deadline: Some(deadline),
            node_cap: None,
        }
    }

    /// Node-cap-only budget.
    #[must_use]
    pub fn nodes(cap: u64) -> Self {
        SearchBudget {
            max_depth: MAX_PLY,
            deadline: None,
            node_cap: Some(cap.max(1)),
        }
    }
}

/// Derive a budget from go parameters. First matching rule wins:
/// fixed depth, fixed nodes, fixed movetime, mate distance,
/// infinite/ponder, then the clock heuristic.
///
/// The clock heuristic allots `remaining / movestogo + increment`,
/// capped at half the remaining clock, after reserving a move overhead.
/// Depth 1 always completes regardless of deadline, so a legal move is
/// produced even on a hopeless clock.
#[must_use]
pub fn derive_budget(params: &GoParams, side: Color, now: Instant) -> SearchBudget {
    if let Some(depth) = params.depth {
        return SearchBudget::depth(depth);
    }
    if let Some(cap) = params.nodes {
        return SearchBudget::nodes(cap);
    }
    if let Some(ms) = params.movetime {
        return SearchBudget::until(now + Duration::from_millis(ms.max(1)));
    }
    if let Some(mate) = params.mate {
        // A mate in N moves is at most 2N-1 plies deep.
        return SearchBudget::depth((2 * mate).saturating_sub(1).max(1));
    }
    if params.infinite || params.ponder {
        return SearchBudget::unlimited();
    }

    let (remaining, inc) = params.clock_for(side);
    match remaining {
        // Bare `go` carries no constraint at all; treat it like infinite.
        None => SearchBudget::unlimited(),
        Some(remaining) => {
            let safe = remaining.saturating_sub(MOVE_OVERHEAD_MS);
            let movestogo = params.movestogo.unwrap_or(DEFAULT_MOVES_TO_GO).max(1);
            let allotment = (safe / movestogo + inc)
                .min(safe / MAX_CLOCK_FRACTION)
                .max(1);
            SearchBudget::until(now + Duration::from_millis(allotment))
        }
    }
}
