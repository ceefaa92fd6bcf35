//! QuickBot: a small UCI chess engine.
//!
//! The crate is the search-and-protocol core: alpha-beta negamax with
//! iterative deepening, a material evaluator, time/budget management, and
//! the UCI state machine. Board rules (move generation, make/unmake, FEN)
//! come from `cozy-chess` behind the [`rules::Position`] adapter.

pub mod eval;
pub mod rules;
pub mod search;
pub mod sync;
pub mod time;
pub mod uci;

pub use rules::{Position, Status};
pub use search::{SearchResult, Searcher};
pub use sync::StopFlag;
pub use time::{derive_budget, GoParams, SearchBudget};
