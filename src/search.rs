//! Alpha-beta negamax search with iterative deepening.
//!
//! The searcher walks the game tree through the rules adapter, scoring
//! leaves with the material evaluator. Cancellation is cooperative: the
//! node loop polls the stop flag, the deadline, and the node cap at a
//! fixed node interval, so a `stop` command or an expired budget ends the
//! search promptly without a second watchdog thread. An aborted depth
//! never overrides the result of the last fully completed depth.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cozy_chess::Move;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::eval::{self, DRAW_SCORE, INF_SCORE, MATE_SCORE, MATE_THRESHOLD};
use crate::rules::{Position, Status};
use crate::sync::StopFlag;
use crate::time::{GoParams, SearchBudget};

/// Poll stop flag, deadline, and node cap once per this many nodes.
const POLL_INTERVAL: u64 = 1024;

/// Result of one search invocation, immutable once produced.
#[derive(Debug, Clone, Copy)]
pub struct SearchResult {
    /// Best move found, `None` only when the root has no legal move.
    pub best_move: Option<Move>,
    /// Score of the best move from the side to move's perspective.
    pub score: i32,
    /// Deepest iteration that ran to completion.
    pub depth: u32,
    /// Nodes visited across all iterations.
    pub nodes: u64,
}

/// Report for one completed iterative-deepening iteration.
pub struct IterationInfo {
    pub depth: u32,
    pub score: i32,
    pub nodes: u64,
    pub elapsed: Duration,
    pub best_move: Move,
}

/// Callback invoked after each completed iteration.
pub type InfoCallback = Arc<dyn Fn(&IterationInfo) + Send + Sync>;

/// Mutable state for one search invocation.
struct SearchContext {
    stop: StopFlag,
    deadline: Option<Instant>,
    node_cap: Option<u64>,
    start: Instant,
    nodes: u64,
    aborted: bool,
    /// Depth 1 always runs to completion so a legal move is available
    /// even when the budget is already exhausted.
    abort_allowed: bool,
}

impl SearchContext {
    fn over_budget(&self) -> bool {
        if !self.abort_allowed {
            return false;
        }
        if self.stop.is_stopped() {
            return true;
        }
        if let Some(cap) = self.node_cap {
            if self.nodes >= cap {
                return true;
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        false
    }
}

/// Tree searcher with an injectable random source.
///
/// The RNG only shuffles the root move list, so among equally scored
/// moves the engine does not repeat itself from game to game. A strictly
/// better score always wins regardless of ordering; seeding the RNG makes
/// a search run reproducible in tests.
pub struct Searcher {
    stop: StopFlag,
    rng: StdRng,
    info: Option<InfoCallback>,
}

impl Searcher {
    /// Create a searcher with a random shuffle seed.
    #[must_use]
    pub fn new(stop: StopFlag) -> Self {
        Self::with_seed(stop, rand::random())
    }

    /// Create a searcher with a fixed shuffle seed.
    #[must_use]
    pub fn with_seed(stop: StopFlag, seed: u64) -> Self {
        Searcher {
            stop,
            rng: StdRng::seed_from_u64(seed),
            info: None,
        }
    }

    /// Install a per-iteration progress callback.
    pub fn set_info_callback(&mut self, info: Option<InfoCallback>) {
        self.info = info;
    }

    /// Search the position within the given budget.
    ///
    /// On return the position is exactly as it was on entry; every move
    /// applied during the walk has been reverted.
    pub fn search(
        &mut self,
        pos: &mut Position,
        params: &GoParams,
        budget: &SearchBudget,
    ) -> SearchResult {
        let mut ctx = SearchContext {
            stop: self.stop.clone(),
            deadline: budget.deadline,
            node_cap: budget.node_cap,
            start: Instant::now(),
            nodes: 0,
            aborted: false,
            abort_allowed: false,
        };

        let mut root_moves = pos.legal_moves();
        if !params.search_moves.is_empty() {
            let restricted: Vec<Move> = root_moves
                .iter()
                .copied()
                .filter(|mv| params.search_moves.contains(mv))
                .collect();
            // An empty restriction set means unrestricted.
            if !restricted.is_empty() {
                root_moves = restricted;
            }
        }

        if root_moves.is_empty() {
            let score = match pos.status() {
                Status::Checkmate => -MATE_SCORE,
                _ => DRAW_SCORE,
            };
            return SearchResult {
                best_move: None,
                score,
                depth: 0,
                nodes: 0,
            };
        }

        root_moves.shuffle(&mut self.rng);

        let mut best = SearchResult {
            best_move: None,
            score: -INF_SCORE,
            depth: 0,
            nodes: 0,
        };

        for depth in 1..=budget.max_depth {
            ctx.abort_allowed = depth > 1;
            if ctx.over_budget() {
                break;
            }

            let Some((mv, score)) = Self::search_root(pos, &mut ctx, &root_moves, depth) else {
                // Aborted mid-iteration; keep the last complete result.
                break;
            };

            best = SearchResult {
                best_move: Some(mv),
                score,
                depth,
                nodes: ctx.nodes,
            };

            // Try the proven best move first at the next depth.
            if let Some(idx) = root_moves.iter().position(|&m| m == mv) {
                root_moves[..=idx].rotate_right(1);
            }

            if let Some(info) = &self.info {
                info(&IterationInfo {
                    depth,
                    score,
                    nodes: ctx.nodes,
                    elapsed: ctx.start.elapsed(),
                    best_move: mv,
                });
            }

            // A forced mate does not get better with more depth.
            if score.abs() >= MATE_THRESHOLD {
                break;
            }
        }

        best.nodes = ctx.nodes;
        debug!(
            "search done: depth {} score {} nodes {}",
            best.depth, best.score, best.nodes
        );
        best
    }

    /// One full-width root iteration. Returns `None` when aborted, in
    /// which case the caller discards the partial iteration.
    fn search_root(
        pos: &mut Position,
        ctx: &mut SearchContext,
        moves: &[Move],
        depth: u32,
    ) -> Option<(Move, i32)> {
        let mut alpha = -INF_SCORE;
        let beta = INF_SCORE;
        let mut best: Option<(Move, i32)> = None;

        for &mv in moves {
            let score = pos.with_move(mv, |p| -Self::negamax(p, ctx, depth - 1, 1, -beta, -alpha));
            if ctx.aborted {
                return None;
            }
            if best.map_or(true, |(_, bs)| score > bs) {
                best = Some((mv, score));
                if score > alpha {
                    alpha = score;
                }
            }
        }

        best
    }

    fn negamax(
        pos: &mut Position,
        ctx: &mut SearchContext,
        depth: u32,
        ply: u32,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        ctx.nodes += 1;
        if ctx.nodes % POLL_INTERVAL == 0 && ctx.over_budget() {
            ctx.aborted = true;
        }
        if ctx.aborted {
            return 0;
        }

        match pos.status() {
            // Mate scores carry the distance so a faster mate ranks higher.
            Status::Checkmate => return -(MATE_SCORE - ply as i32),
            Status::Stalemate | Status::Draw => return DRAW_SCORE,
            Status::Ongoing => {}
        }

        if depth == 0 {
            // Terminal states were handled above.
            return eval::material_balance(pos);
        }

        let mut moves = pos.legal_moves();
        order_moves(pos, &mut moves);

        let mut best = -INF_SCORE;
        for mv in moves {
            let score =
                pos.with_move(mv, |p| -Self::negamax(p, ctx, depth - 1, ply + 1, -beta, -alpha));
            if ctx.aborted {
                return 0;
            }
            if score > best {
                best = score;
                if score > alpha {
                    alpha = score;
                }
            }
            if alpha >= beta {
                break;
            }
        }

        best
    }
}

/// Captures before quiet moves, biggest victim first. The sort is stable,
/// so ties keep whatever order the candidate list already has.
fn order_moves(pos: &Position, moves: &mut [Move]) {
    let board = pos.board();
    moves.sort_by_key(|mv| {
        let victim = board.piece_on(mv.to).map_or(0, eval::piece_value);
        std::cmp::Reverse(victim)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_depth(pos: &mut Position, depth: u32, seed: u64) -> SearchResult {
        let mut searcher = Searcher::with_seed(StopFlag::new(), seed);
        searcher.search(pos, &GoParams::default(), &SearchBudget::depth(depth))
    }

    #[test]
    fn depth_one_returns_a_legal_move() {
        let mut pos = Position::startpos();
        let result = search_depth(&mut pos, 1, 7);
        let mv = result.best_move.expect("startpos has legal moves");
        assert!(pos.legal_moves().contains(&mv));
        assert_eq!(result.depth, 1);
    }

    #[test]
    fn position_is_restored_after_search() {
        let mut pos =
            Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4")
                .unwrap();
        let fen_before = pos.fen();
        search_depth(&mut pos, 3, 1);
        assert_eq!(pos.fen(), fen_before);
        assert_eq!(pos.undo_depth(), 0);
    }

    #[test]
    fn checkmated_root_returns_empty_sentinel() {
        let mut pos = Position::from_fen(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        )
        .unwrap();
        let result = search_depth(&mut pos, 3, 1);
        assert!(result.best_move.is_none());
        assert_eq!(result.score, -MATE_SCORE);
    }

    #[test]
    fn stalemated_root_returns_draw_score() {
        let mut pos = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let result = search_depth(&mut pos, 3, 1);
        assert!(result.best_move.is_none());
        assert_eq!(result.score, DRAW_SCORE);
    }

    #[test]
    fn finds_mate_in_one_back_rank() {
        let mut pos = Position::from_fen("6k1/5ppp/8/8/8/8/8/4Q2K w - - 0 1").unwrap();
        let result = search_depth(&mut pos, 3, 42);
        let mv = result.best_move.expect("should find a move");
        assert_eq!(pos.format_move(mv), "e1e8", "Qe8# is the back rank mate");
        assert!(result.score >= MATE_THRESHOLD);
    }

    #[test]
    fn captures_hanging_queen() {
        // Black queen hangs on h4 with white to move.
        let mut pos = Position::from_fen(
            "rnb1kbnr/pppp1ppp/8/4p3/7q/5N2/PPPPPPPP/RNBQKB1R w KQkq - 0 3",
        )
        .unwrap();
        let result = search_depth(&mut pos, 3, 9);
        let mv = result.best_move.expect("should find a move");
        assert_eq!(pos.format_move(mv), "f3h4", "Nxh4 wins the queen");
    }

    #[test]
    fn score_is_independent_of_shuffle_seed() {
        let mut pos = Position::from_fen(
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
        )
        .unwrap();
        let baseline = search_depth(&mut pos, 3, 0).score;
        for seed in 1..5 {
            assert_eq!(search_depth(&mut pos, 3, seed).score, baseline);
        }
    }

    #[test]
    fn searchmoves_restricts_the_root() {
        let mut pos = Position::startpos();
        let only = pos.parse_move("a2a3").unwrap();
        let params = GoParams {
            search_moves: vec![only],
            ..GoParams::default()
        };
        let mut searcher = Searcher::with_seed(StopFlag::new(), 3);
        let result = searcher.search(&mut pos, &params, &SearchBudget::depth(2));
        assert_eq!(result.best_move, Some(only));
    }

    #[test]
    fn node_cap_stops_the_search() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::with_seed(StopFlag::new(), 5);
        let result = searcher.search(&mut pos, &GoParams::default(), &SearchBudget::nodes(2000));
        assert!(result.best_move.is_some());
        // Depth 1 is exempt from the cap; afterwards one poll interval of
        // overshoot is the worst case.
        assert!(result.nodes < 2000 + 2 * POLL_INTERVAL);
    }

    #[test]
    fn preset_stop_flag_still_yields_depth_one_move() {
        let stop = StopFlag::new();
        stop.stop();
        let mut pos = Position::startpos();
        let mut searcher = Searcher::with_seed(stop, 11);
        let result = searcher.search(&mut pos, &GoParams::default(), &SearchBudget::unlimited());
        assert!(result.best_move.is_some());
        assert_eq!(result.depth, 1);
    }

    #[test]
    fn deadline_bounds_search_time() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::with_seed(StopFlag::new(), 2);
        let start = Instant::now();
        let budget = SearchBudget::until(start + Duration::from_millis(100));
        let result = searcher.search(&mut pos, &GoParams::default(), &budget);
        assert!(result.best_move.is_some());
        assert!(
            start.elapsed() < Duration::from_millis(2000),
            "deadline polling should bound the overshoot"
        );
    }
}
