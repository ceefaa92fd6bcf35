//! Property-based tests using proptest.
//!
//! Positions are generated by seeded random playouts from the starting
//! position, which keeps every sampled position reachable and legal.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use quickbot::eval::{self, INF_SCORE, MATE_SCORE};
use quickbot::{GoParams, Position, SearchBudget, Searcher, Status, StopFlag};

/// Plain full-width negamax, no pruning. The reference the pruned search
/// must agree with at the root.
fn plain_negamax(pos: &mut Position, depth: u32, ply: u32) -> i32 {
    match pos.status() {
        Status::Checkmate => return -(MATE_SCORE - ply as i32),
        Status::Stalemate | Status::Draw => return 0,
        Status::Ongoing => {}
    }
    if depth == 0 {
        return eval::material_balance(pos);
    }

    let mut best = -INF_SCORE;
    for mv in pos.legal_moves() {
        let score = pos.with_move(mv, |p| -plain_negamax(p, depth - 1, ply + 1));
        if score > best {
            best = score;
        }
    }
    best
}

/// Play out `plies` random legal moves from the starting position.
fn random_position(seed: u64, plies: usize) -> Position {
    let mut pos = Position::startpos();
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..plies {
        let moves = pos.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        pos.make(mv);
    }
    pos
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: alpha-beta pruning never changes the root score.
    #[test]
    fn prop_alphabeta_matches_plain_negamax(seed in any::<u64>(), plies in 0..24usize) {
        let mut pos = random_position(seed, plies);
        if pos.legal_moves().is_empty() {
            return Ok(());
        }

        let depth = 2;
        let reference = plain_negamax(&mut pos, depth, 0);

        let mut searcher = Searcher::with_seed(StopFlag::new(), seed);
        let result = searcher.search(&mut pos, &GoParams::default(), &SearchBudget::depth(depth));

        prop_assert_eq!(result.score, reference);
    }

    /// Property: search leaves the position exactly as it found it.
    #[test]
    fn prop_search_restores_position(seed in any::<u64>(), plies in 0..40usize) {
        let mut pos = random_position(seed, plies);
        let fen_before = pos.fen();
        let hash_before = pos.hash();
        let undo_before = pos.undo_depth();

        let mut searcher = Searcher::with_seed(StopFlag::new(), seed ^ 1);
        searcher.search(&mut pos, &GoParams::default(), &SearchBudget::depth(2));

        prop_assert_eq!(pos.fen(), fen_before);
        prop_assert_eq!(pos.hash(), hash_before);
        prop_assert_eq!(pos.undo_depth(), undo_before);
    }

    /// Property: evaluation is pure and deterministic.
    #[test]
    fn prop_evaluate_is_deterministic(seed in any::<u64>(), plies in 0..40usize) {
        let pos = random_position(seed, plies);
        let fen_before = pos.fen();
        let first = eval::evaluate(&pos);
        for _ in 0..3 {
            prop_assert_eq!(eval::evaluate(&pos), first);
        }
        prop_assert_eq!(pos.fen(), fen_before);
    }

    /// Property: the chosen root move is always legal.
    #[test]
    fn prop_best_move_is_legal(seed in any::<u64>(), plies in 0..24usize) {
        let mut pos = random_position(seed, plies);
        let legal = pos.legal_moves();

        let mut searcher = Searcher::with_seed(StopFlag::new(), seed);
        let result = searcher.search(&mut pos, &GoParams::default(), &SearchBudget::depth(2));

        match result.best_move {
            Some(mv) => prop_assert!(legal.contains(&mv)),
            None => prop_assert!(legal.is_empty()),
        }
    }
}
