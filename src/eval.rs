//! Material evaluation.
//!
//! Scores are centipawns from the perspective of the side to move, so the
//! same function serves both sides of a negamax search.

use cozy_chess::Piece;

use crate::rules::{Position, Status};

/// Upper bound of the search window. Never a legal score.
pub const INF_SCORE: i32 = 32_001;

/// Score for delivering checkmate. Mates found during search are reported
/// as `MATE_SCORE - ply` so shorter mates rank higher.
pub const MATE_SCORE: i32 = 32_000;

/// Scores with absolute value at or above this are mate scores.
pub const MATE_THRESHOLD: i32 = MATE_SCORE - MAX_PLY as i32;

/// Score for any drawn position.
pub const DRAW_SCORE: i32 = 0;

/// Deepest ply the search will ever reach.
pub const MAX_PLY: u32 = 128;

/// Material value of a piece in centipawns.
///
/// The king is worth zero: both kings are always on the board at any
/// position the evaluator sees, so counting them would only add noise.
#[must_use]
pub fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 0,
    }
}

/// Evaluate a position for the side to move.
///
/// Checkmate is the most negative score (the mated side is to move),
/// draws are zero, everything else is material balance.
#[must_use]
pub fn evaluate(pos: &Position) -> i32 {
    match pos.status() {
        Status::Checkmate => -MATE_SCORE,
        Status::Stalemate | Status::Draw => DRAW_SCORE,
        Status::Ongoing => material_balance(pos),
    }
}

/// Material balance for the side to move, ignoring terminal states.
#[must_use]
pub fn material_balance(pos: &Position) -> i32 {
    let board = pos.board();
    let us = board.side_to_move();
    let them = !us;

    let mut score = 0;
    for &piece in &Piece::ALL {
        let ours = (board.pieces(piece) & board.colors(us)).len() as i32;
        let theirs = (board.pieces(piece) & board.colors(them)).len() as i32;
        score += piece_value(piece) * (ours - theirs);
    }
    score
}
