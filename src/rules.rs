//! Rules-engine adapter over `cozy-chess`.
//!
//! The search and protocol layers never talk to `cozy_chess::Board` directly.
//! `Position` adds the pieces the core contract needs on top of the library:
//! an undo stack for make/unmake pairing, a hash history for repetition
//! detection, UCI move conversion (castling notation differs), and perft.

use std::fmt;

use cozy_chess::util::{display_uci_move, parse_uci_move};
use cozy_chess::{Board, Color, GameStatus, Move, Rank, Square};

/// FEN for the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Terminal-state classification for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Game continues, at least one legal move exists.
    Ongoing,
    /// Side to move is in check with no legal moves.
    Checkmate,
    /// Side to move has no legal moves but is not in check.
    Stalemate,
    /// Drawn by the fifty-move rule or threefold repetition.
    Draw,
}

/// Error parsing a FEN string.
#[derive(Debug, Clone)]
pub struct FenError(String);

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid FEN: {}", self.0)
    }
}

impl std::error::Error for FenError {}

/// Error parsing or applying a UCI move token.
#[derive(Debug, Clone)]
pub struct MoveError(String);

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal move: {}", self.0)
    }
}

impl std::error::Error for MoveError {}

/// Undo record pushed per applied move.
///
/// `cozy-chess` does not expose incremental unmake, so the record is a
/// snapshot of the board before the move. The core only ever pushes and
/// pops these in LIFO order.
#[derive(Clone)]
struct Undo {
    board: Board,
}

/// A chess position with make/unmake support and game history.
#[derive(Clone)]
pub struct Position {
    board: Board,
    undo_stack: Vec<Undo>,
    /// Hashes of positions reached earlier in the game/search line,
    /// oldest first. Used for threefold repetition detection.
    history: Vec<u64>,
}

impl Position {
    /// Create the standard starting position.
    #[must_use]
    pub fn startpos() -> Self {
        Position {
            board: Board::default(),
            undo_stack: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Parse a position from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let board = Board::from_fen(fen, false).map_err(|_| FenError(fen.to_string()))?;
        Ok(Position {
            board,
            undo_stack: Vec::new(),
            history: Vec::new(),
        })
    }

    /// The underlying board, for evaluation-side queries.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Side to move.
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    /// Encode the current position as FEN.
    #[must_use]
    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    /// Zobrist hash of the current position.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.board.hash()
    }

    /// Number of undo records currently on the stack.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Generate all legal moves for the side to move.
    #[must_use]
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(48);
        self.board.generate_moves(|batch| {
            moves.extend(batch);
            false
        });
        moves
    }

    /// Whether the side to move has at least one legal move.
    #[must_use]
    pub fn has_legal_moves(&self) -> bool {
        let mut any = false;
        self.board.generate_moves(|_| {
            any = true;
            true
        });
        any
    }

    /// Apply a move known to be legal, pushing an undo record.
    pub fn make(&mut self, mv: Move) {
        self.undo_stack.push(Undo {
            board: self.board.clone(),
        });
        self.history.push(self.board.hash());
        self.board.play_unchecked(mv);
    }

    /// Apply a move after checking legality. Used when replaying
    /// GUI-supplied move lists; on error the position is unchanged.
    pub fn try_make(&mut self, mv: Move) -> Result<(), MoveError> {
        let mut next = self.board.clone();
        next.try_play(mv)
            .map_err(|_| MoveError(mv.to_string()))?;
        self.undo_stack.push(Undo {
            board: self.board.clone(),
        });
        self.history.push(self.board.hash());
        self.board = next;
        Ok(())
    }

    /// Revert the most recent `make`.
    ///
    /// Panics in debug builds if the undo stack is empty; a mismatched
    /// make/unmake pair is a bug in the caller.
    pub fn unmake(&mut self) {
        debug_assert!(!self.undo_stack.is_empty(), "unmake without matching make");
        if let Some(undo) = self.undo_stack.pop() {
            self.board = undo.board;
            self.history.pop();
        }
    }

    /// Run `f` with `mv` applied, reverting on every exit path.
    ///
    /// This is the only way search code applies moves, so a pruned or
    /// aborted branch can never leak a move past its node.
    pub fn with_move<R>(&mut self, mv: Move, f: impl FnOnce(&mut Position) -> R) -> R {
        self.make(mv);
        let out = f(self);
        self.unmake();
        out
    }

    /// Parse a move in UCI coordinate notation ("e2e4", "e7e8q", "e1g1")
    /// against the current position. Only legal moves parse.
    pub fn parse_move(&self, token: &str) -> Result<Move, MoveError> {
        let mv = parse_uci_move(&self.board, token).map_err(|_| MoveError(token.to_string()))?;
        if self.board.is_legal(mv) {
            Ok(mv)
        } else {
            Err(MoveError(token.to_string()))
        }
    }

    /// Format a move in UCI coordinate notation for the current position.
    #[must_use]
    pub fn format_move(&self, mv: Move) -> String {
        display_uci_move(&self.board, mv).to_string()
    }

    /// Classify the current position's terminal state.
    #[must_use]
    pub fn status(&self) -> Status {
        match self.board.status() {
            GameStatus::Won => Status::Checkmate,
            GameStatus::Drawn => {
                if self.has_legal_moves() {
                    Status::Draw
                } else {
                    Status::Stalemate
                }
            }
            GameStatus::Ongoing => {
                if self.is_repetition() {
                    Status::Draw
                } else {
                    Status::Ongoing
                }
            }
        }
    }

    /// Threefold repetition: the current position occurred at least
    /// twice before in the game history.
    fn is_repetition(&self) -> bool {
        let hash = self.board.hash();
        self.history.iter().filter(|&&h| h == hash).count() >= 2
    }

    /// Count leaf nodes of the move-generation tree to `depth`.
    ///
    /// Used to validate move generation, not evaluation.
    #[must_use]
    pub fn perft(&mut self, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.legal_moves();
        if depth == 1 {
            return moves.len() as u64;
        }
        let mut nodes = 0;
        for mv in moves {
            nodes += self.with_move(mv, |pos| pos.perft(depth - 1));
        }
        nodes
    }
}

impl fmt::Display for Position {
    /// ASCII board diagram plus the FEN line, for the `d` command.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &rank in Rank::ALL.iter().rev() {
            write!(f, "{} ", rank as usize + 1)?;
            for &file in &cozy_chess::File::ALL {
                let sq = Square::new(file, rank);
                let symbol = match self.board.piece_on(sq) {
                    Some(piece) => {
                        let c = piece_char(piece);
                        if self.board.color_on(sq) == Some(Color::White) {
                            c.to_ascii_uppercase()
                        } else {
                            c
                        }
                    }
                    None => '.',
                };
                write!(f, "{symbol} ")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h")?;
        write!(f, "fen: {}", self.fen())
    }
}

fn piece_char(piece: cozy_chess::Piece) -> char {
    match piece {
        cozy_chess::Piece::Pawn => 'p',
        cozy_chess::Piece::Knight => 'n',
        cozy_chess::Piece::Bishop => 'b',
        cozy_chess::Piece::Rook => 'r',
        cozy_chess::Piece::Queen => 'q',
        cozy_chess::Piece::King => 'k',
    }
}
