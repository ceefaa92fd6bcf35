//! Command-line tokenization and parameter parsing.

use log::warn;

use crate::rules::{FenError, MoveError, Position};
use crate::time::GoParams;

use super::UciError;

/// One recognized protocol command, tokenized but not yet interpreted.
#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    Position(Vec<String>),
    Go(Vec<String>),
    SetOption,
    Stop,
    Quit,
    /// `d` - print the current board.
    Display,
    Perft(u32),
    Help,
    Unknown(String),
}

/// Tokenize one input line. Blank lines and `#` comments yield `None`.
#[must_use]
pub fn parse_command(line: &str) -> Option<UciCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    let owned_parts = || parts.iter().map(|p| (*p).to_string()).collect::<Vec<String>>();

    let cmd = match parts[0] {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "position" => UciCommand::Position(owned_parts()),
        "go" => UciCommand::Go(owned_parts()),
        "setoption" => UciCommand::SetOption,
        "stop" => UciCommand::Stop,
        "quit" => UciCommand::Quit,
        "d" => UciCommand::Display,
        "perft" => {
            let depth = parts.get(1).and_then(|v| v.parse::<u32>().ok()).unwrap_or(1);
            UciCommand::Perft(depth)
        }
        "help" | "--help" => UciCommand::Help,
        _ => UciCommand::Unknown(trimmed.to_string()),
    };

    Some(cmd)
}

/// Apply a `position` command to `pos`.
///
/// Supports `position startpos` and `position fen <fen>`, optionally
/// followed by `moves <m1> <m2> ...`. An illegal move in the list aborts
/// the replay and leaves the position at the last legal move applied; a
/// bad FEN leaves the position untouched.
pub fn parse_position(pos: &mut Position, parts: &[String]) -> Result<(), UciError> {
    let mut i = 1;
    match parts.get(i).map(String::as_str) {
        Some("startpos") => {
            *pos = Position::startpos();
            i += 1;
        }
        Some("fen") => {
            i += 1;
            let mut fen_fields = Vec::new();
            while i < parts.len() && parts[i] != "moves" {
                fen_fields.push(parts[i].as_str());
                i += 1;
            }
            *pos = Position::from_fen(&fen_fields.join(" "))?;
        }
        _ => return Err(UciError::MissingParts),
    }

    if parts.get(i).map(String::as_str) == Some("moves") {
        i += 1;
        while i < parts.len() {
            let mv = pos.parse_move(&parts[i]).map_err(|e| UciError::InvalidMove {
                move_str: parts[i].clone(),
                error: e,
            })?;
            pos.make(mv);
            i += 1;
        }
    }

    Ok(())
}

/// Build `GoParams` from a tokenized `go` command.
///
/// Numeric values that fail to parse default to zero; unknown clauses are
/// skipped. `searchmoves` must be the final clause and consumes the rest
/// of the line, validating each token against the current position.
#[must_use]
pub fn parse_go(pos: &Position, parts: &[String]) -> GoParams {
    let mut params = GoParams::default();
    let mut i = 1;

    while i < parts.len() {
        match parts[i].as_str() {
            "searchmoves" => {
                i += 1;
                while i < parts.len() {
                    match pos.parse_move(&parts[i]) {
                        Ok(mv) => params.search_moves.push(mv),
                        Err(e) => warn!("ignoring searchmoves token '{}': {e}", parts[i]),
                    }
                    i += 1;
                }
            }
            "wtime" => params.wtime = Some(take_u64(parts, &mut i)),
            "btime" => params.btime = Some(take_u64(parts, &mut i)),
            "winc" => params.winc = Some(take_u64(parts, &mut i)),
            "binc" => params.binc = Some(take_u64(parts, &mut i)),
            "movestogo" => params.movestogo = Some(take_u64(parts, &mut i)),
            "depth" => params.depth = Some(take_u32(parts, &mut i)),
            "nodes" => params.nodes = Some(take_u64(parts, &mut i)),
            "movetime" => params.movetime = Some(take_u64(parts, &mut i)),
            "mate" => params.mate = Some(take_u32(parts, &mut i)),
            "infinite" => {
                params.infinite = true;
                i += 1;
            }
            "ponder" => {
                params.ponder = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    params
}

/// Consume the value following a keyword. A missing or malformed number
/// parses as zero rather than failing the whole command.
fn take_u64(parts: &[String], i: &mut usize) -> u64 {
    let value = parts
        .get(*i + 1)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    *i += 2;
    value
}

/// Like `take_u64`, saturating instead of truncating for narrow fields.
fn take_u32(parts: &[String], i: &mut usize) -> u32 {
    take_u64(parts, i).min(u64::from(u32::MAX)) as u32
}

impl From<FenError> for UciError {
    fn from(e: FenError) -> Self {
        UciError::InvalidFen(e)
    }
}

impl From<MoveError> for UciError {
    fn from(e: MoveError) -> Self {
        UciError::InvalidMove {
            move_str: String::new(),
            error: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn blank_and_comment_lines_are_ignored() {
        assert!(parse_command("").is_none());
        assert!(parse_command("   ").is_none());
        assert!(parse_command("# a comment").is_none());
    }

    #[test]
    fn unknown_commands_are_reported() {
        match parse_command("frobnicate now") {
            Some(UciCommand::Unknown(line)) => assert_eq!(line, "frobnicate now"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn position_startpos_with_moves() {
        let mut pos = Position::startpos();
        parse_position(&mut pos, &tokens("position startpos moves e2e4 e7e5")).unwrap();
        assert!(pos.fen().starts_with("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w"));
    }

    #[test]
    fn position_fen_collects_fields_until_moves() {
        let mut pos = Position::startpos();
        parse_position(
            &mut pos,
            &tokens("position fen 6k1/5ppp/8/8/8/8/8/4Q2K w - - 0 1 moves e1e8"),
        )
        .unwrap();
        assert!(pos.fen().starts_with("4Q1k1/5ppp/8/8/8/8/8/7K b"));
    }

    #[test]
    fn position_missing_keyword_is_an_error() {
        let mut pos = Position::startpos();
        let fen_before = pos.fen();
        assert!(parse_position(&mut pos, &tokens("position lolwut")).is_err());
        assert_eq!(pos.fen(), fen_before);
    }

    #[test]
    fn illegal_move_aborts_replay_at_last_good_move() {
        let mut pos = Position::startpos();
        let err = parse_position(&mut pos, &tokens("position startpos moves e2e4 e2e4 e7e5"));
        assert!(err.is_err());
        // e2e4 applied, the rest dropped.
        assert!(pos.fen().starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
    }

    #[test]
    fn go_parses_clock_and_limits() {
        let pos = Position::startpos();
        let params = parse_go(
            &pos,
            &tokens("go wtime 300000 btime 300000 winc 2000 binc 2000 movestogo 40"),
        );
        assert_eq!(params.wtime, Some(300_000));
        assert_eq!(params.btime, Some(300_000));
        assert_eq!(params.winc, Some(2000));
        assert_eq!(params.binc, Some(2000));
        assert_eq!(params.movestogo, Some(40));
        assert!(!params.infinite);
    }

    #[test]
    fn go_malformed_number_defaults_to_zero() {
        let pos = Position::startpos();
        let params = parse_go(&pos, &tokens("go movetime banana"));
        assert_eq!(params.movetime, Some(0));
    }

    #[test]
    fn go_oversized_depth_saturates() {
        let pos = Position::startpos();
        // One past u32::MAX must not wrap around to a tiny depth.
        let params = parse_go(&pos, &tokens("go depth 4294967297 mate 4294967297"));
        assert_eq!(params.depth, Some(u32::MAX));
        assert_eq!(params.mate, Some(u32::MAX));
    }

    #[test]
    fn go_searchmoves_consumes_the_rest() {
        let pos = Position::startpos();
        let params = parse_go(&pos, &tokens("go depth 3 searchmoves e2e4 d2d4"));
        assert_eq!(params.depth, Some(3));
        assert_eq!(params.search_moves.len(), 2);
    }

    #[test]
    fn go_searchmoves_skips_illegal_tokens() {
        let pos = Position::startpos();
        let params = parse_go(&pos, &tokens("go searchmoves e2e4 e2e5 zz99"));
        assert_eq!(params.search_moves.len(), 1);
    }

    #[test]
    fn go_flags() {
        let pos = Position::startpos();
        let params = parse_go(&pos, &tokens("go infinite"));
        assert!(params.infinite);
        let params = parse_go(&pos, &tokens("go ponder wtime 1000"));
        assert!(params.ponder);
        assert_eq!(params.wtime, Some(1000));
    }
}
