//! Protocol response formatting.
//!
//! Every line a GUI may parse is produced here and routed through the
//! shared `SyncOut` so worker and control threads never interleave.

use std::time::Duration;

use crate::eval::{MATE_SCORE, MATE_THRESHOLD};
use crate::search::IterationInfo;
use crate::sync::SyncOut;

pub const ENGINE_NAME: &str = "QuickBot";
pub const ENGINE_AUTHOR: &str = "the QuickBot developers";

/// Printed in place of a move when no legal move exists.
pub const NULL_MOVE: &str = "0000";

pub fn identify(out: &SyncOut) {
    out.line(&format!(
        "id name {} v{}",
        ENGINE_NAME,
        env!("CARGO_PKG_VERSION")
    ));
    out.line(&format!("id author {ENGINE_AUTHOR}"));
    out.line("uciok");
}

pub fn ready(out: &SyncOut) {
    out.line("readyok");
}

pub fn bestmove(out: &SyncOut, mv: Option<&str>) {
    match mv {
        Some(mv) => out.line(&format!("bestmove {mv}")),
        None => out.line(&format!("bestmove {NULL_MOVE}")),
    }
}

/// Per-iteration progress line.
pub fn iteration(out: &SyncOut, info: &IterationInfo, mv: &str) {
    out.line(&format!(
        "info depth {} score {} nodes {} time {} pv {}",
        info.depth,
        format_score(info.score),
        info.nodes,
        info.elapsed.as_millis(),
        mv
    ));
}

/// UCI score field: `cp <centipawns>` or `mate <moves>` with the sign
/// carrying who mates.
#[must_use]
pub fn format_score(score: i32) -> String {
    if score.abs() >= MATE_THRESHOLD {
        let plies = MATE_SCORE - score.abs();
        let moves = (plies + 1) / 2;
        if score > 0 {
            format!("mate {moves}")
        } else {
            format!("mate -{moves}")
        }
    } else {
        format!("cp {score}")
    }
}

pub fn perft_report(out: &SyncOut, depth: u32, nodes: u64, elapsed: Duration) {
    out.line(&format!(
        "info string perft depth {} nodes {} time {} ms",
        depth,
        nodes,
        elapsed.as_millis()
    ));
}

/// One-line notice for anything the parser did not recognize.
pub fn unknown(out: &SyncOut, line: &str) {
    out.line(&format!(
        "Unknown command: '{line}'. Type help for more information."
    ));
}

/// Non-protocol notice surfaced to the operator.
pub fn notice(out: &SyncOut, text: &str) {
    out.line(&format!("info string {text}"));
}

pub fn help(out: &SyncOut) {
    out.line("Commands:");
    out.line("quit - quit program");
    out.line("uci - show uci info");
    out.line("go - start search");
    out.line("stop - stop search");
    out.line("position - set position");
    out.line("ucinewgame - new game");
    out.line("isready - readyok");
    out.line("d - display board");
    out.line("perft N - count move-generation nodes");
    out.line("help - show this help");
}
