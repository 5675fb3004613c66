//! Terminal evaluation: no-move endings and the anti-stalling counters.

use crate::board::Board;
use crate::check;
use crate::legality;
use crate::location::Move;
use crate::piece::{Color, Piece, PieceKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Thresholds of the anti-stalling rules.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Limits {
    /// Consecutive checking moves by one side before that side loses.
    pub perpetual_check: u32,
    /// Moves without a capture or a soldier advance beyond the river before a draw.
    pub no_progress: u32,
    /// Non-checking moves before a draw.
    pub effective_moves: u32,
    /// Total moves before a draw.
    pub total_moves: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            perpetual_check: 12,
            no_progress: 60,
            effective_moves: 120,
            total_moves: 300,
        }
    }
}

/// Counters advanced together after every applied move.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Counters {
    /// Consecutive checking moves, indexed by [`Color::index`].
    pub checks: [u32; 2],
    pub progress: u32,
    pub effective: u32,
    pub total: u32,
}

impl Counters {
    pub fn advance(&mut self, mover: Color, gives_check: bool, progress: bool) {
        let checks = &mut self.checks[mover.index()];
        *checks = if gives_check { *checks + 1 } else { 0 };

        self.progress = if progress { 0 } else { self.progress + 1 };

        if !gives_check {
            self.effective += 1;
        }

        self.total += 1;
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    PerpetualCheck,
    NoProgress,
    MoveLimit,
    MoveCap,
    Resigned,
    Timeout,
}

impl EndReason {
    pub fn is_draw(self) -> bool {
        matches!(self, Self::NoProgress | Self::MoveLimit | Self::MoveCap)
    }

    /// Endings a side declares about itself instead of ones read off the board.
    pub fn is_forfeit(self) -> bool {
        matches!(self, Self::Resigned | Self::Timeout)
    }

    fn token(self) -> &'static str {
        match self {
            Self::Checkmate => "checkmate",
            Self::Stalemate => "stalemate",
            Self::PerpetualCheck => "perpetual-check",
            Self::NoProgress => "no-progress",
            Self::MoveLimit => "move-limit",
            Self::MoveCap => "move-cap",
            Self::Resigned => "resigned",
            Self::Timeout => "timeout",
        }
    }
}

impl Display for EndReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for EndReason {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Checkmate,
            Self::Stalemate,
            Self::PerpetualCheck,
            Self::NoProgress,
            Self::MoveLimit,
            Self::MoveCap,
            Self::Resigned,
            Self::Timeout,
        ]
        .into_iter()
        .find(|reason| reason.token() == s)
        .ok_or(())
    }
}

/// How a match ended. `winner` is `None` for draws.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Outcome {
    pub winner: Option<Color>,
    pub reason: EndReason,
}

impl Outcome {
    pub fn loss(loser: Color, reason: EndReason) -> Self {
        Self {
            winner: Some(loser.opponent()),
            reason,
        }
    }

    pub fn draw(reason: EndReason) -> Self {
        Self { winner: None, reason }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.winner, self.reason) {
            (None, EndReason::NoProgress) => write!(f, "draw, no progress"),
            (None, EndReason::MoveLimit) => write!(f, "draw, move limit reached"),
            (None, reason) => write!(f, "draw by {reason}"),
            (Some(winner), EndReason::Checkmate) => write!(f, "{winner} won by checkmating {}", winner.opponent()),
            (Some(winner), EndReason::Stalemate) => write!(f, "{winner} won, {} has no moves", winner.opponent()),
            (Some(winner), EndReason::PerpetualCheck) => {
                write!(f, "{winner} won, {} checked perpetually", winner.opponent())
            }
            (Some(winner), EndReason::Resigned) => write!(f, "{winner} won by resignation"),
            (Some(winner), EndReason::Timeout) => write!(f, "{winner} won on time"),
            (Some(winner), reason) => write!(f, "{winner} won by {reason}"),
        }
    }
}

/// Whether `mv` counts as progress: a capture, or a soldier already beyond the river moving forward.
pub fn is_progress(mv: Move, piece: Piece, capture: Option<Piece>) -> bool {
    if capture.is_some() {
        return true;
    }
    piece.kind() == PieceKind::Soldier
        && !mv.from.on_home_side(piece.color())
        && (mv.to.y() - mv.from.y()) == piece.color().forward()
}

/// Classifies the position after `mover` moved and the counters were advanced.
/// Returns `None` while the match goes on.
pub fn evaluate(board: &Board, mover: Color, counters: &Counters, limits: &Limits) -> Option<Outcome> {
    let to_move = mover.opponent();

    if !legality::has_safe_moves(board, to_move) {
        let reason = if check::is_in_check(to_move, board) {
            EndReason::Checkmate
        } else {
            EndReason::Stalemate
        };
        return Some(Outcome::loss(to_move, reason));
    }

    if counters.checks[mover.index()] >= limits.perpetual_check {
        return Some(Outcome::loss(mover, EndReason::PerpetualCheck));
    }

    if counters.progress >= limits.no_progress {
        return Some(Outcome::draw(EndReason::NoProgress));
    }

    if counters.effective >= limits.effective_moves {
        return Some(Outcome::draw(EndReason::MoveLimit));
    }

    if counters.total >= limits.total_moves {
        return Some(Outcome::draw(EndReason::MoveCap));
    }

    None
}
