//! Xiangqi rules: board representation, move generation, check and legality, the
//! anti-stalling counters and a per-match state machine.

pub mod board;
pub mod check;
pub mod clock;
pub mod display_format;
pub mod game;
pub mod legality;
pub mod location;
pub mod movegen;
pub mod piece;
pub mod ranker;
pub mod rules;

pub use board::Board;
pub use game::Game;
pub use location::{Location, Move};
pub use piece::{Color, Piece, PieceKind};
pub use rules::{EndReason, Limits, Outcome};
