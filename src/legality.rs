//! Filters pseudo-legal moves down to safe moves, those that leave the mover's own general
//! out of check. Human input, oracle suggestions and random fallbacks all go through here.

use crate::board::Board;
use crate::check;
use crate::location::{Location, Move};
use crate::movegen;
use crate::piece::Color;

/// Whether playing `mv` leaves the general of the moving piece in check.
pub fn exposes_general(board: &Board, mv: Move) -> bool {
    let Some(piece) = board[mv.from] else {
        return true;
    };
    check::is_in_check(piece.color(), &board.with_move(mv))
}

/// Safe moves of the piece on `from`.
pub fn safe_moves(board: &Board, from: Location) -> Vec<Move> {
    let mut moves = movegen::pseudo_moves(board, from);
    moves.retain(|&mv| !exposes_general(board, mv));
    moves
}

pub fn iter_safe_moves(board: &Board, color: Color) -> impl Iterator<Item = Move> + '_ {
    board
        .iter_color(color)
        .flat_map(move |(location, _)| safe_moves(board, location))
}

pub fn all_safe_moves(board: &Board, color: Color) -> Vec<Move> {
    iter_safe_moves(board, color).collect()
}

pub fn has_safe_moves(board: &Board, color: Color) -> bool {
    iter_safe_moves(board, color).next().is_some()
}

pub fn is_safe(board: &Board, color: Color, mv: Move) -> bool {
    board[mv.from].is_some_and(|piece| piece.color() == color)
        && movegen::pseudo_moves(board, mv.from).contains(&mv)
        && !exposes_general(board, mv)
}
