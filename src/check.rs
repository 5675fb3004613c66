//! Check detection, always derived from the live board.

use crate::board::Board;
use crate::movegen;
use crate::piece::Color;

/// Whether the general of `color` is attacked by any enemy piece, or faces the enemy general
/// along an open file.
///
/// A board without a general for `color` is reported as in check; positions are validated on
/// entry so play never reaches one.
pub fn is_in_check(color: Color, board: &Board) -> bool {
    let Some(general) = board.find_general(color) else {
        return true;
    };

    if generals_facing(board) {
        return true;
    }

    board
        .iter_color(color.opponent())
        .any(|(location, _)| movegen::attacks(board, location, general))
}

/// Whether both generals share a file with no piece strictly between them.
pub fn generals_facing(board: &Board) -> bool {
    let (Some(red), Some(black)) = (board.find_general(Color::Red), board.find_general(Color::Black)) else {
        return false;
    };
    if red.x() != black.x() {
        return false;
    }

    let (low, high) = if red.y() < black.y() { (red, black) } else { (black, red) };
    let mut current = low;
    while let Some(next) = current.shift_y(1) {
        if next == high {
            return true;
        }
        if board[next].is_some() {
            return false;
        }
        current = next;
    }

    false
}
