//! Pseudo-legal move generation. Each piece kind has its own rule, looked up through
//! [`RULES`]; none of them consider whether the mover's own general ends up in check.

use crate::board::Board;
use crate::location::{Location, Move};
use crate::piece::{Piece, PieceKind};

/// Appends the pseudo-legal destinations of `piece` standing on `from`.
pub type Rule = fn(board: &Board, from: Location, piece: Piece, moves: &mut Vec<Move>);

/// Indexed by [`PieceKind::index`].
pub const RULES: [Rule; 7] = [general, advisor, elephant, horse, chariot, cannon, soldier];

const ORTHOGONAL: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

pub fn rule(kind: PieceKind) -> Rule {
    RULES[kind.index()]
}

/// Pseudo-legal moves of the piece on `from`, empty if the square is vacant.
pub fn pseudo_moves(board: &Board, from: Location) -> Vec<Move> {
    let mut moves = Vec::new();
    if let Some(piece) = board[from] {
        rule(piece.kind())(board, from, piece, &mut moves);
    }
    moves
}

/// Whether the piece on `from` attacks `target` under its pseudo-legal rule.
pub fn attacks(board: &Board, from: Location, target: Location) -> bool {
    pseudo_moves(board, from).iter().any(|mv| mv.to == target)
}

/// Pushes a move to `to` unless a friendly piece stands there.
/// Returns whether the square was empty, i.e. whether a slider may continue past it.
fn push(board: &Board, from: Location, piece: Piece, to: Location, moves: &mut Vec<Move>) -> bool {
    match board[to] {
        None => {
            moves.push(Move { from, to });
            true
        }
        Some(other) => {
            if other.color() != piece.color() {
                moves.push(Move { from, to });
            }
            false
        }
    }
}

fn general(board: &Board, from: Location, piece: Piece, moves: &mut Vec<Move>) {
    for (dx, dy) in ORTHOGONAL {
        if let Some(to) = from.shift_xy(dx, dy)
            && to.in_palace(piece.color())
        {
            push(board, from, piece, to, moves);
        }
    }
}

fn advisor(board: &Board, from: Location, piece: Piece, moves: &mut Vec<Move>) {
    for (dx, dy) in DIAGONAL {
        if let Some(to) = from.shift_xy(dx, dy)
            && to.in_palace(piece.color())
        {
            push(board, from, piece, to, moves);
        }
    }
}

fn elephant(board: &Board, from: Location, piece: Piece, moves: &mut Vec<Move>) {
    for (dx, dy) in DIAGONAL {
        let Some(to) = from.shift_xy(dx * 2, dy * 2) else {
            continue;
        };
        if !to.on_home_side(piece.color()) {
            continue;
        }
        // blocked eye
        if from.shift_xy(dx, dy).is_some_and(|eye| board[eye].is_none()) {
            push(board, from, piece, to, moves);
        }
    }
}

fn horse(board: &Board, from: Location, piece: Piece, moves: &mut Vec<Move>) {
    for (dx, dy) in ORTHOGONAL {
        // the leg is the square one step along the long axis
        let Some(leg) = from.shift_xy(dx, dy) else {
            continue;
        };
        if board[leg].is_some() {
            continue;
        }

        let sides = if dx == 0 { [(1, 0), (-1, 0)] } else { [(0, 1), (0, -1)] };
        for (sx, sy) in sides {
            if let Some(to) = from.shift_xy(dx * 2 + sx, dy * 2 + sy) {
                push(board, from, piece, to, moves);
            }
        }
    }
}

fn chariot(board: &Board, from: Location, piece: Piece, moves: &mut Vec<Move>) {
    for (dx, dy) in ORTHOGONAL {
        let mut current = from;
        while let Some(to) = current.shift_xy(dx, dy) {
            if !push(board, from, piece, to, moves) {
                break;
            }
            current = to;
        }
    }
}

fn cannon(board: &Board, from: Location, piece: Piece, moves: &mut Vec<Move>) {
    for (dx, dy) in ORTHOGONAL {
        let mut current = from;
        let mut screened = false;

        while let Some(to) = current.shift_xy(dx, dy) {
            current = to;
            match (screened, board[to]) {
                (false, None) => moves.push(Move { from, to }),
                (false, Some(_)) => screened = true,
                (true, None) => {}
                (true, Some(other)) => {
                    if other.color() != piece.color() {
                        moves.push(Move { from, to });
                    }
                    break;
                }
            }
        }
    }
}

fn soldier(board: &Board, from: Location, piece: Piece, moves: &mut Vec<Move>) {
    let color = piece.color();
    if let Some(to) = from.shift_y(color.forward()) {
        push(board, from, piece, to, moves);
    }

    if !from.on_home_side(color) {
        for dx in [-1, 1] {
            if let Some(to) = from.shift_x(dx) {
                push(board, from, piece, to, moves);
            }
        }
    }
}
