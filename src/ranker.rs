use crate::board::Board;
use crate::display_format::DisplayFormat;
use crate::legality;
use crate::location::Move;
use crate::piece::Color;
use std::fmt::{Display, Formatter};

/// Scores every safe move of one position with a fixed-depth material search.
pub struct Ranker {
    board: Board,
    turn: Color,
    entries: Vec<Entry>,
}

#[derive(Clone)]
struct Entry {
    mv: Move,
    value: i32,
    checked: u32,
}

/// Value of a position whose side to move has no safe move.
const LOST: i32 = -1_000_000;

impl Ranker {
    pub fn new(board: Board, turn: Color) -> Ranker {
        let entries = legality::iter_safe_moves(&board, turn)
            .map(|mv| Entry {
                mv,
                value: 0,
                checked: 0,
            })
            .collect();
        Ranker { board, turn, entries }
    }

    pub fn display(&self, format: DisplayFormat) -> impl Display {
        struct Impl<'a>(&'a Ranker, DisplayFormat);
        return Impl(self, format);

        impl Display for Impl<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let &Self(ranker, format) = self;
                let mut entries = ranker.entries.clone();
                entries.sort_by_key(|e| e.value);

                for entry in entries.iter().rev() {
                    match ranker.board[entry.mv.from] {
                        Some(piece) if !format.concise => {
                            writeln!(f, "{} {} {} {}", piece.display(format), entry.mv, entry.value, entry.checked)?
                        }
                        _ => writeln!(f, "{} {} {}", entry.mv, entry.value, entry.checked)?,
                    }
                }

                Ok(())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The highest ranked move, `None` if there is nothing to play.
    pub fn best(&self) -> Option<Move> {
        self.entries.iter().max_by_key(|e| e.value).map(|e| e.mv)
    }

    pub fn rank(&mut self, depth: u32) {
        fn search(board: &mut Board, turn: Color, depth: u32) -> (i32, u32) {
            if depth == 0 {
                return (board.evaluate(turn), 1);
            }

            let moves = legality::all_safe_moves(board, turn);
            if moves.is_empty() {
                return (LOST, 1);
            }

            let mut best = -i32::MAX;
            let mut total = 0u32;

            for mv in moves {
                let Some((_, capture)) = board.play(mv) else {
                    continue;
                };
                let (value, count) = search(board, turn.opponent(), depth - 1);
                board.undo(mv, capture);

                best = best.max(-value);
                total += count;
            }

            (best, total)
        }

        for entry in &mut self.entries {
            let Some((_, capture)) = self.board.play(entry.mv) else {
                continue;
            };
            let (value, checked) = search(&mut self.board, self.turn.opponent(), depth);
            self.board.undo(entry.mv, capture);

            entry.value = -value;
            entry.checked = checked;
        }
    }
}
