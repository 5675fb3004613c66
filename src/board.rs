use crate::check;
use crate::display_format::DisplayFormat;
use crate::location::{Location, Move};
use crate::piece::{Color, Piece, PieceId, PieceKind};
use std::fmt::{Display, Formatter};
use std::ops::{Index, IndexMut};
use thiserror::Error;

/// Piece placement. A square holds at most one piece, so positions are unique by construction.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Board {
    pieces: [Option<Piece>; Board::SIZE],
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum FenError {
    #[error("unexpected character '{0}' in board")]
    InvalidChar(char),
    #[error("rank {0} does not span exactly 9 files")]
    RankWidth(i8),
    #[error("board does not have exactly 10 ranks")]
    RankCount,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum PositionError {
    #[error("{0} has no general")]
    MissingGeneral(Color),
    #[error("{0} has more than one general")]
    DuplicateGeneral(Color),
    #[error("{piece} at {location} is outside its palace")]
    OutsidePalace { piece: Piece, location: Location },
    #[error("{0} is in check while it is not their turn")]
    WaitingSideInCheck(Color),
}

impl Board {
    pub const WIDTH: i8 = 9;
    pub const HEIGHT: i8 = 10;
    pub const SIZE: usize = (Self::WIDTH * Self::HEIGHT) as usize;

    pub const OPENING: &str = "rheakaehr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RHEAKAEHR";

    pub fn new() -> Self {
        Self { pieces: [None; Self::SIZE] }
    }

    /// Parses the board part of a FEN-like string, ranks listed from 9 down to 0.
    /// Piece ids are handed out in reading order.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut board = Self::new();
        let mut y = Self::HEIGHT - 1;
        let mut x = 0;
        let mut next_id: PieceId = 0;

        for current in fen.chars() {
            match current {
                ' ' => break,
                '/' => {
                    if x != Self::WIDTH {
                        return Err(FenError::RankWidth(y));
                    }
                    if y == 0 {
                        return Err(FenError::RankCount);
                    }
                    x = 0;
                    y -= 1;
                }
                '1'..='9' => {
                    x += (current as u8 - b'0') as i8;
                    if x > Self::WIDTH {
                        return Err(FenError::RankWidth(y));
                    }
                }
                _ => {
                    let piece = Piece::from_fen_char(next_id, current).ok_or(FenError::InvalidChar(current))?;
                    let location = Location::from_xy(x, y).ok_or(FenError::RankWidth(y))?;
                    board[location] = Some(piece);
                    next_id += 1;
                    x += 1;
                }
            }
        }

        if y != 0 {
            return Err(FenError::RankCount);
        }
        if x != Self::WIDTH {
            return Err(FenError::RankWidth(y));
        }

        Ok(board)
    }

    pub fn opening() -> Self {
        Self::from_fen(Self::OPENING).unwrap_or_default()
    }

    pub fn fen(&self) -> String {
        let mut result = String::new();

        for y in (0..Self::HEIGHT).rev() {
            let mut empty = 0;
            for x in 0..Self::WIDTH {
                match Location::from_xy(x, y).and_then(|location| self[location]) {
                    Some(piece) => {
                        if empty > 0 {
                            result.push_str(&empty.to_string());
                            empty = 0;
                        }
                        result.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                result.push_str(&empty.to_string());
            }
            if y > 0 {
                result.push('/');
            }
        }

        result
    }

    pub fn iter(&self) -> impl Iterator<Item = (Location, Piece)> + '_ {
        self.pieces
            .iter()
            .enumerate()
            .filter_map(|(index, piece)| Some((Location::from_index(index)?, (*piece)?)))
    }

    pub fn iter_color(&self, color: Color) -> impl Iterator<Item = (Location, Piece)> + '_ {
        self.iter().filter(move |(_, piece)| piece.color() == color)
    }

    pub fn find(&self, id: PieceId) -> Option<Location> {
        self.iter().find(|(_, piece)| piece.id() == id).map(|(location, _)| location)
    }

    pub fn find_general(&self, color: Color) -> Option<Location> {
        self.iter_color(color)
            .find(|(_, piece)| piece.kind() == PieceKind::General)
            .map(|(location, _)| location)
    }

    /// Relocates the piece at `mv.from`, removing whatever occupies `mv.to`.
    /// Returns the moved piece and the capture, or `None` if `mv.from` is empty.
    pub fn play(&mut self, mv: Move) -> Option<(Piece, Option<Piece>)> {
        let piece = self[mv.from].take()?;
        let capture = self[mv.to].replace(piece);
        Some((piece, capture))
    }

    pub fn undo(&mut self, mv: Move, capture: Option<Piece>) {
        self[mv.from] = self[mv.to].take();
        self[mv.to] = capture;
    }

    /// A copy of this board with `mv` applied.
    pub fn with_move(&self, mv: Move) -> Self {
        let mut board = self.clone();
        board.play(mv);
        board
    }

    /// Material balance from the point of view of `color`.
    pub fn evaluate(&self, color: Color) -> i32 {
        self.iter().map(|(_, piece)| piece.value(color)).sum()
    }

    /// Checks the invariants a position must hold before play can start from it.
    pub fn validate(&self, turn: Color) -> Result<(), PositionError> {
        for color in Color::ALL {
            let generals = self
                .iter_color(color)
                .filter(|(_, piece)| piece.kind() == PieceKind::General)
                .count();
            match generals {
                0 => return Err(PositionError::MissingGeneral(color)),
                1 => {}
                _ => return Err(PositionError::DuplicateGeneral(color)),
            }
        }

        for (location, piece) in self.iter() {
            let confined = matches!(piece.kind(), PieceKind::General | PieceKind::Advisor);
            if confined && !location.in_palace(piece.color()) {
                return Err(PositionError::OutsidePalace { piece, location });
            }
        }

        let waiting = turn.opponent();
        if check::is_in_check(waiting, self) {
            return Err(PositionError::WaitingSideInCheck(waiting));
        }

        Ok(())
    }

    pub fn display(&self, format: DisplayFormat) -> impl Display {
        struct Impl<'a>(&'a Board, DisplayFormat);
        return Impl(self, format);

        impl Display for Impl<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let &Self(board, format) = self;
                if format.concise {
                    return write!(f, "{}", board.fen());
                }

                for y in (0..Board::HEIGHT).rev() {
                    write!(f, "{y}")?;
                    for x in 0..Board::WIDTH {
                        match Location::from_xy(x, y).and_then(|location| board[location]) {
                            Some(piece) => write!(f, " {}", piece.display(format))?,
                            None => write!(f, "   ")?,
                        }
                    }
                    writeln!(f)?;
                }
                for char in 'A'..='I' {
                    write!(f, "  {char}")?;
                }
                writeln!(f)
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<Location> for Board {
    type Output = Option<Piece>;
    fn index(&self, index: Location) -> &Self::Output {
        &self.pieces[index.index()]
    }
}

impl IndexMut<Location> for Board {
    fn index_mut(&mut self, index: Location) -> &mut Self::Output {
        &mut self.pieces[index.index()]
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(DisplayFormat::pretty()))
    }
}
