use crate::board::Board;
use crate::piece::Color;
use serde::{Deserialize, Serialize};
use std::fmt::Formatter;
use std::str::{Chars, FromStr};

/// A square on the 9 by 10 grid, `x` being the file (a..i) and `y` the rank (0..9).
/// Rank 0 is the home rank of [`Color::Red`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Location {
    x: i8,
    y: i8,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Move {
    pub from: Location,
    pub to: Location,
}

impl Location {
    pub fn new() -> Self {
        Self { x: 0, y: 0 }
    }

    pub fn from_xy(x: i8, y: i8) -> Option<Self> {
        Self::new().shift_xy(x, y)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Board::SIZE {
            return None;
        }
        let x = index as i8 % Board::WIDTH;
        let y = index as i8 / Board::WIDTH;
        Self::from_xy(x, y)
    }

    pub fn from_chars(chars: &mut Chars<'_>) -> Option<Self> {
        let file = u8::try_from(chars.next()?).ok()?.to_ascii_lowercase();
        let rank = chars.next()?.to_digit(10)?;
        Self::from_xy(file.checked_sub(b'a')? as i8, rank as i8)
    }

    pub fn shift_x(&self, x: i8) -> Option<Self> {
        let new_x = self.x.checked_add(x)?;
        if !(0..Board::WIDTH).contains(&new_x) {
            return None;
        }
        Some(Self { x: new_x, y: self.y })
    }

    pub fn shift_y(&self, y: i8) -> Option<Self> {
        let new_y = self.y.checked_add(y)?;
        if !(0..Board::HEIGHT).contains(&new_y) {
            return None;
        }
        Some(Self { x: self.x, y: new_y })
    }

    pub fn shift_xy(&self, x: i8, y: i8) -> Option<Self> {
        self.shift_x(x)?.shift_y(y)
    }

    pub fn index(&self) -> usize {
        (self.x + self.y * Board::WIDTH) as usize
    }

    pub fn x(&self) -> i8 {
        self.x
    }

    pub fn y(&self) -> i8 {
        self.y
    }

    /// Mirrors the rank so that rank 0 is the home rank of `color`.
    pub fn normalize(&self, color: Color) -> Self {
        match color {
            Color::Red => *self,
            Color::Black => Self {
                x: self.x,
                y: Board::HEIGHT - self.y - 1,
            },
        }
    }

    /// Whether this square lies in the 3 by 3 palace of `color`.
    pub fn in_palace(&self, color: Color) -> bool {
        let local = self.normalize(color);
        (3..=5).contains(&local.x) && local.y <= 2
    }

    /// Whether this square is on the `color` side of the river.
    pub fn on_home_side(&self, color: Color) -> bool {
        self.normalize(color).y < Board::HEIGHT / 2
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (b'a' + self.x as u8) as char, self.y)
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (Self::from_chars(&mut chars), chars.next()) {
            (Some(location), None) => Ok(location),
            _ => Err(format!("'{s}' is not a square, expected a form like 'e0'")),
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

impl FromStr for Move {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let from = Location::from_chars(&mut chars);
        let to = Location::from_chars(&mut chars);

        match (from, to, chars.next()) {
            (Some(from), Some(to), None) => Ok(Self { from, to }),
            _ => Err(format!("'{s}' is not a move, expected a form like 'b2e2'")),
        }
    }
}
