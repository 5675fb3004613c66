use crate::display_format::DisplayFormat;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The two sides. Red is the first player and owns ranks 0 to 4.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::Red, Color::Black];

    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Black,
            Self::Black => Self::Red,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Rank direction this color's soldiers advance in.
    pub fn forward(self) -> i8 {
        match self {
            Self::Red => 1,
            Self::Black => -1,
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Red => "red",
            Self::Black => "black",
        })
    }
}

impl FromStr for Color {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(Self::Red),
            "black" => Ok(Self::Black),
            _ => Err(()),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PieceKind {
    General,
    Advisor,
    Elephant,
    Horse,
    Chariot,
    Cannon,
    Soldier,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::General,
        PieceKind::Advisor,
        PieceKind::Elephant,
        PieceKind::Horse,
        PieceKind::Chariot,
        PieceKind::Cannon,
        PieceKind::Soldier,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Identity of a piece for the duration of one match.
pub type PieceId = u8;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Piece {
    id: PieceId,
    kind: PieceKind,
    color: Color,
}

impl Piece {
    pub fn new(id: PieceId, kind: PieceKind, color: Color) -> Self {
        Self { id, kind, color }
    }

    /// Reads a board-format letter. `b` and `n` are accepted as aliases for elephant and horse.
    pub fn from_fen_char(id: PieceId, value: char) -> Option<Self> {
        let kind = match value.to_ascii_lowercase() {
            'k' => PieceKind::General,
            'a' => PieceKind::Advisor,
            'e' | 'b' => PieceKind::Elephant,
            'h' | 'n' => PieceKind::Horse,
            'r' => PieceKind::Chariot,
            'c' => PieceKind::Cannon,
            'p' => PieceKind::Soldier,
            _ => return None,
        };

        let color = if value.is_ascii_uppercase() { Color::Red } else { Color::Black };
        Some(Self::new(id, kind, color))
    }

    pub fn id(&self) -> PieceId {
        self.id
    }

    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    pub fn fen_char(&self) -> char {
        let result = match self.kind {
            PieceKind::General => 'k',
            PieceKind::Advisor => 'a',
            PieceKind::Elephant => 'e',
            PieceKind::Horse => 'h',
            PieceKind::Chariot => 'r',
            PieceKind::Cannon => 'c',
            PieceKind::Soldier => 'p',
        };
        if self.is_red() { result.to_ascii_uppercase() } else { result }
    }

    pub fn chinese_char(&self) -> char {
        match (self.color, self.kind) {
            (Color::Red, PieceKind::General) => '帥',
            (Color::Red, PieceKind::Advisor) => '仕',
            (Color::Red, PieceKind::Elephant) => '相',
            (Color::Red, PieceKind::Horse) => '傌',
            (Color::Red, PieceKind::Chariot) => '俥',
            (Color::Red, PieceKind::Cannon) => '炮',
            (Color::Red, PieceKind::Soldier) => '兵',
            (Color::Black, PieceKind::General) => '將',
            (Color::Black, PieceKind::Advisor) => '士',
            (Color::Black, PieceKind::Elephant) => '象',
            (Color::Black, PieceKind::Horse) => '馬',
            (Color::Black, PieceKind::Chariot) => '車',
            (Color::Black, PieceKind::Cannon) => '砲',
            (Color::Black, PieceKind::Soldier) => '卒',
        }
    }

    /// Material value from the point of view of `color`.
    pub fn value(&self, color: Color) -> i32 {
        let value = match self.kind {
            PieceKind::General => 1000000,
            PieceKind::Advisor => 2000,
            PieceKind::Elephant => 2000,
            PieceKind::Horse => 4000,
            PieceKind::Chariot => 9000,
            PieceKind::Cannon => 4500,
            PieceKind::Soldier => 1500,
        };
        if self.color == color { value } else { -value }
    }

    pub fn display(&self, format: DisplayFormat) -> impl Display {
        let s = if format.chinese {
            self.chinese_char().to_string()
        } else {
            let c = self.fen_char();
            format!("{c}{c}")
        };
        if format.effects && self.is_red() {
            format!("\x1B[31m{}\x1b[0m", s)
        } else {
            s
        }
    }
}

impl Display for Piece {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(DisplayFormat::string()))
    }
}
