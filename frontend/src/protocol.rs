use std::fmt::{Display, Formatter};
use xiangqi::board::Board;
use xiangqi::game::Game;
use xiangqi::location::Move;
use xiangqi::piece::Color;
use xiangqi::rules::{EndReason, Outcome};

pub const VERSION: u32 = 1;

pub type PlayerId = u64;
pub type RoomId = u64;

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ArbiterMessage {
    Welcome { id: PlayerId },
    Waiting { room: RoomId },
    Start { room: RoomId, red: PlayerId, black: PlayerId },
    Update { origin: PlayerId, snapshot: Snapshot },
    /// The room asked for does not exist or already has two players.
    Refused { room: RoomId },
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum PlayerMessage {
    Init { version: u32 },
    Info { name: String },
    Seek,
    /// Opens a room joined only by its id.
    Host,
    Join { room: RoomId },
    Leave,
    Publish { snapshot: Snapshot },
    Refresh,
}

/// A line of the text protocol.
pub trait Message: Sized {
    fn encode(&self) -> String;
    fn decode(line: &str) -> Option<Self>;
}

/// The published state of a match: everything a peer needs to mirror the last move or the end.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Snapshot {
    pub board: Board,
    pub turn: Color,
    /// Number of moves applied so far.
    pub ply: u32,
    pub last: Option<Move>,
    pub reason: Option<EndReason>,
    pub winner: Option<Color>,
}

fn split(line: &str) -> (&str, impl Iterator<Item = &str>) {
    let mut parts = line.split_whitespace().fuse();
    (parts.next().unwrap_or(""), parts)
}

impl Message for ArbiterMessage {
    fn encode(&self) -> String {
        match self {
            Self::Welcome { id } => format!("welcome {id}"),
            Self::Waiting { room } => format!("waiting {room}"),
            Self::Start { room, red, black } => format!("start {room} {red} {black}"),
            Self::Update { origin, snapshot } => format!("update {origin} {snapshot}"),
            Self::Refused { room } => format!("refused {room}"),
        }
    }

    fn decode(line: &str) -> Option<Self> {
        let (kind, mut arguments) = split(line);
        let message = match kind {
            "welcome" => Self::Welcome {
                id: arguments.next()?.parse().ok()?,
            },
            "waiting" => Self::Waiting {
                room: arguments.next()?.parse().ok()?,
            },
            "start" => Self::Start {
                room: arguments.next()?.parse().ok()?,
                red: arguments.next()?.parse().ok()?,
                black: arguments.next()?.parse().ok()?,
            },
            "update" => Self::Update {
                origin: arguments.next()?.parse().ok()?,
                snapshot: Snapshot::from_parts(&mut arguments)?,
            },
            "refused" => Self::Refused {
                room: arguments.next()?.parse().ok()?,
            },
            _ => return None,
        };
        Some(message)
    }
}

impl Message for PlayerMessage {
    fn encode(&self) -> String {
        match self {
            Self::Init { version } => format!("init {version}"),
            Self::Info { name } => format!("info {name}"),
            Self::Seek => "seek".to_string(),
            Self::Host => "host".to_string(),
            Self::Join { room } => format!("join {room}"),
            Self::Leave => "leave".to_string(),
            Self::Publish { snapshot } => format!("publish {snapshot}"),
            Self::Refresh => "refresh".to_string(),
        }
    }

    fn decode(line: &str) -> Option<Self> {
        let (kind, mut arguments) = split(line);
        let message = match kind {
            "init" => Self::Init {
                version: arguments.next()?.parse().ok()?,
            },
            "info" => Self::Info {
                name: arguments.next()?.to_string(),
            },
            "seek" => Self::Seek,
            "host" => Self::Host,
            "join" => Self::Join {
                room: arguments.next()?.parse().ok()?,
            },
            "leave" => Self::Leave,
            "publish" => Self::Publish {
                snapshot: Snapshot::from_parts(&mut arguments)?,
            },
            "refresh" => Self::Refresh,
            _ => return None,
        };
        Some(message)
    }
}

impl Snapshot {
    pub fn of(game: &Game) -> Self {
        let outcome = game.outcome();
        Self {
            board: game.board().clone(),
            turn: game.turn(),
            ply: game.ply(),
            last: game.last_move(),
            reason: outcome.map(|outcome| outcome.reason),
            winner: outcome.and_then(|outcome| outcome.winner),
        }
    }

    pub fn opening() -> Self {
        Self::of(&Game::opening())
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.reason.map(|reason| Outcome {
            winner: self.winner,
            reason,
        })
    }

    /// Replaces the state of this snapshot with a terminal one, keeping the position.
    pub fn with_outcome(&self, outcome: Outcome) -> Self {
        Self {
            reason: Some(outcome.reason),
            winner: outcome.winner,
            ..self.clone()
        }
    }

    pub fn from_parts<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Option<Self> {
        let board = Board::from_fen(parts.next()?).ok()?;
        let turn = parts.next()?.parse().ok()?;
        let ply = parts.next()?.parse().ok()?;
        let last = match parts.next()? {
            "-" => None,
            mv => Some(mv.parse().ok()?),
        };
        let reason = match parts.next()? {
            "ongoing" => None,
            reason => Some(reason.parse().ok()?),
        };
        let winner = match parts.next()? {
            "none" => None,
            winner => Some(winner.parse().ok()?),
        };

        Some(Self {
            board,
            turn,
            ply,
            last,
            reason,
            winner,
        })
    }
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} ", self.board.fen(), self.turn, self.ply)?;
        match self.last {
            Some(mv) => write!(f, "{mv} ")?,
            None => write!(f, "- ")?,
        }
        match self.reason {
            Some(reason) => write!(f, "{reason} ")?,
            None => write!(f, "ongoing ")?,
        }
        match self.winner {
            Some(winner) => write!(f, "{winner}"),
            None => write!(f, "none"),
        }
    }
}
