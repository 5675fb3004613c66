use crate::board::{Board, FenError, PositionError};
use crate::check;
use crate::display_format::DisplayFormat;
use crate::legality;
use crate::location::{Location, Move};
use crate::piece::{Color, Piece, PieceKind};
use crate::ranker::Ranker;
use crate::rules::{self, Counters, EndReason, Limits, Outcome};
use log::{debug, trace};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// The state of one match: the board, whose turn it is, the moves so far and the
/// anti-stalling counters. Moves are applied one at a time through [`Game::play`].
#[derive(Clone, Debug)]
pub struct Game {
    board: Board,
    turn: Color,
    history: Vec<(Move, Option<Piece>)>,
    moves: Vec<Move>,
    counters: Counters,
    limits: Limits,
    outcome: Option<Outcome>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Status {
    Ongoing,
    Checkmate,
    Stalemate,
    PerpetualCheck,
    Draw,
    Resigned,
    Timeout,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum SetupError {
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error(transparent)]
    Position(#[from] PositionError),
}

impl Game {
    fn from_parts(board: Board, turn: Color, limits: Limits) -> Self {
        let moves = legality::all_safe_moves(&board, turn);
        Self {
            board,
            turn,
            history: Vec::new(),
            moves,
            counters: Counters::default(),
            limits,
            outcome: None,
        }
    }

    pub fn new(board: Board, turn: Color) -> Result<Self, PositionError> {
        Self::with_limits(board, turn, Limits::default())
    }

    pub fn with_limits(board: Board, turn: Color, limits: Limits) -> Result<Self, PositionError> {
        board.validate(turn)?;
        let mut game = Self::from_parts(board, turn, limits);

        // a position can already be over before anyone moves
        if game.moves.is_empty() {
            let reason = if check::is_in_check(turn, &game.board) {
                EndReason::Checkmate
            } else {
                EndReason::Stalemate
            };
            game.outcome = Some(Outcome::loss(turn, reason));
        }

        Ok(game)
    }

    pub fn opening() -> Self {
        Self::opening_with_limits(Limits::default())
    }

    pub fn opening_with_limits(limits: Limits) -> Self {
        Self::from_parts(Board::opening(), Color::Red, limits)
    }

    pub fn from_fen(fen: &str, turn: Color) -> Result<Self, SetupError> {
        Ok(Self::new(Board::from_fen(fen)?, turn)?)
    }

    pub fn fen(&self) -> (String, Color) {
        (self.board.fen(), self.turn)
    }

    /// Applies `mv` for the side to move. Returns `false` and changes nothing if the match is
    /// over or `mv` is not one of the current safe moves.
    pub fn play(&mut self, mv: Move) -> bool {
        if self.outcome.is_some() || !self.moves.contains(&mv) {
            trace!("rejected move {mv} for {}", self.turn);
            return false;
        }

        let Some((piece, capture)) = self.board.play(mv) else {
            return false;
        };

        let mover = self.turn;
        let gives_check = check::is_in_check(mover.opponent(), &self.board);
        let progress = rules::is_progress(mv, piece, capture);
        self.counters.advance(mover, gives_check, progress);

        self.turn = mover.opponent();
        self.history.push((mv, capture));
        self.moves = legality::all_safe_moves(&self.board, self.turn);
        self.outcome = rules::evaluate(&self.board, mover, &self.counters, &self.limits);

        trace!(
            "{mover} played {mv}{}{}, counters {:?}",
            if capture.is_some() { " capturing" } else { "" },
            if gives_check { " with check" } else { "" },
            self.counters
        );
        if let Some(outcome) = self.outcome {
            debug!("match over after {} moves: {outcome}", self.history.len());
        }

        true
    }

    /// Ends the match as a loss for `color`.
    pub fn resign(&mut self, color: Color) -> bool {
        self.finish(Outcome::loss(color, EndReason::Resigned))
    }

    /// Ends the match as a loss on time for `color`.
    pub fn flag(&mut self, color: Color) -> bool {
        self.finish(Outcome::loss(color, EndReason::Timeout))
    }

    /// Records a terminal outcome. Only the first one sticks.
    pub fn finish(&mut self, outcome: Outcome) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        debug!("match finished externally: {outcome}");
        self.outcome = Some(outcome);
        true
    }

    /// Whether `outcome`, declared by the side playing `declarer`, agrees with this game. A side
    /// may resign or run out of time only for itself; every other ending must be the one this
    /// game reached on its own.
    pub fn confirms(&self, declarer: Color, outcome: Outcome) -> bool {
        if outcome.reason.is_forfeit() {
            outcome == Outcome::loss(declarer, outcome.reason)
        } else {
            self.outcome == Some(outcome)
        }
    }

    /// Safe moves for the side to move.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn moves_from(&self, from: Location) -> impl Iterator<Item = Move> + '_ {
        self.moves.iter().copied().filter(move |mv| mv.from == from)
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.outcome.is_none() && self.moves.contains(&mv)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn history(&self) -> impl Iterator<Item = Move> + '_ {
        self.history.iter().map(|&(mv, _)| mv)
    }

    pub fn last_move(&self) -> Option<Move> {
        self.history.last().map(|&(mv, _)| mv)
    }

    /// Number of moves played so far.
    pub fn ply(&self) -> u32 {
        self.history.len() as u32
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn status(&self) -> Status {
        let Some(outcome) = self.outcome else {
            return Status::Ongoing;
        };
        match outcome.reason {
            EndReason::Checkmate => Status::Checkmate,
            EndReason::Stalemate => Status::Stalemate,
            EndReason::PerpetualCheck => Status::PerpetualCheck,
            EndReason::NoProgress | EndReason::MoveLimit | EndReason::MoveCap => Status::Draw,
            EndReason::Resigned => Status::Resigned,
            EndReason::Timeout => Status::Timeout,
        }
    }

    pub fn in_check(&self, color: Color) -> bool {
        check::is_in_check(color, &self.board)
    }

    pub fn ranker(&self) -> Ranker {
        Ranker::new(self.board.clone(), self.turn)
    }

    pub fn display(&self, format: DisplayFormat) -> impl Display {
        struct Impl<'a>(&'a Game, DisplayFormat);
        return Impl(self, format);

        impl Impl<'_> {
            fn format_row(&self, f: &mut Formatter<'_>, y: i8) -> std::fmt::Result {
                let &Self(game, format) = self;
                write!(f, "{y}")?;

                let last = game.last_move();
                for x in 0..Board::WIDTH {
                    let Some(location) = Location::from_xy(x, y) else {
                        continue;
                    };
                    match game.board[location] {
                        Some(piece) => {
                            let piece = piece.display(format.with_concise(true));
                            if format.effects && last.is_some_and(|mv| mv.to == location) {
                                write!(f, " \x1B[3m{piece}\x1B[0m")?;
                            } else {
                                write!(f, " {piece}")?;
                            }
                        }
                        None if last.is_some_and(|mv| mv.from == location) => write!(f, " ╶╴")?,
                        None => write!(f, "   ")?,
                    }
                }

                Ok(())
            }

            /// `(ply) move piece - ` followed by the outcome, or by who is to play.
            fn format_status(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let &Self(game, format) = self;
                let format = format.with_concise(true);

                if let Some(mv) = game.last_move()
                    && let Some(mover) = game.board[mv.to]
                {
                    write!(f, "({}) {mv} {} - ", game.ply(), mover.display(format))?;
                }

                if let Some(outcome) = game.outcome {
                    return write!(f, "{outcome}");
                }

                let general = Piece::new(0, PieceKind::General, game.turn);
                let state = if game.in_check(game.turn) { "in check" } else { "to play" };
                write!(f, "{} {state}, {} safe moves", general.display(format), game.moves.len())
            }

            fn format_captured(&self, f: &mut Formatter<'_>, row: usize) -> std::fmt::Result {
                let &Self(game, format) = self;
                let captured = game.history.iter().filter_map(|&(_, capture)| capture);
                if captured.clone().next().is_none() {
                    return Ok(());
                }

                const HEIGHT: usize = Board::HEIGHT as usize + 1;
                write!(f, " │   ")?;

                let red = captured.clone().filter(|piece| piece.is_red());
                let red_count = red.clone().count();
                let pad = red_count.div_ceil(HEIGHT) * HEIGHT - red_count;
                let row = red
                    .map(Some)
                    .chain(std::iter::repeat_n(None, pad))
                    .chain(captured.filter(|piece| !piece.is_red()).map(Some))
                    .enumerate()
                    .filter_map(|(i, piece)| if i % HEIGHT == row { Some(piece) } else { None });

                for piece in row {
                    match piece {
                        Some(piece) => write!(f, "{} ", piece.display(format.with_concise(true)))?,
                        None => write!(f, "   ")?,
                    }
                }

                Ok(())
            }
        }

        impl Display for Impl<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let &Self(game, format) = self;
                write!(f, "{}", game.board.fen())?;

                if format.concise {
                    return write!(f, " {}", game.turn);
                }

                writeln!(f)?;

                for y in (0..Board::HEIGHT).rev() {
                    self.format_row(f, y)?;
                    self.format_captured(f, (Board::HEIGHT - y - 1) as usize)?;
                    writeln!(f)?;
                }

                for char in 'A'..='I' {
                    write!(f, "  {char}")?;
                }
                write!(f, " ")?;
                self.format_captured(f, Board::HEIGHT as usize)?;
                writeln!(f)?;

                self.format_status(f)?;
                writeln!(f)
            }
        }
    }
}

impl Display for Game {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(DisplayFormat::string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    #[test]
    fn illegal_moves_change_nothing() {
        let mut game = Game::opening();
        assert!(!game.play(mv("b7b0")));
        assert!(!game.play(mv("a0a5")));
        assert_eq!(game.ply(), 0);
        assert_eq!(game.turn(), Color::Red);

        assert!(game.play(mv("b2e2")));
        assert_eq!(game.turn(), Color::Black);
        // red may not move twice
        assert!(!game.play(mv("h2e2")));
        assert_eq!(game.ply(), 1);
    }

    #[test]
    fn opening_has_forty_four_moves() {
        assert_eq!(Game::opening().moves().len(), 44);
    }

    #[test]
    fn capture_keeps_mover_identity() {
        let mut game = Game::opening();
        let cannon = game.board()[mv("b2b0").from].unwrap();
        assert!(game.play(mv("b2b9")));
        assert_eq!(game.board().find(cannon.id()), "b9".parse().ok());
        assert_eq!(game.counters().progress, 0);
        assert_eq!(game.board().iter().count(), 31);
    }

    #[test]
    fn checkmate_ends_the_match() {
        // the chariot on b8 covers the rank below the black general
        let mut game = Game::from_fen("4k4/1R7/R8/9/9/9/9/9/9/5K3", Color::Red).unwrap();
        assert_eq!(game.outcome(), None);
        assert!(game.play(mv("a7a9")));
        assert_eq!(game.outcome(), Some(Outcome::loss(Color::Black, EndReason::Checkmate)));
        assert_eq!(game.status(), Status::Checkmate);
        assert!(game.moves().is_empty());
        assert!(!game.play(mv("e9e8")));
    }

    #[test]
    fn perpetual_check_loses() {
        let limits = Limits {
            perpetual_check: 3,
            ..Limits::default()
        };
        let board = Board::from_fen("4k4/9/9/R8/9/9/9/9/9/5K3").unwrap();
        let mut game = Game::with_limits(board, Color::Red, limits).unwrap();

        let sequence = ["a6e6", "e9d9", "e6d6", "d9e9", "d6e6"];
        for (index, text) in sequence.iter().enumerate() {
            assert!(game.play(mv(text)), "{text} at {index}");
        }

        assert_eq!(game.counters().checks, [3, 0]);
        assert_eq!(game.outcome(), Some(Outcome::loss(Color::Red, EndReason::PerpetualCheck)));
        assert_eq!(game.status(), Status::PerpetualCheck);
        assert!(!game.play(mv("e9d9")));
    }

    #[test]
    fn no_progress_draw() {
        let limits = Limits {
            no_progress: 4,
            ..Limits::default()
        };
        let board = Board::from_fen("3k5/9/9/9/9/9/9/9/9/R3K4").unwrap();
        let mut game = Game::with_limits(board, Color::Red, limits).unwrap();

        for text in ["a0a1", "d9d8", "a1a0", "d8d9"] {
            assert!(game.play(mv(text)), "{text}");
        }
        assert_eq!(game.outcome(), Some(Outcome::draw(EndReason::NoProgress)));
        assert_eq!(game.status(), Status::Draw);
    }

    #[test]
    fn terminal_outcome_is_applied_once() {
        let mut game = Game::opening();
        assert!(game.resign(Color::Black));
        assert!(!game.flag(Color::Red));
        assert_eq!(game.outcome(), Some(Outcome::loss(Color::Black, EndReason::Resigned)));
        assert!(!game.play(mv("b2e2")));
    }

    #[test]
    fn declared_endings_must_match_the_game() {
        let mut game = Game::opening();
        assert!(game.confirms(Color::Red, Outcome::loss(Color::Red, EndReason::Resigned)));
        assert!(game.confirms(Color::Black, Outcome::loss(Color::Black, EndReason::Timeout)));
        assert!(!game.confirms(Color::Red, Outcome::loss(Color::Black, EndReason::Resigned)));
        assert!(!game.confirms(Color::Black, Outcome::loss(Color::Red, EndReason::Timeout)));
        assert!(!game.confirms(Color::Red, Outcome::loss(Color::Black, EndReason::Checkmate)));
        assert!(!game.confirms(Color::Red, Outcome::draw(EndReason::NoProgress)));

        let mut mate = Game::from_fen("4k4/1R7/R8/9/9/9/9/9/9/5K3", Color::Red).unwrap();
        assert!(mate.play(mv("a7a9")));
        assert!(mate.confirms(Color::Red, Outcome::loss(Color::Black, EndReason::Checkmate)));
        assert!(!mate.confirms(Color::Red, Outcome::loss(Color::Black, EndReason::Stalemate)));

        assert!(game.play(mv("b2e2")));
        assert!(!game.confirms(Color::Black, Outcome::loss(Color::Red, EndReason::PerpetualCheck)));
    }

    #[test]
    fn status_line_names_the_side_to_move() {
        let mut game = Game::opening();
        assert!(game.play(mv("b2e2")));

        let text = game.display(DisplayFormat::string().with_concise(false)).to_string();
        let status = text.lines().last().unwrap();
        assert!(status.starts_with("(1) b2e2 "), "{status}");
        assert!(status.contains(" to play, ") && status.ends_with(" safe moves"), "{status}");

        assert!(game.resign(Color::Black));
        let text = game.display(DisplayFormat::string().with_concise(false)).to_string();
        assert!(text.trim_end().ends_with("red won by resignation"), "{text}");
    }

    #[test]
    fn invalid_setups_are_rejected() {
        assert!(matches!(Game::from_fen("4k4/9", Color::Red), Err(SetupError::Fen(_))));
        assert!(matches!(
            Game::from_fen("9/9/9/9/9/9/9/9/9/4K4", Color::Red),
            Err(SetupError::Position(PositionError::MissingGeneral(Color::Black)))
        ));
    }

    #[test]
    fn stalemated_setup_is_already_over() {
        // black general on d9 is not attacked but d8 and e9 both are
        let game = Game::from_fen("3k5/R8/4R4/9/9/9/9/9/9/5K3", Color::Black).unwrap();
        assert_eq!(game.outcome(), Some(Outcome::loss(Color::Black, EndReason::Stalemate)));
    }
}
