//! Turns a [`Game`] into a two-sided match: seats and colors, the per-color clock, and local,
//! computer and remote moves all applied through one entry point.

use crate::protocol::{PlayerId, Snapshot};
use crate::record::MatchRecord;
use log::{debug, info, trace, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use xiangqi::clock::Clock;
use xiangqi::game::Game;
use xiangqi::location::Move;
use xiangqi::piece::Color;
use xiangqi::rules::{EndReason, Limits, Outcome};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Phase {
    AwaitingAssignment,
    CoinToss,
    Playing,
    Finished,
}

/// Who occupies one side of the board.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    Player(PlayerId),
    Computer,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Assignment {
    pub red: Seat,
    pub black: Seat,
}

impl Assignment {
    /// Colors by a fair coin toss, regardless of who asked first.
    pub fn toss<R: Rng + ?Sized>(random: &mut R, first: Seat, second: Seat) -> Self {
        let (red, black) = if random.random_bool(0.5) { (first, second) } else { (second, first) };
        Self { red, black }
    }

    pub fn seat(&self, color: Color) -> Seat {
        match color {
            Color::Red => self.red,
            Color::Black => self.black,
        }
    }

    pub fn color(&self, seat: Seat) -> Option<Color> {
        Color::ALL.into_iter().find(|&color| self.seat(color) == seat)
    }
}

/// Where an action comes from.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Origin {
    Local,
    Computer,
    Remote(PlayerId),
}

#[derive(Copy, Clone, Debug)]
enum Action {
    Move(Move),
    Resign(Color),
    Flag(Color),
    Finish(Outcome),
}

pub struct Synchronizer {
    local: PlayerId,
    phase: Phase,
    opponent: Option<Seat>,
    assignment: Option<Assignment>,
    game: Game,
    clock: Clock,
    record: Option<MatchRecord>,
}

impl Synchronizer {
    pub fn new(local: PlayerId, limits: Limits, time: Duration) -> Self {
        Self::with_game(local, Game::opening_with_limits(limits), time)
    }

    pub fn with_game(local: PlayerId, game: Game, time: Duration) -> Self {
        Self {
            local,
            phase: Phase::AwaitingAssignment,
            opponent: None,
            assignment: None,
            game,
            clock: Clock::new(time),
            record: None,
        }
    }

    pub fn local(&self) -> PlayerId {
        self.local
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn assignment(&self) -> Option<Assignment> {
        self.assignment
    }

    pub fn local_color(&self) -> Option<Color> {
        self.assignment?.color(Seat::Player(self.local))
    }

    /// Seats `opponent` across from the local player; colors are still open.
    pub fn pair(&mut self, opponent: Seat) -> bool {
        if self.phase != Phase::AwaitingAssignment || opponent == Seat::Player(self.local) {
            return false;
        }
        self.opponent = Some(opponent);
        self.phase = Phase::CoinToss;
        true
    }

    pub fn toss<R: Rng + ?Sized>(&mut self, random: &mut R) -> Option<Assignment> {
        let opponent = self.opponent.filter(|_| self.phase == Phase::CoinToss)?;
        let assignment = Assignment::toss(random, Seat::Player(self.local), opponent);
        self.assign(assignment).then_some(assignment)
    }

    /// Adopts colors decided elsewhere, or by [`Synchronizer::toss`].
    pub fn assign(&mut self, assignment: Assignment) -> bool {
        if !matches!(self.phase, Phase::AwaitingAssignment | Phase::CoinToss)
            || assignment.red == assignment.black
            || assignment.color(Seat::Player(self.local)).is_none()
        {
            return false;
        }

        self.assignment = Some(assignment);
        self.phase = Phase::Playing;
        info!(
            "player {} seated as {:?}, red {:?} black {:?}",
            self.local,
            self.local_color(),
            assignment.red,
            assignment.black
        );

        // a match set up from a finished position has nothing left to play
        self.settle();
        true
    }

    /// Which origin is expected to act next.
    pub fn to_move(&self) -> Option<Origin> {
        if self.phase != Phase::Playing {
            return None;
        }
        Some(self.origin_of(self.assignment?.seat(self.game.turn())))
    }

    pub fn is_local_turn(&self) -> bool {
        self.to_move() == Some(Origin::Local)
    }

    fn origin_of(&self, seat: Seat) -> Origin {
        match seat {
            Seat::Player(id) if id == self.local => Origin::Local,
            Seat::Player(id) => Origin::Remote(id),
            Seat::Computer => Origin::Computer,
        }
    }

    /// Plays a move for the local player. Returns the state to publish, or `None` if the move
    /// was not accepted.
    pub fn play(&mut self, mv: Move) -> Option<Snapshot> {
        self.play_as(Origin::Local, mv)
    }

    pub fn play_as(&mut self, origin: Origin, mv: Move) -> Option<Snapshot> {
        self.apply(origin, Action::Move(mv)).then(|| self.snapshot())
    }

    pub fn resign(&mut self) -> Option<Snapshot> {
        let color = self.local_color()?;
        self.apply(Origin::Local, Action::Resign(color)).then(|| self.snapshot())
    }

    /// Charges `elapsed` to the side to move. Returns the state to publish if that side is
    /// played here and its flag fell. A remote player's flag is theirs to declare.
    pub fn tick(&mut self, elapsed: Duration) -> Option<Snapshot> {
        if self.phase != Phase::Playing {
            return None;
        }
        let flagged = self.clock.tick(self.game.turn(), elapsed)?;
        let origin = self.origin_of(self.assignment?.seat(flagged));
        if let Origin::Remote(id) = origin {
            debug!("clock of player {id} ran out, waiting for their flag");
            return None;
        }
        self.apply(origin, Action::Flag(flagged)).then(|| self.snapshot())
    }

    /// Mirrors state published by `origin`. Echoes of our own updates, stale or repeated
    /// snapshots and anything after the end of the match are ignored. A resignation or timeout
    /// of the publisher is taken even when it was sent before our latest move reached them.
    /// Returns whether anything changed.
    pub fn receive(&mut self, origin: PlayerId, snapshot: &Snapshot) -> bool {
        if origin == self.local {
            trace!("ignoring echo of ply {}", snapshot.ply);
            return false;
        }
        if self.phase != Phase::Playing {
            trace!("ignoring update from {origin} while {:?}", self.phase);
            return false;
        }

        let origin = Origin::Remote(origin);
        let ply = self.game.ply();
        let outcome = snapshot.outcome();
        let mut changed = false;

        if snapshot.ply == ply + 1 {
            let Some(mv) = snapshot.last else {
                warn!("update for ply {} from {origin:?} carries no move", snapshot.ply);
                return false;
            };
            if !self.apply(origin, Action::Move(mv)) {
                warn!("rejected move {mv} from {origin:?}");
                return false;
            }
            if self.game.board().fen() != snapshot.board.fen() {
                warn!("board diverged from {origin:?} after {mv}");
            }
            changed = true;
        } else if snapshot.ply < ply && outcome.is_some_and(|outcome| outcome.reason.is_forfeit()) {
            debug!("taking {origin:?}'s forfeit from ply {} at ply {ply}", snapshot.ply);
        } else if snapshot.ply != ply {
            debug!("skipping update for ply {} at ply {ply}", snapshot.ply);
            return false;
        }

        if let Some(outcome) = outcome {
            changed |= self.apply(origin, Action::Finish(outcome));
        }

        changed
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::of(&self.game)
    }

    /// The record of the finished match. Handed out once.
    pub fn take_record(&mut self) -> Option<MatchRecord> {
        self.record.take()
    }

    fn apply(&mut self, origin: Origin, action: Action) -> bool {
        if origin == Origin::Remote(self.local) {
            trace!("ignoring own {action:?}");
            return false;
        }
        if self.phase != Phase::Playing {
            return false;
        }
        let Some(assignment) = self.assignment else {
            return false;
        };

        let applied = match action {
            Action::Move(mv) => {
                let seat = assignment.seat(self.game.turn());
                if self.origin_of(seat) != origin {
                    trace!("{origin:?} tried {mv} out of turn");
                    return false;
                }
                self.game.play(mv)
            }
            Action::Resign(color) => {
                let allowed = match origin {
                    Origin::Local => self.local_color() == Some(color),
                    Origin::Computer => assignment.seat(color) == Seat::Computer,
                    Origin::Remote(id) => assignment.seat(color) == Seat::Player(id),
                };
                allowed && self.game.resign(color)
            }
            Action::Flag(color) => self.game.flag(color),
            Action::Finish(outcome) => {
                let declarer = match origin {
                    Origin::Remote(id) => assignment.color(Seat::Player(id)),
                    Origin::Local | Origin::Computer => None,
                };
                match declarer {
                    Some(declarer) if self.game.confirms(declarer, outcome) => self.game.finish(outcome),
                    _ => {
                        warn!("{origin:?} declared an ending this game does not reach: {outcome}");
                        false
                    }
                }
            }
        };

        if applied {
            trace!("{origin:?} applied {action:?}");
            self.settle();
        }
        applied
    }

    fn settle(&mut self) {
        let (Some(outcome), Some(assignment)) = (self.game.outcome(), self.assignment) else {
            return;
        };
        if self.phase == Phase::Finished {
            return;
        }

        self.phase = Phase::Finished;
        info!("match over after {} moves: {outcome}", self.game.ply());
        self.record = Some(MatchRecord {
            red: assignment.red,
            black: assignment.black,
            moves: self.game.history().collect(),
            winner: outcome.winner,
            reason: outcome.reason,
        });
    }

    /// Whether the match ended on time.
    pub fn is_timeout(&self) -> bool {
        self.game.outcome().is_some_and(|outcome| outcome.reason == EndReason::Timeout)
    }
}
