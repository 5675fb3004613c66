//! Rooms shared between the two sides of a match. Seats are claimed with a conditional write so
//! that two seekers racing for the same vacancy cannot both get it. Every room referees its
//! match: a published snapshot is stored only if it follows from the room's own game.

use crate::protocol::{PlayerId, RoomId, Snapshot};
use crate::sync::{Assignment, Seat};
use log::{debug, trace};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use xiangqi::game::Game;
use xiangqi::piece::Color;
use xiangqi::rules::Limits;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RoomState {
    Waiting,
    Playing,
}

#[derive(Clone, Debug)]
pub struct Room {
    pub id: RoomId,
    pub host: PlayerId,
    pub guest: Option<PlayerId>,
    pub state: RoomState,
    /// Joined only by its id, never handed to seekers.
    pub private: bool,
    pub assignment: Option<Assignment>,
    /// The match as the room has accepted it so far.
    pub game: Game,
    /// Latest accepted snapshot and who published it.
    pub snapshot: Option<(PlayerId, Snapshot)>,
}

impl Room {
    pub fn seats(&self) -> impl Iterator<Item = PlayerId> + '_ {
        std::iter::once(self.host).chain(self.guest)
    }

    pub fn opponent(&self, player: PlayerId) -> Option<PlayerId> {
        if player == self.host {
            self.guest
        } else if self.guest == Some(player) {
            Some(self.host)
        } else {
            None
        }
    }

    pub fn color_of(&self, player: PlayerId) -> Option<Color> {
        self.assignment?.color(Seat::Player(player))
    }
}

/// Result of a conditional seat claim. Losing the race is an ordinary answer.
#[derive(Clone, Debug)]
pub enum Claim {
    Seated(Room),
    Taken,
}

#[derive(Clone, Debug)]
pub enum Seek {
    Joined(Room),
    Hosting(RoomId),
}

pub trait SessionStore {
    fn create(&self, host: PlayerId, private: bool) -> RoomId;

    /// Public rooms still waiting for a guest, oldest first.
    fn vacant(&self) -> Vec<Room>;

    /// Seats `guest` only if the room is still waiting and nobody else got there first.
    fn claim(&self, room: RoomId, guest: PlayerId) -> Claim;

    fn assign(&self, room: RoomId, assignment: Assignment) -> bool;

    /// Deletes a room its host abandons before anyone joined.
    fn release(&self, room: RoomId, host: PlayerId) -> bool;

    /// Stores `snapshot` if it follows from the room's game. Returns the room as updated, or
    /// `None` if the snapshot was refused. A room whose match is over is removed on the way out.
    fn publish(&self, room: RoomId, origin: PlayerId, snapshot: Snapshot) -> Option<Room>;

    /// Removes a room whatever its state.
    fn close(&self, room: RoomId) -> Option<Room>;

    fn fetch(&self, room: RoomId) -> Option<Room>;
}

/// Claims the oldest vacant room not hosted by `player`, moving on to the next one whenever a
/// claim is lost, and hosts a new room if none is left.
pub fn seek(store: &impl SessionStore, player: PlayerId) -> Seek {
    for room in store.vacant() {
        if room.host == player {
            continue;
        }

        match store.claim(room.id, player) {
            Claim::Seated(room) => return Seek::Joined(room),
            Claim::Taken => trace!("player {player} lost the race for room {}", room.id),
        }
    }

    Seek::Hosting(store.create(player, false))
}

/// The game after `snapshot`, published by the player of `color`, or `None` if the snapshot does
/// not follow from `game`. Only the next move, or an ending at the current ply, is accepted; a
/// resignation or timeout of the publisher may also come from an earlier ply.
pub fn referee(game: &Game, color: Color, snapshot: &Snapshot) -> Option<Game> {
    let mut game = game.clone();
    let outcome = snapshot.outcome();

    if snapshot.ply == game.ply() + 1 {
        let mv = snapshot.last?;
        if game.turn() != color
            || !game.play(mv)
            || game.turn() != snapshot.turn
            || game.board().fen() != snapshot.board.fen()
        {
            return None;
        }
    } else if snapshot.ply == game.ply() {
        outcome?;
    } else if snapshot.ply > game.ply() || !outcome.is_some_and(|outcome| outcome.reason.is_forfeit()) {
        return None;
    }

    match outcome {
        Some(outcome) if game.outcome() == Some(outcome) => {}
        Some(outcome) => {
            if !game.confirms(color, outcome) || !game.finish(outcome) {
                return None;
            }
        }
        // the move ended the match but the publisher claims otherwise
        None if game.outcome().is_some() => return None,
        None => {}
    }

    Some(game)
}

pub struct MemoryStore {
    rooms: Mutex<BTreeMap<RoomId, Room>>,
    next_id: AtomicU64,
    limits: Limits,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            rooms: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            limits,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<RoomId, Room>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<T>(&self, room: RoomId, f: impl FnOnce(&mut Room) -> T) -> Option<T> {
        self.lock().get_mut(&room).map(f)
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.lock().values().cloned().collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemoryStore {
    fn create(&self, host: PlayerId, private: bool) -> RoomId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let room = Room {
            id,
            host,
            guest: None,
            state: RoomState::Waiting,
            private,
            assignment: None,
            game: Game::opening_with_limits(self.limits),
            snapshot: None,
        };

        self.lock().insert(id, room);
        debug!("player {host} is hosting {}room {id}", if private { "private " } else { "" });
        id
    }

    fn vacant(&self) -> Vec<Room> {
        self.lock()
            .values()
            .filter(|room| room.state == RoomState::Waiting && room.guest.is_none() && !room.private)
            .cloned()
            .collect()
    }

    fn claim(&self, room: RoomId, guest: PlayerId) -> Claim {
        let claimed = self.update(room, |room| {
            if room.state != RoomState::Waiting || room.guest.is_some() || room.host == guest {
                return None;
            }
            room.guest = Some(guest);
            room.state = RoomState::Playing;
            Some(room.clone())
        });

        match claimed.flatten() {
            Some(room) => {
                debug!("player {guest} joined room {} hosted by {}", room.id, room.host);
                Claim::Seated(room)
            }
            None => Claim::Taken,
        }
    }

    fn assign(&self, room: RoomId, assignment: Assignment) -> bool {
        self.update(room, |room| {
            if room.state != RoomState::Playing {
                return false;
            }
            room.assignment = Some(assignment);
            true
        })
        .unwrap_or(false)
    }

    fn release(&self, room: RoomId, host: PlayerId) -> bool {
        let mut rooms = self.lock();
        let vacant = rooms
            .get(&room)
            .is_some_and(|room| room.host == host && room.state == RoomState::Waiting);
        if vacant {
            rooms.remove(&room);
            debug!("room {room} released by its host {host}");
        }
        vacant
    }

    fn publish(&self, room: RoomId, origin: PlayerId, snapshot: Snapshot) -> Option<Room> {
        let mut rooms = self.lock();
        let entry = rooms.get_mut(&room).filter(|entry| entry.state == RoomState::Playing)?;
        let color = entry.color_of(origin)?;
        entry.game = referee(&entry.game, color, &snapshot)?;
        entry.snapshot = Some((origin, snapshot));

        if entry.game.outcome().is_none() {
            return Some(entry.clone());
        }
        debug!("room {room} finished after {} moves", entry.game.ply());
        rooms.remove(&room)
    }

    fn close(&self, room: RoomId) -> Option<Room> {
        let closed = self.lock().remove(&room);
        if closed.is_some() {
            debug!("room {room} closed");
        }
        closed
    }

    fn fetch(&self, room: RoomId) -> Option<Room> {
        self.lock().get(&room).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use xiangqi::board::Board;
    use xiangqi::rules::{EndReason, Outcome};

    #[test]
    fn only_one_claim_wins_the_race() {
        for _ in 0..32 {
            let store = MemoryStore::new();
            let room = store.create(1, false);
            let barrier = Barrier::new(2);

            let claims: Vec<_> = std::thread::scope(|scope| {
                let handles: Vec<_> = [2, 3]
                    .map(|guest| {
                        let (store, barrier) = (&store, &barrier);
                        scope.spawn(move || {
                            barrier.wait();
                            store.claim(room, guest)
                        })
                    })
                    .into_iter()
                    .collect();
                handles.into_iter().map(|handle| handle.join().unwrap()).collect()
            });

            let seated: Vec<_> = claims
                .iter()
                .filter_map(|claim| match claim {
                    Claim::Seated(room) => Some(room.guest),
                    Claim::Taken => None,
                })
                .collect();
            assert_eq!(seated.len(), 1);
            assert_eq!(store.fetch(room).unwrap().guest, seated[0]);
        }
    }

    #[test]
    fn loser_of_the_race_hosts_instead() {
        let store = MemoryStore::new();
        let room = store.create(1, false);
        assert!(matches!(store.claim(room, 2), Claim::Seated(_)));

        match seek(&store, 3) {
            Seek::Hosting(id) => assert_ne!(id, room),
            Seek::Joined(room) => panic!("joined occupied room {}", room.id),
        }
        assert!(matches!(seek(&store, 4), Seek::Joined(room) if room.host == 3));
    }

    #[test]
    fn seekers_do_not_join_their_own_room() {
        let store = MemoryStore::new();
        let Seek::Hosting(first) = seek(&store, 1) else {
            panic!("expected an empty store");
        };
        let Seek::Hosting(second) = seek(&store, 1) else {
            panic!("joined own room");
        };
        assert_ne!(first, second);
        assert!(matches!(store.claim(first, 1), Claim::Taken));
    }

    #[test]
    fn released_rooms_cannot_be_joined() {
        let store = MemoryStore::new();
        let room = store.create(1, false);
        assert!(!store.release(room, 2));
        assert!(store.release(room, 1));
        assert!(matches!(store.claim(room, 2), Claim::Taken));
        assert!(store.vacant().is_empty());

        let room = store.create(1, false);
        assert!(matches!(store.claim(room, 2), Claim::Seated(_)));
        assert!(!store.release(room, 1));
    }

    fn playing(store: &MemoryStore) -> RoomId {
        let room = store.create(1, false);
        assert!(matches!(store.claim(room, 2), Claim::Seated(_)));
        let assignment = Assignment {
            red: Seat::Player(1),
            black: Seat::Player(2),
        };
        assert!(store.assign(room, assignment));
        room
    }

    fn after(moves: &[&str]) -> Game {
        let mut game = Game::opening();
        for mv in moves {
            assert!(game.play(mv.parse().unwrap()), "{mv}");
        }
        game
    }

    #[test]
    fn only_the_side_to_move_publishes_moves() {
        let store = MemoryStore::new();
        let room = store.create(1, false);
        let first = Snapshot::of(&after(&["b2e2"]));
        assert!(store.publish(room, 1, first.clone()).is_none());

        let room = playing(&store);
        assert!(store.publish(room, 3, first.clone()).is_none());
        assert!(store.publish(room, 2, first.clone()).is_none());
        let published = store.publish(room, 1, first.clone()).unwrap();
        assert_eq!(published.game.ply(), 1);
        assert_eq!(published.snapshot.map(|(origin, _)| origin), Some(1));

        let second = Snapshot::of(&after(&["b2e2", "h9g7"]));
        assert!(store.publish(room, 1, second.clone()).is_none());
        assert!(store.publish(room, 2, second).is_some());
    }

    #[test]
    fn stale_and_inconsistent_snapshots_are_refused() {
        let store = MemoryStore::new();
        let room = playing(&store);
        let first = Snapshot::of(&after(&["b2e2"]));
        let second = Snapshot::of(&after(&["b2e2", "h9g7"]));
        assert!(store.publish(room, 1, first.clone()).is_some());
        assert!(store.publish(room, 2, second).is_some());

        // a late duplicate of an older move
        assert!(store.publish(room, 1, first).is_none());
        assert_eq!(store.fetch(room).unwrap().game.ply(), 2);

        // a move that skips ahead, and a board that does not match its move
        assert!(store.publish(room, 1, Snapshot::of(&after(&["b2e2", "h9g7", "h0g2", "b9c7"]))).is_none());
        let mut forged = Snapshot::of(&after(&["b2e2", "h9g7", "h0g2"]));
        forged.board = Board::opening();
        assert!(store.publish(room, 1, forged).is_none());

        // an illegal move
        let mut illegal = Snapshot::of(&after(&["b2e2", "h9g7"]));
        illegal.ply = 3;
        illegal.turn = Color::Black;
        illegal.last = Some("a0a5".parse().unwrap());
        assert!(store.publish(room, 1, illegal).is_none());

        let room = store.fetch(room).unwrap();
        assert_eq!(room.game.ply(), 2);
        assert_eq!(room.snapshot.map(|(origin, snapshot)| (origin, snapshot.ply)), Some((2, 2)));
    }

    #[test]
    fn endings_the_game_does_not_reach_are_refused() {
        let store = MemoryStore::new();
        let room = playing(&store);
        let opening = Snapshot::opening();

        for outcome in [
            Outcome::loss(Color::Black, EndReason::Checkmate),
            Outcome::draw(EndReason::MoveCap),
            Outcome::loss(Color::Black, EndReason::Resigned),
            Outcome::loss(Color::Black, EndReason::Timeout),
        ] {
            assert!(store.publish(room, 1, opening.with_outcome(outcome)).is_none(), "{outcome:?}");
        }
        assert!(store.fetch(room).unwrap().game.outcome().is_none());

        let resigned = Outcome::loss(Color::Black, EndReason::Resigned);
        let closed = store.publish(room, 2, opening.with_outcome(resigned)).unwrap();
        assert_eq!(closed.game.outcome(), Some(resigned));
        assert!(store.fetch(room).is_none());
        assert!(store.publish(room, 1, opening).is_none());
        assert!(store.close(room).is_none());
    }

    #[test]
    fn resignation_racing_a_move_is_taken() {
        let store = MemoryStore::new();
        let room = playing(&store);
        assert!(store.publish(room, 1, Snapshot::of(&after(&["b2e2"]))).is_some());
        assert!(store.publish(room, 2, Snapshot::of(&after(&["b2e2", "h9g7"]))).is_some());

        // red resigned before seeing black's reply
        let resigned = Outcome::loss(Color::Red, EndReason::Resigned);
        let late = Snapshot::of(&after(&["b2e2"])).with_outcome(resigned);
        let forged = late.with_outcome(Outcome::loss(Color::Black, EndReason::Resigned));
        assert!(store.publish(room, 1, forged).is_none());
        assert!(store.publish(room, 2, late.clone()).is_none());

        let closed = store.publish(room, 1, late).unwrap();
        assert_eq!(closed.game.outcome(), Some(resigned));
        assert_eq!(closed.game.ply(), 2);
    }

    #[test]
    fn finished_rooms_are_removed() {
        let store = MemoryStore::new();
        for _ in 0..1000 {
            let room = playing(&store);
            let outcome = Outcome::loss(Color::Red, EndReason::Timeout);
            assert!(store.publish(room, 1, Snapshot::opening().with_outcome(outcome)).is_some());
        }
        let room = playing(&store);
        assert!(store.close(room).is_some());
        assert!(store.rooms().is_empty());
    }

    #[test]
    fn private_rooms_are_not_offered_to_seekers() {
        let store = MemoryStore::new();
        let private = store.create(1, true);
        assert!(store.vacant().is_empty());
        assert!(matches!(seek(&store, 2), Seek::Hosting(room) if room != private));
        assert!(matches!(store.claim(private, 3), Claim::Seated(room) if room.private && room.host == 1));
    }
}
