use crate::protocol::{ArbiterMessage, PlayerId, RoomId, Snapshot};
use crate::store::{self, Claim, MemoryStore, Room, RoomState, Seek, SessionStore};
use crate::sync::{Assignment, Seat};
use log::{debug, info, trace, warn};
use smol::channel::Sender;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use xiangqi::rules::{EndReason, Limits, Outcome};

/// Connected players and the rooms they sit in. Every message to a player goes through its
/// outbox, drained by that player's writer task.
pub struct Lobby {
    store: MemoryStore,
    players: Mutex<BTreeMap<PlayerId, Participant>>,
    next_id: AtomicU64,
}

struct Participant {
    name: String,
    outbox: Sender<ArbiterMessage>,
    room: Option<RoomId>,
}

#[derive(Clone, Debug)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub room: Option<RoomId>,
}

fn player_of(seat: Seat) -> Option<PlayerId> {
    match seat {
        Seat::Player(id) => Some(id),
        Seat::Computer => None,
    }
}

impl Lobby {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    /// A lobby whose rooms referee matches under `limits`.
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            store: MemoryStore::with_limits(limits),
            players: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn join(&self, name: String, outbox: Sender<ArbiterMessage>) -> PlayerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!("player '{name}' joined with id {id}");

        let participant = Participant {
            name,
            outbox,
            room: None,
        };
        self.players().insert(id, participant);
        self.send(id, ArbiterMessage::Welcome { id });
        id
    }

    pub fn seek(&self, player: PlayerId) {
        if self.is_seated(player) {
            return;
        }

        match store::seek(&self.store, player) {
            Seek::Hosting(room) => self.wait(player, room),
            Seek::Joined(room) => self.start(player, room),
        }
    }

    /// Opens a private room that only a player given its id can join.
    pub fn host(&self, player: PlayerId) {
        if self.is_seated(player) {
            return;
        }
        let room = self.store.create(player, true);
        self.wait(player, room);
    }

    /// Takes the guest seat of a room by its id, public or private.
    pub fn join_room(&self, player: PlayerId, room: RoomId) {
        if self.is_seated(player) {
            return;
        }

        match self.store.claim(room, player) {
            Claim::Seated(room) => self.start(player, room),
            Claim::Taken => {
                debug!("player {player} was refused room {room}");
                self.send(player, ArbiterMessage::Refused { room });
            }
        }
    }

    fn is_seated(&self, player: PlayerId) -> bool {
        let room = self.room_of(player);
        if let Some(room) = room {
            warn!("player {player} is already in room {room}");
        }
        room.is_some()
    }

    fn wait(&self, player: PlayerId, room: RoomId) {
        self.set_room(player, Some(room));
        self.send(player, ArbiterMessage::Waiting { room });
    }

    fn start(&self, guest: PlayerId, room: Room) {
        let assignment = Assignment::toss(&mut rand::rng(), Seat::Player(room.host), Seat::Player(guest));
        self.set_room(guest, Some(room.id));
        if !self.store.assign(room.id, assignment) {
            warn!("room {} closed before colors were assigned", room.id);
            self.set_room(guest, None);
            return;
        }

        let (Some(red), Some(black)) = (player_of(assignment.red), player_of(assignment.black)) else {
            return;
        };
        info!("room {} starts with {red} as red and {black} as black", room.id);

        let start = ArbiterMessage::Start {
            room: room.id,
            red,
            black,
        };
        for seat in [red, black] {
            self.send(seat, start.clone());
        }
    }

    /// Gives up the player's seat: a waiting room is released, a match in progress is resigned.
    pub fn leave(&self, player: PlayerId) {
        let Some(room) = self.room_of(player).and_then(|room| self.store.fetch(room)) else {
            self.set_room(player, None);
            return;
        };

        match room.state {
            RoomState::Waiting => {
                self.store.release(room.id, player);
            }
            RoomState::Playing => match room.color_of(player) {
                Some(loser) => {
                    info!("player {player} left room {} during the match", room.id);
                    let resigned = Outcome::loss(loser, EndReason::Resigned);
                    self.publish(player, Snapshot::of(&room.game).with_outcome(resigned));
                }
                None => {
                    self.store.close(room.id);
                    for seat in room.seats() {
                        self.set_room(seat, None);
                    }
                }
            },
        }

        self.set_room(player, None);
    }

    /// Stores `snapshot` and relays it to both seats, tagged with the player who sent it. A
    /// snapshot the room does not accept goes no further.
    pub fn publish(&self, player: PlayerId, snapshot: Snapshot) {
        let Some(room) = self.room_of(player) else {
            warn!("player {player} published without a room");
            return;
        };
        let Some(room) = self.store.publish(room, player, snapshot.clone()) else {
            warn!("room {room} rejected an update at ply {} from player {player}", snapshot.ply);
            return;
        };

        trace!("room {} at ply {} from player {player}", room.id, snapshot.ply);
        let finished = room.game.outcome().is_some();
        let update = ArbiterMessage::Update {
            origin: player,
            snapshot,
        };
        for seat in room.seats() {
            self.send(seat, update.clone());
            if finished {
                self.set_room(seat, None);
            }
        }
    }

    /// Replays the latest stored state of the player's room.
    pub fn refresh(&self, player: PlayerId) {
        let Some(room) = self.room_of(player).and_then(|room| self.store.fetch(room)) else {
            return;
        };
        if let Some((origin, snapshot)) = room.snapshot {
            self.send(player, ArbiterMessage::Update { origin, snapshot });
        }
    }

    pub fn disconnect(&self, player: PlayerId) {
        self.leave(player);
        if let Some(participant) = self.players().remove(&player) {
            info!("player '{}' ({player}) disconnected", participant.name);
        }
    }

    pub fn list_players(&self) -> Vec<PlayerInfo> {
        self.players()
            .iter()
            .map(|(&id, participant)| PlayerInfo {
                id,
                name: participant.name.clone(),
                room: participant.room,
            })
            .collect()
    }

    pub fn list_rooms(&self) -> Vec<Room> {
        self.store.rooms()
    }

    pub fn room(&self, room: RoomId) -> Option<Room> {
        self.store.fetch(room)
    }

    fn players(&self) -> std::sync::MutexGuard<'_, BTreeMap<PlayerId, Participant>> {
        self.players.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn room_of(&self, player: PlayerId) -> Option<RoomId> {
        self.players().get(&player).and_then(|participant| participant.room)
    }

    fn set_room(&self, player: PlayerId, room: Option<RoomId>) {
        if let Some(participant) = self.players().get_mut(&player) {
            participant.room = room;
        }
    }

    fn send(&self, player: PlayerId, message: ArbiterMessage) {
        let players = self.players();
        let Some(participant) = players.get(&player) else {
            trace!("dropping message for departed player {player}");
            return;
        };
        if participant.outbox.try_send(message).is_err() {
            debug!("outbox of player {player} is closed");
        }
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new()
    }
}
