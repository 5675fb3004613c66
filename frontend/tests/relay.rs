use frontend::arbiter::lobby::Lobby;
use frontend::protocol::{ArbiterMessage, PlayerId};
use frontend::store::RoomState;
use frontend::sync::{Assignment, Phase, Seat, Synchronizer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smol::channel::{self, Receiver};
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use xiangqi::piece::Color;
use xiangqi::rules::{EndReason, Limits, Outcome};

struct Client {
    id: PlayerId,
    inbox: Receiver<ArbiterMessage>,
    sync: Synchronizer,
}

impl Client {
    fn join(lobby: &Lobby, name: &str) -> Self {
        let (outbox, inbox) = channel::unbounded();
        let id = lobby.join(name.to_string(), outbox);
        assert_eq!(inbox.try_recv().unwrap(), ArbiterMessage::Welcome { id });

        Self {
            id,
            inbox,
            sync: Synchronizer::new(id, Limits::default(), Duration::from_secs(600)),
        }
    }

    /// Feeds every pending message to the synchronizer.
    fn drain(&mut self) {
        while let Ok(message) = self.inbox.try_recv() {
            match message {
                ArbiterMessage::Start { red, black, .. } => {
                    let assignment = Assignment {
                        red: Seat::Player(red),
                        black: Seat::Player(black),
                    };
                    assert!(self.sync.assign(assignment));
                }
                ArbiterMessage::Update { origin, snapshot } => {
                    self.sync.receive(origin, &snapshot);
                }
                ArbiterMessage::Waiting { .. } | ArbiterMessage::Welcome { .. } | ArbiterMessage::Refused { .. } => {}
            }
        }
    }
}

#[test]
fn random_match_stays_in_sync_through_the_lobby() {
    let lobby = Lobby::new();
    let mut random = StdRng::seed_from_u64(99);
    let mut clients = [Client::join(&lobby, "first"), Client::join(&lobby, "second")];

    lobby.seek(clients[0].id);
    lobby.seek(clients[1].id);
    for client in &mut clients {
        client.drain();
        assert_eq!(client.sync.phase(), Phase::Playing);
    }

    for _ in 0..400 {
        let Some(mover) = clients.iter().position(|client| client.sync.is_local_turn()) else {
            break;
        };

        let moves = clients[mover].sync.game().moves().to_vec();
        let mv = moves[random.random_range(0..moves.len())];
        let snapshot = clients[mover].sync.play(mv).unwrap();
        lobby.publish(clients[mover].id, snapshot);

        // duplicated deliveries must not be replayed
        if random.random_bool(0.25) {
            lobby.refresh(clients[1 - mover].id);
        }

        for client in &mut clients {
            client.drain();
        }
        assert_eq!(clients[0].sync.game().board().fen(), clients[1].sync.game().board().fen());
        assert_eq!(clients[0].sync.game().ply(), clients[1].sync.game().ply());
    }

    // whoever is still playing resigns
    if clients[0].sync.phase() == Phase::Playing {
        let snapshot = clients[0].sync.resign().unwrap();
        lobby.publish(clients[0].id, snapshot);
        clients[1].drain();
    }

    let [first, second] = &mut clients;
    assert_eq!(first.sync.phase(), Phase::Finished);
    assert_eq!(second.sync.phase(), Phase::Finished);
    assert_eq!(first.sync.game().outcome(), second.sync.game().outcome());

    let record = first.sync.take_record().unwrap();
    assert_eq!(Some(record), second.sync.take_record());
    assert!(lobby.list_rooms().is_empty());
}

/// Seats two clients through seeking and returns them red first.
fn pair(lobby: &Lobby) -> [Client; 2] {
    let mut clients = [Client::join(lobby, "first"), Client::join(lobby, "second")];
    lobby.seek(clients[0].id);
    lobby.seek(clients[1].id);
    for client in &mut clients {
        client.drain();
    }
    if clients[1].sync.is_local_turn() {
        clients.reverse();
    }
    assert!(clients[0].sync.is_local_turn());
    clients
}

#[test]
fn resignation_racing_a_move_ends_both_sides_alike() {
    let lobby = Lobby::new();
    let [mut red, mut black] = pair(&lobby);

    let snapshot = red.sync.play("b2e2".parse().unwrap()).unwrap();
    lobby.publish(red.id, snapshot);
    red.drain();
    black.drain();

    let snapshot = black.sync.play("h9g7".parse().unwrap()).unwrap();
    lobby.publish(black.id, snapshot);

    // red resigns before the reply reaches it
    let snapshot = red.sync.resign().unwrap();
    assert_eq!(snapshot.ply, 1);
    lobby.publish(red.id, snapshot);
    red.drain();
    black.drain();

    let resigned = Some(Outcome::loss(Color::Red, EndReason::Resigned));
    assert_eq!(red.sync.game().outcome(), resigned);
    assert_eq!(black.sync.game().outcome(), resigned);
    assert_eq!(black.sync.phase(), Phase::Finished);
    assert!(lobby.list_rooms().is_empty());
    assert!(lobby.list_players().iter().all(|player| player.room.is_none()));
}

#[test]
fn forged_endings_never_reach_the_opponent() {
    let lobby = Lobby::new();
    let [mut red, mut black] = pair(&lobby);

    // black claims red gave up, then that red ran out of time
    let opening = black.sync.snapshot();
    for reason in [EndReason::Resigned, EndReason::Timeout, EndReason::Checkmate] {
        lobby.publish(black.id, opening.with_outcome(Outcome::loss(Color::Red, reason)));
    }
    red.drain();
    black.drain();
    assert_eq!(red.sync.phase(), Phase::Playing);
    assert_eq!(black.sync.phase(), Phase::Playing);

    let snapshot = red.sync.play("b2e2".parse().unwrap()).unwrap();
    lobby.publish(red.id, snapshot);
    black.drain();
    assert_eq!(black.sync.game().ply(), 1);
}

#[test]
fn friends_meet_by_room_id() {
    let lobby = Lobby::new();
    let mut host = Client::join(&lobby, "host");
    let mut stranger = Client::join(&lobby, "stranger");
    let mut friend = Client::join(&lobby, "friend");

    lobby.host(host.id);
    let Ok(ArbiterMessage::Waiting { room }) = host.inbox.try_recv() else {
        panic!("host was not given a room");
    };

    // seekers are not matched into the private room
    lobby.seek(stranger.id);
    stranger.drain();
    assert_eq!(stranger.sync.phase(), Phase::AwaitingAssignment);

    lobby.join_room(friend.id, room);
    host.drain();
    friend.drain();
    assert_eq!(host.sync.phase(), Phase::Playing);
    assert_eq!(friend.sync.phase(), Phase::Playing);

    let (mover, other) = if host.sync.is_local_turn() { (&mut host, &mut friend) } else { (&mut friend, &mut host) };
    let snapshot = mover.sync.play("h2e2".parse().unwrap()).unwrap();
    lobby.publish(mover.id, snapshot);
    other.drain();
    assert_eq!(other.sync.game().board().fen(), mover.sync.game().board().fen());

    // the room is full now
    lobby.leave(stranger.id);
    lobby.join_room(stranger.id, room);
    assert_eq!(stranger.inbox.try_recv(), Ok(ArbiterMessage::Refused { room }));
}

#[test]
fn finished_matches_leave_no_rooms_behind() {
    let lobby = Lobby::new();
    for _ in 0..200 {
        let [mut red, mut black] = pair(&lobby);
        let snapshot = black.sync.resign().unwrap();
        lobby.publish(black.id, snapshot);
        red.drain();
        assert_eq!(red.sync.phase(), Phase::Finished);
        lobby.disconnect(red.id);
        lobby.disconnect(black.id);
    }
    assert!(lobby.list_rooms().is_empty());
    assert!(lobby.list_players().is_empty());
}

#[test]
fn concurrent_seekers_never_share_a_seat() {
    const PLAYERS: usize = 12;

    let lobby = Arc::new(Lobby::new());
    let barrier = Arc::new(Barrier::new(PLAYERS));

    let handles: Vec<_> = (0..PLAYERS)
        .map(|index| {
            let lobby = Arc::clone(&lobby);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let (outbox, inbox) = channel::unbounded();
                let id = lobby.join(format!("player {index}"), outbox);
                barrier.wait();
                lobby.seek(id);
                (id, inbox)
            })
        })
        .collect();
    let players: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    let mut seated = BTreeSet::new();
    for room in lobby.list_rooms() {
        let seats: Vec<_> = room.seats().collect();
        match room.state {
            RoomState::Playing => assert_eq!(seats.len(), 2, "{room:?}"),
            RoomState::Waiting => assert_eq!(seats.len(), 1, "{room:?}"),
        }
        for seat in seats {
            assert!(seated.insert(seat), "player {seat} holds two seats");
        }
    }
    assert_eq!(seated.len(), PLAYERS);

    for (id, inbox) in players {
        let messages: Vec<_> = std::iter::from_fn(|| inbox.try_recv().ok()).collect();
        let starts = messages.iter().filter(|message| matches!(message, ArbiterMessage::Start { .. })).count();
        let waits = messages.iter().filter(|message| matches!(message, ArbiterMessage::Waiting { .. })).count();
        assert!(starts <= 1, "player {id} started twice");
        assert!(starts + waits >= 1, "player {id} heard nothing");
    }
}
