//! Client side of a match. Network messages, typed input and clock ticks all arrive on one
//! event channel and are handled in order by a [`Synchronizer`]; outbound messages are queued to
//! a writer task so the local state never waits on the network.

use crate::config::MatchArgs;
use crate::console;
use crate::error::Error;
use crate::line_stream;
use crate::oracle::{self, MoveOracle};
use crate::protocol::{ArbiterMessage, Message, PlayerId, PlayerMessage, RoomId, Snapshot, VERSION};
use crate::record::{MatchRecord, RecordSink};
use crate::sync::{Assignment, Origin, Phase, Seat, Synchronizer};
use clap::Subcommand;
use log::{debug, info, trace, warn};
use rand::rngs::ThreadRng;
use smol::Timer;
use smol::channel::{self, Receiver, Sender};
use smol::net::TcpStream;
use smol::stream::StreamExt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use xiangqi::display_format::DisplayFormat;
use xiangqi::game::Game;
use xiangqi::location::{Location, Move};
use xiangqi::piece::Color;

pub const TICK: Duration = Duration::from_secs(1);

/// Ticks between two requests for the stored state of the room.
const REFRESH_TICKS: u32 = 5;

/// Id of the human seat when playing offline.
const OFFLINE: PlayerId = 0;

#[derive(Debug)]
pub enum Event {
    Message(ArbiterMessage),
    Input(String),
    Tick,
    Closed,
}

/// How an online match is found.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Entry {
    /// Join any waiting player, or wait for one.
    Seek,
    /// Open a room that only a player given its id can join.
    Host,
    Join(RoomId),
}

impl Entry {
    fn message(self) -> PlayerMessage {
        match self {
            Self::Seek => PlayerMessage::Seek,
            Self::Host => PlayerMessage::Host,
            Self::Join(room) => PlayerMessage::Join { room },
        }
    }
}

/// Who decides the local seat's moves.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Pilot {
    Human,
    Oracle,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(alias = "p", about = "play a move such as b2e2")]
    Play { mv: Move },
    #[command(about = "give up the match")]
    Resign,
    #[command(about = "show the board and clocks")]
    Show,
    #[command(about = "list the safe moves of the piece on a square")]
    Moves { from: Location },
    #[command(about = "rank the safe moves with a material search")]
    Hint {
        #[arg(default_value_t = 2)]
        depth: u32,
    },
    #[command(about = "leave, resigning a match in progress")]
    Quit,
}

/// Feeds lines typed on stdin into `events`.
pub fn spawn_input(events: Sender<Event>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if events.send_blocking(Event::Input(line)).is_err() {
                break;
            }
        }
    });
}

pub fn spawn_ticker(events: Sender<Event>) {
    smol::spawn(async move {
        let mut timer = Timer::interval(TICK);
        while timer.next().await.is_some() {
            if events.send(Event::Tick).await.is_err() {
                break;
            }
        }
    })
    .detach();
}

/// A connection to the arbiter, kept across matches.
pub struct Session {
    id: PlayerId,
    outbox: Sender<PlayerMessage>,
    events: Receiver<Event>,
    sender: Sender<Event>,
}

impl Session {
    pub async fn connect(address: SocketAddr, name: &str) -> Result<Self, Error> {
        let stream = TcpStream::connect(address).await?;
        let (mut reader, mut writer) = line_stream::split(stream);

        writer.write(&PlayerMessage::Init { version: VERSION }).await?;
        writer
            .write(&PlayerMessage::Info {
                name: name.to_string(),
            })
            .await?;

        let id = match reader.read().await? {
            ArbiterMessage::Welcome { id } => id,
            message => return Err(Error::Unexpected(message.encode())),
        };
        info!("connected to {address} as player {id}");

        let (outbox, outgoing) = channel::unbounded::<PlayerMessage>();
        smol::spawn(async move {
            while let Ok(message) = outgoing.recv().await {
                if let Err(err) = writer.write(&message).await {
                    warn!("failed to send '{}': {err}", message.encode());
                    break;
                }
            }
        })
        .detach();

        let (sender, events) = channel::unbounded();
        let incoming = sender.clone();
        smol::spawn(async move {
            loop {
                let event = match reader.read::<ArbiterMessage>().await {
                    Ok(message) => Event::Message(message),
                    Err(Error::Malformed(line)) => {
                        warn!("ignoring malformed message '{line}'");
                        continue;
                    }
                    Err(err) => {
                        debug!("connection lost: {err}");
                        let _ = incoming.send(Event::Closed).await;
                        break;
                    }
                };
                if incoming.send(event).await.is_err() {
                    break;
                }
            }
        })
        .detach();

        spawn_ticker(sender.clone());
        Ok(Self {
            id,
            outbox,
            events,
            sender,
        })
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Where additional events, such as typed input, should be sent.
    pub fn events(&self) -> Sender<Event> {
        self.sender.clone()
    }

    /// Finds an opponent through `entry` and plays one match. `None` if the player quit before it
    /// finished.
    pub async fn play<O: MoveOracle>(
        &self,
        entry: Entry,
        pilot: Pilot,
        oracle: &O,
        args: &MatchArgs,
        sink: &mut dyn RecordSink,
    ) -> Result<Option<MatchRecord>, Error> {
        let sync = Synchronizer::new(self.id, args.limits(), args.time_control());
        let mut driver = Driver::new(sync, pilot, oracle, args, Some(&self.outbox));
        driver.send(entry.message());
        driver.run(&self.events, sink).await
    }
}

/// Plays `game` from stdin against `oracle`, colors decided by a coin toss.
pub async fn play_offline<O: MoveOracle>(
    game: Game,
    events: &Receiver<Event>,
    oracle: &O,
    args: &MatchArgs,
    sink: &mut dyn RecordSink,
) -> Result<Option<MatchRecord>, Error> {
    let mut sync = Synchronizer::with_game(OFFLINE, game, args.time_control());
    sync.pair(Seat::Computer);
    sync.toss(&mut rand::rng());

    let mut driver = Driver::new(sync, Pilot::Human, oracle, args, None);
    driver.show();
    driver.run(events, sink).await
}

struct Driver<'a, O> {
    sync: Synchronizer,
    pilot: Pilot,
    oracle: &'a O,
    args: &'a MatchArgs,
    outbox: Option<&'a Sender<PlayerMessage>>,
    random: ThreadRng,
    last_tick: Instant,
    ticks: u32,
}

impl<'a, O: MoveOracle> Driver<'a, O> {
    fn new(
        sync: Synchronizer,
        pilot: Pilot,
        oracle: &'a O,
        args: &'a MatchArgs,
        outbox: Option<&'a Sender<PlayerMessage>>,
    ) -> Self {
        Self {
            sync,
            pilot,
            oracle,
            args,
            outbox,
            random: rand::rng(),
            last_tick: Instant::now(),
            ticks: 0,
        }
    }

    async fn run(&mut self, events: &Receiver<Event>, sink: &mut dyn RecordSink) -> Result<Option<MatchRecord>, Error> {
        loop {
            self.advance().await;

            if let Some(record) = self.sync.take_record() {
                sink.write(&record)?;
                self.show();
                return Ok(Some(record));
            }

            let event = events.recv().await.map_err(|_| Error::Closed)?;
            trace!("handling {event:?}");
            if !self.handle(event)? {
                return Ok(None);
            }
        }
    }

    fn send(&self, message: PlayerMessage) {
        let Some(outbox) = self.outbox else {
            return;
        };
        if outbox.try_send(message).is_err() {
            warn!("writer is gone, message dropped");
        }
    }

    fn publish(&self, snapshot: Option<Snapshot>) {
        if let Some(snapshot) = snapshot {
            self.send(PlayerMessage::Publish { snapshot });
        }
    }

    /// Charges the time since the last charge to the side to move, which keeps every move's
    /// thinking time on the mover's clock.
    fn charge(&mut self) {
        let now = Instant::now();
        let snapshot = self.sync.tick(now.saturating_duration_since(self.last_tick));
        self.last_tick = now;
        if snapshot.is_some() {
            info!("flag fell");
        }
        self.publish(snapshot);
    }

    /// Lets the oracle move for the seats it controls.
    async fn advance(&mut self) {
        let origin = match self.sync.to_move() {
            Some(Origin::Computer) => Origin::Computer,
            Some(Origin::Local) if self.pilot == Pilot::Oracle => Origin::Local,
            _ => return,
        };

        let timeout = self.args.oracle_timeout();
        let Some(mv) = oracle::choose_move(self.oracle, self.sync.game(), timeout, &mut self.random).await else {
            return;
        };

        // the search ran on the mover's time
        self.charge();
        let snapshot = self.sync.play_as(origin, mv);
        if snapshot.is_some() {
            debug!("{origin:?} played {mv}");
            self.show();
        }
        self.publish(snapshot);
    }

    /// Returns `false` once the player chose to leave.
    fn handle(&mut self, event: Event) -> Result<bool, Error> {
        match event {
            Event::Tick => {
                self.charge();
                self.ticks += 1;
                if self.sync.phase() == Phase::Playing && self.ticks.is_multiple_of(REFRESH_TICKS) {
                    self.send(PlayerMessage::Refresh);
                }
            }
            Event::Input(line) if self.pilot == Pilot::Human => match console::parse_line(&line) {
                Ok(Command::Play { mv }) => {
                    self.charge();
                    match self.sync.play(mv) {
                        Some(snapshot) => {
                            self.publish(Some(snapshot));
                            self.show();
                        }
                        None => println!("illegal move"),
                    }
                }
                Ok(Command::Resign) => {
                    let snapshot = self.sync.resign();
                    self.publish(snapshot);
                }
                Ok(Command::Show) => self.show(),
                Ok(Command::Moves { from }) => {
                    let moves: Vec<_> = self.sync.game().moves_from(from).map(|mv| mv.to.to_string()).collect();
                    println!("{from}: {}", moves.join(" "));
                }
                Ok(Command::Hint { depth }) => {
                    let mut ranker = self.sync.game().ranker();
                    ranker.rank(depth);
                    print!("{}", ranker.display(DisplayFormat::pretty()));
                }
                Ok(Command::Quit) => {
                    if self.sync.phase() == Phase::Playing {
                        let snapshot = self.sync.resign();
                        self.publish(snapshot);
                        return Ok(true);
                    }
                    self.send(PlayerMessage::Leave);
                    return Ok(false);
                }
                Err(err) => print!("{err}"),
            },
            Event::Input(_) => {}
            Event::Message(message) => self.receive(message)?,
            Event::Closed if self.sync.phase() == Phase::Finished => {}
            Event::Closed => return Err(Error::Closed),
        }

        Ok(true)
    }

    fn receive(&mut self, message: ArbiterMessage) -> Result<(), Error> {
        match message {
            ArbiterMessage::Waiting { room } => {
                info!("waiting for an opponent in room {room}");
                if self.pilot == Pilot::Human {
                    println!("waiting in room {room}, a friend can join it with --join {room}");
                }
            }
            ArbiterMessage::Refused { room } => return Err(Error::Refused(room)),
            ArbiterMessage::Start { room, red, black } => {
                let assignment = Assignment {
                    red: Seat::Player(red),
                    black: Seat::Player(black),
                };
                if !self.sync.assign(assignment) {
                    warn!("ignoring start of room {room}");
                    return Ok(());
                }
                self.last_tick = Instant::now();
                if let Some(color) = self.sync.local_color() {
                    info!("match in room {room} started, playing {color}");
                }
                self.show();
            }
            ArbiterMessage::Update { origin, snapshot } => {
                self.charge();
                if self.sync.receive(origin, &snapshot) {
                    self.show();
                }
            }
            message @ ArbiterMessage::Welcome { .. } => return Err(Error::Unexpected(message.encode())),
        }
        Ok(())
    }

    fn show(&self) {
        if self.pilot != Pilot::Human {
            return;
        }

        let game = self.sync.game();
        println!("{}", game.display(DisplayFormat::pretty()));

        let clock = self.sync.clock();
        let format = |color: Color| {
            let seconds = clock.remaining(color).as_secs();
            format!("{color} {}:{:02}", seconds / 60, seconds % 60)
        };
        match self.sync.local_color() {
            Some(color) => println!("{} | {} | you play {color}", format(Color::Red), format(Color::Black)),
            None => println!("{} | {}", format(Color::Red), format(Color::Black)),
        }
    }
}
