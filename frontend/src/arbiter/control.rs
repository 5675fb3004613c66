use crate::arbiter::lobby::Lobby;
use crate::console;
use crate::protocol::RoomId;
use crate::store::{Room, RoomState};
use clap::Subcommand;
use std::sync::Arc;
use xiangqi::display_format::DisplayFormat;

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "show connected players")]
    Players,
    #[command(about = "show rooms")]
    Rooms,
    #[command(about = "show the latest position of a room")]
    Show { room: RoomId },
}

/// Operator console of the arbiter, reading commands from stdin.
pub struct Control {
    lobby: Arc<Lobby>,
}

impl Control {
    pub fn new(lobby: Arc<Lobby>) -> Self {
        Self { lobby }
    }

    pub fn begin(&mut self) {
        while let Some(command) = console::read_command() {
            self.execute(command);
        }
    }

    fn execute(&self, command: Command) {
        match command {
            Command::Players => {
                println!("connected players:");
                for player in self.lobby.list_players() {
                    match player.room {
                        Some(room) => println!("{} '{}' in room {room}", player.id, player.name),
                        None => println!("{} '{}'", player.id, player.name),
                    }
                }
            }
            Command::Rooms => {
                for room in self.lobby.list_rooms() {
                    println!("{}", describe(&room));
                }
            }
            Command::Show { room } => {
                let Some(room) = self.lobby.room(room) else {
                    println!("unknown room {room}");
                    return;
                };

                println!("{}", describe(&room));
                print!("{}", room.game.board().display(DisplayFormat::pretty()));
                match room.snapshot {
                    Some((origin, _)) => println!("{} to move, last update from {origin}", room.game.turn()),
                    None => println!("{} to move", room.game.turn()),
                }
            }
        }
    }
}

fn describe(room: &Room) -> String {
    let state = match room.state {
        RoomState::Waiting => "waiting",
        RoomState::Playing => "playing",
    };
    let seats = match room.assignment {
        Some(assignment) => format!("red {:?} black {:?}", assignment.red, assignment.black),
        None => format!("host {}", room.host),
    };
    let private = if room.private { " private" } else { "" };
    format!("room {} {state}{private} {seats} after {} moves", room.id, room.game.ply())
}
