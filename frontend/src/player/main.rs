use clap::Parser;
use frontend::client::{self, Entry, Pilot, Session};
use frontend::protocol::RoomId;
use frontend::config::{LogArgs, MatchArgs, NetworkArgs};
use frontend::logging;
use frontend::oracle::RankerOracle;
use frontend::record::JsonLinesSink;
use smol::channel;
use std::error::Error;
use xiangqi::board::Board;
use xiangqi::display_format::DisplayFormat;
use xiangqi::game::Game;
use xiangqi::piece::Color;

#[derive(Parser, Debug)]
struct Arguments {
    #[command(flatten)]
    network: NetworkArgs,

    #[command(flatten)]
    game: MatchArgs,

    #[command(flatten)]
    log: LogArgs,

    #[arg(short, long, default_value = "human")]
    name: String,

    #[arg(short, long, default_value_t = false, help = "play offline against the computer")]
    computer: bool,

    #[arg(long, default_value_t = false, conflicts_with = "join", help = "open a private room and wait for a friend")]
    host: bool,

    #[arg(long, help = "join the room with this id")]
    join: Option<RoomId>,

    #[arg(long, help = "board to start from when playing offline")]
    fen: Option<String>,

    #[arg(long, default_value = "red", help = "side to move first in --fen")]
    turn: String,

    #[arg(long, default_value_t = false, help = "board letters instead of chinese glyphs")]
    ascii: bool,

    #[arg(long, default_value_t = false, help = "no terminal colours")]
    plain: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let arguments = Arguments::parse();
    logging::init(arguments.log.log_level, &arguments.log.log_file)?;
    DisplayFormat::set_defaults(!arguments.ascii, !arguments.plain);

    smol::block_on(run(arguments))
}

async fn run(arguments: Arguments) -> Result<(), Box<dyn Error>> {
    let oracle = RankerOracle::new(arguments.game.depth);
    let mut sink = JsonLinesSink::open(&arguments.game.record)?;

    let record = if arguments.computer {
        let limits = arguments.game.limits();
        let game = match &arguments.fen {
            Some(fen) => {
                let turn: Color = arguments.turn.parse().map_err(|_| "turn must be 'red' or 'black'")?;
                Game::with_limits(Board::from_fen(fen)?, turn, limits)?
            }
            None => Game::opening_with_limits(limits),
        };

        let (sender, events) = channel::unbounded();
        client::spawn_input(sender.clone());
        client::spawn_ticker(sender);
        client::play_offline(game, &events, &oracle, &arguments.game, &mut sink).await?
    } else {
        let entry = match (arguments.host, arguments.join) {
            (_, Some(room)) => Entry::Join(room),
            (true, None) => Entry::Host,
            (false, None) => Entry::Seek,
        };
        let session = Session::connect(arguments.network.address(), &arguments.name).await?;
        client::spawn_input(session.events());
        println!("connected as player {}, waiting for an opponent", session.id());
        session.play(entry, Pilot::Human, &oracle, &arguments.game, &mut sink).await?
    };

    match record {
        Some(record) => println!("{} moves played", record.moves.len()),
        None => println!("left before the match finished"),
    }
    Ok(())
}
