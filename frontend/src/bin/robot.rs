use clap::Parser;
use frontend::client::{Entry, Pilot, Session};
use frontend::config::{LogArgs, MatchArgs, NetworkArgs};
use frontend::logging;
use frontend::oracle::RankerOracle;
use frontend::record::JsonLinesSink;
use log::info;
use std::error::Error;

#[derive(Parser, Debug)]
struct Arguments {
    #[command(flatten)]
    network: NetworkArgs,

    #[command(flatten)]
    game: MatchArgs,

    #[command(flatten)]
    log: LogArgs,

    #[arg(short, long, default_value = "robot")]
    name: String,

    #[arg(short, long, default_value_t = 1, help = "matches to play before disconnecting")]
    rounds: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    let arguments = Arguments::parse();
    logging::init(arguments.log.log_level, &arguments.log.log_file)?;

    smol::block_on(run(arguments))
}

async fn run(arguments: Arguments) -> Result<(), Box<dyn Error>> {
    let oracle = RankerOracle::new(arguments.game.depth);
    let mut sink = JsonLinesSink::open(&arguments.game.record)?;
    let session = Session::connect(arguments.network.address(), &arguments.name).await?;

    for round in 1..=arguments.rounds {
        let record = session.play(Entry::Seek, Pilot::Oracle, &oracle, &arguments.game, &mut sink).await?;
        if let Some(record) = record {
            info!(
                "round {round} over after {} moves: {:?} by {}",
                record.moves.len(),
                record.winner,
                record.reason
            );
        }
    }

    Ok(())
}
