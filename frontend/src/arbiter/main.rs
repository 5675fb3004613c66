use clap::Parser;
use frontend::arbiter::connection;
use frontend::arbiter::control::Control;
use frontend::arbiter::lobby::Lobby;
use frontend::config::{LogArgs, RuleArgs};
use frontend::logging;
use log::{info, warn};
use std::error::Error;
use std::net::IpAddr;
use std::sync::Arc;
use std::thread;

#[derive(Parser)]
struct Arguments {
    #[arg(short, long, default_value = "127.0.0.1")]
    ip: IpAddr,

    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    #[command(flatten)]
    rules: RuleArgs,

    #[command(flatten)]
    log: LogArgs,
}

fn main() -> Result<(), Box<dyn Error>> {
    let arguments = Arguments::parse();
    logging::init(arguments.log.log_level, &arguments.log.log_file)?;

    let address = format!("{}:{}", arguments.ip, arguments.port);
    let lobby = Arc::new(Lobby::with_limits(arguments.rules.limits()));

    let mut control = Control::new(lobby.clone());
    thread::spawn(move || control.begin());

    smol::block_on(listen(lobby, address))
}

async fn listen(lobby: Arc<Lobby>, address: String) -> Result<(), Box<dyn Error>> {
    let listener = smol::net::TcpListener::bind(&address).await?;
    info!("server listening at {address}");

    loop {
        let (stream, address) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!("failed to accept connection: {err}");
                continue;
            }
        };
        info!("received incoming connection from {address}");
        smol::spawn(connection::serve(lobby.clone(), stream, address)).detach();
    }
}
