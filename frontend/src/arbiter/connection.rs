use crate::arbiter::lobby::Lobby;
use crate::error::Error;
use crate::line_stream::{self, LineReader};
use crate::protocol::{Message, PlayerId, PlayerMessage, VERSION};
use log::{debug, info, warn};
use smol::channel;
use smol::io::AsyncBufRead;
use smol::net::TcpStream;
use std::net::SocketAddr;
use std::sync::Arc;

/// Serves one player connection until it closes, then frees whatever seat it held.
pub async fn serve(lobby: Arc<Lobby>, stream: TcpStream, address: SocketAddr) {
    if let Err(err) = serve_impl(lobby, stream).await {
        warn!("connection from {address} closed with error {err}");
    } else {
        debug!("connection from {address} closed");
    }
}

async fn serve_impl(lobby: Arc<Lobby>, stream: TcpStream) -> Result<(), Error> {
    let (mut reader, mut writer) = line_stream::split(stream);

    let version = match reader.read().await? {
        PlayerMessage::Init { version } => version,
        message => return Err(Error::Unexpected(message.encode())),
    };
    if version != VERSION {
        return Err(Error::Version(version));
    }

    let name = match reader.read().await? {
        PlayerMessage::Info { name } => name,
        message => return Err(Error::Unexpected(message.encode())),
    };

    let (outbox, outgoing) = channel::unbounded();
    let id = lobby.join(name, outbox);

    smol::spawn(async move {
        while let Ok(message) = outgoing.recv().await {
            if let Err(err) = writer.write(&message).await {
                debug!("stopped writing to player {id}: {err}");
                break;
            }
        }
    })
    .detach();

    let result = relay(&lobby, id, &mut reader).await;
    lobby.disconnect(id);
    result
}

async fn relay<R: AsyncBufRead + Unpin>(lobby: &Lobby, id: PlayerId, reader: &mut LineReader<R>) -> Result<(), Error> {
    loop {
        let message = match reader.read::<PlayerMessage>().await {
            Ok(message) => message,
            Err(Error::Malformed(line)) => {
                warn!("player {id} sent malformed message '{line}'");
                continue;
            }
            Err(Error::Closed) => return Ok(()),
            Err(err) => return Err(err),
        };

        match message {
            PlayerMessage::Seek => lobby.seek(id),
            PlayerMessage::Host => lobby.host(id),
            PlayerMessage::Join { room } => lobby.join_room(id, room),
            PlayerMessage::Leave => lobby.leave(id),
            PlayerMessage::Publish { snapshot } => lobby.publish(id, snapshot),
            PlayerMessage::Refresh => lobby.refresh(id),
            PlayerMessage::Init { .. } | PlayerMessage::Info { .. } => {
                info!("player {id} repeated the handshake, ignored")
            }
        }
    }
}
