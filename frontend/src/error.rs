use crate::protocol::RoomId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("connection closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed message '{0}'")]
    Malformed(String),
    #[error("unexpected message '{0}'")]
    Unexpected(String),
    #[error("unsupported protocol version {0}")]
    Version(u32),
    #[error("room {0} cannot be joined")]
    Refused(RoomId),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
