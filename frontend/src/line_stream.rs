use crate::error::Error;
use crate::protocol::Message;
use log::trace;
use smol::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use smol::net::TcpStream;

/// Reads one protocol message per non-empty line.
pub struct LineReader<R> {
    inner: R,
}

/// Writes one protocol message per line.
pub struct LineWriter<W> {
    inner: W,
}

/// Splits a connection into halves that can be driven from separate tasks.
pub fn split(stream: TcpStream) -> (LineReader<BufReader<TcpStream>>, LineWriter<TcpStream>) {
    (LineReader::new(BufReader::new(stream.clone())), LineWriter::new(stream))
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub async fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        loop {
            if let Err(_) | Ok(0) = self.inner.read_line(&mut line).await {
                return None;
            }

            let result = line.trim();
            if !result.is_empty() {
                return Some(result.to_string());
            }
            line.clear();
        }
    }

    pub async fn read<M: Message>(&mut self) -> Result<M, Error> {
        let line = self.read_line().await.ok_or(Error::Closed)?;
        trace!("received '{line}'");
        M::decode(&line).ok_or(Error::Malformed(line))
    }
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_line(&mut self, mut line: String) -> Result<(), Error> {
        line.push('\n');
        self.inner.write_all(line.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }

    pub async fn write<M: Message>(&mut self, message: &M) -> Result<(), Error> {
        let line = message.encode();
        trace!("sending '{line}'");
        self.write_line(line).await
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
