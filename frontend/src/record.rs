use crate::error::Error;
use crate::sync::Seat;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use xiangqi::location::Move;
use xiangqi::piece::Color;
use xiangqi::rules::EndReason;

/// What is archived about a finished match.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct MatchRecord {
    pub red: Seat,
    pub black: Seat,
    pub moves: Vec<Move>,
    pub winner: Option<Color>,
    pub reason: EndReason,
}

pub trait RecordSink {
    fn write(&mut self, record: &MatchRecord) -> Result<(), Error>;
}

/// Appends one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl JsonLinesSink<BufWriter<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn write(&mut self, record: &MatchRecord) -> Result<(), Error> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        debug!("archived match of {} moves", record.moves.len());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub records: Vec<MatchRecord>,
}

impl RecordSink for MemorySink {
    fn write(&mut self, record: &MatchRecord) -> Result<(), Error> {
        self.records.push(record.clone());
        Ok(())
    }
}
