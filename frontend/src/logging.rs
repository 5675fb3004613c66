use chrono::Local;
use env_logger::Target;
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Copies every log line to stderr and to the log file.
struct Tee {
    file: BufWriter<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()?;
        self.file.flush()
    }
}

/// Logs to stderr and appends to `path`, each line stamped with the local time.
pub fn init(level: LevelFilter, path: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{style}[{}] [{:5}]{style:#} {}",
                Local::now().format("%T%.3f"),
                record.level(),
                record.args(),
                style = buf.default_level_style(record.level()),
            )
        })
        .target(Target::Pipe(Box::new(Tee {
            file: BufWriter::new(file),
        })))
        .init();

    Ok(())
}
