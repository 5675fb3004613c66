pub mod arbiter;
pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod line_stream;
pub mod logging;
pub mod oracle;
pub mod protocol;
pub mod record;
pub mod store;
pub mod sync;
