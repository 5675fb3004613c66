pub mod connection;
pub mod control;
pub mod lobby;
