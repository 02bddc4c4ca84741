mod config;
mod connection;
mod protocol;

pub use config::*;
pub use connection::*;
pub use protocol::*;
