mod adapter;
mod queries;

pub use adapter::{MINIMUM_VERSION, SqliteAdapter, connect, parse_server_version};
