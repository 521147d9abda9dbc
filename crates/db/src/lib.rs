pub mod connection;
pub mod migrations;
pub mod projects;
pub mod saver;

pub use connection::{connect, connect_url, DbPool};
pub use projects::{InMemoryProjectStore, ProjectStore, SqlProjectStore, StoreError};
pub use saver::DebouncedSaver;
