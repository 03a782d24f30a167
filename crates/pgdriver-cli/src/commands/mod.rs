//! Command implementations.

mod migrate;
mod ping;

pub use migrate::migrate;
pub use ping::ping;
