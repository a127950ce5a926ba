//! Room playlists and the runtime state of their movies

pub mod channel;
mod movie;
mod playlist;
mod registry;

pub use channel::{ChannelProvider, InMemoryChannelProvider, LocalChannel, StreamChannel};
pub use movie::MovieEntry;
pub use playlist::{PlaylistContext, PlaylistStore};
pub use registry::RoomPlaylists;
