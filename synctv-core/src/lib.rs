//! Core of `SyncTV`: room playlists and vendor media resolution.
//!
//! [`room::RoomPlaylists`] holds one [`room::PlaylistStore`] per room.
//! [`vendor::VendorMediaResolver`] turns playlist movies into playable
//! media, memoizing vendor sessions and signed URLs with [`cache::RefreshMap`].

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod room;
pub mod vendor;

pub use config::Config;
pub use error::{Error, Result};
