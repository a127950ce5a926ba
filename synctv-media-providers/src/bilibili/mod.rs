//! Bilibili Provider Client
//!
//! Play URL, DASH and subtitle endpoints of the Bilibili web API.

mod client;
mod mpd;
pub mod types;

pub use client::BilibiliClient;
pub use mpd::generate_mpd;
pub use types::*;
