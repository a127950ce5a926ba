//! Persistent store contracts and their implementations
//!
//! The playlist and vendor layers only see the traits below. `Pg*` types
//! back them with PostgreSQL, `InMemory*` types with process memory.

use async_trait::async_trait;

use crate::{
    models::{AlistVendor, BilibiliVendor, Movie, MovieId, RoomId, UserId},
    Result,
};

pub mod memory;
pub mod movie;
pub mod vendor;

pub use memory::{InMemoryMovieRepository, InMemoryVendorRepository};
pub use movie::PgMovieRepository;
pub use vendor::PgVendorRepository;

/// Movie rows of every room
#[async_trait]
pub trait MovieRepository: Send + Sync {
    /// All movies of a room ordered by position
    async fn get_all_by_room(&self, room_id: &RoomId) -> Result<Vec<Movie>>;

    async fn create(&self, movie: &Movie) -> Result<()>;

    /// Insert every movie or none of them
    async fn create_batch(&self, movies: &[Movie]) -> Result<()>;

    /// Overwrite the stored row of an existing movie
    async fn save(&self, movie: &Movie) -> Result<()>;

    /// Fails with `NotFound` when the room has no such movie
    async fn delete_by_id(&self, room_id: &RoomId, id: &MovieId) -> Result<()>;

    /// Returns the number of rows removed; unknown ids are skipped
    async fn delete_by_ids(&self, room_id: &RoomId, ids: &[MovieId]) -> Result<u64>;

    async fn delete_by_room(&self, room_id: &RoomId) -> Result<u64>;

    /// Exchange the positions of two movies atomically.
    /// Fails with `NotFound` when either movie is missing.
    async fn swap_positions(&self, room_id: &RoomId, id1: &MovieId, id2: &MovieId) -> Result<()>;
}

/// Vendor account bindings of every user
#[async_trait]
pub trait VendorRepository: Send + Sync {
    /// Fails with `NotFound` when the user has not bound that server
    async fn get_alist_vendor(&self, user_id: &UserId, server_id: &str) -> Result<AlistVendor>;

    /// Fails with `NotFound` when the user has not bound an account
    async fn get_bilibili_vendor(&self, user_id: &UserId) -> Result<BilibiliVendor>;
}

pub(crate) fn position_to_db(position: u64) -> Result<i64> {
    i64::try_from(position)
        .map_err(|_| crate::Error::InvalidInput(format!("position out of range: {position}")))
}
