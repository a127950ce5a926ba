//! In-process store implementations
//!
//! Used by tests and single-node deployments that do not need durability.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{MovieRepository, VendorRepository};
use crate::{
    models::{AlistVendor, BilibiliVendor, Movie, MovieId, RoomId, UserId},
    Error, Result,
};

#[derive(Default)]
pub struct InMemoryMovieRepository {
    rows: RwLock<HashMap<MovieId, Movie>>,
    fail_next_write: AtomicBool,
    loads: AtomicUsize,
    load_delay_ms: AtomicU64,
}

impl InMemoryMovieRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next mutating call fail with a `Database` error.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Hold every later `get_all_by_room` call for `delay` before reading.
    pub fn delay_loads(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.load_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Number of `get_all_by_room` calls served so far
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Snapshot of one room's rows ordered by position
    pub fn stored(&self, room_id: &RoomId) -> Vec<Movie> {
        let mut movies: Vec<Movie> = self
            .rows
            .read()
            .values()
            .filter(|m| &m.room_id == room_id)
            .cloned()
            .collect();
        movies.sort_by_key(|m| m.position);
        movies
    }

    /// Seed rows directly, bypassing failure injection
    pub fn insert_raw(&self, movie: Movie) {
        self.rows.write().insert(movie.id.clone(), movie);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(Error::Database("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MovieRepository for InMemoryMovieRepository {
    async fn get_all_by_room(&self, room_id: &RoomId) -> Result<Vec<Movie>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let delay = self.load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(self.stored(room_id))
    }

    async fn create(&self, movie: &Movie) -> Result<()> {
        self.check_write()?;
        let mut rows = self.rows.write();
        if rows.contains_key(&movie.id) {
            return Err(Error::Database(format!("duplicate movie id {}", movie.id)));
        }
        rows.insert(movie.id.clone(), movie.clone());
        Ok(())
    }

    async fn create_batch(&self, movies: &[Movie]) -> Result<()> {
        self.check_write()?;
        let mut rows = self.rows.write();
        if let Some(dup) = movies.iter().find(|m| rows.contains_key(&m.id)) {
            return Err(Error::Database(format!("duplicate movie id {}", dup.id)));
        }
        for movie in movies {
            rows.insert(movie.id.clone(), movie.clone());
        }
        Ok(())
    }

    async fn save(&self, movie: &Movie) -> Result<()> {
        self.check_write()?;
        let mut rows = self.rows.write();
        match rows.get_mut(&movie.id) {
            Some(row) if row.room_id == movie.room_id => {
                *row = movie.clone();
                Ok(())
            }
            _ => Err(Error::NotFound(format!("movie {}", movie.id))),
        }
    }

    async fn delete_by_id(&self, room_id: &RoomId, id: &MovieId) -> Result<()> {
        self.check_write()?;
        let mut rows = self.rows.write();
        match rows.get(id) {
            Some(row) if &row.room_id == room_id => {
                rows.remove(id);
                Ok(())
            }
            _ => Err(Error::NotFound(format!("movie {id}"))),
        }
    }

    async fn delete_by_ids(&self, room_id: &RoomId, ids: &[MovieId]) -> Result<u64> {
        self.check_write()?;
        let mut rows = self.rows.write();
        let mut removed = 0;
        for id in ids {
            if rows.get(id).is_some_and(|row| &row.room_id == room_id) {
                rows.remove(id);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn delete_by_room(&self, room_id: &RoomId) -> Result<u64> {
        self.check_write()?;
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, row| &row.room_id != room_id);
        Ok((before - rows.len()) as u64)
    }

    async fn swap_positions(&self, room_id: &RoomId, id1: &MovieId, id2: &MovieId) -> Result<()> {
        self.check_write()?;
        let mut rows = self.rows.write();
        let pos1 = rows
            .get(id1)
            .filter(|row| &row.room_id == room_id)
            .map(|row| row.position)
            .ok_or_else(|| Error::NotFound(format!("movie {id1}")))?;
        let pos2 = rows
            .get(id2)
            .filter(|row| &row.room_id == room_id)
            .map(|row| row.position)
            .ok_or_else(|| Error::NotFound(format!("movie {id2}")))?;

        if let Some(row) = rows.get_mut(id1) {
            row.position = pos2;
        }
        if let Some(row) = rows.get_mut(id2) {
            row.position = pos1;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryVendorRepository {
    alist: RwLock<HashMap<(UserId, String), AlistVendor>>,
    bilibili: RwLock<HashMap<UserId, BilibiliVendor>>,
    lookups: AtomicUsize,
}

impl InMemoryVendorRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_alist(&self, vendor: AlistVendor) {
        self.alist
            .write()
            .insert((vendor.user_id.clone(), vendor.server_id.clone()), vendor);
    }

    pub fn bind_bilibili(&self, vendor: BilibiliVendor) {
        self.bilibili.write().insert(vendor.user_id.clone(), vendor);
    }

    /// Number of binding lookups served so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VendorRepository for InMemoryVendorRepository {
    async fn get_alist_vendor(&self, user_id: &UserId, server_id: &str) -> Result<AlistVendor> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.alist
            .read()
            .get(&(user_id.clone(), server_id.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("alist vendor {server_id}")))
    }

    async fn get_bilibili_vendor(&self, user_id: &UserId) -> Result<BilibiliVendor> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.bilibili
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("bilibili vendor".to_string()))
    }
}
