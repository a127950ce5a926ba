use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use super::playlist::{PlaylistContext, PlaylistStore};
use crate::{models::RoomId, Result};

/// Playlists of the rooms currently held in memory
pub struct RoomPlaylists {
    ctx: PlaylistContext,
    rooms: DashMap<RoomId, Arc<PlaylistStore>>,
}

impl RoomPlaylists {
    #[must_use]
    pub fn new(ctx: PlaylistContext) -> Self {
        Self {
            ctx,
            rooms: DashMap::new(),
        }
    }

    /// The room's playlist, created (not yet loaded) on first access
    pub fn get(&self, room_id: &RoomId) -> Arc<PlaylistStore> {
        if let Some(store) = self.rooms.get(room_id) {
            return store.clone();
        }
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(PlaylistStore::new(room_id.clone(), self.ctx.clone())))
            .clone()
    }

    #[must_use]
    pub fn is_loaded(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Drop a room from memory, releasing its movies' resources.
    pub async fn unload(&self, room_id: &RoomId) {
        if let Some((_, store)) = self.rooms.remove(room_id) {
            store.close().await;
            info!(room_id = %room_id, "Unloaded room playlist");
        }
    }

    /// Delete a room's movies everywhere and drop it from memory.
    pub async fn delete(&self, room_id: &RoomId) -> Result<()> {
        let store = self.get(room_id);
        store.clear().await?;
        self.rooms.remove(room_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Movie, MovieBase, UserId};
    use crate::repository::InMemoryMovieRepository;
    use crate::room::channel::InMemoryChannelProvider;

    fn registry() -> (RoomPlaylists, Arc<InMemoryMovieRepository>) {
        let repo = Arc::new(InMemoryMovieRepository::new());
        let ctx = PlaylistContext::new(repo.clone(), Arc::new(InMemoryChannelProvider::new()));
        (RoomPlaylists::new(ctx), repo)
    }

    fn movie(room: &RoomId) -> Movie {
        Movie::new(
            room.clone(),
            UserId::from("u1"),
            MovieBase {
                name: "a".to_string(),
                url: "https://example.com/a.mp4".to_string(),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_same_room_same_store() {
        let (rooms, _) = registry();
        let room = RoomId::from("r1");
        assert!(Arc::ptr_eq(&rooms.get(&room), &rooms.get(&room)));
        assert_eq!(rooms.len(), 1);
    }

    #[tokio::test]
    async fn test_unload_keeps_rows_and_reloads() {
        let (rooms, repo) = registry();
        let room = RoomId::from("r1");
        rooms.get(&room).add_movie(movie(&room)).await.unwrap();

        rooms.unload(&room).await;
        assert!(!rooms.is_loaded(&room));
        assert_eq!(repo.stored(&room).len(), 1);

        assert_eq!(rooms.get(&room).len().await.unwrap(), 1);
        assert_eq!(repo.loads(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_rows() {
        let (rooms, repo) = registry();
        let room = RoomId::from("r1");
        rooms.get(&room).add_movie(movie(&room)).await.unwrap();

        rooms.delete(&room).await.unwrap();
        assert!(rooms.is_empty());
        assert!(repo.stored(&room).is_empty());
    }
}
