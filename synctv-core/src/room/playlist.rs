//! Per-room playlist
//!
//! The in-memory list is the authoritative view of one room's movies. Every
//! write goes to the repository first and touches memory only after the
//! repository accepted it, so a failed write leaves the list unchanged.
//!
//! Locking: writers are serialized by `write_gate`, which is held across the
//! repository call. The initial load holds it too, so a load still in flight
//! cannot bring back rows a writer has since deleted. The list itself sits
//! behind a `RwLock` that writers take only to apply an already persisted
//! change, so readers never wait on I/O.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info, warn};

use super::channel::{ChannelProvider, StreamChannel};
use super::movie::MovieEntry;
use crate::{
    models::{page_window, Movie, MovieId, MoviePatch, Page, RoomId, UserId},
    repository::MovieRepository,
    Error, Result,
};

/// Collaborators shared by every playlist of a process
#[derive(Clone)]
pub struct PlaylistContext {
    pub movies: Arc<dyn MovieRepository>,
    pub channels: Arc<dyn ChannelProvider>,
}

impl PlaylistContext {
    #[must_use]
    pub fn new(movies: Arc<dyn MovieRepository>, channels: Arc<dyn ChannelProvider>) -> Self {
        Self { movies, channels }
    }
}

#[derive(Default)]
struct PlaylistState {
    /// Ordered by position
    entries: Vec<Arc<MovieEntry>>,
    index: HashMap<MovieId, usize>,
    /// Highest position handed out or loaded so far
    last_position: u64,
}

impl PlaylistState {
    fn push(&mut self, entry: Arc<MovieEntry>) {
        self.last_position = self.last_position.max(entry.position());
        self.index.insert(entry.id(), self.entries.len());
        self.entries.push(entry);
    }

    fn remove(&mut self, id: &MovieId) -> Option<Arc<MovieEntry>> {
        let idx = self.index.remove(id)?;
        let entry = self.entries.remove(idx);
        for (i, e) in self.entries.iter().enumerate().skip(idx) {
            self.index.insert(e.id(), i);
        }
        Some(entry)
    }

    fn get(&self, id: &MovieId) -> Option<&Arc<MovieEntry>> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    fn take_all(&mut self) -> Vec<Arc<MovieEntry>> {
        self.index.clear();
        std::mem::take(&mut self.entries)
    }
}

/// Ordered, lazily loaded movie list of one room
pub struct PlaylistStore {
    room_id: RoomId,
    ctx: PlaylistContext,
    loaded: OnceCell<()>,
    write_gate: Mutex<()>,
    state: RwLock<PlaylistState>,
}

impl PlaylistStore {
    #[must_use]
    pub fn new(room_id: RoomId, ctx: PlaylistContext) -> Self {
        Self {
            room_id,
            ctx,
            loaded: OnceCell::new(),
            write_gate: Mutex::new(()),
            state: RwLock::new(PlaylistState::default()),
        }
    }

    #[must_use]
    pub const fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Load the room's movies once. A failed load is retried by the next call.
    async fn init(&self) -> Result<()> {
        self.loaded
            .get_or_try_init(|| async {
                let _gate = self.write_gate.lock().await;
                let mut movies = self.ctx.movies.get_all_by_room(&self.room_id).await?;
                movies.sort_by_key(|m| m.position);

                let mut state = self.state.write().await;
                for movie in movies {
                    state.push(Arc::new(MovieEntry::new(movie, self.ctx.channels.clone())));
                }
                info!(room_id = %self.room_id, count = state.entries.len(), "Loaded room playlist");
                Ok::<(), Error>(())
            })
            .await?;
        Ok(())
    }

    fn next_position(state: &PlaylistState) -> u64 {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
        now.max(state.last_position + 1)
    }

    fn check_room(&self, movie: &Movie) -> Result<()> {
        if movie.room_id != self.room_id {
            return Err(Error::InvalidInput(format!(
                "movie {} belongs to room {}, not {}",
                movie.id, movie.room_id, self.room_id
            )));
        }
        Ok(())
    }

    pub async fn len(&self) -> Result<usize> {
        self.init().await?;
        Ok(self.state.read().await.entries.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Append a movie. Its position is assigned here.
    pub async fn add_movie(&self, mut movie: Movie) -> Result<Arc<MovieEntry>> {
        self.init().await?;
        let _gate = self.write_gate.lock().await;

        movie.position = Self::next_position(&*self.state.read().await);
        self.check_room(&movie)?;
        movie.validate()?;

        self.ctx.movies.create(&movie).await?;

        let entry = Arc::new(MovieEntry::new(movie, self.ctx.channels.clone()));
        self.state.write().await.push(entry.clone());
        debug!(room_id = %self.room_id, movie_id = %entry.id(), "Added movie");
        Ok(entry)
    }

    /// Append several movies, all or none.
    pub async fn add_movies(&self, mut movies: Vec<Movie>) -> Result<Vec<Arc<MovieEntry>>> {
        self.init().await?;
        let _gate = self.write_gate.lock().await;

        let mut position = Self::next_position(&*self.state.read().await);
        for movie in &mut movies {
            movie.position = position;
            position += 1;
            self.check_room(movie)?;
            movie.validate()?;
        }

        self.ctx.movies.create_batch(&movies).await?;

        let entries: Vec<_> = movies
            .into_iter()
            .map(|movie| Arc::new(MovieEntry::new(movie, self.ctx.channels.clone())))
            .collect();
        let mut state = self.state.write().await;
        for entry in &entries {
            state.push(entry.clone());
        }
        debug!(room_id = %self.room_id, count = entries.len(), "Added movies");
        Ok(entries)
    }

    /// Apply a partial update to one movie. Returns the updated movie.
    pub async fn update(&self, id: &MovieId, patch: MoviePatch) -> Result<Movie> {
        self.init().await?;
        let _gate = self.write_gate.lock().await;

        let entry = self.lookup(id).await?;
        let movie = entry.patched(patch)?;
        self.ctx.movies.save(&movie).await?;
        entry.replace(movie.clone()).await;

        debug!(room_id = %self.room_id, movie_id = %id, "Updated movie");
        Ok(movie)
    }

    pub async fn delete_movie_by_id(&self, id: &MovieId) -> Result<()> {
        self.init().await?;
        let _gate = self.write_gate.lock().await;

        self.ctx.movies.delete_by_id(&self.room_id, id).await?;

        let removed = self.state.write().await.remove(id);
        match removed {
            Some(entry) => {
                self.terminate(&entry).await;
                debug!(room_id = %self.room_id, movie_id = %id, "Deleted movie");
                Ok(())
            }
            None => Err(Error::NotFound(format!("movie {id}"))),
        }
    }

    /// Delete every listed movie; ids not in the room are skipped.
    /// Returns how many movies were removed from the list.
    pub async fn delete_movies_by_id(&self, ids: &[MovieId]) -> Result<usize> {
        self.init().await?;
        let _gate = self.write_gate.lock().await;

        self.ctx.movies.delete_by_ids(&self.room_id, ids).await?;

        let removed: Vec<_> = {
            let mut state = self.state.write().await;
            ids.iter().filter_map(|id| state.remove(id)).collect()
        };
        for entry in &removed {
            self.terminate(entry).await;
        }
        debug!(room_id = %self.room_id, count = removed.len(), "Deleted movies");
        Ok(removed.len())
    }

    /// Delete the room's movies from the repository and empty the list.
    pub async fn clear(&self) -> Result<()> {
        self.init().await?;
        let _gate = self.write_gate.lock().await;

        let deleted = self.ctx.movies.delete_by_room(&self.room_id).await?;
        let removed = self.state.write().await.take_all();
        for entry in &removed {
            self.terminate(entry).await;
        }
        info!(room_id = %self.room_id, deleted, "Cleared room playlist");
        Ok(())
    }

    /// Empty the list without touching the repository.
    pub async fn close(&self) {
        if let Err(e) = self.init().await {
            warn!(room_id = %self.room_id, error = %e, "Closing playlist that failed to load");
        }
        let _gate = self.write_gate.lock().await;

        let removed = self.state.write().await.take_all();
        for entry in &removed {
            self.terminate(entry).await;
        }
        debug!(room_id = %self.room_id, count = removed.len(), "Closed room playlist");
    }

    /// Exchange the positions of two movies, in the repository and in the list.
    pub async fn swap_movie_positions(&self, id1: &MovieId, id2: &MovieId) -> Result<()> {
        self.init().await?;
        let _gate = self.write_gate.lock().await;

        {
            let state = self.state.read().await;
            for id in [id1, id2] {
                if state.get(id).is_none() {
                    return Err(Error::NotFound(format!("movie {id}")));
                }
            }
        }
        if id1 == id2 {
            return Ok(());
        }

        self.ctx.movies.swap_positions(&self.room_id, id1, id2).await?;

        let mut state = self.state.write().await;
        let (Some(&i), Some(&j)) = (state.index.get(id1), state.index.get(id2)) else {
            return Err(Error::Internal("swapped movie vanished from playlist".to_string()));
        };
        let (a, b) = (state.entries[i].clone(), state.entries[j].clone());
        let (pos_a, pos_b) = (a.position(), b.position());
        a.set_position(pos_b);
        b.set_position(pos_a);
        state.entries.swap(i, j);
        state.index.insert(a.id(), j);
        state.index.insert(b.id(), i);

        debug!(room_id = %self.room_id, movie_id1 = %id1, movie_id2 = %id2, "Swapped movies");
        Ok(())
    }

    pub async fn get_movie_by_id(&self, id: &MovieId) -> Result<Arc<MovieEntry>> {
        if id.is_empty() {
            return Err(Error::InvalidInput("movie id is empty".to_string()));
        }
        self.init().await?;
        self.lookup(id).await
    }

    async fn lookup(&self, id: &MovieId) -> Result<Arc<MovieEntry>> {
        self.state
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("movie {id}")))
    }

    /// One page of the list, optionally restricted to movies added by `creator`.
    /// `total` counts the movies matching the filter.
    pub async fn get_movies_with_page(
        &self,
        page: i64,
        page_size: i64,
        creator: Option<&UserId>,
    ) -> Result<Page<Arc<MovieEntry>>> {
        self.init().await?;
        let state = self.state.read().await;

        let matches = |entry: &&Arc<MovieEntry>| creator.is_none_or(|c| entry.is_created_by(c));
        let total = match creator {
            Some(_) => state.entries.iter().filter(matches).count(),
            None => state.entries.len(),
        };
        let (start, end) = page_window(total, page, page_size);
        let items = state
            .entries
            .iter()
            .filter(matches)
            .skip(start)
            .take(end - start)
            .cloned()
            .collect();
        Ok(Page::new(items, total))
    }

    /// The streaming channel of a live movie
    pub async fn get_channel(&self, id: &MovieId) -> Result<Arc<dyn StreamChannel>> {
        if id.is_empty() {
            return Err(Error::InvalidInput("channel name is empty".to_string()));
        }
        self.get_movie_by_id(id).await?.channel().await
    }

    async fn terminate(&self, entry: &MovieEntry) {
        if let Err(e) = entry.terminate().await {
            warn!(
                room_id = %self.room_id,
                movie_id = %entry.id(),
                error = %e,
                "Failed to terminate movie"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieBase;
    use crate::repository::InMemoryMovieRepository;
    use crate::room::channel::InMemoryChannelProvider;
    use std::time::Duration;

    struct Fixture {
        repo: Arc<InMemoryMovieRepository>,
        channels: Arc<InMemoryChannelProvider>,
        store: PlaylistStore,
        room: RoomId,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryMovieRepository::new());
        let channels = Arc::new(InMemoryChannelProvider::new());
        let room = RoomId::from("room1");
        let store = PlaylistStore::new(
            room.clone(),
            PlaylistContext::new(repo.clone(), channels.clone()),
        );
        Fixture {
            repo,
            channels,
            store,
            room,
        }
    }

    fn movie(room: &RoomId, creator: &str, name: &str) -> Movie {
        Movie::new(
            room.clone(),
            UserId::from(creator),
            MovieBase {
                name: name.to_string(),
                url: format!("https://example.com/{name}.mp4"),
                ..Default::default()
            },
        )
    }

    fn live_movie(room: &RoomId) -> Movie {
        Movie::new(
            room.clone(),
            UserId::from("u1"),
            MovieBase {
                name: "cam".to_string(),
                live: true,
                rtmp_source: true,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_lazy_load_happens_once() {
        let f = fixture();
        let mut seeded = movie(&f.room, "u1", "seeded");
        seeded.position = 7;
        f.repo.insert_raw(seeded.clone());

        let (a, b, c) = tokio::join!(f.store.len(), f.store.len(), f.store.len());
        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (1, 1, 1));
        assert_eq!(f.repo.loads(), 1);
        assert_eq!(f.store.get_movie_by_id(&seeded.id).await.unwrap().position(), 7);
    }

    #[tokio::test]
    async fn test_positions_strictly_increase() {
        let f = fixture();
        let mut last = 0;
        for i in 0..20 {
            let entry = f.store.add_movie(movie(&f.room, "u1", &format!("m{i}"))).await.unwrap();
            assert!(entry.position() > last);
            last = entry.position();
        }

        let batch = f
            .store
            .add_movies(vec![movie(&f.room, "u1", "x"), movie(&f.room, "u1", "y")])
            .await
            .unwrap();
        assert!(batch[0].position() > last);
        assert!(batch[1].position() > batch[0].position());
    }

    #[tokio::test]
    async fn test_add_failure_leaves_list_unchanged() {
        let f = fixture();
        f.repo.fail_next_write();
        let err = f.store.add_movie(movie(&f.room, "u1", "a")).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert_eq!(f.store.len().await.unwrap(), 0);

        let invalid = movie(&f.room, "u1", "");
        assert!(matches!(f.store.add_movie(invalid).await, Err(Error::InvalidInput(_))));
        assert_eq!(f.repo.stored(&f.room).len(), 0);
    }

    #[tokio::test]
    async fn test_add_movies_is_all_or_nothing() {
        let f = fixture();
        let movies = vec![movie(&f.room, "u1", "a"), movie(&f.room, "u1", "")];
        assert!(f.store.add_movies(movies).await.is_err());
        assert_eq!(f.store.len().await.unwrap(), 0);
        assert!(f.repo.stored(&f.room).is_empty());

        f.repo.fail_next_write();
        let movies = vec![movie(&f.room, "u1", "a"), movie(&f.room, "u1", "b")];
        assert!(f.store.add_movies(movies).await.is_err());
        assert_eq!(f.store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_foreign_room_rejected() {
        let f = fixture();
        let other = movie(&RoomId::from("room2"), "u1", "a");
        assert!(matches!(f.store.add_movie(other).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_update_persists_before_mutating() {
        let f = fixture();
        let entry = f.store.add_movie(movie(&f.room, "u1", "a")).await.unwrap();
        let id = entry.id();

        f.repo.fail_next_write();
        let patch = MoviePatch {
            name: Some("renamed".to_string()),
            ..Default::default()
        };
        assert!(f.store.update(&id, patch.clone()).await.is_err());
        assert_eq!(entry.movie().base.name, "a");

        let updated = f.store.update(&id, patch).await.unwrap();
        assert_eq!(updated.base.name, "renamed");
        assert_eq!(entry.movie().base.name, "renamed");
        assert_eq!(f.repo.stored(&f.room)[0].base.name, "renamed");

        let missing = MovieId::from("missing");
        assert!(f.store.update(&missing, MoviePatch::default()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let f = fixture();
        let entry = f.store.add_movie(live_movie(&f.room)).await.unwrap();
        let channel = entry.channel().await.unwrap();

        f.store.delete_movie_by_id(&entry.id()).await.unwrap();
        assert!(channel.is_closed());
        assert_eq!(f.store.len().await.unwrap(), 0);
        assert!(f.repo.stored(&f.room).is_empty());

        let err = f.store.delete_movie_by_id(&entry.id()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_many_skips_unknown() {
        let f = fixture();
        let a = f.store.add_movie(movie(&f.room, "u1", "a")).await.unwrap();
        let b = f.store.add_movie(movie(&f.room, "u1", "b")).await.unwrap();
        let c = f.store.add_movie(movie(&f.room, "u1", "c")).await.unwrap();

        let removed = f
            .store
            .delete_movies_by_id(&[a.id(), MovieId::from("nope"), c.id()])
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let page = f.store.get_movies_with_page(1, 10, None).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id(), b.id());
        assert_eq!(f.store.get_movie_by_id(&b.id()).await.unwrap().id(), b.id());
    }

    #[tokio::test]
    async fn test_swap_failure_changes_nothing() {
        let f = fixture();
        let a = f.store.add_movie(movie(&f.room, "u1", "a")).await.unwrap();
        let b = f.store.add_movie(movie(&f.room, "u1", "b")).await.unwrap();
        let (pa, pb) = (a.position(), b.position());

        f.repo.fail_next_write();
        assert!(f.store.swap_movie_positions(&a.id(), &b.id()).await.is_err());
        assert_eq!((a.position(), b.position()), (pa, pb));
        assert_eq!(f.repo.stored(&f.room)[0].id, a.id());

        f.store.swap_movie_positions(&a.id(), &b.id()).await.unwrap();
        assert_eq!((a.position(), b.position()), (pb, pa));
        let stored = f.repo.stored(&f.room);
        assert_eq!(stored[0].id, b.id());
        assert_eq!(stored[0].position, pa);

        let missing = MovieId::from("missing");
        assert!(f.store.swap_movie_positions(&a.id(), &missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_page_with_creator_filter() {
        let f = fixture();
        for i in 0..5 {
            let creator = if i % 2 == 0 { "alice" } else { "bob" };
            f.store.add_movie(movie(&f.room, creator, &format!("m{i}"))).await.unwrap();
        }

        let alice = UserId::from("alice");
        let page = f.store.get_movies_with_page(1, 2, Some(&alice)).await.unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<_> = page.items.iter().map(|e| e.movie().base.name).collect();
        assert_eq!(names, ["m0", "m2"]);

        let page = f.store.get_movies_with_page(2, 2, Some(&alice)).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|e| e.movie().base.name).collect();
        assert_eq!(names, ["m4"]);

        let page = f.store.get_movies_with_page(2, 2, None).await.unwrap();
        assert_eq!(page.total, 5);
        let names: Vec<_> = page.items.iter().map(|e| e.movie().base.name).collect();
        assert_eq!(names, ["m2", "m3"]);

        let page = f.store.get_movies_with_page(9, 2, None).await.unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_clear_and_close() {
        let f = fixture();
        let live = f.store.add_movie(live_movie(&f.room)).await.unwrap();
        let channel = live.channel().await.unwrap();
        f.store.add_movie(movie(&f.room, "u1", "a")).await.unwrap();

        f.store.close().await;
        assert!(channel.is_closed());
        assert_eq!(f.store.len().await.unwrap(), 0);
        assert_eq!(f.repo.stored(&f.room).len(), 2);

        f.store.clear().await.unwrap();
        assert!(f.repo.stored(&f.room).is_empty());
    }

    #[tokio::test]
    async fn test_clear_waits_for_initial_load() {
        let f = fixture();
        f.repo.insert_raw(movie(&f.room, "u1", "persisted"));
        f.repo.delay_loads(Duration::from_millis(50));

        let (_, cleared) = tokio::join!(f.store.len(), f.store.clear());
        cleared.unwrap();

        assert!(f.repo.stored(&f.room).is_empty());
        assert_eq!(f.store.len().await.unwrap(), 0);
        assert_eq!(f.repo.loads(), 1);
    }

    #[tokio::test]
    async fn test_close_waits_for_initial_load() {
        let f = fixture();
        f.repo.insert_raw(movie(&f.room, "u1", "persisted"));
        f.repo.delay_loads(Duration::from_millis(50));

        tokio::join!(async { f.store.len().await.unwrap() }, f.store.close());

        assert_eq!(f.store.len().await.unwrap(), 0);
        assert_eq!(f.repo.stored(&f.room).len(), 1);
    }

    #[tokio::test]
    async fn test_readers_never_see_half_swapped_list() {
        let f = fixture();
        let mut ids = vec![];
        for name in ["a", "b", "c", "d", "e"] {
            ids.push(f.store.add_movie(movie(&f.room, "u1", name)).await.unwrap().id());
        }
        let store = Arc::new(f.store);

        let swapper = {
            let store = store.clone();
            let ids = ids.clone();
            tokio::spawn(async move {
                for round in 0..200 {
                    let (i, j) = (round % ids.len(), (round * 3 + 1) % ids.len());
                    store.swap_movie_positions(&ids[i], &ids[j]).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut readers = vec![];
        for _ in 0..4 {
            let store = store.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let page = store.get_movies_with_page(1, 10, None).await.unwrap();
                    assert_eq!(page.total, 5);
                    let positions: Vec<u64> = page.items.iter().map(|e| e.position()).collect();
                    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
                    let mut seen: Vec<MovieId> = page.items.iter().map(|e| e.id()).collect();
                    seen.sort();
                    seen.dedup();
                    assert_eq!(seen.len(), 5);
                    tokio::task::yield_now().await;
                }
            }));
        }

        swapper.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_get_channel() {
        let f = fixture();
        let live = f.store.add_movie(live_movie(&f.room)).await.unwrap();

        let channel = f.store.get_channel(&live.id()).await.unwrap();
        assert_eq!(channel.name(), live.id().as_str());
        assert_eq!(f.channels.created(), 1);

        assert!(matches!(
            f.store.get_channel(&MovieId::from("")).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(f.store.get_channel(&MovieId::from("nope")).await.unwrap_err().is_not_found());
    }
}
