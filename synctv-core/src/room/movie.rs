use std::sync::Arc;

use parking_lot::{Mutex as SyncMutex, RwLock};
use tokio::sync::Mutex;
use tracing::warn;

use super::channel::{ChannelProvider, StreamChannel};
use crate::{
    models::{Movie, MovieId, MoviePatch, UserId},
    vendor::MovieMediaCache,
    Error, Result,
};

/// One playlist item: the persisted movie plus its runtime resources
///
/// The streaming channel is created on first [`MovieEntry::channel`] call and
/// released by [`MovieEntry::terminate`]. Resolved vendor media lives in a
/// per-entry cache that is dropped whenever the movie changes.
pub struct MovieEntry {
    movie: RwLock<Movie>,
    channels: Arc<dyn ChannelProvider>,
    channel: Mutex<Option<Arc<dyn StreamChannel>>>,
    media: SyncMutex<Option<Arc<MovieMediaCache>>>,
}

impl std::fmt::Debug for MovieEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieEntry")
            .field("movie", &*self.movie.read())
            .finish_non_exhaustive()
    }
}

impl MovieEntry {
    #[must_use]
    pub fn new(movie: Movie, channels: Arc<dyn ChannelProvider>) -> Self {
        Self {
            movie: RwLock::new(movie),
            channels,
            channel: Mutex::new(None),
            media: SyncMutex::new(None),
        }
    }

    /// Snapshot of the current movie
    #[must_use]
    pub fn movie(&self) -> Movie {
        self.movie.read().clone()
    }

    #[must_use]
    pub fn id(&self) -> MovieId {
        self.movie.read().id.clone()
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.movie.read().position
    }

    pub(crate) fn set_position(&self, position: u64) {
        self.movie.write().position = position;
    }

    #[must_use]
    pub fn is_created_by(&self, user_id: &UserId) -> bool {
        &self.movie.read().creator_id == user_id
    }

    pub fn validate(&self) -> Result<()> {
        self.movie.read().validate()
    }

    /// The movie as it would look after `patch`, validated. Nothing is changed.
    pub fn patched(&self, patch: MoviePatch) -> Result<Movie> {
        let mut movie = self.movie();
        movie.base.apply(patch);
        movie.updated_at = chrono::Utc::now();
        movie.validate()?;
        Ok(movie)
    }

    /// Merge `patch` into the movie and re-validate; on failure nothing changes.
    pub async fn update(&self, patch: MoviePatch) -> Result<()> {
        let movie = self.patched(patch)?;
        self.replace(movie).await;
        Ok(())
    }

    /// Install an already validated movie. The source may have changed, so
    /// resolved media and any open channel are dropped.
    pub(crate) async fn replace(&self, movie: Movie) {
        *self.movie.write() = movie;
        self.close_channel().await;
    }

    /// The movie's streaming channel, created on first use
    pub async fn channel(&self) -> Result<Arc<dyn StreamChannel>> {
        let (eligible, name) = {
            let movie = self.movie.read();
            (movie.needs_channel(), movie.id.to_string())
        };
        if !eligible {
            return Err(Error::InvalidInput(format!("movie {name} has no live channel")));
        }

        let mut channel = self.channel.lock().await;
        if let Some(existing) = channel.as_ref() {
            if !existing.is_closed() {
                return Ok(existing.clone());
            }
        }
        let created = self.channels.get_or_create_channel(&name).await?;
        *channel = Some(created.clone());
        Ok(created)
    }

    /// Release the channel and cached media. Safe to call any number of times.
    pub async fn terminate(&self) -> Result<()> {
        self.reset_media_cache();
        let channel = self.channel.lock().await.take();
        match channel {
            Some(channel) => channel.close().await,
            None => Ok(()),
        }
    }

    async fn close_channel(&self) {
        if let Err(e) = self.terminate().await {
            warn!(movie_id = %self.id(), error = %e, "Failed to close movie channel");
        }
    }

    /// Resolved-media cache of this entry, built by `init` on first use
    pub(crate) fn media_cache_or_init(
        &self,
        init: impl FnOnce(&Movie) -> MovieMediaCache,
    ) -> Arc<MovieMediaCache> {
        let mut media = self.media.lock();
        if let Some(cache) = media.as_ref() {
            return cache.clone();
        }
        let cache = Arc::new(init(&self.movie.read()));
        *media = Some(cache.clone());
        cache
    }

    pub(crate) fn media_cache(&self) -> Option<Arc<MovieMediaCache>> {
        self.media.lock().clone()
    }

    pub(crate) fn reset_media_cache(&self) {
        self.media.lock().take();
    }
}
