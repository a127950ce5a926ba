//! Service initialization and dependency injection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::{
    repository::{MovieRepository, PgMovieRepository, PgVendorRepository, VendorRepository},
    room::{ChannelProvider, InMemoryChannelProvider, PlaylistContext, RoomPlaylists},
    vendor::{VendorMediaResolver, VendorRegistry},
    Config,
};

/// Container for the initialized core services
#[derive(Clone)]
pub struct Services {
    /// Playlists of every loaded room
    pub playlists: Arc<RoomPlaylists>,
    /// Playback resolution for playlist movies
    pub resolver: VendorMediaResolver,
}

impl Services {
    /// Wire services over explicit stores and vendor clients
    #[must_use]
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        vendor_store: Arc<dyn VendorRepository>,
        channels: Arc<dyn ChannelProvider>,
        vendors: VendorRegistry,
        config: &Config,
    ) -> Self {
        let playlists = Arc::new(RoomPlaylists::new(PlaylistContext::new(movies, channels)));
        let resolver = VendorMediaResolver::new(vendors, vendor_store, config.media.clone());
        Self { playlists, resolver }
    }
}

/// Initialize services backed by PostgreSQL, local channels, and the HTTP vendor clients
pub fn init_services(pool: PgPool, config: &Config) -> Services {
    info!("Initializing services...");
    let services = Services::new(
        Arc::new(PgMovieRepository::new(pool.clone())),
        Arc::new(PgVendorRepository::new(pool)),
        Arc::new(InMemoryChannelProvider::new()),
        VendorRegistry::default(),
        config,
    );
    info!(
        alist_ttl_secs = config.media.alist_movie_ttl_secs,
        bilibili_ttl_secs = config.media.bilibili_movie_ttl_secs,
        "Services initialized"
    );
    services
}
