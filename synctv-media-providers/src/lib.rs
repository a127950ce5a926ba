// SyncTV Vendor Clients
//
// Pure HTTP client implementations for the media vendors a room can play from.
// These clients know nothing about rooms, movies or caching; synctv-core wraps
// them behind its own vendor traits and memoizes their results.
//
// Architecture:
// - synctv-media-providers: Pure HTTP clients (Alist, Bilibili) + MPD generation
// - synctv-core/vendor: VendorMediaResolver (auth cache, manifest rewriting, subtitles)

// Shared error types
pub mod error;

// HTTP clients
pub mod alist;
pub mod bilibili;

// Re-export client types for convenience
pub use alist::AlistClient;
pub use bilibili::BilibiliClient;
pub use error::ProviderClientError;
