//! Streaming channel contract
//!
//! Live movies (RTMP sources and proxied live URLs) are played through a
//! channel owned by the streaming transport. The playlist only acquires and
//! releases handles; ingestion and playback happen elsewhere.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{Error, Result};

/// Handle to one live channel
#[async_trait]
pub trait StreamChannel: Send + Sync {
    fn name(&self) -> &str;

    fn is_closed(&self) -> bool;

    /// Stop the channel and drop its viewers. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
impl std::fmt::Debug for dyn StreamChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn StreamChannel")
    }
}

/// Source of channel handles, keyed by channel name
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    async fn get_or_create_channel(&self, name: &str) -> Result<Arc<dyn StreamChannel>>;
}

/// Channel that only tracks its own state
#[derive(Debug)]
pub struct LocalChannel {
    name: String,
    closed: AtomicBool,
}

impl LocalChannel {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl StreamChannel for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// In-process channel provider
///
/// Hands out one [`LocalChannel`] per name until it is closed; the next
/// request after a close creates a fresh channel.
#[derive(Default)]
pub struct InMemoryChannelProvider {
    channels: DashMap<String, Arc<LocalChannel>>,
    created: AtomicUsize,
}

impl InMemoryChannelProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of channels created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Current handle for `name`, if one was ever created
    pub fn channel(&self, name: &str) -> Option<Arc<LocalChannel>> {
        self.channels.get(name).map(|c| c.clone())
    }
}

#[async_trait]
impl ChannelProvider for InMemoryChannelProvider {
    async fn get_or_create_channel(&self, name: &str) -> Result<Arc<dyn StreamChannel>> {
        if name.is_empty() {
            return Err(Error::InvalidInput("channel name is empty".to_string()));
        }
        let mut entry = self
            .channels
            .entry(name.to_string())
            .or_insert_with(|| {
                self.created.fetch_add(1, Ordering::SeqCst);
                Arc::new(LocalChannel::new(name))
            });
        if entry.is_closed() {
            self.created.fetch_add(1, Ordering::SeqCst);
            *entry = Arc::new(LocalChannel::new(name));
        }
        let channel: Arc<dyn StreamChannel> = entry.clone();
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_name_same_channel() {
        let provider = InMemoryChannelProvider::new();
        let a = provider.get_or_create_channel("m1").await.unwrap();
        let b = provider.get_or_create_channel("m1").await.unwrap();
        assert_eq!(a.name(), "m1");
        assert_eq!(b.name(), "m1");
        assert_eq!(provider.created(), 1);
    }

    #[tokio::test]
    async fn test_closed_channel_is_replaced() {
        let provider = InMemoryChannelProvider::new();
        let a = provider.get_or_create_channel("m1").await.unwrap();
        a.close().await.unwrap();
        a.close().await.unwrap();

        let b = provider.get_or_create_channel("m1").await.unwrap();
        assert!(!b.is_closed());
        assert_eq!(provider.created(), 2);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let provider = InMemoryChannelProvider::new();
        assert!(provider.get_or_create_channel("").await.is_err());
    }
}
