//! Keyed, time-bounded memoization with single-flight refresh
//!
//! Each key owns a slot that is either empty, holds a value until its
//! deadline, or is being resolved. The first caller that finds a slot empty
//! or expired starts the refresh; every concurrent caller of that key awaits
//! the same in-flight result. Refreshes run on their own task, so a caller
//! that gives up waiting never aborts the refresh others are waiting on.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use synctv_core::cache::RefreshMap;
//!
//! # async fn example() -> synctv_core::Result<()> {
//! let tokens = RefreshMap::new(
//!     |user: String, _: ()| async move { Ok(format!("token-for-{user}")) },
//!     Duration::from_secs(60),
//! );
//! let token = tokens.load_or_store("alice".to_string(), ()).await?;
//! assert_eq!(token, "token-for-alice");
//! # Ok(())
//! # }
//! ```

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Error, Result};

type RefreshFn<K, V, A> = Arc<dyn Fn(K, A) -> BoxFuture<'static, Result<V>> + Send + Sync>;
type Flight<V> = Shared<BoxFuture<'static, Result<V>>>;

enum SlotState<V> {
    Empty,
    Valid { value: V, expires_at: Option<Instant> },
    Resolving(Flight<V>),
}

struct SlotInner<V> {
    state: SlotState<V>,
    /// Bumped whenever a refresh starts; a finishing refresh only
    /// settles the slot if it is still the latest one.
    generation: u64,
}

struct Slot<V> {
    inner: Mutex<SlotInner<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                state: SlotState::Empty,
                generation: 0,
            }),
        }
    }
}

impl<V: Clone> Slot<V> {
    fn settle(&self, generation: u64, result: &Result<V>, ttl: Duration) {
        let mut inner = self.inner.lock();
        if inner.generation != generation || !matches!(inner.state, SlotState::Resolving(_)) {
            return;
        }
        inner.state = match result {
            Ok(value) => SlotState::Valid {
                value: value.clone(),
                // A deadline past the clock's range never expires
                expires_at: if ttl.is_zero() { None } else { Instant::now().checked_add(ttl) },
            },
            Err(_) => SlotState::Empty,
        };
    }
}

/// Multi-key memoizer. `A` carries per-call arguments to the refresh function;
/// only the arguments of the caller that starts a refresh are used.
pub struct RefreshMap<K, V, A = ()> {
    slots: DashMap<K, Arc<Slot<V>>>,
    refresh: RefreshFn<K, V, A>,
    ttl: Duration,
}

impl<K, V, A> RefreshMap<K, V, A>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    /// A `ttl` of zero keeps values until they are invalidated.
    pub fn new<F, Fut>(refresh: F, ttl: Duration) -> Self
    where
        F: Fn(K, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        Self {
            slots: DashMap::new(),
            refresh: Arc::new(move |key, args| refresh(key, args).boxed()),
            ttl,
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn slot(&self, key: &K) -> Arc<Slot<V>> {
        if let Some(slot) = self.slots.get(key) {
            return slot.clone();
        }
        self.slots.entry(key.clone()).or_default().clone()
    }

    /// Return the live value for `key`, refreshing it first if needed.
    pub async fn load_or_store(&self, key: K, args: A) -> Result<V> {
        let flight = {
            let slot = self.slot(&key);
            let mut inner = slot.inner.lock();
            match &inner.state {
                SlotState::Valid { value, expires_at }
                    if expires_at.is_none_or(|deadline| Instant::now() < deadline) =>
                {
                    return Ok(value.clone());
                }
                SlotState::Resolving(flight) => flight.clone(),
                _ => {
                    inner.generation += 1;
                    let flight = self.start_refresh(slot.clone(), inner.generation, key, args);
                    inner.state = SlotState::Resolving(flight.clone());
                    flight
                }
            }
        };
        flight.await
    }

    /// Like [`Self::load_or_store`], but stop waiting when `token` fires.
    /// A refresh already started keeps running and still stores its result.
    pub async fn load_or_store_cancellable(
        &self,
        key: K,
        args: A,
        token: &CancellationToken,
    ) -> Result<V> {
        let label = format!("{key:?}");
        tokio::select! {
            biased;
            () = token.cancelled() => Err(Error::Cancelled(label)),
            result = self.load_or_store(key, args) => result,
        }
    }

    fn start_refresh(&self, slot: Arc<Slot<V>>, generation: u64, key: K, args: A) -> Flight<V> {
        let refresh = self.refresh.clone();
        let ttl = self.ttl;
        let task_slot = slot.clone();

        let task = tokio::spawn(async move {
            debug!(key = ?key, "refreshing cached value");
            let result = match AssertUnwindSafe(refresh(key.clone(), args)).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(Error::Internal("refresh panicked".to_string())),
            };
            if let Err(e) = &result {
                debug!(key = ?key, error = %e, "refresh failed");
            }
            task_slot.settle(generation, &result, ttl);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(join_err) => {
                    let result = Err(Error::from(join_err));
                    slot.settle(generation, &result, ttl);
                    result
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Force the next load of `key` to refresh. An in-flight refresh is
    /// detached: its current waiters still get its result, but it no longer
    /// settles the slot.
    pub fn invalidate(&self, key: &K) {
        if let Some(slot) = self.slots.get(key) {
            let mut inner = slot.inner.lock();
            match inner.state {
                SlotState::Valid { .. } => inner.state = SlotState::Empty,
                SlotState::Resolving(_) => {
                    inner.generation += 1;
                    inner.state = SlotState::Empty;
                }
                SlotState::Empty => {}
            }
        }
    }

    /// Invalidate then load.
    pub async fn refresh(&self, key: K, args: A) -> Result<V> {
        self.invalidate(&key);
        self.load_or_store(key, args).await
    }

    /// The live value for `key`, without refreshing.
    pub fn get_cached(&self, key: &K) -> Option<V> {
        let slot = self.slots.get(key)?;
        let inner = slot.inner.lock();
        match &inner.state {
            SlotState::Valid { value, expires_at }
                if expires_at.is_none_or(|deadline| Instant::now() < deadline) =>
            {
                Some(value.clone())
            }
            _ => None,
        }
    }

    /// Drop the slot of `key`. Returns whether it existed.
    pub fn remove(&self, key: &K) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Drop every slot.
    pub fn clear(&self) {
        self.slots.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Single-value memoizer: a [`RefreshMap`] over the unit key.
pub struct RefreshCache<V, A = ()> {
    map: RefreshMap<(), V, A>,
}

impl<V, A> RefreshCache<V, A>
where
    V: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    pub fn new<F, Fut>(refresh: F, ttl: Duration) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        Self {
            map: RefreshMap::new(move |(), args| refresh(args), ttl),
        }
    }

    pub async fn load_or_store(&self, args: A) -> Result<V> {
        self.map.load_or_store((), args).await
    }

    pub async fn load_or_store_cancellable(&self, args: A, token: &CancellationToken) -> Result<V> {
        self.map.load_or_store_cancellable((), args, token).await
    }

    pub fn invalidate(&self) {
        self.map.invalidate(&());
    }

    pub async fn refresh(&self, args: A) -> Result<V> {
        self.map.refresh((), args).await
    }

    pub fn get_cached(&self) -> Option<V> {
        self.map.get_cached(&())
    }
}
