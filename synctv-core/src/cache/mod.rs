//! Time-bounded memoization with single-flight refresh
//!
//! - [`RefreshMap`]: one slot per key (per-user tokens, per-user play URLs)
//! - [`RefreshCache`]: a single slot (one resolved movie, one subtitle track)

mod refresh;

pub use refresh::{RefreshCache, RefreshMap};
