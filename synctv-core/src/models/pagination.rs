//! Pagination window over an in-memory ordered list

use serde::{Deserialize, Serialize};

/// Compute the `[start, end)` slice of a list of `total` items for a
/// 1-indexed `page` of `page_size` items.
///
/// Non-positive `page` or `page_size` yields the empty window `(0, 0)`.
/// A page past the end yields `(total, total)`.
///
/// ```
/// use synctv_core::models::page_window;
///
/// assert_eq!(page_window(25, 1, 10), (0, 10));
/// assert_eq!(page_window(25, 3, 10), (20, 25));
/// assert_eq!(page_window(25, 4, 10), (25, 25));
/// assert_eq!(page_window(25, 0, 10), (0, 0));
/// ```
#[must_use]
pub fn page_window(total: usize, page: i64, page_size: i64) -> (usize, usize) {
    if page <= 0 || page_size <= 0 {
        return (0, 0);
    }
    let page_size = usize::try_from(page_size).unwrap_or(usize::MAX);
    let skip = usize::try_from(page - 1)
        .unwrap_or(usize::MAX)
        .saturating_mul(page_size);
    let start = skip.min(total);
    let end = start.saturating_add(page_size).min(total);
    (start, end)
}

/// One page of results plus the total count the page was cut from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, total: usize) -> Self {
        Self { items, total }
    }
}
