//! Mock store implementation for testing.
//!
//! This module provides an in-memory [`ReadingStore`] so the pagination
//! engine and scheduler can be exercised without a network.
//!
//! # Features
//!
//! - **Queued pages**: push range pages in the order they should be served
//! - **Failure injection**: queue errors for either query kind
//! - **Call counters**: assert how many requests each path issued
//! - **Cursor log**: assert cursor advancement across a window fetch

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;

use airsync_types::RawReading;

use crate::client::ReadingStore;
use crate::error::{Error, Result};

/// An in-memory mock of the remote store.
///
/// Range queries serve queued pages front to back; an exhausted queue serves
/// an empty page, which terminates pagination. Latest queries serve the set
/// latest row, `None` by default.
///
/// # Example
///
/// ```
/// use airsync_core::mock::MockStore;
/// use airsync_core::client::ReadingStore;
/// use airsync_types::RawReading;
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MockStore::new();
/// store.set_latest(RawReading {
///     pm25: 36.5,
///     measure_time: "2024-03-01T10:00:00".to_string(),
///     ..RawReading::default()
/// });
///
/// let row = store.query_latest().await.unwrap().unwrap();
/// assert_eq!(row.pm25, 36.5);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockStore {
    range_queue: Mutex<VecDeque<std::result::Result<Vec<RawReading>, Error>>>,
    latest_errors: Mutex<VecDeque<Error>>,
    latest_row: Mutex<Option<RawReading>>,
    range_cursors: Mutex<Vec<OffsetDateTime>>,
    range_calls: AtomicUsize,
    latest_calls: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page to serve from the next range query.
    pub fn push_page(&self, rows: Vec<RawReading>) {
        self.lock_range_queue().push_back(Ok(rows));
    }

    /// Queue an error to serve from the next range query.
    pub fn push_range_error(&self, error: Error) {
        self.lock_range_queue().push_back(Err(error));
    }

    /// Set the row served by latest queries.
    pub fn set_latest(&self, row: RawReading) {
        *self.latest_row.lock().expect("mock lock poisoned") = Some(row);
    }

    /// Clear the latest row (latest queries serve `None`).
    pub fn clear_latest(&self) {
        *self.latest_row.lock().expect("mock lock poisoned") = None;
    }

    /// Queue an error to serve from the next latest query, before any set
    /// row.
    pub fn push_latest_error(&self, error: Error) {
        self.latest_errors
            .lock()
            .expect("mock lock poisoned")
            .push_back(error);
    }

    /// How many range queries were issued.
    pub fn range_calls(&self) -> usize {
        self.range_calls.load(Ordering::SeqCst)
    }

    /// How many latest queries were issued.
    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    /// Lower-bound cursors of every range query, in request order.
    pub fn range_cursors(&self) -> Vec<OffsetDateTime> {
        self.range_cursors
            .lock()
            .expect("mock lock poisoned")
            .clone()
    }

    fn lock_range_queue(
        &self,
    ) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<Vec<RawReading>, Error>>> {
        self.range_queue.lock().expect("mock lock poisoned")
    }
}

#[async_trait]
impl ReadingStore for MockStore {
    async fn query_range(
        &self,
        start: OffsetDateTime,
        _end: OffsetDateTime,
        _limit: usize,
    ) -> Result<Vec<RawReading>> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        self.range_cursors
            .lock()
            .expect("mock lock poisoned")
            .push(start);

        match self.lock_range_queue().pop_front() {
            Some(result) => result,
            None => Ok(Vec::new()),
        }
    }

    async fn query_latest(&self) -> Result<Option<RawReading>> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self
            .latest_errors
            .lock()
            .expect("mock lock poisoned")
            .pop_front()
        {
            return Err(error);
        }

        Ok(self.latest_row.lock().expect("mock lock poisoned").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(time: &str) -> RawReading {
        RawReading {
            measure_time: time.to_string(),
            ..RawReading::default()
        }
    }

    #[tokio::test]
    async fn test_pages_serve_in_order() {
        let store = MockStore::new();
        store.push_page(vec![row("2024-03-01T10:00:00")]);
        store.push_page(vec![row("2024-03-01T10:05:00"), row("2024-03-01T10:10:00")]);

        let now = OffsetDateTime::now_utc();
        let first = store.query_range(now, now, 10).await.unwrap();
        assert_eq!(first.len(), 1);
        let second = store.query_range(now, now, 10).await.unwrap();
        assert_eq!(second.len(), 2);

        // Exhausted queue serves the empty page.
        let third = store.query_range(now, now, 10).await.unwrap();
        assert!(third.is_empty());
        assert_eq!(store.range_calls(), 3);
    }

    #[tokio::test]
    async fn test_latest_error_takes_precedence() {
        let store = MockStore::new();
        store.set_latest(row("2024-03-01T10:00:00"));
        store.push_latest_error(Error::Auth { status: 401 });

        assert!(matches!(
            store.query_latest().await,
            Err(Error::Auth { status: 401 })
        ));
        // Queue drained; the set row is served again.
        assert!(store.query_latest().await.unwrap().is_some());
    }
}
