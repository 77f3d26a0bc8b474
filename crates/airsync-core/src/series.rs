//! Window fetches: pagination engine and the assembled time series.
//!
//! A window fetch repeatedly drives the store client with a cursor derived
//! from the last row of the previous page until a page comes back smaller
//! than the request limit. The assembled [`TimeSeries`] is owned by the one
//! fetch that produced it and replaced wholesale on the next request; the
//! engine holds no window state of its own.
//!
//! # Boundary policy
//!
//! The lower bound is inclusive, so the boundary row of the previous page is
//! re-fetched. Pages are totally ordered by `(Measure_time, ID)` (the store
//! client requests the secondary ID order), and rows at or before the last
//! appended key are dropped on arrival. Together this makes the result
//! duplicate-free even when many readings share one timestamp. A page cap
//! bounds the loop; hitting it aborts with [`Error::Truncated`] rather than
//! silently returning a partial series.
//!
//! # Stale results
//!
//! No in-flight fetch is cancelled when a new one starts, so an older
//! fetch's result can arrive after a newer one. Each fetch claims a
//! generation from the fetcher's counter; the rendering collaborator calls
//! [`SeriesFetcher::is_current`] and discards a series that lost the race.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use airsync_types::{Metric, Reading, Window};

use crate::client::ReadingStore;
use crate::config::Config;
use crate::error::{Error, Result};

/// The ordered result of one window fetch.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    readings: Vec<Reading>,
    window: Window,
    generation: u64,
    skipped: usize,
}

impl TimeSeries {
    /// Readings in ascending `(measured_at, id)` order.
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// The window this series was fetched for.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Which fetch produced this series (see [`SeriesFetcher::is_current`]).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// How many malformed records were dropped during assembly.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// One metric's `(instant, value)` points, in series order.
    ///
    /// Rendering collaborators iterate the [`Metric`] mapping once per chart
    /// instead of duplicating extraction logic.
    pub fn values(&self, metric: Metric) -> impl Iterator<Item = (OffsetDateTime, f64)> + '_ {
        self.readings
            .iter()
            .map(move |r| (r.measured_at, metric.extract(r)))
    }

    /// Consume the series, returning the readings.
    pub fn into_readings(self) -> Vec<Reading> {
        self.readings
    }
}

/// Foreground pagination engine over a [`ReadingStore`].
#[derive(Debug)]
pub struct SeriesFetcher<S> {
    store: Arc<S>,
    page_limit: usize,
    max_pages: usize,
    generation: AtomicU64,
}

impl<S: ReadingStore> SeriesFetcher<S> {
    /// Create a fetcher with the configured page limit and page cap.
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            page_limit: config.page_limit.max(1),
            max_pages: config.max_pages.max(1),
            generation: AtomicU64::new(0),
        }
    }

    /// Fetch every reading in the window, in order, without gaps or
    /// duplicates.
    ///
    /// Fail-fast: any request error aborts the whole fetch and no partial
    /// series is returned. The caller keeps whatever it last displayed.
    pub async fn fetch_range(&self, window: Window) -> Result<TimeSeries> {
        self.fetch_range_with(window, &CancellationToken::new())
            .await
    }

    /// [`fetch_range`](Self::fetch_range) with a cancellation token, checked
    /// between page requests. Cancelling yields [`Error::Cancelled`].
    pub async fn fetch_range_with(
        &self,
        window: Window,
        cancel: &CancellationToken,
    ) -> Result<TimeSeries> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);

        let mut readings: Vec<Reading> = Vec::new();
        let mut skipped = 0usize;
        let mut seen_bad: HashSet<(String, String)> = HashSet::new();
        let mut cursor = window.start;
        let mut pages = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let rows = self
                .store
                .query_range(cursor, window.end, self.page_limit)
                .await?;
            pages += 1;
            let full_page = rows.len() >= self.page_limit;

            let mut page = Vec::with_capacity(rows.len());
            for row in &rows {
                match Reading::try_from(row) {
                    Ok(reading) => page.push(reading),
                    Err(error) => {
                        // The inclusive cursor can re-fetch a malformed row
                        // on the next page; count and log each bad record
                        // once.
                        if seen_bad.insert((row.measure_time.clone(), row.id.clone())) {
                            skipped += 1;
                            warn!(%error, "skipping malformed reading");
                        }
                    }
                }
            }

            // Drop the re-fetched boundary row(s).
            if let Some(boundary) = readings.last().map(|r| (r.measured_at, r.id.clone())) {
                page.retain(|r| (r.measured_at, r.id.as_str()) > (boundary.0, boundary.1.as_str()));
            }
            readings.append(&mut page);

            if !full_page {
                break;
            }
            if pages >= self.max_pages {
                return Err(Error::Truncated {
                    pages,
                    readings: readings.len(),
                });
            }

            // Advance the cursor to the newest parseable timestamp seen.
            // Re-fetched rows are deduplicated above, so an unparseable tail
            // row only costs a refetch, never a gap.
            match readings.last() {
                Some(last) => cursor = last.measured_at,
                None => {
                    // A full page with nothing parseable cannot advance.
                    return Err(Error::Truncated {
                        pages,
                        readings: 0,
                    });
                }
            }
        }

        debug!(
            pages,
            readings = readings.len(),
            skipped,
            %window,
            "window fetch complete"
        );

        Ok(TimeSeries {
            readings,
            window,
            generation,
            skipped,
        })
    }

    /// Fetch the single newest reading, or `None` when the store is empty.
    pub async fn fetch_latest(&self) -> Result<Option<Reading>> {
        match self.store.query_latest().await? {
            Some(row) => Ok(Some(Reading::try_from(&row)?)),
            None => Ok(None),
        }
    }

    /// Whether `series` is the most recently started fetch's result.
    ///
    /// An older fetch that completed after a newer one started must not
    /// overwrite the newer request's display.
    pub fn is_current(&self, series: &TimeSeries) -> bool {
        series.generation + 1 == self.generation.load(Ordering::SeqCst)
    }
}
