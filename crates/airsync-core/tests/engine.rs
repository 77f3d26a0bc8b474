//! End-to-end engine tests against the in-memory mock store.
//!
//! These exercise the full pipeline the way a UI would drive it: a windowed
//! multi-page history fetch, and a registered background sync delivering
//! alerts, without any network.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;

use airsync_core::mock::MockStore;
use airsync_core::sink::{AlertSink, SinkError, StatusSink};
use airsync_core::{Config, SeriesFetcher, SyncScheduler, Thresholds};
use airsync_types::{Alert, Metric, RawReading, Reading, Window, timecodec};

/// Build `count` rows at one-minute intervals from `start`.
fn rows_from(start: OffsetDateTime, count: usize) -> Vec<RawReading> {
    (0..count)
        .map(|i| {
            let at = start + Duration::from_secs(60 * i as u64);
            RawReading {
                id: format!("{i}"),
                pm25: 10.0 + (i % 7) as f64,
                pm10: 20.0 + (i % 11) as f64,
                measure_time: timecodec::format_wire(at),
                ..RawReading::default()
            }
        })
        .collect()
}

/// Queue `rows` onto the mock the way the remote store would serve them: a
/// results page starts at the cursor inclusively, so every page after the
/// first repeats the previous page's last row.
fn serve_paged(store: &MockStore, rows: &[RawReading], page_limit: usize) {
    let mut start = 0;
    loop {
        let page: Vec<RawReading> = rows[start..].iter().take(page_limit).cloned().collect();
        let len = page.len();
        store.push_page(page);
        if len < page_limit {
            break;
        }
        // The next request's inclusive lower bound lands on this page's
        // last row, so it is served again.
        start += page_limit - 1;
    }
}

#[tokio::test]
async fn test_windowed_fetch_spans_multiple_pages_without_loss() {
    let config = Config::default();
    let start = datetime!(2024-03-01 00:00:00 UTC);
    let rows = rows_from(start, 2340);

    let store = Arc::new(MockStore::new());
    serve_paged(&store, &rows, config.page_limit);

    let fetcher = SeriesFetcher::new(Arc::clone(&store), &config);
    let window = Window::new(start, start + Duration::from_secs(60 * 2400)).unwrap();
    let series = fetcher.fetch_range(window).await.unwrap();

    // 2340 rows at limit 1000 means three requests: 1000, 1000, 342 (the
    // second and third pages each repeat one boundary row).
    assert_eq!(store.range_calls(), 3);
    assert_eq!(series.len(), 2340);
    assert_eq!(series.skipped(), 0);

    // Strictly ascending, no duplicates, endpoints intact.
    let readings = series.into_readings();
    assert!(readings.windows(2).all(|w| w[0].measured_at < w[1].measured_at));
    assert_eq!(readings[0].measured_at, start);
    assert_eq!(
        readings[2339].measured_at,
        start + Duration::from_secs(60 * 2339)
    );
}

#[tokio::test]
async fn test_cursor_advances_from_last_row_of_each_page() {
    let config = Config::default();
    let start = datetime!(2024-06-15 08:00:00 UTC);
    let rows = rows_from(start, 1500);

    let store = Arc::new(MockStore::new());
    serve_paged(&store, &rows, config.page_limit);

    let fetcher = SeriesFetcher::new(Arc::clone(&store), &config);
    let window = Window::new(start, start + Duration::from_secs(60 * 1600)).unwrap();
    fetcher.fetch_range(window).await.unwrap();

    let cursors = store.range_cursors();
    assert_eq!(cursors.len(), 2);
    assert_eq!(cursors[0], start);
    // Second request resumes at the first page's last timestamp.
    assert_eq!(cursors[1], start + Duration::from_secs(60 * 999));
}

#[derive(Default)]
struct CollectingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

#[async_trait]
impl AlertSink for CollectingAlertSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), SinkError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

#[derive(Default)]
struct CollectingStatusSink {
    readings: Mutex<Vec<Reading>>,
}

#[async_trait]
impl StatusSink for CollectingStatusSink {
    async fn display(&self, reading: &Reading) {
        self.readings.lock().unwrap().push(reading.clone());
    }
}

#[tokio::test(start_paused = true)]
async fn test_background_sync_delivers_status_and_alerts() {
    let store = Arc::new(MockStore::new());
    store.set_latest(RawReading {
        id: "9001".to_string(),
        pm25: 42.5,
        pm10: 18.0,
        measure_time: "2024-03-01T10:00:00".to_string(),
        ..RawReading::default()
    });

    let alerts = Arc::new(CollectingAlertSink::default());
    let status = Arc::new(CollectingStatusSink::default());
    let scheduler = SyncScheduler::new(
        Arc::clone(&store),
        Thresholds::default(),
        Arc::clone(&alerts) as Arc<dyn AlertSink>,
        Arc::clone(&status) as Arc<dyn StatusSink>,
    );

    scheduler.schedule("sensor-sync", Duration::from_secs(300));
    tokio::time::sleep(Duration::from_secs(1)).await;

    // The latest reading reached the status sink.
    {
        let displayed = status.readings.lock().unwrap();
        assert_eq!(displayed.len(), 1);
        assert_eq!(displayed[0].pm25, 42.5);
        assert_eq!(
            displayed[0].measured_at,
            datetime!(2024-03-01 10:00:00 UTC)
        );
    }

    // Only the breached metric alerted.
    {
        let delivered = alerts.alerts.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].metric, Metric::Pm25);
    }

    // A later clean reading produces status but no alert.
    store.set_latest(RawReading {
        id: "9002".to_string(),
        pm25: 8.0,
        pm10: 12.0,
        measure_time: "2024-03-01T10:05:00".to_string(),
        ..RawReading::default()
    });
    tokio::time::sleep(Duration::from_secs(301)).await;

    assert_eq!(status.readings.lock().unwrap().len(), 2);
    assert_eq!(alerts.alerts.lock().unwrap().len(), 1);

    scheduler.shutdown();
    assert_eq!(scheduler.active_count(), 0);
}
