//! Download worker driven directly against fake media backends

mod common;

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use tubefetch::media::{MediaError, OutputKind};
use tubefetch::observability::Metrics;
use tubefetch::progress::{Progress, ProgressFeed, ProgressRegistry};
use tubefetch::storage::ArtifactStore;
use tubefetch::worker::{DownloadError, DownloadJob, DownloadWorker};

use common::{FakeFetcher, FakeResolver, FakeTranscoder, PAYLOAD, VIDEO_ID};

struct Harness {
    worker: DownloadWorker,
    registry: Arc<ProgressRegistry>,
    metrics: Arc<Metrics>,
    temp_dir: TempDir,
}

async fn harness(fetcher: FakeFetcher, transcoder_available: bool) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(
        temp_dir.path().join("downloads"),
        temp_dir.path().join("static/thumbnails"),
    );
    store.prepare().await.unwrap();

    let registry = Arc::new(ProgressRegistry::new());
    let metrics = Arc::new(Metrics::new());
    let worker = DownloadWorker::builder()
        .resolver(Arc::new(FakeResolver::new()))
        .fetcher(Arc::new(fetcher))
        .transcoder(Arc::new(FakeTranscoder { available: transcoder_available }))
        .registry(registry.clone())
        .store(store)
        .metrics(metrics.clone())
        .build();

    Harness { worker, registry, metrics, temp_dir }
}

fn job(kind: OutputKind) -> DownloadJob {
    DownloadJob {
        url: "https://www.youtube.com/watch?v=abc123".to_string(),
        job_id: VIDEO_ID.to_string(),
        kind,
    }
}

#[tokio::test]
async fn test_mp4_job_completes() {
    let h = harness(FakeFetcher::default(), false).await;

    let artifact = h.worker.run(job(OutputKind::Mp4)).await.unwrap();

    assert_eq!(artifact.path, h.temp_dir.path().join("downloads/abc123.mp4"));
    assert_eq!(artifact.size, PAYLOAD.len() as u64);
    assert_eq!(artifact.title.as_deref(), Some("Test Video: Part 1"));
    assert_eq!(h.registry.get(VIDEO_ID), Progress::Completed);

    let metrics = h.metrics.snapshot();
    assert_eq!(metrics.downloads_started, 1);
    assert_eq!(metrics.downloads_completed, 1);
}

#[tokio::test]
async fn test_mp3_job_removes_intermediate() {
    let h = harness(FakeFetcher::default(), true).await;

    let artifact = h.worker.spawn(job(OutputKind::Mp3)).await.unwrap().unwrap();

    assert_eq!(artifact.kind, OutputKind::Mp3);
    assert!(artifact.path.exists());
    assert!(!h.temp_dir.path().join("downloads/abc123.source.webm").exists());
}

#[tokio::test]
async fn test_mp3_without_transcoder_touches_nothing() {
    let h = harness(FakeFetcher::default(), false).await;

    let err = h.worker.run(job(OutputKind::Mp3)).await.unwrap_err();

    assert!(matches!(err, DownloadError::DependencyUnavailable));
    assert!(h.registry.is_empty());
    assert_eq!(h.metrics.snapshot().downloads_started, 0);
}

#[tokio::test]
async fn test_invalid_job_rejected() {
    let h = harness(FakeFetcher::default(), true).await;

    let mut bad = job(OutputKind::Mp4);
    bad.job_id = "../escape".to_string();
    assert!(matches!(h.worker.run(bad).await, Err(DownloadError::InvalidInput(_))));

    let mut bad = job(OutputKind::Mp4);
    bad.url = "  ".to_string();
    assert!(matches!(h.worker.run(bad).await, Err(DownloadError::InvalidInput(_))));
}

#[tokio::test]
async fn test_fetch_failure_sets_sentinel_and_cleans_up() {
    fn login_required() -> MediaError {
        MediaError::LoginRequired
    }
    let fetcher = FakeFetcher {
        fail_with: Some(login_required),
        ..FakeFetcher::default()
    };
    let h = harness(fetcher, true).await;

    let err = h.worker.run(job(OutputKind::Mp4)).await.unwrap_err();

    assert!(matches!(err, DownloadError::Media(MediaError::LoginRequired)));
    assert_eq!(h.registry.get(VIDEO_ID), Progress::Failed);
    assert!(!h.temp_dir.path().join("downloads/abc123.mp4").exists());
    assert_eq!(h.metrics.snapshot().downloads_failed, 1);
}

#[tokio::test]
async fn test_feed_sees_three_events() {
    let fetcher = FakeFetcher {
        steps: vec![(75, Some(200))],
        step_delay: Duration::from_millis(50),
        fail_with: None,
    };
    let h = harness(fetcher, true).await;
    let mut feed = ProgressFeed::new(h.registry.clone(), VIDEO_ID, Duration::from_millis(10));

    let first = feed.next_event().await.unwrap();
    let handle = h.worker.spawn(job(OutputKind::Mp4));

    let mut events = vec![first];
    while let Some(event) = feed.next_event().await {
        events.push(event);
    }
    handle.await.unwrap().unwrap();

    let values: Vec<f64> = events.iter().map(|e| e.progress.value()).collect();
    assert_eq!(values, vec![0.0, 37.5, 100.0]);
    assert!(events[2].completed);
}

#[tokio::test]
async fn test_progress_without_total_stays_zero() {
    let fetcher = FakeFetcher {
        steps: vec![(4096, None), (8192, Some(0))],
        step_delay: Duration::from_millis(20),
        fail_with: None,
    };
    let h = harness(fetcher, true).await;
    let mut feed = ProgressFeed::new(h.registry.clone(), VIDEO_ID, Duration::from_millis(10));

    let mut values = vec![feed.next_event().await.unwrap().progress.value()];
    let handle = h.worker.spawn(job(OutputKind::Mp4));
    while let Some(event) = feed.next_event().await {
        values.push(event.progress.value());
    }
    handle.await.unwrap().unwrap();

    assert_eq!(values, vec![0.0, 100.0]);
}

#[tokio::test]
async fn test_rerun_starts_from_zero() {
    let fetcher = FakeFetcher {
        steps: vec![(75, Some(200))],
        step_delay: Duration::from_millis(100),
        fail_with: None,
    };
    let h = harness(fetcher, true).await;
    h.registry.set(VIDEO_ID, Progress::Completed);

    let handle = h.worker.spawn(job(OutputKind::Mp4));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.registry.get(VIDEO_ID), Progress::Percent(37.5));

    handle.await.unwrap().unwrap();
    assert_eq!(h.registry.get(VIDEO_ID), Progress::Completed);
}
