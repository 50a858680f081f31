// crates/geotiles-core/tests/sync.rs

use geotiles_core::sync::{JobOutcome, RetryPolicy, SyncJob, SyncOrchestrator};
use geotiles_core::GeoTilesError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn quick(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        attempt_timeout: None,
    }
}

fn jobs(n: usize) -> Vec<SyncJob> {
    (0..n)
        .map(|i| SyncJob::new(format!("out/{i}.svg"), format!("svg/{i}.svg")))
        .collect()
}

#[tokio::test]
async fn never_exceeds_the_concurrency_ceiling() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let orchestrator = SyncOrchestrator::new(3, quick(1));
    let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
    let report = orchestrator
        .run(jobs(20), move |_, _| {
            let (running, peak) = (Arc::clone(&r), Arc::clone(&p));
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), GeoTilesError>(())
            }
        })
        .await;

    assert_eq!(report.succeeded, 20);
    assert_eq!(report.failed, 0);
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {peak}");
    assert!(peak >= 1);
}

#[tokio::test]
async fn exhausted_jobs_report_every_attempt() {
    let report = SyncOrchestrator::new(2, quick(3))
        .run(jobs(2), |_, _| async {
            Err::<(), _>(GeoTilesError::Network("connection reset".into()))
        })
        .await;

    assert_eq!(report.failed, 2);
    for job in &report.jobs {
        assert_eq!(job.attempts, 3);
        assert!(matches!(&job.outcome, JobOutcome::Failed(msg) if msg.contains("connection reset")));
    }
}

#[tokio::test]
async fn permanent_errors_are_not_retried() {
    let report = SyncOrchestrator::new(1, quick(5))
        .run(jobs(1), |_, _| async {
            Err::<(), _>(GeoTilesError::Storage {
                status: 403,
                message: "forbidden".into(),
            })
        })
        .await;
    assert_eq!(report.jobs[0].attempts, 1);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn transient_failures_recover_within_budget() {
    let seen: Arc<Mutex<HashMap<String, u32>>> = Arc::default();
    let s = Arc::clone(&seen);
    let report = SyncOrchestrator::new(4, quick(3))
        .run(jobs(4), move |target, attempt| {
            let seen = Arc::clone(&s);
            async move {
                seen.lock().unwrap().insert(target.key.clone(), attempt);
                if attempt < 2 {
                    Err(GeoTilesError::Storage {
                        status: 503,
                        message: "busy".into(),
                    })
                } else {
                    Ok(())
                }
            }
        })
        .await;

    assert!(report.is_complete_success());
    assert!(report.jobs.iter().all(|j| j.attempts == 2));
    assert_eq!(seen.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn success_on_the_last_attempt_counts_every_attempt() {
    const BUDGET: u32 = 4;
    let report = SyncOrchestrator::new(2, quick(BUDGET))
        .run(jobs(3), |_, attempt| async move {
            if attempt < BUDGET {
                Err(GeoTilesError::Network(format!("attempt {attempt} dropped")))
            } else {
                Ok(())
            }
        })
        .await;

    assert!(report.is_complete_success());
    assert!(report.jobs.iter().all(|j| j.attempts == BUDGET));
}

#[tokio::test]
async fn one_failure_does_not_stop_its_siblings() {
    let report = SyncOrchestrator::new(2, quick(2))
        .run(jobs(6), |target, _| async move {
            if target.key == "svg/3.svg" {
                Err(GeoTilesError::Network("timeout".into()))
            } else {
                Ok(())
            }
        })
        .await;

    assert_eq!(report.succeeded, 5);
    assert_eq!(report.failed, 1);
    let failed: Vec<&str> = report.failures().map(|j| j.key.as_str()).collect();
    assert_eq!(failed, vec!["svg/3.svg"]);
    // Report keeps the input order.
    assert_eq!(report.jobs[0].key, "svg/0.svg");
    assert!(report.jobs.iter().all(|j| j.outcome != JobOutcome::Pending));
}

#[tokio::test]
async fn slow_attempts_time_out_and_retry() {
    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
        attempt_timeout: Some(Duration::from_millis(10)),
    };
    let report = SyncOrchestrator::new(1, policy)
        .run(jobs(1), |_, attempt| async move {
            if attempt == 1 {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok::<(), GeoTilesError>(())
        })
        .await;
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.jobs[0].attempts, 2);
}

#[test]
fn backoff_doubles() {
    let p = RetryPolicy {
        max_attempts: 4,
        base_delay: Duration::from_millis(100),
        attempt_timeout: None,
    };
    assert_eq!(p.delay_for(1), Duration::from_millis(100));
    assert_eq!(p.delay_for(2), Duration::from_millis(200));
    assert_eq!(p.delay_for(3), Duration::from_millis(400));
}
