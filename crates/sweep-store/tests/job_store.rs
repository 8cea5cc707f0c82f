use sweep_store::JobStore;
use sweep_testing::{fixture_store, sample_parameters};
use sweep_types::{DispatchError, JobStatus};

#[tokio::test]
async fn claim_next_returns_jobs_in_id_order_and_none_when_empty() {
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();

    let first = fx.store.claim_next("alice@host(gpu)").await.unwrap().unwrap();
    assert_eq!(first.id, 0);
    assert_eq!(first.status, JobStatus::Served);
    assert_eq!(first.requested_by, "alice@host(gpu)");
    assert_eq!(first.history.len(), 1);

    let second = fx.store.claim_next("bob@host(gpu)").await.unwrap().unwrap();
    assert_eq!(second.id, 1);

    // Exhaust the remaining two, then confirm the queue is empty.
    fx.store.claim_next("c@host(gpu)").await.unwrap().unwrap();
    fx.store.claim_next("d@host(gpu)").await.unwrap().unwrap();
    assert!(fx.store.claim_next("e@host(gpu)").await.unwrap().is_none());
}

/// Spec.md §8's testable property: for N concurrent `claim_next` calls
/// against K pending jobs, exactly `min(N, K)` succeed with pairwise
/// distinct ids. `writer_lock` (sqlite_store.rs) is the one mechanism
/// enforcing this, so the test needs genuine concurrency, not just
/// interleaved cooperative polling on one thread.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn claim_next_is_atomic_under_concurrent_callers() {
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();
    let store = fx.arc_store();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.claim_next(&format!("worker-{i}@host(gpu)")).await.unwrap() })
        })
        .collect();

    let mut claimed_ids = Vec::new();
    let mut misses = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Some(job) => claimed_ids.push(job.id),
            None => misses += 1,
        }
    }

    claimed_ids.sort();
    assert_eq!(claimed_ids, vec![0, 1, 2, 3], "every pending job claimed exactly once");
    assert_eq!(misses, 2, "callers beyond the pending count see an empty queue");
}

#[tokio::test]
async fn finish_is_at_most_once() {
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();
    let job = fx.store.claim_next("alice@host(gpu)").await.unwrap().unwrap();

    fx.clock.advance(30);
    let done = fx
        .store
        .finish(job.id, JobStatus::Done, "completed successfully")
        .await
        .unwrap();
    assert_eq!(done.status, JobStatus::Done);
    assert_eq!(done.required_time, 30);

    let repeat = fx.store.finish(job.id, JobStatus::Done, "again").await;
    assert!(matches!(repeat, Err(DispatchError::NotClaimable { .. })));
}

#[tokio::test]
async fn ping_requires_served_status() {
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();

    let pending_ping = fx.store.ping(0).await;
    assert!(matches!(pending_ping, Err(DispatchError::NotClaimable { .. })));

    let job = fx.store.claim_next("alice@host(gpu)").await.unwrap().unwrap();
    fx.clock.advance(5);
    fx.store.ping(job.id).await.unwrap();

    let refreshed = fx.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(refreshed.last_ping_timestamp, 1_005);
}

#[tokio::test]
async fn reap_stale_served_waits_for_idle_timeout() {
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();
    let job = fx.store.claim_next("silent@host(gpu)").await.unwrap().unwrap();

    // Not yet idle: nothing to reap.
    fx.clock.advance(30);
    assert_eq!(fx.store.reap_stale_served(60).await.unwrap(), 0);

    // Now past the idle timeout.
    fx.clock.advance(40);
    assert_eq!(fx.store.reap_stale_served(60).await.unwrap(), 1);

    let reset = fx.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(reset.status, JobStatus::Pending);
    assert_eq!(reset.requested_by, "");
    assert_eq!(reset.last_ping_timestamp, 0);
    assert!(reset.history.iter().any(|h| h.reason.contains("Reaper")));
}

#[tokio::test]
async fn reap_aborted_recycles_jobs_older_than_the_abort_age() {
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();
    let job = fx.store.claim_next("flaky@host(gpu)").await.unwrap().unwrap();
    fx.store.finish(job.id, JobStatus::Aborted, "segfault").await.unwrap();

    assert_eq!(fx.store.reap_aborted(1_800).await.unwrap(), 0);

    fx.clock.advance(1_801);
    assert_eq!(fx.store.reap_aborted(1_800).await.unwrap(), 1);

    let reset = fx.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(reset.status, JobStatus::Pending);
}

#[tokio::test]
async fn override_status_to_pending_zeroes_execution_fields() {
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();
    let job = fx.store.claim_next("alice@host(gpu)").await.unwrap().unwrap();
    fx.store.finish(job.id, JobStatus::Done, "ok").await.unwrap();

    let reverted = fx
        .store
        .override_status(job.id, JobStatus::Pending, "rerun with new code")
        .await
        .unwrap();
    assert_eq!(reverted.status, JobStatus::Pending);
    assert_eq!(reverted.completion_timestamp, 0);
    assert_eq!(reverted.requested_by, "");
    assert!(reverted
        .history
        .iter()
        .any(|h| h.reason.contains("rerun with new code")));
}

#[tokio::test]
async fn override_status_rejects_served_source_and_bad_target() {
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();
    let job = fx.store.claim_next("alice@host(gpu)").await.unwrap().unwrap();

    let result = fx
        .store
        .override_status(job.id, JobStatus::Done, "skip ahead")
        .await;
    assert!(matches!(result, Err(DispatchError::NotClaimable { .. })));
}

#[tokio::test]
async fn counts_by_status_and_pagination_reflect_the_queue() {
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();
    fx.store.claim_next("alice@host(gpu)").await.unwrap();

    let counts = fx.store.counts_by_status().await.unwrap();
    assert_eq!(counts.pending, 3);
    assert_eq!(counts.served, 1);

    let page = fx.store.list_paginated(1, 2, None, None).await.unwrap();
    assert_eq!(page.jobs.len(), 2);
    assert_eq!(page.total_count, 4);
    assert_eq!(page.total_pages, 2);

    let filtered = fx
        .store
        .list_paginated(1, 10, Some(JobStatus::Served), None)
        .await
        .unwrap();
    assert_eq!(filtered.total_count, 1);
}

#[tokio::test]
async fn api_stats_accumulate_per_endpoint_and_method() {
    let fx = fixture_store(1_000).await;
    fx.store.record_api_call("/request_job", "POST").await.unwrap();
    fx.store.record_api_call("/request_job", "POST").await.unwrap();
    fx.store.record_api_call("/ping", "POST").await.unwrap();

    let stats = fx.store.api_stats().await.unwrap();
    let request_job = stats
        .iter()
        .find(|s| s.endpoint == "/request_job" && s.method == "POST")
        .unwrap();
    assert_eq!(request_job.request_count, 2);

    let info = fx.store.database_info().await.unwrap();
    assert_eq!(info.api_stats_count, 2);
    assert!(info.indices.iter().any(|i| i == "idx_jobs_status"));
}
