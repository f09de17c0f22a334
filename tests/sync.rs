//! Directory sync job tests: batched pre-fetch, new/existing accounting,
//! skip handling and idempotence.

mod common;

use std::sync::Arc;

use proptest::prelude::*;

use contribution_engine::config::{PipelineConfig, StageKind};
use contribution_engine::error::{EngineError, ErrorClass};
use contribution_engine::pipeline::{JobKind, JobStatus};
use contribution_engine::stages::sync::DirectoryCache;

use common::*;

fn sync_config(chunk_size: usize, prefetch_batch_size: usize) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.stage_mut(StageKind::Sync).chunk_size = chunk_size;
    config.prefetch_batch_size = prefetch_batch_size;
    config
}

// =============================================================================
// SECTION 1: Job outcomes
// =============================================================================

#[tokio::test]
async fn test_sync_creates_participants_from_directory() {
    let h = harness().directory(FakeDirectory::with_employees(5)).build().await;

    let job = h.orchestrator.launch_sync(TENANT).await.unwrap();

    assert_eq!(job.job, JobKind::DirectorySync);
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.period.is_none());
    assert_eq!(
        job.summary().message,
        "Successfully synced employees. Processed: 5, New: 5, Existing: 0, Failed: 0"
    );

    let participant = h.participants.get(TENANT, "emp_001").unwrap();
    assert_eq!(participant.date_of_birth, Some(date(1985, 6, 15)));
    assert_eq!(participant.hire_date, Some(date(2019, 2, 1)));
    assert_eq!(participant.annual_compensation, dec("72000.00"));
    assert_eq!(participant.first_name.as_deref(), Some("Ada"));
    // The individual has no last name, so the listing's is used.
    assert_eq!(participant.last_name.as_deref(), Some("EMP_001"));
    assert!(participant.is_active);
}

#[tokio::test]
async fn test_missing_employment_is_skipped_and_counted_failed() {
    let h = harness()
        .directory(FakeDirectory::with_employees(5).without_employment("emp_003"))
        .build()
        .await;

    let job = h.orchestrator.launch_sync(TENANT).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    let summary = job.summary();
    assert_eq!(
        summary.message,
        "Successfully synced employees. Processed: 5, New: 4, Existing: 0, Failed: 1"
    );
    assert_eq!(
        summary.failures,
        vec!["sync item 3: Data not found: no employment data for employee emp_003"]
    );
    assert!(h.participants.get(TENANT, "emp_003").is_none());
    assert_eq!(h.participants.len(), 4);
}

#[tokio::test]
async fn test_malformed_date_is_skipped_as_mapping_error() {
    let h = harness()
        .directory(FakeDirectory::with_employees(3).with_dob("emp_002", "15/06/1985"))
        .build()
        .await;

    let job = h.orchestrator.launch_sync(TENANT).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    let sync = job.stage(StageKind::Sync).unwrap();
    assert_eq!(sync.stats.skip_count, 1);
    assert_eq!(sync.stats.failures[0].class, ErrorClass::Mapping);
    assert!(sync.stats.failures[0].message.contains("invalid dob '15/06/1985'"));
    assert_eq!(h.participants.len(), 2);
}

#[tokio::test]
async fn test_listing_failure_fails_the_job() {
    let h = harness().directory(FakeDirectory::failing_listing()).build().await;

    let job = h.orchestrator.launch_sync(TENANT).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    match &job.failure {
        Some(EngineError::StageFailed { stage, cause }) => {
            assert_eq!(stage, "sync");
            assert_eq!(cause.class(), ErrorClass::ExternalApi);
        }
        other => panic!("Expected StageFailed, got {other:?}"),
    }
    assert!(job.summary().message.starts_with("directory-sync job failed:"));
    assert!(h.participants.is_empty());
}

#[tokio::test]
async fn test_empty_directory_completes_with_zero_counts() {
    let h = harness().build().await;

    let job = h.orchestrator.launch_sync(TENANT).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.summary().message,
        "Successfully synced employees. Processed: 0, New: 0, Existing: 0, Failed: 0"
    );
    assert_eq!(h.directory.individual_call_count(), 0);
}

// =============================================================================
// SECTION 2: New vs existing
// =============================================================================

#[tokio::test]
async fn test_new_plus_existing_equals_items_written() {
    let mut seeded: Vec<_> = (1..=3).map(|n| create_test_participant(&employee_id(n))).collect();
    seeded[0].annual_compensation = dec("1.00");
    let h = harness()
        .participants(seeded)
        .directory(FakeDirectory::with_employees(10))
        .config(sync_config(4, 100))
        .build()
        .await;

    let job = h.orchestrator.launch_sync(TENANT).await.unwrap();

    let sync = job.stage(StageKind::Sync).unwrap();
    assert_eq!(sync.stats.read_count, 10);
    assert_eq!(sync.stats.new_count, 7);
    assert_eq!(sync.stats.existing_count, 3);
    assert_eq!(sync.stats.new_count + sync.stats.existing_count, 10);
    assert_eq!(sync.stats.commit_count, 3);
    // Existing participants are left untouched.
    assert_eq!(
        h.participants.get(TENANT, "emp_001").unwrap().annual_compensation,
        dec("1.00")
    );
    assert_eq!(h.participants.len(), 10);
}

#[tokio::test]
async fn test_second_sync_reports_everything_existing() {
    let h = harness()
        .directory(FakeDirectory::with_employees(6).without_employment("emp_006"))
        .build()
        .await;

    let first = h.orchestrator.launch_sync(TENANT).await.unwrap();
    let after_first = h.participants.all(TENANT);
    let second = h.orchestrator.launch_sync(TENANT).await.unwrap();

    assert_eq!(first.summary().new, 5);
    assert_eq!(
        second.summary().message,
        "Successfully synced employees. Processed: 6, New: 0, Existing: 5, Failed: 1"
    );
    assert_eq!(h.participants.all(TENANT), after_first);
    assert_eq!(h.orchestrator.jobs().len(), 2);
}

#[tokio::test]
async fn test_duplicate_listing_rows_count_as_existing() {
    let h = harness()
        .directory(FakeDirectory::with_employees(3).listed_twice("emp_002"))
        .build()
        .await;

    let job = h.orchestrator.launch_sync(TENANT).await.unwrap();

    let summary = job.summary();
    assert_eq!(summary.read, 4);
    assert_eq!(summary.new, 3);
    assert_eq!(summary.existing, 1);
    // Ids are de-duplicated before the batched lookups.
    assert_eq!(h.directory.requested_ids.lock().len(), 3);
}

// =============================================================================
// SECTION 3: Batched pre-fetch
// =============================================================================

#[tokio::test]
async fn test_prefetch_batches_lookups() {
    let h = harness()
        .directory(FakeDirectory::with_employees(20))
        .config(sync_config(5, 7))
        .build()
        .await;

    let job = h.orchestrator.launch_sync(TENANT).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(h.directory.list_call_count(), 1);
    assert_eq!(h.directory.individual_call_count(), 3);
    assert_eq!(h.directory.employment_call_count(), 3);
    assert_eq!(h.participants.len(), 20);
}

#[tokio::test]
async fn test_cache_flush_drops_details() {
    let directory = Arc::new(FakeDirectory::with_employees(4));
    let cache = DirectoryCache::new(directory.clone(), TENANT, 3);

    cache.prefetch().await.unwrap();
    cache.prefetch().await.unwrap();
    assert_eq!(cache.cached_counts(), (4, 4));
    assert_eq!(directory.individual_call_count(), 2);

    cache.flush();
    assert_eq!(cache.cached_counts(), (0, 0));
    assert!(cache.individual("emp_001").is_none());
}

fn expected_calls(ids: usize, batch: usize) -> usize {
    ids.div_ceil(batch)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_prefetch_issues_one_call_per_batch(ids in 0usize..120, batch in 1usize..25) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let directory = Arc::new(FakeDirectory::with_employees(ids));
        let cache = DirectoryCache::new(directory.clone(), TENANT, batch);

        runtime.block_on(async {
            cache.prefetch().await.unwrap();
            cache.prefetch().await.unwrap();
        });

        prop_assert_eq!(directory.individual_call_count(), expected_calls(ids, batch));
        prop_assert_eq!(directory.employment_call_count(), expected_calls(ids, batch));
        prop_assert_eq!(directory.list_call_count(), 1);
        prop_assert_eq!(cache.cached_counts(), (ids, ids));
    }
}
