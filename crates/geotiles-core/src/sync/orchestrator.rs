// crates/geotiles-core/src/sync/orchestrator.rs

//! Bounded-concurrency job pool.
//!
//! Every job is spawned up front and waits on a semaphore slot, so at most
//! `concurrency` jobs run at once. The pool drains its `JoinSet` to the end
//! before reporting: a failing (or panicking) job never hides the outcome
//! of its siblings.

use super::retry::{retry, RetryPolicy};
use crate::error::Result;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum JobOutcome {
    Pending,
    Success,
    Failed(String),
}

/// One artifact to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncJob {
    pub source: PathBuf,
    pub key: String,
    pub attempts: u32,
    pub outcome: JobOutcome,
}

impl SyncJob {
    pub fn new(source: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            key: key.into(),
            attempts: 0,
            outcome: JobOutcome::Pending,
        }
    }
}

/// What an attempt gets to work with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTarget {
    pub source: PathBuf,
    pub key: String,
}

/// Aggregate of a fully settled batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub succeeded: usize,
    pub failed: usize,
    pub jobs: Vec<SyncJob>,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = &SyncJob> {
        self.jobs
            .iter()
            .filter(|j| matches!(j.outcome, JobOutcome::Failed(_)))
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SyncOrchestrator {
    concurrency: usize,
    policy: RetryPolicy,
}

impl SyncOrchestrator {
    pub fn new(concurrency: usize, policy: RetryPolicy) -> Self {
        Self {
            concurrency: concurrency.max(1),
            policy,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `op` for every job with retry and returns once all have settled.
    pub async fn run<F, Fut>(&self, mut jobs: Vec<SyncJob>, op: F) -> SyncReport
    where
        F: Fn(JobTarget, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let op = Arc::new(op);
        let slots = Arc::new(Semaphore::new(self.concurrency));
        let mut set: JoinSet<(usize, u32, std::result::Result<(), String>)> = JoinSet::new();

        info!(
            jobs = jobs.len(),
            concurrency = self.concurrency,
            max_attempts = self.policy.max_attempts,
            "starting sync batch"
        );

        for (idx, job) in jobs.iter().enumerate() {
            let target = JobTarget {
                source: job.source.clone(),
                key: job.key.clone(),
            };
            let op = Arc::clone(&op);
            let slots = Arc::clone(&slots);
            let policy = self.policy;

            set.spawn(async move {
                // The semaphore is never closed while the batch runs.
                let _permit = match slots.acquire_owned().await {
                    Ok(p) => p,
                    Err(e) => return (idx, 0, Err(format!("no concurrency slot: {e}"))),
                };
                let label = target.key.clone();
                let attempted = retry(&policy, &label, |attempt| op(target.clone(), attempt)).await;
                (
                    idx,
                    attempted.attempts,
                    attempted.result.map_err(|e| e.to_string()),
                )
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, attempts, result)) => {
                    let job = &mut jobs[idx];
                    job.attempts = attempts;
                    match result {
                        Ok(()) => {
                            debug!(key = %job.key, attempts, "job succeeded");
                            job.outcome = JobOutcome::Success;
                        }
                        Err(msg) => {
                            error!(key = %job.key, attempts, error = %msg, "job failed");
                            job.outcome = JobOutcome::Failed(msg);
                        }
                    }
                }
                // Panicked tasks carry no index; they stay Pending and are
                // swept up below.
                Err(e) => warn!(error = %e, "sync task did not complete"),
            }
        }

        for job in jobs.iter_mut().filter(|j| j.outcome == JobOutcome::Pending) {
            job.outcome = JobOutcome::Failed("task aborted before settling".into());
        }

        let succeeded = jobs
            .iter()
            .filter(|j| j.outcome == JobOutcome::Success)
            .count();
        let failed = jobs.len() - succeeded;
        info!(succeeded, failed, "sync batch settled");

        SyncReport {
            succeeded,
            failed,
            jobs,
        }
    }
}
