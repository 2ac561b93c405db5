//! Batch processing with per-item failure isolation.
//!
//! Every item of a batch runs its own pipeline. A failing item is
//! recorded and the batch moves on, so one malformed message never drops
//! the rest. Once all items have run, the recorded failures decide the
//! outcome:
//!
//! | Failures | Outcome |
//! |----------|---------|
//! | 0 | success |
//! | 1 | that error, unwrapped |
//! | 2+ | [`IngestError::Aggregate`] in input order |
//!
//! Callers route failed batches to retry or dead-letter handling based on
//! this distinction.

use std::future::Future;

use futures::StreamExt;
use tracing::{debug, warn};
use twinbridge_core::FailurePolicy;

use crate::error::{AggregateError, IngestError, ItemFailure, Result};

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Items whose pipeline completed
    pub succeeded: usize,
    /// Failed items, ordered by input position
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Apply the 0 / 1 / many rule.
    ///
    /// Returns the number of successful items when nothing failed.
    pub fn into_result(self) -> Result<usize> {
        let mut failures = self.failures;
        match failures.len() {
            0 => Ok(self.succeeded),
            1 => Err(failures.remove(0).error),
            _ => Err(IngestError::Aggregate(AggregateError::new(failures))),
        }
    }

    /// Finish the batch under a failure policy.
    pub fn finish(self, policy: FailurePolicy) -> Result<usize> {
        match policy {
            FailurePolicy::Aggregate => self.into_result(),
            FailurePolicy::LogAndContinue => {
                for failure in &self.failures {
                    warn!("Dropping failed batch {}", failure);
                }
                Ok(self.succeeded)
            }
        }
    }
}

/// Drives a per-item pipeline over a batch.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    concurrency: usize,
}

impl BatchProcessor {
    /// Sequential processor.
    pub fn new() -> Self {
        Self { concurrency: 1 }
    }

    /// Processor running up to `concurrency` items at once.
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `pipeline` for every item.
    ///
    /// Results are collected in input order even when items complete out
    /// of order.
    pub async fn run<I, T, F, Fut>(&self, items: I, pipeline: F) -> BatchReport
    where
        I: IntoIterator<Item = T>,
        F: Fn(usize, T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let results: Vec<(usize, Result<()>)> = futures::stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| {
                let fut = pipeline(index, item);
                async move { (index, fut.await) }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (index, result) in results {
            match result {
                Ok(()) => report.succeeded += 1,
                Err(error) => {
                    debug!("Batch item {} failed: {}", index, error);
                    report.failures.push(ItemFailure { index, error });
                }
            }
        }
        report
    }
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self::new()
    }
}
