use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_channel::unbounded;
use fluvio_future::task::spawn;
use tracing::{debug, instrument, trace};

use crate::client::Client;
use crate::consumer::contains;
use crate::error::{KcliError, Result};
use crate::partition::{Partition, SearchResult};

/// Shared stop flag for a group of search tasks.
///
/// Tasks poll it between records, so a read already in flight may still
/// complete after [`CancelToken::cancel`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Client {
    /// Offset of the first record at or after the cursor whose decoded
    /// payload contains `term`.
    ///
    /// `progress` receives `(attempts, budget)` after every read.
    #[instrument(
        skip(self, partition, progress),
        fields(topic = %partition.topic, partition = partition.partition, offset = partition.offset)
    )]
    pub async fn search(
        &self,
        partition: &Partition,
        term: &str,
        progress: impl FnMut(i64, i64) + Send,
    ) -> Result<Option<i64>> {
        self.search_until(partition, term, &CancelToken::new(), progress)
            .await
    }

    async fn search_until(
        &self,
        partition: &Partition,
        term: &str,
        cancel: &CancelToken,
        mut progress: impl FnMut(i64, i64) + Send,
    ) -> Result<Option<i64>> {
        let mut scan = self.scan(partition);
        while !cancel.is_cancelled() {
            let Some(record) = scan.next().await? else {
                break;
            };
            progress(scan.attempts(), scan.budget());

            let value = self.decode(
                &partition.topic,
                partition.partition,
                record.offset,
                &record.value,
            )?;
            if contains(&value, term.as_bytes()) {
                debug!(offset = record.offset, "match");
                return Ok(Some(record.offset));
            }
        }
        Ok(None)
    }

    /// Searches every partition concurrently.
    ///
    /// Returns the matching partitions positioned at their match, sorted by
    /// partition id. With `first_result_only` the remaining tasks are
    /// cancelled as soon as one partition matches. The first failing task
    /// cancels the rest and its error is returned. `progress` receives
    /// `(completed, total)` task counts.
    #[instrument(skip(self, partitions, progress), fields(partitions = partitions.len()))]
    pub async fn search_topic(
        &self,
        partitions: &[Partition],
        term: &str,
        first_result_only: bool,
        mut progress: impl FnMut(usize, usize) + Send,
    ) -> Result<Vec<Partition>> {
        let total = partitions.len();
        if total == 0 {
            return Ok(vec![]);
        }

        let cancel = CancelToken::new();
        let (tx, rx) = unbounded();
        for partition in partitions {
            let client = self.clone();
            let partition = partition.clone();
            let term = term.to_owned();
            let cancel = cancel.clone();
            let tx = tx.clone();
            spawn(async move {
                let found = client
                    .search_until(&partition, &term, &cancel, |_, _| {})
                    .await;
                let result = found.map(|offset| SearchResult { partition, offset });
                // receiver is gone once the caller has what it needs
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        let wanted = if first_result_only { 1 } else { total };
        let mut results = Vec::new();
        for completed in 1..=total {
            let result = match rx.recv().await {
                Ok(Ok(result)) => result,
                Ok(Err(err)) => {
                    cancel.cancel();
                    return Err(err);
                }
                Err(_) => {
                    cancel.cancel();
                    return Err(KcliError::SearchAborted);
                }
            };
            progress(completed, total);
            trace!(partition = result.partition.partition, found = result.is_found(), "task done");

            if let Some(partition) = result.into_positioned() {
                results.push(partition);
            }
            if results.len() == wanted {
                break;
            }
        }
        cancel.cancel();

        results.sort_by_key(|partition| partition.partition);
        Ok(results)
    }
}
