use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_lock::RwLock;
use async_trait::async_trait;
use tracing::{debug, trace};

use fluvio_future::timer::sleep;

use crate::error::{KcliError, Result};
use super::{Broker, PartitionReader, RawRecord};

#[derive(Debug, Default)]
struct MemoryPartition {
    start: i64,
    records: Vec<Vec<u8>>,
    poisoned: bool,
    reads: AtomicUsize,
}

impl MemoryPartition {
    fn end(&self) -> i64 {
        self.start + self.records.len() as i64
    }

    fn get(&self, offset: i64) -> Option<&Vec<u8>> {
        if offset < self.start {
            return None;
        }
        self.records.get((offset - self.start) as usize)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    topics: BTreeMap<String, Vec<MemoryPartition>>,
    read_delay: Duration,
}

impl MemoryState {
    fn partition(&self, topic: &str, partition: i32) -> Result<&MemoryPartition> {
        let partitions = self
            .topics
            .get(topic)
            .ok_or_else(|| KcliError::TopicNotFound(topic.to_owned()))?;
        usize::try_from(partition)
            .ok()
            .and_then(|idx| partitions.get(idx))
            .ok_or_else(|| KcliError::PartitionNotFound(topic.to_owned(), partition))
    }

    fn partition_mut(&mut self, topic: &str, partition: i32) -> Result<&mut MemoryPartition> {
        let partitions = self
            .topics
            .get_mut(topic)
            .ok_or_else(|| KcliError::TopicNotFound(topic.to_owned()))?;
        usize::try_from(partition)
            .ok()
            .and_then(|idx| partitions.get_mut(idx))
            .ok_or_else(|| KcliError::PartitionNotFound(topic.to_owned(), partition))
    }
}

/// A broker that keeps every topic in memory.
///
/// Partition ids are the position of the partition in its topic. Besides
/// serving the demo mode it can simulate slow reads, dead partitions and an
/// unreachable cluster, and it counts reads and open sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    state: Arc<RwLock<MemoryState>>,
    offline: Arc<AtomicBool>,
    sessions: Arc<AtomicUsize>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `topic` with `partitions` empty partitions, replacing any existing one
    pub async fn create_topic(&self, topic: impl Into<String>, partitions: usize) {
        let mut state = self.state.write().await;
        let logs = (0..partitions).map(|_| MemoryPartition::default()).collect();
        state.topics.insert(topic.into(), logs);
    }

    /// Appends a record and returns its offset
    pub async fn produce(
        &self,
        topic: &str,
        partition: i32,
        value: impl Into<Vec<u8>>,
    ) -> Result<i64> {
        let mut state = self.state.write().await;
        let log = state.partition_mut(topic, partition)?;
        log.records.push(value.into());
        Ok(log.end() - 1)
    }

    /// Drops every record older than `start`, the way retention would
    pub async fn truncate(&self, topic: &str, partition: i32, start: i64) -> Result<()> {
        let mut state = self.state.write().await;
        let log = state.partition_mut(topic, partition)?;
        let start = start.clamp(log.start, log.end());
        let drop_count = (start - log.start) as usize;
        log.records.drain(..drop_count);
        log.start = start;
        Ok(())
    }

    /// Makes every read attempt wait `delay` before looking for a record
    pub async fn set_read_delay(&self, delay: Duration) {
        self.state.write().await.read_delay = delay;
    }

    /// Reads from this partition fail from now on
    pub async fn poison(&self, topic: &str, partition: i32) -> Result<()> {
        let mut state = self.state.write().await;
        state.partition_mut(topic, partition)?.poisoned = true;
        Ok(())
    }

    /// Simulates the cluster going away
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of records handed out by readers of this partition
    pub async fn reads(&self, topic: &str, partition: i32) -> usize {
        let state = self.state.read().await;
        state
            .partition(topic, partition)
            .map(|log| log.reads.load(Ordering::SeqCst))
            .unwrap_or_default()
    }

    /// Number of read sessions currently open
    pub fn open_sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(KcliError::Connect("memory broker is offline".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn topics(&self) -> Result<Vec<String>> {
        self.check_online()?;
        let state = self.state.read().await;
        Ok(state.topics.keys().cloned().collect())
    }

    async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        self.check_online()?;
        let state = self.state.read().await;
        let logs = state
            .topics
            .get(topic)
            .ok_or_else(|| KcliError::TopicNotFound(topic.to_owned()))?;
        Ok((0..logs.len() as i32).collect())
    }

    async fn offsets(&self, topic: &str, partition: i32) -> Result<(i64, i64)> {
        self.check_online()?;
        let state = self.state.read().await;
        let log = state.partition(topic, partition)?;
        Ok((log.start, log.end()))
    }

    async fn open_reader(
        &self,
        topic: &str,
        partition: i32,
        offset: i64,
    ) -> Result<Box<dyn PartitionReader>> {
        self.check_online()
            .map_err(|err| KcliError::consume(topic, partition, err))?;
        {
            let state = self.state.read().await;
            state
                .partition(topic, partition)
                .map_err(|err| KcliError::consume(topic, partition, err))?;
        }

        debug!(topic, partition, offset, "opening memory reader");
        Ok(Box::new(MemoryReader {
            broker: self.clone(),
            topic: topic.to_owned(),
            partition,
            next: offset,
            _session: SessionGuard::acquire(self.sessions.clone()),
        }))
    }
}

struct SessionGuard(Arc<AtomicUsize>);

impl SessionGuard {
    fn acquire(sessions: Arc<AtomicUsize>) -> Self {
        sessions.fetch_add(1, Ordering::SeqCst);
        Self(sessions)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct MemoryReader {
    broker: MemoryBroker,
    topic: String,
    partition: i32,
    next: i64,
    _session: SessionGuard,
}

#[async_trait]
impl PartitionReader for MemoryReader {
    async fn next_record(&mut self) -> Result<RawRecord> {
        let delay = self.broker.state.read().await.read_delay;
        if !delay.is_zero() {
            sleep(delay).await;
        }

        self.broker
            .check_online()
            .map_err(|err| KcliError::consume(&self.topic, self.partition, err))?;

        let record = {
            let state = self.broker.state.read().await;
            let log = state
                .partition(&self.topic, self.partition)
                .map_err(|err| KcliError::consume(&self.topic, self.partition, err))?;
            if log.poisoned {
                return Err(KcliError::consume(
                    &self.topic,
                    self.partition,
                    "connection reset by broker",
                ));
            }

            // records older than the retention point are gone, skip ahead
            let offset = self.next.max(log.start);
            log.get(offset).map(|value| {
                log.reads.fetch_add(1, Ordering::SeqCst);
                RawRecord {
                    offset,
                    value: value.clone(),
                }
            })
        };

        match record {
            Some(record) => {
                trace!(offset = record.offset, "memory record");
                self.next = record.offset + 1;
                Ok(record)
            }
            // nothing new yet, a real consumer would block here too
            None => futures_util::future::pending().await,
        }
    }
}
