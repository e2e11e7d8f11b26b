//!
//! # Broker transport
//!
//! The client never talks to a broker library directly, it goes through
//! [`Broker`] for metadata and opens one [`PartitionReader`] per read call.
//!

mod memory;
#[cfg(feature = "kafka")]
mod kafka;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::MemoryBroker;
#[cfg(feature = "kafka")]
pub use kafka::{KafkaBroker, FluvioRuntime};

/// A record as it comes off the wire, before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub offset: i64,
    pub value: Vec<u8>,
}

/// Metadata access to a set of brokers
#[async_trait]
pub trait Broker: Debug + Send + Sync {
    /// Names of every topic, in no particular order
    async fn topics(&self) -> Result<Vec<String>>;

    /// Partition ids of `topic`, in broker order
    async fn partitions(&self, topic: &str) -> Result<Vec<i32>>;

    /// Oldest retained offset and one past the newest offset
    async fn offsets(&self, topic: &str, partition: i32) -> Result<(i64, i64)>;

    /// Opens a dedicated read session positioned at `offset`.
    ///
    /// The session is closed when the reader is dropped.
    async fn open_reader(
        &self,
        topic: &str,
        partition: i32,
        offset: i64,
    ) -> Result<Box<dyn PartitionReader>>;

    /// Releases the metadata connections
    async fn close(&self) {}
}

/// A read session on one partition
#[async_trait]
pub trait PartitionReader: Send {
    /// Waits for the next record.
    ///
    /// May wait forever when no record is available, callers bound each
    /// attempt with a timeout. Dropping the returned future before it
    /// resolves must not skip a record.
    async fn next_record(&mut self) -> Result<RawRecord>;
}
