//! Read side of a Kafka topic browser.
//!
//! A [`Client`] lists topics and partitions, reads bounded ranges of records
//! from a partition and searches one or many partitions for a substring.
//! The broker itself sits behind the [`Broker`] trait, with an in-memory
//! implementation always available and an `rdkafka` one behind the `kafka`
//! feature.

mod client;
mod directory;
mod error;
mod search;

pub mod broker;
pub mod config;
pub mod consumer;
pub mod decoder;
pub mod partition;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder, ConfigError, TlsPaths, TlsPolicy};
pub use consumer::{Filter, PartitionScan, RecordPredicate};
pub use decoder::{DecodeError, Decoder, PlainDecoder};
pub use error::{KcliError, Result};
pub use partition::{Message, NOT_FOUND, Partition, SearchResult};
pub use search::CancelToken;
