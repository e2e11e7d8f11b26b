use std::time::Duration;

use fluvio_future::future::timeout;
use tracing::{debug, instrument, trace, warn};

use crate::broker::{PartitionReader, RawRecord};
use crate::client::Client;
use crate::error::Result;
use crate::partition::{Message, Partition};

/// Decides which raw records a consume call keeps
pub trait RecordPredicate: Send {
    fn matches(&mut self, value: &[u8]) -> bool;
}

/// Substring filter over raw payloads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Contains(Vec<u8>),
}

impl Filter {
    /// `None` and the empty term keep every record
    pub fn from_term(term: Option<&str>) -> Self {
        match term {
            Some(term) if !term.is_empty() => Self::Contains(term.as_bytes().to_vec()),
            _ => Self::All,
        }
    }
}

impl RecordPredicate for Filter {
    fn matches(&mut self, value: &[u8]) -> bool {
        match self {
            Self::All => true,
            Self::Contains(needle) => contains(value, needle),
        }
    }
}

/// Adapts a closure into a [`RecordPredicate`]
pub struct FnPredicate<F>(F);

pub fn from_fn<F>(f: F) -> FnPredicate<F>
where
    F: FnMut(&[u8]) -> bool + Send,
{
    FnPredicate(f)
}

impl<F> RecordPredicate for FnPredicate<F>
where
    F: FnMut(&[u8]) -> bool + Send,
{
    fn matches(&mut self, value: &[u8]) -> bool {
        (self.0)(value)
    }
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

/// Lazy, finite walk over the records of one partition.
///
/// The scan starts at the partition cursor and ends once the record at
/// `end - 1` has been read. Every read attempt, whether it yields a record
/// or times out, spends one unit of the `end - offset` budget, so a scan
/// always terminates even when the broker stops answering. The read session
/// is opened on the first call to [`PartitionScan::next`] and closed when the
/// scan finishes or is dropped.
pub struct PartitionScan {
    client: Client,
    partition: Partition,
    reader: Option<Box<dyn PartitionReader>>,
    read_timeout: Duration,
    budget: i64,
    attempts: i64,
    done: bool,
}

impl PartitionScan {
    pub(crate) fn new(client: Client, partition: Partition) -> Self {
        let read_timeout = client.config().read_timeout;
        Self {
            budget: partition.remaining(),
            client,
            partition,
            reader: None,
            read_timeout,
            attempts: 0,
            done: false,
        }
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Read attempts made so far
    pub fn attempts(&self) -> i64 {
        self.attempts
    }

    /// Total attempts this scan may make
    pub fn budget(&self) -> i64 {
        self.budget
    }

    /// Next raw record, or `None` once the scan is exhausted
    pub async fn next(&mut self) -> Result<Option<RawRecord>> {
        while !self.done && self.attempts < self.budget {
            if self.reader.is_none() {
                let opened = self
                    .client
                    .broker()
                    .open_reader(
                        &self.partition.topic,
                        self.partition.partition,
                        self.partition.offset,
                    )
                    .await;
                match opened {
                    Ok(reader) => self.reader = Some(reader),
                    Err(err) => {
                        self.done = true;
                        return Err(err);
                    }
                }
            }
            let Some(reader) = self.reader.as_mut() else {
                break;
            };

            self.attempts += 1;
            match timeout(self.read_timeout, reader.next_record()).await {
                Ok(Ok(record)) => {
                    if record.offset >= self.partition.end {
                        break;
                    }
                    if record.offset >= self.partition.end - 1 {
                        self.finish();
                    }
                    return Ok(Some(record));
                }
                Ok(Err(err)) => {
                    self.finish();
                    return Err(err);
                }
                Err(_) => {
                    trace!(
                        topic = %self.partition.topic,
                        partition = self.partition.partition,
                        attempt = self.attempts,
                        "read attempt timed out"
                    );
                }
            }
        }

        self.finish();
        Ok(None)
    }

    fn finish(&mut self) {
        self.done = true;
        self.reader = None;
    }
}

impl Client {
    /// Starts a scan at the partition cursor
    pub fn scan(&self, partition: &Partition) -> PartitionScan {
        PartitionScan::new(self.clone(), partition.clone())
    }

    /// Collects up to `max_count` decoded messages whose raw payload matches `predicate`
    #[instrument(
        skip(self, partition, predicate),
        fields(topic = %partition.topic, partition = partition.partition, offset = partition.offset)
    )]
    pub async fn consume(
        &self,
        partition: &Partition,
        max_count: usize,
        mut predicate: impl RecordPredicate,
    ) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        if max_count == 0 {
            return Ok(messages);
        }

        let mut scan = self.scan(partition);
        while let Some(record) = scan.next().await? {
            if !predicate.matches(&record.value) {
                continue;
            }

            let value = self.decode(
                &partition.topic,
                partition.partition,
                record.offset,
                &record.value,
            )?;
            messages.push(Message {
                partition: partition.at(record.offset),
                value,
                offset: record.offset,
            });

            if messages.len() >= max_count {
                break;
            }
        }

        debug!(count = messages.len(), attempts = scan.attempts(), "consumed");
        Ok(messages)
    }

    /// Streams every decoded message from the cursor to the end of the partition.
    ///
    /// Records that fail to decode are logged and skipped. Returns the number
    /// of messages handed to `on_message`.
    #[instrument(
        skip(self, partition, on_message),
        fields(topic = %partition.topic, partition = partition.partition)
    )]
    pub async fn fetch(
        &self,
        partition: &Partition,
        mut on_message: impl FnMut(Message) + Send,
    ) -> Result<usize> {
        let mut count = 0;
        let mut scan = self.scan(partition);
        while let Some(record) = scan.next().await? {
            match self.decode(
                &partition.topic,
                partition.partition,
                record.offset,
                &record.value,
            ) {
                Ok(value) => {
                    on_message(Message {
                        partition: partition.at(record.offset),
                        value,
                        offset: record.offset,
                    });
                    count += 1;
                }
                Err(err) => warn!(%err, "skipping record"),
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_term() {
        assert_eq!(Filter::from_term(None), Filter::All);
        assert_eq!(Filter::from_term(Some("")), Filter::All);
        assert_eq!(
            Filter::from_term(Some("bob")),
            Filter::Contains(b"bob".to_vec())
        );
    }

    #[test]
    fn test_contains_filter() {
        let mut filter = Filter::from_term(Some("ob"));

        assert!(filter.matches(b"{\"name\": \"bob\"}"));
        assert!(!filter.matches(b"alice"));
        assert!(!filter.matches(b""));
    }

    #[test]
    fn test_closure_predicate() {
        let mut seen = 0;
        let mut every_other = from_fn(|_: &[u8]| {
            seen += 1;
            seen % 2 == 0
        });

        assert!(!every_other.matches(b"a"));
        assert!(every_other.matches(b"b"));
    }
}
