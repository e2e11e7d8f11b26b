use std::io::Write;

use kcli_client::{Client, Filter, Message, Partition};
use tracing::debug;

use crate::error::{NavError, Result};
use crate::format::{self, TOPIC_HEADER, TOPICS_HEADER};
use crate::page::{Page, Row, RowTarget};

/// One level of the navigation stack
#[derive(Debug, Clone)]
pub enum Feeder {
    Topics(TopicsFeeder),
    Topic(TopicFeeder),
    Partition(PartitionFeeder),
    Message(MessageFeeder),
}

impl Feeder {
    pub fn page(&self) -> &Page {
        match self {
            Self::Topics(feeder) => &feeder.page,
            Self::Topic(feeder) => &feeder.page,
            Self::Partition(feeder) => &feeder.page,
            Self::Message(feeder) => &feeder.page,
        }
    }

    pub fn page_mut(&mut self) -> &mut Page {
        match self {
            Self::Topics(feeder) => &mut feeder.page,
            Self::Topic(feeder) => &mut feeder.page,
            Self::Partition(feeder) => &mut feeder.page,
            Self::Message(feeder) => &mut feeder.page,
        }
    }

    pub fn header(&self) -> String {
        match self {
            Self::Topics(_) => TOPICS_HEADER.to_owned(),
            Self::Topic(_) => TOPIC_HEADER.to_owned(),
            Self::Partition(feeder) => format::partition_header(&feeder.partition),
            Self::Message(feeder) => format::message_header(&feeder.message),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Topics(_) => "topics",
            Self::Topic(_) => "topic",
            Self::Partition(_) => "partition",
            Self::Message(_) => "message",
        }
    }

    /// Builds the feeder for `row` of the current window
    pub(crate) async fn child(&self, client: &Client, row: usize) -> Result<Feeder> {
        let height = self.page().height();
        let target = self.page().row(row).map(|row| &row.target);
        match (self, target) {
            (Self::Topics(_), Some(RowTarget::Topic(topic))) => {
                Ok(Self::Topic(TopicFeeder::load(client, topic, height).await?))
            }
            (Self::Topic(_), Some(RowTarget::Partition(partition))) => {
                if partition.is_empty() {
                    return Err(NavError::NoData);
                }
                let feeder = PartitionFeeder::load(client, partition.clone(), height, None).await?;
                Ok(Self::Partition(feeder))
            }
            (Self::Partition(_), Some(RowTarget::Message(message))) => {
                Ok(Self::Message(MessageFeeder::new(message.clone(), height)))
            }
            _ => Err(NavError::NoData),
        }
    }

    /// Writes the full content of this level, not just the loaded windows
    pub(crate) async fn dump<W: Write + Send>(&self, client: &Client, out: &mut W) -> Result<()> {
        writeln!(out, "{}", self.header())?;
        match self {
            Self::Topics(_) | Self::Topic(_) | Self::Message(_) => {
                for row in self.page().all_rows() {
                    writeln!(out, "{}", row.value)?;
                }
            }
            Self::Partition(feeder) => {
                let from_start = feeder.partition.at(feeder.partition.start);
                let mut failed = None;
                client
                    .fetch(&from_start, |message| {
                        if failed.is_some() {
                            return;
                        }
                        let written = out
                            .write_all(&message.value)
                            .and_then(|_| out.write_all(b"\n"));
                        if let Err(err) = written {
                            failed = Some(err);
                        }
                    })
                    .await?;
                if let Some(err) = failed {
                    return Err(err.into());
                }
            }
        }
        out.flush()?;
        Ok(())
    }
}

/// Every topic on the cluster
#[derive(Debug, Clone)]
pub struct TopicsFeeder {
    page: Page,
}

impl TopicsFeeder {
    pub async fn load(client: &Client, height: usize) -> Result<Self> {
        let topics = client.list_topics().await?;
        let rows = topics.iter().map(|topic| format::topic_row(topic)).collect();
        Ok(Self {
            page: Page::new(rows, height),
        })
    }

    /// Absolute row index of `topic`
    pub fn position(&self, topic: &str) -> Option<usize> {
        self.page
            .all_rows()
            .position(|row| matches!(&row.target, RowTarget::Topic(name) if name == topic))
    }
}

/// Partitions of one topic
#[derive(Debug, Clone)]
pub struct TopicFeeder {
    topic: String,
    page: Page,
}

impl TopicFeeder {
    pub async fn load(client: &Client, topic: &str, height: usize) -> Result<Self> {
        let partitions = client.partitions(topic).await?;
        Ok(Self::from_partitions(topic, &partitions, height))
    }

    pub fn from_partitions(topic: &str, partitions: &[Partition], height: usize) -> Self {
        let rows = partitions.iter().map(format::partition_row).collect();
        Self {
            topic: topic.to_owned(),
            page: Page::new(rows, height),
        }
    }

    pub(crate) fn with_search(mut self, term: String) -> Self {
        self.page = self.page.with_search(Some(term));
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Every partition row, across all windows
    pub fn partitions(&self) -> Vec<Partition> {
        self.page
            .all_rows()
            .filter_map(|row| match &row.target {
                RowTarget::Partition(partition) => Some(partition.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, partition: i32) -> Option<usize> {
        self.page.all_rows().position(
            |row| matches!(&row.target, RowTarget::Partition(p) if p.partition == partition),
        )
    }

    /// Same partitions, each cursor moved to the relative position `n`
    pub(crate) fn with_offset(&self, n: i64) -> Self {
        let partitions = self.partitions().into_iter().map(|mut partition| {
            // empty partitions have no offset to move to
            if let Ok(offset) = partition.resolve(n) {
                partition.offset = offset;
            }
            partition
        });
        let mut feeder = self.clone();
        feeder
            .page
            .replace_rows(partitions.map(|partition| format::partition_row(&partition)));
        feeder
    }
}

/// Messages of one partition, fetched a window at a time
#[derive(Debug, Clone)]
pub struct PartitionFeeder {
    /// Bounds and filter of the partition, `offset` is where the first window starts
    partition: Partition,
    page: Page,
}

impl PartitionFeeder {
    /// Fetches the first window starting at the partition cursor
    pub async fn load(
        client: &Client,
        partition: Partition,
        height: usize,
        search: Option<String>,
    ) -> Result<Self> {
        let height = height.max(1);
        let messages = client
            .consume(&partition, height, predicate(&partition))
            .await?;
        debug!(offset = partition.offset, count = messages.len(), "loaded partition window");
        Ok(Self {
            page: Page::new(rows(messages), height).with_search(search),
            partition,
        })
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn is_filtered(&self) -> bool {
        self.partition.filter.is_some()
    }

    /// Offset of the message under the cursor, or where the page starts
    pub fn current_offset(&self) -> i64 {
        match self.page.current_row().map(|row| &row.target) {
            Some(RowTarget::Message(message)) => message.offset,
            _ => self.partition.offset,
        }
    }

    pub(crate) fn first_offset(&self) -> i64 {
        match self.page.first_row().map(|row| &row.target) {
            Some(RowTarget::Message(message)) => message.offset,
            _ => self.partition.offset,
        }
    }

    fn last_offset(&self) -> Option<i64> {
        match self.page.last_row().map(|row| &row.target) {
            Some(RowTarget::Message(message)) => Some(message.offset),
            _ => None,
        }
    }

    /// Reloads at `offset` keeping the filter and search term
    pub(crate) async fn reload(&self, client: &Client, offset: i64) -> Result<Self> {
        Self::load(
            client,
            self.partition.at(offset),
            self.page.height(),
            self.page.search.clone(),
        )
        .await
    }

    /// Fetches the window after the last fetched message, `None` at the end of the partition
    pub(crate) async fn next_window(&self, client: &Client) -> Result<Option<Vec<Row>>> {
        let Some(last) = self.last_offset() else {
            return Ok(None);
        };
        let next = last + 1;
        if next >= self.partition.end {
            return Ok(None);
        }

        let from = self.partition.at(next);
        let messages = client
            .consume(&from, self.page.height(), predicate(&from))
            .await?;
        Ok((!messages.is_empty()).then(|| rows(messages)))
    }
}

fn predicate(partition: &Partition) -> Filter {
    Filter::from_term(partition.filter.as_deref())
}

fn rows(messages: Vec<Message>) -> Vec<Row> {
    messages.into_iter().map(format::message_row).collect()
}

/// Body of a single message
#[derive(Debug, Clone)]
pub struct MessageFeeder {
    message: Message,
    page: Page,
}

impl MessageFeeder {
    pub fn new(message: Message, height: usize) -> Self {
        let rows = format::body_lines(&message.value)
            .into_iter()
            .map(|line| Row::new(line, RowTarget::Line))
            .collect();
        Self {
            message,
            page: Page::new(rows, height),
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }
}
