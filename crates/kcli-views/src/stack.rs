use std::io::Write;

use kcli_client::{Client, KcliError, Partition};
use tracing::{debug, instrument};

use crate::error::{NavError, Result, offset_error};
use crate::feeder::{Feeder, PartitionFeeder, TopicFeeder, TopicsFeeder};
use crate::page::Row;

/// Navigation state of the browser.
///
/// The stack is never empty, the topic list sits at the bottom. Every
/// operation either succeeds or leaves the stack exactly as it was.
#[derive(Debug)]
pub struct Stack {
    client: Client,
    height: usize,
    feeders: Vec<Feeder>,
    generation: u64,
}

impl Stack {
    /// Loads the topic list, a cluster without topics is [`NavError::NoData`]
    #[instrument(skip(client))]
    pub async fn new(client: Client, height: usize) -> Result<Self> {
        let height = height.max(1);
        let root = Feeder::Topics(TopicsFeeder::load(&client, height).await?);
        if root.page().is_empty() {
            return Err(NavError::NoData);
        }
        Ok(Self {
            client,
            height,
            feeders: vec![root],
            generation: 0,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn top(&self) -> &Feeder {
        // the root is never popped
        &self.feeders[self.feeders.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Feeder {
        let last = self.feeders.len() - 1;
        &mut self.feeders[last]
    }

    pub fn depth(&self) -> usize {
        self.feeders.len()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Bumped on every change, used to spot stale background results
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rows(&self) -> &[Row] {
        self.top().page().rows()
    }

    pub fn header(&self) -> String {
        self.top().header()
    }

    pub fn cursor(&self) -> usize {
        self.top().page().cursor()
    }

    pub fn select(&mut self, cursor: usize) {
        self.top_mut().page_mut().select(cursor);
    }

    fn push(&mut self, feeder: Feeder) {
        self.feeders.push(feeder);
        self.generation += 1;
    }

    fn replace_top(&mut self, feeder: Feeder) {
        *self.top_mut() = feeder;
        self.generation += 1;
    }

    /// Opens `row` of the current window
    #[instrument(skip(self))]
    pub async fn enter(&mut self, row: usize) -> Result<()> {
        let child = self.top().child(&self.client, row).await?;
        debug!(kind = child.name(), "entered");
        self.top_mut().page_mut().mark_entered(row);
        self.push(child);
        Ok(())
    }

    /// Returns to the previous level, the cursor lands on the row that was entered
    pub fn escape(&mut self) {
        if self.feeders.len() == 1 {
            return;
        }
        self.feeders.pop();
        self.top_mut().page_mut().restore_entered();
        self.generation += 1;
    }

    /// Moves one window forward (`delta > 0`) or back (`delta < 0`)
    #[instrument(skip(self))]
    pub async fn page(&mut self, delta: i32) -> Result<()> {
        if delta > 0 {
            self.forward().await
        } else if delta < 0 {
            self.back().await
        } else {
            Ok(())
        }
    }

    async fn forward(&mut self) -> Result<()> {
        if self.top_mut().page_mut().forward() {
            self.generation += 1;
            return Ok(());
        }

        let Feeder::Partition(feeder) = self.top() else {
            return Ok(());
        };
        let next = feeder.next_window(&self.client).await?;
        if let Some(rows) = next {
            self.top_mut().page_mut().push_window(rows);
            self.generation += 1;
        }
        Ok(())
    }

    async fn back(&mut self) -> Result<()> {
        if self.top_mut().page_mut().back() {
            self.generation += 1;
            return Ok(());
        }

        let Feeder::Partition(feeder) = self.top() else {
            return Ok(());
        };
        if feeder.is_filtered() {
            return Ok(());
        }

        let start = feeder.partition().start;
        let first = feeder.first_offset();
        if first <= start {
            return Ok(());
        }
        let height = i64::try_from(self.height).unwrap_or(i64::MAX);
        let offset = first.saturating_sub(height).max(start);
        let feeder = feeder.reload(&self.client, offset).await?;
        self.replace_top(Feeder::Partition(feeder));
        Ok(())
    }

    /// Partition: moves to the relative position `n` (see [`Partition::resolve`]).
    /// Topic lists: shows the window holding row `n`.
    #[instrument(skip(self))]
    pub async fn jump(&mut self, n: i64) -> Result<()> {
        match self.top() {
            Feeder::Partition(feeder) => {
                let offset = feeder.partition().resolve(n).map_err(offset_error)?;
                let feeder = feeder.reload(&self.client, offset).await?;
                self.replace_top(Feeder::Partition(feeder));
            }
            Feeder::Topics(_) | Feeder::Topic(_) => {
                let index = usize::try_from(n).map_err(|_| NavError::NoData)?;
                if !self.top_mut().page_mut().focus(index) {
                    return Err(NavError::NoData);
                }
                self.generation += 1;
            }
            Feeder::Message(_) => {}
        }
        Ok(())
    }

    /// Topic: every partition starts at relative position `n` when entered.
    /// Partition: same as [`Stack::jump`].
    #[instrument(skip(self))]
    pub async fn set_offset(&mut self, n: i64) -> Result<()> {
        match self.top() {
            Feeder::Topic(feeder) => {
                let feeder = feeder.with_offset(n);
                self.replace_top(Feeder::Topic(feeder));
                Ok(())
            }
            Feeder::Partition(_) => self.jump(n).await,
            Feeder::Topics(_) | Feeder::Message(_) => Ok(()),
        }
    }

    /// Shows only the messages containing `term`, an empty term reuses the last search term
    #[instrument(skip(self))]
    pub async fn filter(&mut self, term: &str) -> Result<()> {
        let Feeder::Partition(feeder) = self.top() else {
            return Ok(());
        };
        let term = match (term.is_empty(), feeder.page().search_term()) {
            (false, _) => term.to_owned(),
            (true, Some(stored)) => stored.to_owned(),
            (true, None) => return Ok(()),
        };

        let partition = feeder
            .partition()
            .at(feeder.current_offset())
            .with_filter(Some(term.clone()));
        let feeder =
            PartitionFeeder::load(&self.client, partition, self.height, Some(term)).await?;
        self.replace_top(Feeder::Partition(feeder));
        Ok(())
    }

    pub async fn clear_filter(&mut self) -> Result<()> {
        let Feeder::Partition(feeder) = self.top() else {
            return Ok(());
        };
        if !feeder.is_filtered() {
            return Ok(());
        }

        let partition = feeder
            .partition()
            .at(feeder.current_offset())
            .with_filter(None);
        let search = feeder.page().search_term().map(str::to_owned);
        let feeder = PartitionFeeder::load(&self.client, partition, self.height, search).await?;
        self.replace_top(Feeder::Partition(feeder));
        Ok(())
    }

    /// Re-windows every level for a new page height
    pub fn resize(&mut self, height: usize) {
        self.height = height.max(1);
        for feeder in &mut self.feeders {
            feeder.page_mut().resize(self.height);
        }
        self.generation += 1;
    }

    /// Opens `topic`, then optionally one of its partitions positioned at `offset`.
    ///
    /// Starts from the topic list. On failure every level, cursors included,
    /// is put back the way it was.
    #[instrument(skip(self))]
    pub async fn goto(
        &mut self,
        topic: &str,
        partition: Option<i32>,
        offset: Option<i64>,
    ) -> Result<()> {
        let saved = self.feeders.clone();
        let generation = self.generation;

        let result = self.navigate(topic, partition, offset).await;
        if result.is_err() {
            self.feeders = saved;
            self.generation = generation;
        }
        result
    }

    async fn navigate(
        &mut self,
        topic: &str,
        partition: Option<i32>,
        offset: Option<i64>,
    ) -> Result<()> {
        self.feeders.truncate(1);
        self.generation += 1;

        let Feeder::Topics(root) = self.top() else {
            return Err(NavError::NoData);
        };
        let index = root
            .position(topic)
            .ok_or_else(|| KcliError::TopicNotFound(topic.to_owned()))?;
        self.enter_index(index).await?;

        let Some(partition) = partition else {
            return Ok(());
        };
        let Feeder::Topic(feeder) = self.top() else {
            return Err(NavError::NoData);
        };
        let index = feeder
            .position(partition)
            .ok_or_else(|| KcliError::PartitionNotFound(topic.to_owned(), partition))?;
        if let Some(offset) = offset {
            self.set_offset(offset).await?;
        }
        self.enter_index(index).await
    }

    async fn enter_index(&mut self, index: usize) -> Result<()> {
        let page = self.top_mut().page_mut();
        if !page.focus(index) {
            return Err(NavError::NoData);
        }
        let row = page.cursor();
        self.enter(row).await
    }

    /// Writes everything the current level holds
    pub async fn dump<W: Write + Send>(&self, out: &mut W) -> Result<()> {
        self.top().dump(&self.client, out).await
    }

    /// Captures what a search on the current level needs.
    ///
    /// `None` when there is nothing to search, either because the level
    /// does not support it or because the term is empty and no previous
    /// term is stored.
    pub fn prepare_search(&self, term: &str, first_result_only: bool) -> Option<SearchJob> {
        let stored = self.top().page().search_term();
        let reuse = term.is_empty();
        let term = if reuse { stored?.to_owned() } else { term.to_owned() };

        let target = match self.top() {
            Feeder::Topic(feeder) => SearchTarget::Topic {
                topic: feeder.topic().to_owned(),
                partitions: feeder.partitions(),
                first_result_only,
            },
            Feeder::Partition(feeder) => {
                let mut start = feeder.current_offset();
                if reuse {
                    // skip the match we are sitting on
                    start += 1;
                }
                if start >= feeder.partition().end {
                    return Some(SearchJob {
                        generation: self.generation,
                        height: self.height,
                        term,
                        target: SearchTarget::Exhausted,
                    });
                }
                SearchTarget::Partition {
                    feeder: feeder.clone(),
                    from: feeder.partition().at(start),
                }
            }
            Feeder::Topics(_) | Feeder::Message(_) => return None,
        };

        Some(SearchJob {
            generation: self.generation,
            height: self.height,
            term,
            target,
        })
    }

    /// Installs a prepared search result, unless the stack moved on since it was prepared
    pub fn apply(&mut self, prepared: Prepared) -> Result<()> {
        if prepared.generation != self.generation {
            debug!(
                prepared = prepared.generation,
                current = self.generation,
                "dropping stale search result"
            );
            return Err(NavError::Stale);
        }
        self.replace_top(prepared.feeder);
        Ok(())
    }

    /// Searches and applies the result in one step
    pub async fn search(&mut self, term: &str, first_result_only: bool) -> Result<()> {
        let Some(job) = self.prepare_search(term, first_result_only) else {
            return Ok(());
        };
        let prepared = job.run(&self.client, |_, _| {}).await?;
        self.apply(prepared)
    }
}

#[derive(Debug, Clone)]
enum SearchTarget {
    Topic {
        topic: String,
        partitions: Vec<Partition>,
        first_result_only: bool,
    },
    Partition {
        feeder: PartitionFeeder,
        from: Partition,
    },
    Exhausted,
}

/// A search detached from the stack, safe to run on another task
#[derive(Debug, Clone)]
pub struct SearchJob {
    generation: u64,
    height: usize,
    term: String,
    target: SearchTarget,
}

/// New top level computed by a [`SearchJob`]
#[derive(Debug)]
pub struct Prepared {
    generation: u64,
    feeder: Feeder,
}

impl SearchJob {
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Runs the search and builds the replacement for the top level.
    ///
    /// `progress` receives `(done, total)`, counted in partitions for a
    /// topic and in records for a partition.
    #[instrument(skip(self, client, progress), fields(term = %self.term))]
    pub async fn run(
        self,
        client: &Client,
        mut progress: impl FnMut(i64, i64) + Send,
    ) -> Result<Prepared> {
        let feeder = match self.target {
            SearchTarget::Topic {
                topic,
                partitions,
                first_result_only,
            } => {
                let found = client
                    .search_topic(&partitions, &self.term, first_result_only, |done, total| {
                        progress(done as i64, total as i64)
                    })
                    .await?;
                if found.is_empty() {
                    return Err(NavError::NotFound);
                }
                let feeder = TopicFeeder::from_partitions(&topic, &found, self.height)
                    .with_search(self.term);
                Feeder::Topic(feeder)
            }
            SearchTarget::Partition { feeder, from } => {
                let offset = client
                    .search(&from, &self.term, progress)
                    .await?
                    .ok_or(NavError::NotFound)?;
                let mut partition = feeder.partition().clone();
                partition.seek(offset).map_err(offset_error)?;
                let loaded =
                    PartitionFeeder::load(client, partition, self.height, Some(self.term)).await?;
                Feeder::Partition(loaded)
            }
            SearchTarget::Exhausted => return Err(NavError::NotFound),
        };

        Ok(Prepared {
            generation: self.generation,
            feeder,
        })
    }
}
