use std::collections::BTreeSet;

use futures_util::future::try_join_all;
use tracing::{debug, instrument};

use crate::client::Client;
use crate::error::Result;
use crate::partition::Partition;

impl Client {
    /// Every topic on the cluster, sorted and without duplicates
    #[instrument(skip(self))]
    pub async fn list_topics(&self) -> Result<BTreeSet<String>> {
        let topics: BTreeSet<String> = self.broker().topics().await?.into_iter().collect();
        debug!(count = topics.len(), "listed topics");
        Ok(topics)
    }

    /// Partitions of `topic` with their current offset boundaries,
    /// each positioned at its oldest offset
    #[instrument(skip(self))]
    pub async fn partitions(&self, topic: &str) -> Result<Vec<Partition>> {
        let ids = self.broker().partitions(topic).await?;
        let bounds = ids.iter().map(|id| self.broker().offsets(topic, *id));
        let bounds = try_join_all(bounds).await?;

        Ok(ids
            .into_iter()
            .zip(bounds)
            .map(|(id, (start, end))| Partition::new(topic, id, start, end))
            .collect())
    }
}
