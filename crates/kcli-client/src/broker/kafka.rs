use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blocking::unblock;
use rdkafka::ClientConfig as RdConfig;
use rdkafka::Message as _;
use rdkafka::Offset;
use rdkafka::TopicPartitionList;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::{BaseConsumer, Consumer, DefaultConsumerContext, StreamConsumer};
use rdkafka::util::AsyncRuntime;
use tracing::{debug, instrument};

use crate::config::{ClientConfig, TlsPolicy};
use crate::error::{KcliError, Result};
use super::{Broker, PartitionReader, RawRecord};

const GROUP_ID: &str = "kcli";

/// Drives rdkafka's stream consumer on the fluvio-future executor
pub struct FluvioRuntime;

impl AsyncRuntime for FluvioRuntime {
    type Delay = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn spawn<T>(task: T)
    where
        T: Future<Output = ()> + Send + 'static,
    {
        fluvio_future::task::spawn(task);
    }

    fn delay_for(duration: Duration) -> Self::Delay {
        Box::pin(fluvio_future::timer::sleep(duration))
    }
}

type KafkaStream = StreamConsumer<DefaultConsumerContext, FluvioRuntime>;

/// Broker access through librdkafka
#[derive(Clone)]
pub struct KafkaBroker {
    config: ClientConfig,
    metadata: Arc<BaseConsumer>,
}

impl fmt::Debug for KafkaBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KafkaBroker({})", self.config.bootstrap_servers())
    }
}

impl KafkaBroker {
    /// Creates the metadata client and checks that the cluster answers
    #[instrument(skip(config), fields(brokers = %config.bootstrap_servers()))]
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let metadata: BaseConsumer = rd_config(config)
            .create()
            .map_err(|err| KcliError::Connect(err.to_string()))?;
        let broker = Self {
            config: config.clone(),
            metadata: Arc::new(metadata),
        };

        broker.topics().await?;
        debug!("connected");
        Ok(broker)
    }
}

fn rd_config(config: &ClientConfig) -> RdConfig {
    let mut rd = RdConfig::new();
    rd.set("bootstrap.servers", config.bootstrap_servers())
        .set("group.id", GROUP_ID)
        .set("enable.auto.commit", "false")
        .set("enable.partition.eof", "false")
        .set_log_level(RDKafkaLogLevel::Critical);

    if let TlsPolicy::Verified(paths) = &config.tls {
        rd.set("security.protocol", "ssl")
            .set("ssl.certificate.location", paths.cert.display().to_string())
            .set("ssl.key.location", paths.key.display().to_string())
            .set("ssl.ca.location", paths.ca_cert.display().to_string());
    }
    rd
}

#[async_trait]
impl Broker for KafkaBroker {
    async fn topics(&self) -> Result<Vec<String>> {
        let consumer = self.metadata.clone();
        let wait = self.config.metadata_timeout;
        unblock(move || {
            let metadata = consumer
                .fetch_metadata(None, wait)
                .map_err(|err| KcliError::Connect(err.to_string()))?;
            Ok(metadata
                .topics()
                .iter()
                .map(|topic| topic.name().to_owned())
                .collect())
        })
        .await
    }

    async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        let consumer = self.metadata.clone();
        let wait = self.config.metadata_timeout;
        let name = topic.to_owned();
        unblock(move || {
            let metadata = consumer
                .fetch_metadata(Some(&name), wait)
                .map_err(|err| KcliError::Connect(err.to_string()))?;
            let topic = metadata
                .topics()
                .iter()
                .find(|t| t.name() == name && t.error().is_none())
                .ok_or_else(|| KcliError::TopicNotFound(name.clone()))?;
            Ok(topic.partitions().iter().map(|p| p.id()).collect())
        })
        .await
    }

    async fn offsets(&self, topic: &str, partition: i32) -> Result<(i64, i64)> {
        let consumer = self.metadata.clone();
        let wait = self.config.metadata_timeout;
        let name = topic.to_owned();
        unblock(move || {
            consumer
                .fetch_watermarks(&name, partition, wait)
                .map_err(|err| KcliError::consume(&name, partition, err))
        })
        .await
    }

    async fn open_reader(
        &self,
        topic: &str,
        partition: i32,
        offset: i64,
    ) -> Result<Box<dyn PartitionReader>> {
        let consumer: KafkaStream = rd_config(&self.config)
            .create_with_context(DefaultConsumerContext)
            .map_err(|err| KcliError::consume(topic, partition, err))?;

        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(topic, partition, Offset::Offset(offset))
            .map_err(|err| KcliError::consume(topic, partition, err))?;
        consumer
            .assign(&assignment)
            .map_err(|err| KcliError::consume(topic, partition, err))?;

        debug!(topic, partition, offset, "assigned stream consumer");
        Ok(Box::new(KafkaReader {
            consumer,
            topic: topic.to_owned(),
            partition,
        }))
    }
}

struct KafkaReader {
    consumer: KafkaStream,
    topic: String,
    partition: i32,
}

#[async_trait]
impl PartitionReader for KafkaReader {
    async fn next_record(&mut self) -> Result<RawRecord> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|err| KcliError::consume(&self.topic, self.partition, err))?;

        Ok(RawRecord {
            offset: message.offset(),
            value: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }
}
