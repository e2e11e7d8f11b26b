use std::sync::Arc;

use tracing::{debug, instrument};

use crate::broker::Broker;
use crate::config::ClientConfig;
use crate::decoder::{Decoder, PlainDecoder};
use crate::error::{KcliError, Result};

/// Handle to a set of brokers.
///
/// Cloning is cheap, every clone shares the broker connection, the decoder
/// and the config. Search tasks each take their own clone.
#[derive(Clone, Debug)]
pub struct Client {
    broker: Arc<dyn Broker>,
    decoder: Arc<dyn Decoder>,
    config: Arc<ClientConfig>,
}

impl Client {
    /// Wraps a broker without checking that it can be reached
    pub fn new(config: ClientConfig, broker: impl Broker + 'static) -> Self {
        Self {
            broker: Arc::new(broker),
            decoder: Arc::new(PlainDecoder),
            config: Arc::new(config),
        }
    }

    /// Wraps a broker and probes it with a topic listing
    #[instrument(skip(config, broker))]
    pub async fn connect(config: ClientConfig, broker: impl Broker + 'static) -> Result<Self> {
        let client = Self::new(config, broker);
        client.broker.topics().await.map_err(|err| match err {
            KcliError::Connect(_) => err,
            other => KcliError::Connect(other.to_string()),
        })?;
        debug!("broker reachable");
        Ok(client)
    }

    pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn broker(&self) -> &dyn Broker {
        self.broker.as_ref()
    }

    /// Runs the decoder over a raw record
    pub(crate) fn decode(
        &self,
        topic: &str,
        partition: i32,
        offset: i64,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        self.decoder
            .decode(topic, data)
            .map_err(|err| KcliError::Decode {
                topic: topic.to_owned(),
                partition,
                offset,
                reason: err.to_string(),
            })
    }

    /// Releases the broker connections
    pub async fn close(self) {
        self.broker.close().await;
    }
}
