use crate::config::ConfigError;

pub type Result<T, E = KcliError> = core::result::Result<T, E>;

/// Possible errors that may arise when browsing a broker
#[derive(thiserror::Error, Debug)]
pub enum KcliError {
    #[error("Unable to reach broker: {0}")]
    Connect(String),
    #[error("Failed to consume {topic}-{partition}: {reason}")]
    Consume {
        topic: String,
        partition: i32,
        reason: String,
    },
    #[error("Failed to decode record at {topic}-{partition}@{offset}: {reason}")]
    Decode {
        topic: String,
        partition: i32,
        offset: i64,
        reason: String,
    },
    #[error("Topic not found: {0}")]
    TopicNotFound(String),
    #[error("Partition not found: {0}-{1}")]
    PartitionNotFound(String, i32),
    #[error("Invalid offset {offset}, valid range is [{start}, {end})")]
    InvalidOffset { offset: i64, start: i64, end: i64 },
    #[error("Client config error: {0}")]
    ClientConfig(#[from] ConfigError),
    #[error("Search task exited before reporting a result")]
    SearchAborted,
}

impl KcliError {
    pub(crate) fn consume(topic: &str, partition: i32, reason: impl ToString) -> Self {
        Self::Consume {
            topic: topic.to_owned(),
            partition,
            reason: reason.to_string(),
        }
    }

    /// Errors that mean the broker itself is gone, as opposed to a single read failing
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connect(_))
    }
}
