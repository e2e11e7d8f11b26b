use kcli_client::{Message, Partition};

use crate::page::{Row, RowTarget};

pub const TOPICS_HEADER: &str = "topics";
pub const TOPIC_HEADER: &str =
    "partition     1st offset             current offset         last offset            size";

pub fn topic_row(topic: &str) -> Row {
    Row::new(topic, RowTarget::Topic(topic.to_owned()))
}

pub fn partition_row(partition: &Partition) -> Row {
    Row::new(
        format!(
            "{:<13} {:<22} {:<22} {:<22} {}",
            partition.partition,
            partition.start,
            partition.offset,
            partition.end,
            partition.len()
        ),
        RowTarget::Partition(partition.clone()),
    )
}

pub fn message_row(message: Message) -> Row {
    // keep each message on one display line
    let value = message.value_lossy().replace(['\n', '\r'], " ");
    Row::new(
        format!("{:<12} {}", message.offset, value),
        RowTarget::Message(message),
    )
}

pub fn partition_header(partition: &Partition) -> String {
    let mut header = format!(
        "offset       message    topic: {} partition: {} start: {} end: {}",
        partition.topic, partition.partition, partition.start, partition.end
    );
    if let Some(filter) = &partition.filter {
        header.push_str(&format!(" filter: {filter}"));
    }
    header
}

pub fn message_header(message: &Message) -> String {
    format!(
        "topic: {} partition: {} offset: {}",
        message.partition.topic, message.partition.partition, message.offset
    )
}

/// Body lines of a message, indented when the payload is JSON
pub fn body_lines(value: &[u8]) -> Vec<String> {
    let pretty = serde_json::from_slice::<serde_json::Value>(value)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok());

    match pretty {
        Some(pretty) => pretty.lines().map(str::to_owned).collect(),
        None => String::from_utf8_lossy(value)
            .lines()
            .map(str::to_owned)
            .collect(),
    }
}
