use std::time::Duration;

use kcli_client::broker::MemoryBroker;
use kcli_client::{Client, ClientConfig, KcliError};
use kcli_views::{Feeder, NavError, Row, RowTarget, Stack};

const HEIGHT: usize = 5;

/// "people" has 1100 records in partition 0, "bob" only at offset 12, and an
/// empty partition 1. "things" has 30 records.
async fn cluster() -> (MemoryBroker, Client) {
    let broker = MemoryBroker::new();
    broker.create_topic("people", 2).await;
    for i in 0..1100 {
        let name = if i == 12 {
            "bob".to_owned()
        } else {
            format!("user-{i}")
        };
        broker
            .produce("people", 0, format!("{{\"name\": \"{name}\", \"n\": {i}}}"))
            .await
            .expect("produce");
    }
    broker.create_topic("things", 1).await;
    for i in 0..30 {
        broker
            .produce("things", 0, format!("thing {i}"))
            .await
            .expect("produce");
    }

    let config = ClientConfig::builder()
        .read_timeout(Duration::from_millis(200))
        .build()
        .expect("config");
    (broker.clone(), Client::new(config, broker))
}

async fn stack() -> Stack {
    let (_broker, client) = cluster().await;
    Stack::new(client, HEIGHT).await.expect("stack")
}

fn offsets(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .filter_map(|row| match &row.target {
            RowTarget::Message(message) => Some(message.offset),
            _ => None,
        })
        .collect()
}

/// Stack positioned on partition 0 of "people"
async fn people_partition() -> Stack {
    let mut stack = stack().await;
    stack.enter(0).await.expect("topic");
    stack.enter(0).await.expect("partition");
    stack
}

#[fluvio_future::test]
async fn test_topics_listed_sorted() {
    let stack = stack().await;

    assert_eq!(stack.header(), "topics");
    assert_eq!(
        stack.rows().iter().map(|r| r.value.as_str()).collect::<Vec<_>>(),
        vec!["people", "things"]
    );
}

#[fluvio_future::test]
async fn test_enter_empty_partition_is_no_data() {
    //given
    let mut stack = stack().await;
    stack.enter(0).await.expect("topic");

    //when
    let result = stack.enter(1).await;

    //then
    assert!(matches!(result, Err(NavError::NoData)));
    assert_eq!(stack.depth(), 2);
    assert!(matches!(stack.top(), Feeder::Topic(_)));
}

#[fluvio_future::test]
async fn test_enter_out_of_range_row() {
    let mut stack = stack().await;

    let result = stack.enter(7).await;

    assert!(matches!(result, Err(NavError::NoData)));
    assert_eq!(stack.depth(), 1);
}

#[fluvio_future::test]
async fn test_partition_paging_round_trip() {
    //given
    let mut stack = people_partition().await;
    let first = stack.rows().to_vec();
    assert_eq!(offsets(&first), vec![0, 1, 2, 3, 4]);

    //when
    stack.page(1).await.expect("forward");
    let second = offsets(stack.rows());
    stack.page(-1).await.expect("back");

    //then
    assert_eq!(second, vec![5, 6, 7, 8, 9]);
    assert_eq!(stack.rows(), first.as_slice());
}

#[fluvio_future::test]
async fn test_back_at_partition_start_is_noop() {
    let mut stack = people_partition().await;
    let generation = stack.generation();

    stack.page(-1).await.expect("back");

    assert_eq!(offsets(stack.rows()), vec![0, 1, 2, 3, 4]);
    assert_eq!(stack.generation(), generation);
}

#[fluvio_future::test]
async fn test_jump_relative_offsets() {
    //given
    let mut stack = people_partition().await;

    //when
    stack.jump(40).await.expect("jump");
    let forward = offsets(stack.rows())[0];
    stack.jump(-100).await.expect("jump");
    let backward = offsets(stack.rows())[0];

    //then
    assert_eq!(forward, 40);
    assert_eq!(backward, 1000);
}

#[fluvio_future::test]
async fn test_back_from_first_window_fetches_previous_offsets() {
    //given
    let mut stack = people_partition().await;
    stack.jump(-100).await.expect("jump");

    //when
    stack.page(-1).await.expect("back");

    //then
    assert_eq!(offsets(stack.rows()), vec![995, 996, 997, 998, 999]);
}

#[fluvio_future::test]
async fn test_partition_search_and_repeat() {
    //given
    let mut stack = people_partition().await;

    //when
    stack.search("bob", false).await.expect("search");
    let found = offsets(stack.rows());
    let repeat = stack.search("", false).await;

    //then
    assert_eq!(found[0], 12);
    assert!(matches!(repeat, Err(NavError::NotFound)));
    assert_eq!(offsets(stack.rows()), found);
}

#[fluvio_future::test]
async fn test_repeat_search_skips_current_match() {
    //given
    let mut stack = people_partition().await;
    stack.search("user-1", false).await.expect("search");
    assert_eq!(offsets(stack.rows())[0], 1);

    //when
    stack.search("", false).await.expect("search");

    //then
    assert_eq!(offsets(stack.rows())[0], 10);
}

#[fluvio_future::test]
async fn test_topic_search_then_enter() {
    //given
    let mut stack = stack().await;
    stack.enter(0).await.expect("topic");

    //when
    stack.search("bob", true).await.expect("search");

    //then
    let rows = stack.rows().to_vec();
    assert_eq!(rows.len(), 1);
    let RowTarget::Partition(partition) = &rows[0].target else {
        panic!("expected a partition row");
    };
    assert_eq!((partition.partition, partition.offset), (0, 12));

    stack.enter(0).await.expect("partition");
    assert_eq!(offsets(stack.rows())[0], 12);
}

#[fluvio_future::test]
async fn test_topic_search_without_match_keeps_rows() {
    let mut stack = stack().await;
    stack.enter(0).await.expect("topic");
    let before = stack.rows().to_vec();

    let result = stack.search("carol", false).await;

    assert!(matches!(result, Err(NavError::NotFound)));
    assert_eq!(stack.rows(), before.as_slice());
}

#[fluvio_future::test]
async fn test_filter_and_clear() {
    //given
    let mut stack = people_partition().await;

    //when
    stack.filter("bob").await.expect("filter");
    let filtered = offsets(stack.rows());
    let header = stack.header();
    stack.page(1).await.expect("forward");
    let after_page = offsets(stack.rows());
    stack.clear_filter().await.expect("clear");

    //then
    assert_eq!(filtered, vec![12]);
    assert!(header.ends_with("filter: bob"));
    assert_eq!(after_page, vec![12]);
    assert_eq!(offsets(stack.rows()), vec![12, 13, 14, 15, 16]);
}

#[fluvio_future::test]
async fn test_empty_filter_reuses_search_term() {
    //given
    let mut stack = people_partition().await;
    stack.search("user-10", false).await.expect("search");

    //when
    stack.filter("").await.expect("filter");

    //then
    assert_eq!(offsets(stack.rows()), vec![10, 100, 101, 102, 103]);
}

#[fluvio_future::test]
async fn test_escape_restores_cursor() {
    //given
    let mut stack = stack().await;
    stack.enter(1).await.expect("topic");

    //when
    stack.escape();
    stack.escape();

    //then
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.cursor(), 1);
}

#[fluvio_future::test]
async fn test_resize_rewindows_every_level() {
    //given
    let mut stack = people_partition().await;
    stack.page(1).await.expect("forward");

    //when
    stack.resize(3);

    //then
    assert_eq!(offsets(stack.rows()), vec![0, 1, 2]);
    assert_eq!(stack.top().page().windows(), 4);
    assert_eq!(stack.cursor(), 0);
    stack.escape();
    assert_eq!(stack.cursor(), 0);
}

#[fluvio_future::test]
async fn test_set_offset_on_topic() {
    //given
    let mut stack = stack().await;
    stack.enter(0).await.expect("topic");

    //when
    stack.set_offset(-100).await.expect("offset");

    //then
    let partitions: Vec<_> = stack
        .rows()
        .iter()
        .filter_map(|row| match &row.target {
            RowTarget::Partition(p) => Some(p.offset),
            _ => None,
        })
        .collect();
    assert_eq!(partitions, vec![1000, 0]);
    stack.enter(0).await.expect("partition");
    assert_eq!(offsets(stack.rows())[0], 1000);
}

#[fluvio_future::test]
async fn test_goto_partition_and_offset() {
    let mut stack = stack().await;

    stack
        .goto("people", Some(0), Some(40))
        .await
        .expect("goto");

    assert_eq!(stack.depth(), 3);
    assert_eq!(offsets(stack.rows()), vec![40, 41, 42, 43, 44]);
}

#[fluvio_future::test]
async fn test_goto_unknown_topic_keeps_stack() {
    //given
    let mut stack = people_partition().await;
    stack.page(1).await.expect("page");
    let before = offsets(stack.rows());
    let generation = stack.generation();

    //when
    let result = stack.goto("nope", None, None).await;

    //then
    assert!(matches!(
        result,
        Err(NavError::Client(KcliError::TopicNotFound(_)))
    ));
    assert_eq!(stack.depth(), 3);
    assert_eq!(offsets(stack.rows()), before);
    assert_eq!(stack.generation(), generation);
}

#[fluvio_future::test]
async fn test_goto_empty_partition_keeps_stack() {
    //given
    let mut stack = stack().await;
    stack.select(1);

    //when
    let result = stack.goto("people", Some(1), Some(5)).await;

    //then
    assert!(matches!(result, Err(NavError::NoData)));
    assert_eq!(stack.depth(), 1);
    assert!(matches!(stack.top(), Feeder::Topics(_)));
    assert_eq!(stack.cursor(), 1);
}

#[fluvio_future::test]
async fn test_goto_unknown_partition_keeps_stack() {
    let mut stack = stack().await;

    let result = stack.goto("people", Some(7), None).await;

    assert!(matches!(
        result,
        Err(NavError::Client(KcliError::PartitionNotFound(_, 7)))
    ));
    assert_eq!(stack.depth(), 1);
}

#[fluvio_future::test]
async fn test_cluster_without_topics() {
    let config = ClientConfig::builder().build().expect("config");
    let client = Client::new(config, MemoryBroker::new());

    let result = Stack::new(client, HEIGHT).await;

    assert!(matches!(result, Err(NavError::NoData)));
}

#[fluvio_future::test]
async fn test_message_view() {
    //given
    let mut stack = people_partition().await;
    stack.jump(12).await.expect("jump");

    //when
    stack.enter(0).await.expect("message");

    //then
    assert_eq!(stack.header(), "topic: people partition: 0 offset: 12");
    assert!(
        stack
            .rows()
            .iter()
            .any(|row| row.value.trim() == "\"name\": \"bob\"")
    );
    assert!(matches!(stack.enter(0).await, Err(NavError::NoData)));
    assert_eq!(stack.depth(), 4);
}

#[fluvio_future::test]
async fn test_jump_on_topic_list() {
    let mut stack = stack().await;
    stack.resize(1);

    stack.jump(1).await.expect("jump");
    let moved = stack.rows()[0].value.clone();
    let missing = stack.jump(9).await;

    assert_eq!(moved, "things");
    assert!(matches!(missing, Err(NavError::NoData)));
    assert_eq!(stack.rows()[0].value, "things");
}

#[fluvio_future::test]
async fn test_dump_partition() {
    //given
    let mut stack = stack().await;
    stack.enter(1).await.expect("topic");
    stack.enter(0).await.expect("partition");
    let mut out = Vec::new();

    //when
    stack.dump(&mut out).await.expect("dump");

    //then
    let text = String::from_utf8(out).expect("utf8");
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 31);
    assert!(lines[0].starts_with("offset       message    topic: things"));
    assert_eq!(lines[30], "thing 29");
}
