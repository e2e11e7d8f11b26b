use std::time::Duration;

use kcli_client::broker::MemoryBroker;
use kcli_client::{Client, ClientConfig, KcliError, Partition};

fn config() -> ClientConfig {
    ClientConfig::builder()
        .read_timeout(Duration::from_millis(200))
        .build()
        .expect("config")
}

/// Two partitions of 20 records, "bob" only at offset 12 of partition 0
async fn people() -> (MemoryBroker, Client) {
    let broker = MemoryBroker::new();
    broker.create_topic("people", 2).await;
    for partition in 0..2 {
        for i in 0..20 {
            let name = if partition == 0 && i == 12 { "bob" } else { "alice" };
            broker
                .produce("people", partition, format!("{{\"name\": \"{name}\", \"n\": {i}}}"))
                .await
                .expect("produce");
        }
    }
    let client = Client::new(config(), broker.clone());
    (broker, client)
}

#[fluvio_future::test]
async fn test_search_returns_absolute_offset() {
    //given
    let (_broker, client) = people().await;
    let partitions = client.partitions("people").await.expect("partitions");
    let mut steps = 0;

    //when
    let found = client
        .search(&partitions[0], "bob", |_, _| steps += 1)
        .await
        .expect("search");
    let missing = client
        .search(&partitions[1], "bob", |_, _| {})
        .await
        .expect("search");

    //then
    assert_eq!(found, Some(12));
    assert_eq!(steps, 13);
    assert_eq!(missing, None);
}

#[fluvio_future::test]
async fn test_search_from_cursor_skips_earlier_matches() {
    //given
    let (_broker, client) = people().await;
    let partitions = client.partitions("people").await.expect("partitions");

    //when
    let after = client
        .search(&partitions[0].at(13), "bob", |_, _| {})
        .await
        .expect("search");
    let from_offset = client
        .search(&partitions[0].at(5), "\"n\": 7", |_, _| {})
        .await
        .expect("search");

    //then
    assert_eq!(after, None);
    assert_eq!(from_offset, Some(7));
}

#[fluvio_future::test]
async fn test_search_topic_single_match() {
    //given
    let (_broker, client) = people().await;
    let partitions = client.partitions("people").await.expect("partitions");
    let mut reports = vec![];

    //when
    let results = client
        .search_topic(&partitions, "bob", true, |done, total| reports.push((done, total)))
        .await
        .expect("search");

    //then
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].partition, 0);
    assert_eq!(results[0].offset, 12);
    assert!(reports.iter().all(|(_, total)| *total == 2));
}

#[fluvio_future::test]
async fn test_search_topic_sorted_by_partition() {
    //given
    let (_broker, client) = people().await;
    let partitions = client.partitions("people").await.expect("partitions");

    //when
    let results = client
        .search_topic(&partitions, "alice", false, |_, _| {})
        .await
        .expect("search");

    //then
    assert_eq!(
        results
            .iter()
            .map(|p| (p.partition, p.offset))
            .collect::<Vec<_>>(),
        vec![(0, 0), (1, 0)]
    );
}

#[fluvio_future::test]
async fn test_search_topic_no_match_and_no_partitions() {
    let (_broker, client) = people().await;
    let partitions = client.partitions("people").await.expect("partitions");

    let none = client
        .search_topic(&partitions, "carol", false, |_, _| {})
        .await
        .expect("search");
    let empty = client
        .search_topic(&[], "carol", false, |_, _| {})
        .await
        .expect("search");

    assert!(none.is_empty());
    assert!(empty.is_empty());
}

#[fluvio_future::test]
async fn test_first_result_only_with_matches_everywhere() {
    //given
    let broker = MemoryBroker::new();
    broker.create_topic("crowd", 4).await;
    for partition in 0..4 {
        for i in 0..10 {
            let name = if i == partition { "bob" } else { "alice" };
            broker
                .produce("crowd", partition, format!("{{\"name\": \"{name}\"}}"))
                .await
                .expect("produce");
        }
    }
    let client = Client::new(config(), broker.clone());
    let partitions = client.partitions("crowd").await.expect("partitions");

    //when
    let first = client
        .search_topic(&partitions, "bob", true, |_, _| {})
        .await
        .expect("search");
    let all = client
        .search_topic(&partitions, "bob", false, |_, _| {})
        .await
        .expect("search");

    //then
    assert_eq!(first.len(), 1);
    // whichever partition won, it sits on its own match
    assert_eq!(i64::from(first[0].partition), first[0].offset);
    assert_eq!(all.len(), 4);
}

#[fluvio_future::test]
async fn test_first_result_stops_other_tasks() {
    //given
    let broker = MemoryBroker::new();
    broker.create_topic("big", 2).await;
    broker.produce("big", 0, "needle").await.expect("produce");
    for _ in 0..2000 {
        broker.produce("big", 1, "hay").await.expect("produce");
    }
    broker.set_read_delay(Duration::from_millis(1)).await;
    let client = Client::new(config(), broker.clone());
    let partitions = client.partitions("big").await.expect("partitions");

    //when
    let results = client
        .search_topic(&partitions, "needle", true, |_, _| {})
        .await
        .expect("search");
    fluvio_future::timer::sleep(Duration::from_millis(100)).await;
    let reads_after_cancel = broker.reads("big", 1).await;
    fluvio_future::timer::sleep(Duration::from_millis(100)).await;

    //then
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].partition, 0);
    assert!(reads_after_cancel < 2000);
    assert!(broker.reads("big", 1).await <= reads_after_cancel + 1);
}

#[fluvio_future::test]
async fn test_first_error_aborts_search() {
    //given
    let (broker, client) = people().await;
    broker.poison("people", 1).await.expect("poison");
    let partitions = client.partitions("people").await.expect("partitions");

    //when
    let result = client
        .search_topic(&partitions, "nobody", false, |_, _| {})
        .await;

    //then
    assert!(matches!(result, Err(KcliError::Consume { partition: 1, .. })));
}

#[fluvio_future::test]
async fn test_directory_lists_topics_and_offsets() {
    //given
    let (broker, client) = people().await;
    broker.create_topic("empty", 1).await;
    broker.truncate("people", 1, 5).await.expect("truncate");

    //when
    let topics = client.list_topics().await.expect("topics");
    let partitions = client.partitions("people").await.expect("partitions");
    let missing = client.partitions("nope").await;

    //then
    assert_eq!(topics.into_iter().collect::<Vec<_>>(), vec!["empty", "people"]);
    assert_eq!(partitions[1].start, 5);
    assert_eq!(partitions[1].offset, 5);
    assert_eq!(partitions[1].end, 20);
    assert!(matches!(missing, Err(KcliError::TopicNotFound(_))));
}

#[fluvio_future::test]
async fn test_unreachable_broker() {
    let broker = MemoryBroker::new();
    broker.set_offline(true);

    let result = Client::connect(config(), broker).await;

    assert!(matches!(result, Err(KcliError::Connect(_))));
}
