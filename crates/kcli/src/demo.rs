use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;

use kcli_client::Result;
use kcli_client::broker::MemoryBroker;

const FIRST_NAMES: &[&str] = &[
    "Hector", "Orlando", "Marc", "Tami", "Jorge", "Leigh", "Sabrina", "Jim", "Elaine", "Jeanne",
    "Felix", "Marco", "Kelvin", "Owen", "Debra", "Bob", "Rosalie", "Kerry", "Susan", "Natasha",
];
const LAST_NAMES: &[&str] = &[
    "Gray", "Robertson", "Johnston", "Gregory", "Sullivan", "Powers", "Nash", "Rowe", "Parks",
    "Fleming", "Paul", "Pratt", "Scott", "Maldonado", "Moody", "Myers", "Brock", "Becker",
];

/// How records of a demo topic are laid out
#[derive(Debug, Clone, Copy)]
enum Layout {
    Json,
    Pairs,
    Csv,
}

const TOPICS: &[(&str, Layout, usize)] = &[
    ("stuff", Layout::Json, 2),
    ("things", Layout::Pairs, 3),
    ("whatnot", Layout::Json, 4),
    ("items", Layout::Csv, 5),
    ("other", Layout::Json, 6),
];

pub const RECORDS_PER_TOPIC: usize = 500;

fn person(layout: Layout, rng: &mut impl Rng) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Bob");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Gray");
    let age: u8 = rng.gen_range(18..90);
    match layout {
        Layout::Json => {
            format!(r#"{{"first_name": "{first}", "last_name": "{last}", "age": {age}}}"#)
        }
        Layout::Pairs => format!("first_name: {first}, last_name: {last}, age: {age}"),
        Layout::Csv => format!("{first},{last},{age}"),
    }
}

/// Fills `broker` with a handful of topics of made up people
pub async fn seed(broker: &MemoryBroker, rng: &mut impl Rng) -> Result<()> {
    for (topic, layout, partitions) in TOPICS {
        broker.create_topic(*topic, *partitions).await;
        for i in 0..RECORDS_PER_TOPIC {
            let partition = (i % partitions) as i32;
            broker
                .produce(topic, partition, person(*layout, rng))
                .await?;
        }
    }
    // the last partition of "stuff" has been emptied by retention
    broker.truncate("stuff", 1, i64::MAX).await?;
    info!(topics = TOPICS.len(), "demo data ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use kcli_client::broker::Broker;

    use super::*;

    #[fluvio_future::test]
    async fn test_seed_creates_topics() {
        //given
        let broker = MemoryBroker::new();
        let mut rng = StdRng::seed_from_u64(7);

        //when
        seed(&broker, &mut rng).await.expect("seed");

        //then
        let mut topics = broker.topics().await.expect("topics");
        topics.sort();
        assert_eq!(topics, vec!["items", "other", "stuff", "things", "whatnot"]);
        assert_eq!(broker.offsets("stuff", 1).await.expect("offsets"), (250, 250));
        assert_eq!(broker.offsets("items", 0).await.expect("offsets"), (0, 100));
    }

    #[test]
    fn test_layouts() {
        let mut rng = StdRng::seed_from_u64(1);

        assert!(person(Layout::Json, &mut rng).starts_with("{\"first_name\": "));
        assert!(person(Layout::Pairs, &mut rng).starts_with("first_name: "));
        assert_eq!(person(Layout::Csv, &mut rng).split(',').count(), 3);
    }
}
