mod demo;
mod shell;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use fluvio_future::task::run_block_on;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kcli_client::config::DEFAULT_ADDRESS;
use kcli_client::{Client, ClientConfig, TlsPolicy};
use kcli_views::{NavError, Session, Stack};

fn main() -> Result<()> {
    let args = Args::parse();
    args.init_logging()?;
    run_block_on(args.process())
}

/// Browse Kafka topics, partitions and messages
#[derive(Debug, Parser)]
#[command(name = "kcli", max_term_width = 100)]
struct Args {
    /// Broker addresses, comma separated or repeated
    #[arg(short = 'a', long = "addresses", default_value = DEFAULT_ADDRESS)]
    addresses: Vec<String>,

    /// Go directly to a topic
    #[arg(short, long)]
    topic: Option<String>,

    /// Go directly to a partition of the topic
    #[arg(short, long, requires = "topic")]
    partition: Option<i32>,

    /// Start the partition at this offset, negative values count from the end
    #[arg(short, long, requires = "partition", allow_negative_numbers = true)]
    offset: Option<i64>,

    /// Write debug logs to this file
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Rows per page
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u16).range(1..))]
    rows: u16,

    /// Upper bound for a single read from a partition
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    read_timeout_ms: u64,

    /// Browse generated data instead of a cluster
    #[arg(long)]
    demo: bool,
}

impl Args {
    fn init_logging(&self) -> Result<()> {
        let Some(path) = &self.log else {
            fluvio_future::subscriber::init_logger();
            return Ok(());
        };

        let file = File::create(path)
            .with_context(|| format!("unable to create log file {}", path.display()))?;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .try_init();
        Ok(())
    }

    fn client_config(&self) -> kcli_client::Result<ClientConfig> {
        let config = ClientConfig::builder()
            .addrs(&self.addresses)
            .read_timeout(Duration::from_millis(self.read_timeout_ms))
            .tls(TlsPolicy::from_env()?)
            .build()?;
        Ok(config)
    }

    async fn process(self) -> Result<()> {
        let config = self.client_config()?;
        let client = if self.demo {
            demo_client(config).await?
        } else {
            connect(config).await?
        };

        let mut stack = match Stack::new(client.clone(), usize::from(self.rows)).await {
            Ok(stack) => stack,
            Err(NavError::NoData) => bail!("no topics found in kafka"),
            Err(err) => return Err(err.into()),
        };
        if let Some(topic) = &self.topic {
            stack.goto(topic, self.partition, self.offset).await?;
        }

        let session = Session::new(stack, std::io::stdout());
        // blocked on stdin until the next line, left to die with the process
        let _input = shell::spawn_stdin(session.sender());
        let result = session.run().await;
        client.close().await;
        result?;
        Ok(())
    }
}

async fn demo_client(config: ClientConfig) -> Result<Client> {
    let broker = kcli_client::broker::MemoryBroker::new();
    let mut rng = StdRng::from_entropy();
    demo::seed(&broker, &mut rng).await?;
    info!("browsing demo data");
    Ok(Client::new(config, broker))
}

#[cfg(feature = "kafka")]
async fn connect(config: ClientConfig) -> Result<Client> {
    let broker = kcli_client::broker::KafkaBroker::connect(&config).await?;
    info!(brokers = %config.bootstrap_servers(), "connected");
    Ok(Client::connect(config, broker).await?)
}

#[cfg(not(feature = "kafka"))]
async fn connect(config: ClientConfig) -> Result<Client> {
    Err(kcli_client::KcliError::Connect(format!(
        "cannot reach {}, this build has no kafka support, rebuild with `--features kafka` or pass --demo",
        config.bootstrap_servers()
    ))
    .into())
}
