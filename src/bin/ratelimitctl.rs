//! `ratelimitctl` — a manual exerciser for the throttlecore engine.
//!
//! Not part of the library's public contract; a harness for poking a
//! [`throttlecore::engine::Limiter`] from the command line against either
//! the in-process store or a real Redis instance, in the same spirit as the
//! teacher crate's own demo binary.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use throttlecore::config::{RemoteConfig, Topology};
use throttlecore::engine::Limiter;
use throttlecore::observability::TracingSink;
use throttlecore::rule::{Rule, Strategy};
use throttlecore::store::local::LocalStore;
use throttlecore::store::remote::RemoteStore;
use throttlecore::Store;

#[derive(Parser)]
#[command(name = "ratelimitctl", about = "Exercise the throttlecore rate limiter")]
struct Cli {
    /// Identity to check against, e.g. `user:42`.
    #[arg(short, long, default_value = "cli-user")]
    identity: String,

    /// Limit spec, e.g. `10/second` or `100/minute`.
    #[arg(short, long, default_value = "10/second")]
    limit: String,

    /// Limiting algorithm to apply.
    #[arg(short, long, value_enum, default_value = "sliding-window")]
    strategy: CliStrategy,

    /// Burst capacity for bucket strategies. Defaults to the limit's count.
    #[arg(long)]
    capacity: Option<u32>,

    #[command(subcommand)]
    backend: Backend,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliStrategy {
    SlidingWindow,
    FixedWindow,
    TokenBucket,
    LeakyBucket,
}

impl From<CliStrategy> for Strategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::SlidingWindow => Strategy::SlidingWindow,
            CliStrategy::FixedWindow => Strategy::FixedWindow,
            CliStrategy::TokenBucket => Strategy::TokenBucket,
            CliStrategy::LeakyBucket => Strategy::LeakyBucket,
        }
    }
}

#[derive(Subcommand)]
enum Backend {
    /// Run against the in-process fallback store only.
    Local,
    /// Run against a Redis instance.
    Redis {
        /// Redis host.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Redis port.
        #[arg(long, default_value_t = 6379)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut builder = Rule::builder(&cli.limit)?.strategy(cli.strategy.into());
    if let Some(capacity) = cli.capacity {
        builder = builder.capacity(capacity);
    }
    let rule = builder.build()?;
    let sink = Arc::new(TracingSink::new());

    let limiter = match &cli.backend {
        Backend::Local => Limiter::new(Arc::new(LocalStore::new())).with_sink(sink.clone()),
        Backend::Redis { host, port } => {
            let store: Arc<dyn Store> = Arc::new(RemoteStore::new(RemoteConfig {
                host: host.clone(),
                port: *port,
                topology: Topology::Single,
                ..RemoteConfig::default()
            }));
            Limiter::new(store)
                .with_fallback(Arc::new(LocalStore::new()))
                .with_sink(sink.clone())
        }
    };

    let result = limiter.check(&cli.identity, &[rule]).await?;

    if result.allowed {
        println!("ALLOW  identity={}", cli.identity);
    } else {
        println!(
            "DENY   identity={} retry_after={}s",
            cli.identity, result.retry_after_seconds
        );
    }
    println!(
        "sink   allowed={} violations={} latency_samples={}",
        sink.allowed_count(),
        sink.violation_count(),
        sink.latency_sample_count(),
    );

    Ok(())
}
