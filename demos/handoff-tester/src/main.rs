//! handoff-tester: hammers a `HandoffMap` with one producer and one consumer
//! thread per key and checks every delivery against a reference map.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=keyed_handoff=trace handoff-tester --keys 200 --producer-delay-ms 50
//! ```

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use keyed_handoff::{HandoffError, HandoffMap, MapConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "handoff-tester")]
#[command(about = "Concurrent producer/consumer check for keyed-handoff")]
struct Args {
    /// Number of distinct keys; each gets one producer and one consumer
    #[arg(long, default_value_t = 100)]
    keys: u32,

    /// How long each consumer waits for its value before giving up
    #[arg(long, default_value_t = 10_000)]
    take_timeout_ms: u64,

    /// Delay before each producer publishes
    #[arg(long, default_value_t = 0)]
    producer_delay_ms: u64,
}

/// A producer whose value was not accepted.
#[derive(Debug)]
struct ProductionError {
    key: u32,
    outcome: Result<Option<String>, HandoffError>,
}

/// A consumer that did not receive its reference value.
#[derive(Debug)]
struct ConsumptionError {
    key: u32,
    outcome: Result<Option<String>, HandoffError>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!(?args, "starting hand-off run");

    let reference: Arc<HashMap<u32, String>> = Arc::new(
        (0..args.keys)
            .map(|key| (key, format!("Stringy {}", key)))
            .collect(),
    );
    let map: Arc<HandoffMap<u32, String>> = Arc::new(HandoffMap::with_config(
        MapConfig::default()
            .with_label("handoff-tester")
            .with_initial_capacity(args.keys as usize),
    ));

    let started = Instant::now();
    let take_timeout = Duration::from_millis(args.take_timeout_ms);
    let producer_delay = Duration::from_millis(args.producer_delay_ms);

    let consumers: Vec<_> = (0..args.keys)
        .map(|key| {
            let map = map.clone();
            thread::spawn(move || (key, map.take_timeout(&key, take_timeout)))
        })
        .collect();

    let producers: Vec<_> = (0..args.keys)
        .map(|key| {
            let map = map.clone();
            let reference = reference.clone();
            thread::spawn(move || {
                thread::sleep(producer_delay);
                let value = reference.get(&key).cloned().unwrap_or_default();
                (key, map.put(key, value))
            })
        })
        .collect();

    let mut production_errors = Vec::new();
    for producer in producers {
        match producer.join() {
            Ok((_, Ok(None))) => {}
            Ok((key, outcome)) => production_errors.push(ProductionError { key, outcome }),
            Err(_) => tracing::error!("producer thread panicked"),
        }
    }

    let mut consumption_errors = Vec::new();
    for consumer in consumers {
        match consumer.join() {
            Ok((key, outcome)) => {
                let delivered = matches!(&outcome, Ok(Some(value)) if reference.get(&key) == Some(value));
                if delivered {
                    tracing::debug!(key, "consumed");
                } else {
                    consumption_errors.push(ConsumptionError { key, outcome });
                }
            }
            Err(_) => tracing::error!("consumer thread panicked"),
        }
    }

    for error in &production_errors {
        tracing::warn!(key = error.key, outcome = ?error.outcome, "production error");
    }
    for error in &consumption_errors {
        tracing::warn!(key = error.key, outcome = ?error.outcome, "consumption error");
    }

    let leftover = map.len().unwrap_or(0);
    if let Err(error) = map.clear() {
        tracing::error!(%error, "shutdown failed");
    }

    tracing::info!(
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        production_errors = production_errors.len(),
        consumption_errors = consumption_errors.len(),
        leftover,
        "run complete"
    );

    if production_errors.is_empty() && consumption_errors.is_empty() && leftover == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
