//! Basic read-through caching in front of a slow lookup.
//!
//! Run with: RUST_LOG=debug cargo run --example basic_usage

use read_through_cache::{ReadThrough, ReadThroughConfig};
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
struct SearchRequest {
    query: String,
    tags: Vec<String>,
}

async fn slow_search(request: SearchRequest) -> anyhow::Result<Vec<String>> {
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok(request
        .tags
        .iter()
        .map(|tag| format!("{}#{}", request.query, tag))
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Tag order is irrelevant to the search, so sort it before fingerprinting.
    let cache: ReadThrough<SearchRequest, Vec<String>, _, _, _> = ReadThrough::new(slow_search)
        .with_normalizer(|request: &SearchRequest| {
            let mut tags = request.tags.clone();
            tags.sort();
            (request.query.to_lowercase(), tags)
        })
        .with_config(ReadThroughConfig::new().with_namespace("search"));

    let requests = [
        SearchRequest {
            query: "Rust".into(),
            tags: vec!["async".into(), "cache".into()],
        },
        SearchRequest {
            query: "rust".into(),
            tags: vec!["cache".into(), "async".into()],
        },
    ];

    for request in requests {
        let started = Instant::now();
        let results = cache.read_through(request).await?;
        println!("{:?} in {:?}", results, started.elapsed());
    }

    let stats = cache.stats();
    println!(
        "hits={} misses={} hit_ratio={:.2}",
        stats.hits,
        stats.misses,
        stats.hit_ratio()
    );
    Ok(())
}
