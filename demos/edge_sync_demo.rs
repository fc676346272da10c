// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Edge sync walkthrough.
//!
//! Demonstrates:
//! 1. Serving a central catalog over HTTP with 20% simulated drops
//! 2. Syncing credentials and content to an edge through the HTTP transport
//! 3. Oldest-first eviction under a tight per-user ceiling
//! 4. An idempotent second run
//! 5. Serving the edge's copy offline
//! 6. Displaying metrics
//!
//! # Run
//!
//! ```bash
//! cargo run --example edge_sync_demo
//! ```

use std::sync::Arc;
use std::time::Instant;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use tokio::net::TcpListener;

use edge_sync::server::{self, central_router, edge_router};
use edge_sync::transport::HttpTransport;
use edge_sync::{
    CentralService, ChunkCodec, ContentStore, CredentialStore, EdgeNode, SyncConfig, SyncOrchestrator,
    TransferSimulator,
};

const KB: usize = 1024;
const POOL: &str = "pool";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           edge-sync: Central → Edge Walkthrough               ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Central authority
    // ─────────────────────────────────────────────────────────────────────────
    let config = SyncConfig {
        // Small ceiling so eviction shows up
        usage_limit_bytes: 24 * KB as u64,
        chunk_max_attempts: 10,
        ..Default::default()
    };

    println!("📦 Seeding central catalog...");
    let store = ContentStore::new();
    for (id, title, size) in [(1, "Video1.mp4", 10 * KB), (2, "Video2.mp4", 5 * KB), (3, "Video3.mp4", 20 * KB)] {
        store.ingest(id, title, (0..size).map(|i| (i % 251) as u8).collect())?;
        println!("   └─ {} ({} bytes)", title, size);
    }

    let central = Arc::new(CentralService::new(
        Arc::new(store),
        Arc::new(CredentialStore::with_users([("user1", "pass1"), ("user2", "pass2")])),
        ChunkCodec::new(config.chunk_size),
        Arc::new(TransferSimulator::new(config.fail_probability)),
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let central_addr = listener.local_addr()?;
    tokio::spawn(server::serve(listener, central_router(central.clone())));
    println!("   ✅ Central listening on http://{} (drop rate {:.0}%)", central_addr, config.fail_probability * 100.0);

    // ─────────────────────────────────────────────────────────────────────────
    // 2. First sync
    // ─────────────────────────────────────────────────────────────────────────
    let transport = HttpTransport::new(format!("http://{}", central_addr), config.request_timeout())?;
    let edge = Arc::new(EdgeNode::from_config(&config));
    let orchestrator = SyncOrchestrator::new(Arc::new(transport), edge.clone(), config);

    println!("\n🔄 Syncing (credentials, then content)...");
    let start = Instant::now();
    let report = orchestrator.run_full(POOL).await?;
    println!("   ├─ fetched:   {:?}", report.fetched);
    println!("   ├─ evicted:   {:?}", report.evicted);
    println!("   ├─ abandoned: {}", report.abandoned.len());
    println!("   ├─ chunks:    {} ({} retried)", report.chunks_fetched, report.retries);
    println!("   └─ took {:?}", start.elapsed());

    let usage = edge.cache().usage(POOL);
    println!(
        "\n💾 Edge holds {:?}: {} / {} bytes",
        edge.cache().owned_ids(POOL),
        usage.bytes_used,
        usage.usage_limit
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Second sync is a no-op
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔁 Syncing again...");
    let again = orchestrator.run(POOL).await?;
    println!("   └─ fetched {:?}, skipped {:?}", again.fetched, again.skipped);

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Edge serves offline
    // ─────────────────────────────────────────────────────────────────────────
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let edge_addr = listener.local_addr()?;
    tokio::spawn(server::serve(listener, edge_router(edge.clone(), POOL)));

    println!("\n🌐 Edge listening on http://{}", edge_addr);
    match edge.login("user2", "pass2") {
        Ok(token) => println!("   ├─ user2 logged in offline (token {})", token),
        Err(e) => println!("   ├─ user2 login failed: {}", e),
    }
    for entry in edge.owned_catalog(POOL) {
        let bytes = edge.read_content(POOL, entry.id)?;
        let intact = central.store().get(entry.id)?.payload == bytes;
        println!("   └─ {} ({} bytes) intact={}", entry.title, entry.size, intact);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📊 Metrics:");
    dump_metrics(&snapshotter);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Walkthrough complete!                      ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

/// Dump all captured metrics
fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut counters: Vec<_> = vec![];
    let mut gauges: Vec<_> = vec![];
    let mut histograms: Vec<_> = vec![];

    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_, key) = composite_key.into_parts();
        let name = key.name().to_string();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        match value {
            DebugValue::Counter(v) => counters.push((name, label_str, v)),
            DebugValue::Gauge(v) => gauges.push((name, label_str, v.into_inner())),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                histograms.push((name, label_str, count, sum));
            }
        }
    }

    counters.sort_by(|a, b| a.0.cmp(&b.0));
    gauges.sort_by(|a, b| a.0.cmp(&b.0));
    histograms.sort_by(|a, b| a.0.cmp(&b.0));

    if !counters.is_empty() {
        println!("   ┌─ Counters (cumulative)");
        for (name, labels, value) in &counters {
            println!("   │  └─ {}{} = {}", name, labels, value);
        }
    }

    if !gauges.is_empty() {
        println!("   ├─ Gauges (current value)");
        for (name, labels, value) in &gauges {
            println!("   │  └─ {}{} = {:.0}", name, labels, value);
        }
    }

    if !histograms.is_empty() {
        println!("   └─ Histograms (distributions)");
        for (name, labels, count, sum) in &histograms {
            println!("      └─ {}{} count={} sum={:.4}", name, labels, count, sum);
        }
    }

    if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
}
