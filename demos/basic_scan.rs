//! Basic scan example running the six standard probes against the live network.
//!
//! This example shows how to:
//! - Wire the production capabilities
//! - Describe the host environment with a `HostSnapshot`
//! - Run a scan with a progress callback and print the report
//!
//! Run with: cargo run --example basic_scan

use privacyscan::capabilities::{
    Builtin, HostSnapshot, HttpClient, NavigatorInfo, SecurityContext, StunConnector,
};
use privacyscan::prelude::*;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=privacyscan=debug shows every sub-request
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== privacyscan Basic Scan Example ===\n");

    let http = Arc::new(HttpClient::with_defaults()?);

    // A native shell would collect these from its embedded webview.
    let host = HostSnapshot::new()
        .with_navigator(
            NavigatorInfo::new("Mozilla/5.0 (X11; Linux x86_64) privacyscan-demo")
                .with_language("en-US")
                .with_plugin("PDF Viewer"),
        )
        .with_security_context(SecurityContext::new("https:", "example.com").fully_capable())
        .with_patched_builtin(Builtin::Console);

    let caps = Capabilities::new(
        http.clone(),
        http,
        Arc::new(StunConnector::default()),
        Arc::new(host),
    );

    let orchestrator = Orchestrator::builder()
        .with_standard_probes(&caps, &ProbeSettings::default())
        .build()?;

    let progress: ProgressSink = Arc::new(|event: &ProgressEvent| {
        println!(
            "[{:>5.1}%] {} ({}/{})",
            event.progress, event.current, event.completed, event.total
        );
    });

    let report = orchestrator.run_or_fallback(Some(progress)).await;

    println!("\n=== Scan Results ===");
    println!("Report ID: {}", report.id);
    println!("Total duration: {:?}", report.total_duration);
    if report.is_synthetic() {
        println!("(synthetic placeholder results)");
    }

    for (kind, result) in &report.results {
        let badge = match result.status {
            Status::Safe => "OK  ",
            Status::Warning => "WARN",
            Status::Danger => "FAIL",
        };
        println!("[{}] {:<10} {}", badge, kind.key(), result.message);
    }

    let summary = report.summary();
    println!(
        "\nSafe: {}  Warning: {}  Danger: {}",
        summary.safe, summary.warning, summary.danger
    );

    println!("\n=== Full Report ===");
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
