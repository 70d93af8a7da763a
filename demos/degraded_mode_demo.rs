//! Demonstrates the degradation ladder without any backend running: the
//! channel exhausts its reconnection budget, recovery falls back to polling,
//! and a collapsed thumbnail pipeline ends in placeholder mode.
//!
//! ```sh
//! cargo run --example degraded_mode_demo
//! ```

use medilink::{
    ClientConfig, ErrorCategory, Failure, HostBridge, MediaEngine, MedilinkError, SessionClient,
    ThumbnailPipeline,
};
use std::sync::Arc;
use std::time::Duration;

struct DeadEngine;

#[async_trait::async_trait]
impl MediaEngine for DeadEngine {
    async fn initialize(&self) -> Result<(), MedilinkError> {
        Err(MedilinkError::Collaborator {
            subsystem: "media engine".to_string(),
            reason: "demo engine never initializes".to_string(),
        })
    }

    async fn recover_from_error(&self) -> Result<(), MedilinkError> {
        Err(MedilinkError::Collaborator {
            subsystem: "media engine".to_string(),
            reason: "demo engine never recovers".to_string(),
        })
    }

    async fn reload_source(&self, _url: &str) -> Result<(), MedilinkError> {
        Err(MedilinkError::Collaborator {
            subsystem: "media engine".to_string(),
            reason: "nothing to reload".to_string(),
        })
    }

    fn source_url(&self) -> Option<String> {
        None
    }
}

struct DeadThumbnails;

#[async_trait::async_trait]
impl ThumbnailPipeline for DeadThumbnails {
    async fn clear_cache(&self) -> Result<(), MedilinkError> {
        Err(dead("cache locked"))
    }

    async fn rebuild(&self) -> Result<(), MedilinkError> {
        Err(dead("rebuild failed"))
    }

    async fn enable_frame_extraction(&self) -> Result<(), MedilinkError> {
        Err(dead("no frames"))
    }

    async fn enable_placeholders(&self) -> Result<(), MedilinkError> {
        Err(dead("placeholders missing"))
    }

    fn cache_size(&self) -> usize {
        0
    }
}

fn dead(reason: &str) -> MedilinkError {
    MedilinkError::Collaborator {
        subsystem: "thumbnails".to_string(),
        reason: reason.to_string(),
    }
}

struct ConsoleBridge;

impl HostBridge for ConsoleBridge {
    fn post_message(&self, payload: &str) {
        println!("[bridge] {payload}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medilink=info".into()),
        )
        .init();

    let mut config = ClientConfig::default();
    // An endpoint nobody is listening on, with a short budget so the ladder
    // is visible in seconds.
    config.connection.endpoint_base = "ws://127.0.0.1:59999/ws/session".to_string();
    config.connection.max_reconnect_attempts = 2;
    config.connection.base_reconnect_delay = Duration::from_millis(250);

    let (client, mut events) = SessionClient::builder(config)
        .with_media_engine(Arc::new(DeadEngine))
        .with_thumbnails(Arc::new(DeadThumbnails))
        .with_host_bridge(Arc::new(ConsoleBridge))
        .build()?;

    println!("connecting to a dead endpoint...");
    let _ = client.connect("rec-demo").await;

    // Watch the reconnection storm exhaust itself and recovery kick in.
    for _ in 0..16 {
        match tokio::time::timeout(Duration::from_secs(10), events.next()).await {
            Ok(Some(event)) => println!("[event] {:?}", event),
            _ => break,
        }
    }

    println!("\nreporting a thumbnail pipeline collapse...");
    let recovered = client
        .report_failure(Failure::new("thumbnail render worker crashed"))
        .await;
    println!("recovered: {recovered}");
    println!("flags now: {:?}", client.flags());

    println!("\nmanual retry of the thumbnail feature:");
    client.retry_category(ErrorCategory::ThumbnailFailed).await?;
    println!("flags now: {:?}", client.flags());

    println!("\nerror history (most recent first):");
    for record in client.error_history().into_iter().take(10) {
        println!(
            "  {} {} {:?} action={:?}",
            record.timestamp.format("%H:%M:%S"),
            record.category,
            record.outcome,
            record.action
        );
    }

    client.shutdown().await;
    Ok(())
}
