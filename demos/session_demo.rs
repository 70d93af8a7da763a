//! Connects to a local session endpoint and prints everything the client
//! surfaces. Point it at a running workstation backend:
//!
//! ```sh
//! cargo run --example session_demo -- ws://127.0.0.1:9443/ws/session rec-0001
//! ```

use medilink::{
    ClientConfig, HostBridge, MediaEngine, MedilinkError, SessionClient, ThumbnailPipeline,
};
use std::sync::Arc;

struct ConsoleEngine;

#[async_trait::async_trait]
impl MediaEngine for ConsoleEngine {
    async fn initialize(&self) -> Result<(), MedilinkError> {
        println!("[engine] initialize");
        Ok(())
    }

    async fn recover_from_error(&self) -> Result<(), MedilinkError> {
        println!("[engine] recover from error");
        Ok(())
    }

    async fn reload_source(&self, url: &str) -> Result<(), MedilinkError> {
        println!("[engine] reload source {url}");
        Ok(())
    }

    fn source_url(&self) -> Option<String> {
        None
    }
}

struct ConsoleThumbnails;

#[async_trait::async_trait]
impl ThumbnailPipeline for ConsoleThumbnails {
    async fn clear_cache(&self) -> Result<(), MedilinkError> {
        println!("[thumbnails] clear cache");
        Ok(())
    }

    async fn rebuild(&self) -> Result<(), MedilinkError> {
        println!("[thumbnails] rebuild");
        Ok(())
    }

    async fn enable_frame_extraction(&self) -> Result<(), MedilinkError> {
        println!("[thumbnails] frame extraction fallback");
        Ok(())
    }

    async fn enable_placeholders(&self) -> Result<(), MedilinkError> {
        println!("[thumbnails] placeholders");
        Ok(())
    }

    fn cache_size(&self) -> usize {
        0
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
                .unwrap_or_else(|_| "medilink=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let endpoint = args
        .next()
        .unwrap_or_else(|| "ws://127.0.0.1:9443/ws/session".to_string());
    let session_id = args.next().unwrap_or_else(|| "rec-0001".to_string());

    let mut config = ClientConfig::default();
    config.connection.endpoint_base = endpoint;

    let (client, mut events) = SessionClient::builder(config)
        .with_media_engine(Arc::new(ConsoleEngine))
        .with_thumbnails(Arc::new(ConsoleThumbnails))
        .with_host_bridge(Arc::new(ConsoleBridge))
        .build()?;

    client.connect(&session_id).await?;
    println!("connected to session {session_id}; ctrl-c to stop");

    loop {
        tokio::select! {
            maybe = events.next() => match maybe {
                Some(event) => println!("[event] {:?}", event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("shutting down");
                client.shutdown().await;
                break;
            }
        }
    }
    Ok(())
}
