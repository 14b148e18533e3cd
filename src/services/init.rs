//! Startup helpers:
//! - building the data service from configuration
//! - background worker spawn helpers
//!
//! Keeps the wiring out of `main.rs`.

use std::{sync::Arc, time::Duration};

use anyhow::Result;

use crate::config::Config;
use crate::db::SheetStore;
use crate::services::data::DataService;
use crate::services::session::FileSessionStore;
use crate::services::sheets::GoogleSheetsClient;

/// Build the data service against the real Sheets API and restore the saved session.
pub async fn init_service(config: &Config) -> Result<Arc<DataService>> {
    tracing::info!(
        "Using Sheets API at {} (timeout {}s)",
        config.sheets.api_base_url,
        config.sheets.request_timeout_seconds
    );
    let client = GoogleSheetsClient::new(
        &config.sheets.api_base_url,
        config.sheets.request_timeout_seconds,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create Sheets client: {}", e))?;

    let store = SheetStore::new(Arc::new(client), config.sheets.tables.clone());
    tracing::info!("Session file: {}", config.session.path);
    let sessions = Arc::new(FileSessionStore::new(&config.session.path));

    let service = Arc::new(DataService::new(
        store,
        sessions,
        config.booking.clone(),
    ));
    service.restore().await;

    Ok(service)
}

/// Spawn background workers:
/// - periodic full sync while auto-sync is on and a session is active
///
/// Returns the `JoinHandle`s so callers can await shutdown. Each worker exits
/// when the `shutdown` broadcast fires.
pub fn spawn_background_workers(
    service: Arc<DataService>,
    interval: Duration,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    // Auto-sync worker
    {
        let mut shutdown_rx = shutdown.subscribe();
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Auto-sync worker shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }

                if !service.auto_sync_active() {
                    continue;
                }

                tracing::debug!("Starting periodic sync");
                if let Err(e) = service.sync_all().await {
                    tracing::warn!("Periodic sync failed: {}", e);
                }
            }
        }));
    }

    handles
}
