//! Watcher loop: notices newly fetched grid files and runs them through
//! the processor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::processor;
use crate::state::{AppState, Published};

const RECHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Run until shutdown. The published timestamp moves only after the
/// processor reports success, and the two updates happen as one unit
/// from this task; a processing failure keeps the previous raster and
/// snapshot in place.
pub async fn run(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    info!(
        interval_secs = RECHECK_INTERVAL.as_secs(),
        "Starting grid watcher"
    );

    let mut last_processed: Option<PathBuf> = None;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Shutting down watcher");
                break;
            }
            _ = tokio::time::sleep(RECHECK_INTERVAL) => {
                let Some(grid) = state.fetcher.current().await else {
                    continue;
                };
                if last_processed.as_deref() == Some(grid.path.as_path()) {
                    continue;
                }

                let grid_path = grid.path.clone();
                let raster_path = state.config.latest_raster_path();
                let result = tokio::task::spawn_blocking(move || {
                    processor::process(&grid_path, &raster_path)
                })
                .await;

                match result {
                    Ok(Ok(_)) => {
                        counter!("radar_process_total", "outcome" => "ok").increment(1);
                        state
                            .set_published(Published {
                                captured_at: grid.captured_at,
                            })
                            .await;
                        last_processed = Some(grid.path);
                        info!(timestamp = %grid.captured_at, "Data updated");
                    }
                    Ok(Err(e)) => {
                        counter!("radar_process_total", "outcome" => "error").increment(1);
                        error!(error = %e, "Processing failed, keeping previous raster");
                    }
                    Err(e) => {
                        counter!("radar_process_total", "outcome" => "error").increment(1);
                        error!(error = %e, "Processing task panicked");
                    }
                }
            }
        }
    }
}
