//! Change-aware polling fetcher for the remote mosaic.
//!
//! Each cycle: a HEAD request compares the remote `Last-Modified` token
//! against the last stored one; on a match the cycle is skipped. New data
//! is downloaded with a bounded timeout, gunzipped, and written to a
//! timestamped grid file before any in-memory pointer changes. Cycle
//! errors drive exponential backoff, capped and reset per policy.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use metrics::counter;
use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::Config;

/// Backoff ceiling: ten minutes.
pub const MAX_BACKOFF: Duration = Duration::from_secs(600);

/// Errors from a single fetch cycle. All are caught in the poll loop and
/// drive backoff; none propagate further.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned status {0}")]
    Status(StatusCode),

    #[error("failed to decompress payload: {0}")]
    Decompress(std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The most recently fetched grid file.
#[derive(Debug, Clone)]
pub struct FetchedGrid {
    pub path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

/// Outcome of one poll cycle.
#[derive(Debug)]
pub enum PollOutcome {
    /// Remote token matched the stored one; nothing was downloaded.
    Unchanged,
    Fetched(FetchedGrid),
}

#[derive(Debug, Default)]
struct FetchState {
    current: Option<FetchedGrid>,
    last_modified: Option<String>,
}

/// Polls the remote mosaic and maintains the retained grid-file history.
pub struct Fetcher {
    client: Client,
    config: Config,
    state: RwLock<FetchState>,
}

impl Fetcher {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            state: RwLock::new(FetchState::default()),
        })
    }

    /// The most recently fetched grid, if any.
    pub async fn current(&self) -> Option<FetchedGrid> {
        self.state.read().await.current.clone()
    }

    /// Poll until shutdown. One immediate poll at start, then an
    /// interval-wait loop whose delay follows the backoff policy.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            url = %self.config.source_url,
            interval_secs = self.config.poll_interval.as_secs(),
            "Starting mosaic fetcher"
        );

        let mut delay = self.cycle(self.config.poll_interval).await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down fetcher");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    delay = self.cycle(delay).await;
                }
            }
        }
    }

    /// Run one cycle and return the delay before the next one.
    async fn cycle(&self, current_delay: Duration) -> Duration {
        match self.poll_once().await {
            Ok(PollOutcome::Fetched(grid)) => {
                counter!("radar_fetch_cycles_total", "outcome" => "fetched").increment(1);
                info!(
                    path = %grid.path.display(),
                    captured_at = %grid.captured_at,
                    "Fetched new mosaic"
                );
                next_backoff(current_delay, self.config.poll_interval, true)
            }
            Ok(PollOutcome::Unchanged) => {
                counter!("radar_fetch_cycles_total", "outcome" => "unchanged").increment(1);
                debug!("No new data available");
                next_backoff(current_delay, self.config.poll_interval, true)
            }
            Err(e) => {
                counter!("radar_fetch_cycles_total", "outcome" => "error").increment(1);
                error!(error = %e, "Fetch cycle failed");
                let next = next_backoff(current_delay, self.config.poll_interval, false);
                info!(backoff_secs = next.as_secs(), "Backing off");
                next
            }
        }
    }

    /// One complete cycle: change detection, conditional download,
    /// decompression, file publication and retention sweep.
    pub async fn poll_once(&self) -> Result<PollOutcome, FetchError> {
        // Lightweight change detection. A failed HEAD is not an error:
        // some servers omit the behavior, so fall through to the GET.
        match self.client.head(&self.config.source_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let remote_token = header_string(resp.headers().get(header::LAST_MODIFIED));
                let stored_token = self.state.read().await.last_modified.clone();
                if remote_token.is_some() && remote_token == stored_token {
                    return Ok(PollOutcome::Unchanged);
                }
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "HEAD request failed, proceeding with GET");
            }
            Err(e) => {
                warn!(error = %e, "HEAD request failed, proceeding with GET");
            }
        }

        info!("Fetching new radar data");
        let resp = self.client.get(&self.config.source_url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status()));
        }

        let token = header_string(resp.headers().get(header::LAST_MODIFIED));
        let compressed = resp.bytes().await?;

        // A corrupt download must not mutate any state.
        let mut decompressed = Vec::new();
        GzDecoder::new(&compressed[..])
            .read_to_end(&mut decompressed)
            .map_err(FetchError::Decompress)?;

        let captured_at = token
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc2822(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let path = self.config.grid_file_path(&captured_at);
        tokio::fs::write(&path, &decompressed).await?;
        info!(
            path = %path.display(),
            bytes = decompressed.len(),
            "Saved grid file"
        );

        let grid = FetchedGrid {
            path,
            captured_at,
        };

        // The three pointers move together, and only after the file
        // write above succeeded.
        {
            let mut state = self.state.write().await;
            *state = FetchState {
                current: Some(grid.clone()),
                last_modified: token,
            };
        }

        prune_grid_files(&self.config.data_dir, self.config.max_grid_files);

        Ok(PollOutcome::Fetched(grid))
    }
}

/// Next poll delay under the backoff policy: reset to the base interval
/// on success, double up to [`MAX_BACKOFF`] on failure.
pub fn next_backoff(current: Duration, base: Duration, succeeded: bool) -> Duration {
    if succeeded {
        base
    } else {
        (current * 2).min(MAX_BACKOFF)
    }
}

/// Delete grid files beyond the retention count, newest-first by
/// filename (filenames encode capture time). Failures are logged and
/// non-fatal.
pub fn prune_grid_files(data_dir: &Path, keep: usize) {
    let entries = match std::fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Failed to list data directory for cleanup");
            return;
        }
    };

    let mut grids: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_grid_file(p))
        .collect();

    grids.sort();
    grids.reverse();

    for old in grids.iter().skip(keep) {
        match std::fs::remove_file(old) {
            Ok(()) => debug!(path = %old.display(), "Deleted old grid file"),
            Err(e) => warn!(path = %old.display(), error = %e, "Failed to delete old grid file"),
        }
    }
}

fn is_grid_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("reflectivity_") && n.ends_with(".grib2"))
        .unwrap_or(false)
}

fn header_string(value: Option<&header::HeaderValue>) -> Option<String> {
    value.and_then(|v| v.to_str().ok()).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_to_cap() {
        let base = Duration::from_secs(120);
        let mut delay = base;

        // After k consecutive failures the delay is min(base * 2^k, 600).
        let expected = [240u64, 480, 600, 600];
        for want in expected {
            delay = next_backoff(delay, base, false);
            assert_eq!(delay.as_secs(), want);
        }
    }

    #[test]
    fn test_backoff_resets_on_success() {
        let base = Duration::from_secs(120);
        let delay = next_backoff(Duration::from_secs(600), base, true);
        assert_eq!(delay, base);
    }

    #[test]
    fn test_backoff_small_base() {
        let base = Duration::from_secs(10);
        let mut delay = base;
        for _ in 0..10 {
            delay = next_backoff(delay, base, false);
        }
        assert_eq!(delay, MAX_BACKOFF);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..8)
            .map(|i| format!("reflectivity_20260807_12{:02}00.grib2", i))
            .collect();
        for name in &names {
            std::fs::write(dir.path().join(name), b"grid").unwrap();
        }
        // An unrelated file must never be touched.
        std::fs::write(dir.path().join("latest_radar.rst"), b"raster").unwrap();

        prune_grid_files(dir.path(), 5);

        let mut remaining: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|n| n.ends_with(".grib2"))
            .collect();
        remaining.sort();

        assert_eq!(remaining, names[3..].to_vec(), "the 5 newest must remain");
        assert!(dir.path().join("latest_radar.rst").exists());
    }

    #[test]
    fn test_prune_under_limit_deletes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            std::fs::write(
                dir.path()
                    .join(format!("reflectivity_20260807_12{:02}00.grib2", i)),
                b"grid",
            )
            .unwrap();
        }

        prune_grid_files(dir.path(), 5);

        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 3);
    }
}
