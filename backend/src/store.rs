//! Round snapshot persistence, together with the treasury's credited balances.
//!
//! The snapshot is written to a sibling temp file and renamed over the target,
//! so a crash mid-write leaves the previous snapshot intact.

use anyhow::{Context, Result};
use raffle::Raffle;
use raffle::events::RaffleEvent;
use raffle::snapshot::RoundSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::treasury::Treasury;

/// Contents of the state file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredState {
    pub round: RoundSnapshot,
    /// Lamports credited to past winners, keyed by base58 pubkey.
    #[serde(default)]
    pub credited: BTreeMap<String, u64>,
}

/// Read a snapshot, or `None` when the file does not exist yet.
pub fn load(path: &Path) -> Result<Option<StoredState>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let state = serde_json::from_slice(&bytes)
        .with_context(|| format!("malformed snapshot in {}", path.display()))?;
    Ok(Some(state))
}

pub async fn save(path: &Path, state: &StoredState) -> Result<()> {
    let json = serde_json::to_vec_pretty(state).context("failed to encode snapshot")?;
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &json)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Persist a fresh snapshot after every raffle event until the sink closes.
pub async fn run_recorder(
    raffle: Arc<Raffle>,
    treasury: Arc<Treasury>,
    path: PathBuf,
    mut events: broadcast::Receiver<RaffleEvent>,
) {
    info!(path = %path.display(), "Recording round snapshots");

    loop {
        match events.recv().await {
            Ok(event) => debug!(event = event.name(), "Snapshotting after event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Snapshot recorder lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }

        // Taken after the event, so it reflects at least that transition.
        let state = StoredState {
            round: raffle.snapshot(),
            credited: treasury.credits(),
        };
        if let Err(e) = save(&path, &state).await {
            error!(error = %format!("{e:#}"), "Failed to persist snapshot");
        }
    }

    info!("Event channel closed, snapshot recorder stopping");
}
