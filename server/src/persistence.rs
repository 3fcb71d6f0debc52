//! Leaderboard snapshot persisted across restarts

use crate::leaderboard::PlayerStats;
use bincode::{deserialize, serialize};
use log::info;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

pub type Snapshot = HashMap<String, PlayerStats>;

/// Loads a snapshot, returning an empty one when no file exists yet
pub fn load(path: &Path) -> Result<Snapshot, Box<dyn std::error::Error + Send + Sync>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("No saved leaderboard at {}", path.display());
            return Ok(Snapshot::new());
        }
        Err(e) => return Err(e.into()),
    };

    let snapshot: Snapshot = deserialize(&data)?;
    info!(
        "Loaded {} players from {}",
        snapshot.len(),
        path.display()
    );
    Ok(snapshot)
}

pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let data = serialize(snapshot)?;
    fs::write(path, data)?;
    info!("Saved {} players to {}", snapshot.len(), path.display());
    Ok(())
}
