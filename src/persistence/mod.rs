use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::Position;

/// On-disk record, keyed by symbol in the file
#[derive(Debug, Serialize, Deserialize)]
struct StoredPosition {
    buy_price: f64,
    amount: f64,
}

/// Open positions keyed by symbol
pub type PositionMap = BTreeMap<String, Position>;

/// JSON file persistence for open positions
///
/// File layout: `{ "BTC/USDT": { "buy_price": 50000.0, "amount": 0.002 } }`
#[derive(Debug, Clone)]
pub struct PositionStore {
    path: PathBuf,
}

impl PositionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load positions
    ///
    /// Never fails: a missing or unreadable file and malformed content all
    /// load as an empty map.
    pub fn load(&self) -> PositionMap {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No position file at {}, starting empty", self.path.display());
                return PositionMap::new();
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read {} ({}), starting with no positions",
                    self.path.display(),
                    e
                );
                return PositionMap::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, StoredPosition>>(&contents) {
            Ok(stored) => stored
                .into_iter()
                .map(|(symbol, p)| {
                    let position = Position::new(symbol.clone(), p.buy_price, p.amount);
                    (symbol, position)
                })
                .collect(),
            Err(e) => {
                tracing::warn!(
                    "Corrupt position file {} ({}), starting with no positions",
                    self.path.display(),
                    e
                );
                PositionMap::new()
            }
        }
    }

    /// Overwrite the file with `positions`
    ///
    /// Writes to a sibling temp file and renames it into place, so a crash
    /// mid-write leaves the previous state intact.
    pub fn save(&self, positions: &PositionMap) -> Result<(), StoreError> {
        let stored: BTreeMap<&str, StoredPosition> = positions
            .iter()
            .map(|(symbol, p)| {
                (
                    symbol.as_str(),
                    StoredPosition {
                        buy_price: p.buy_price,
                        amount: p.amount,
                    },
                )
            })
            .collect();

        let json = serde_json::to_string_pretty(&stored)?;

        let tmp_path = self.tmp_path();
        let io_err = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let mut file = std::fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        tracing::debug!("Saved {} positions to {}", positions.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "positions.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
