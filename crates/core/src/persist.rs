//! JSON persistence of the full ledger state.

use std::io::Write;
use std::path::Path;

use crate::error::PersistError;
use crate::store::LedgerState;

/// Load and validate a state file. Returns `Ok(None)` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<LedgerState>, PersistError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let state: LedgerState = serde_json::from_slice(&bytes)?;
    state.validate().map_err(PersistError::Corrupt)?;

    let summary = state.summary();
    tracing::info!(
        path = %path.display(),
        assets = summary.assets,
        transactions = summary.transactions,
        snapshots = summary.snapshots,
        "loaded ledger state"
    );
    Ok(Some(state))
}

/// Write `state` to `path`, replacing any previous file atomically.
pub fn save(path: &Path, state: &LedgerState) -> Result<(), PersistError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, state)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| PersistError::Io(e.error))?;

    tracing::info!(path = %path.display(), "saved ledger state");
    Ok(())
}
