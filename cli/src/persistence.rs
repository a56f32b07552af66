//! Wallet blob persistence: read/write the JSON shape `WalletState::to_blob`
//! produces (spec.md §6). The Merkle tree itself is never persisted here;
//! callers rebuild it by rescanning the chain fixture from block zero.

use std::fs;
use std::path::Path;

use anonpool_core::wallet::{WalletBlob, WalletState};
use anyhow::Context;

pub fn load_wallet(path: &Path) -> anyhow::Result<WalletState> {
    let bytes = fs::read(path)
        .with_context(|| format!("no wallet found at {}; run `init` first", path.display()))?;
    let blob: WalletBlob = serde_json::from_slice(&bytes)?;
    Ok(WalletState::from_blob(&blob)?)
}

/// Write the wallet blob via a temp-file-plus-rename so a crash mid-write
/// never leaves a partially written blob in place (spec.md §5: "either the
/// prior blob remains valid or the new blob replaces it; no partial writes").
pub fn save_wallet(path: &Path, wallet: &WalletState) -> anyhow::Result<()> {
    let blob = wallet.to_blob();
    let bytes = serde_json::to_vec_pretty(&blob)?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &bytes)
        .with_context(|| format!("writing wallet to {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replacing wallet at {}", path.display()))?;
    Ok(())
}
