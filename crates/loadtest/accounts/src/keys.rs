//! Sending account key files: one hex private key per line.

use std::{fs, io::Write as _, path::Path};

use surge_primitives::Wallet;
use tracing::info;

use crate::AccountError;

/// Reads every key in `path`. Blank lines and lines starting with `#` are skipped.
pub fn read_key_file(path: &Path) -> Result<Vec<Wallet>, AccountError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| AccountError::KeyFile { path: path.to_path_buf(), source })?;
    let wallets = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            Wallet::from_hex(line).map_err(|source| AccountError::InvalidKey {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!(path = %path.display(), accounts = wallets.len(), "Loaded sending accounts");
    Ok(wallets)
}

/// Writes the keys of `wallets` to `path`, replacing its contents.
pub fn write_key_file(path: &Path, wallets: &[Wallet]) -> Result<(), AccountError> {
    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(path)?;
        for wallet in wallets {
            writeln!(file, "{}", wallet.to_hex())?;
        }
        file.flush()
    };
    write().map_err(|source| AccountError::KeyFile { path: path.to_path_buf(), source })?;
    info!(path = %path.display(), accounts = wallets.len(), "Wrote sending account keys");
    Ok(())
}
