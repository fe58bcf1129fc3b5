//! Key files under `<data-dir>/keys/`.
//!
//! Each key is one file holding the hex-encoded 32-byte Ed25519 secret,
//! readable by the owner only.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lockup_protocol::crypto::keys::{Keypair, Pubkey};

pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("keys"),
        }
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.key"))
    }

    /// Write `keypair` under `name`. Refuses to replace an existing key
    /// unless `force` is set.
    pub fn save(&self, name: &str, keypair: &Keypair, force: bool) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create key directory: {}", self.dir.display()))?;

        let path = self.path_of(name);
        if path.exists() && !force {
            bail!("key {name} already exists at {} (use --force to replace it)", path.display());
        }
        std::fs::write(&path, keypair.to_hex())
            .with_context(|| format!("failed to write key to {}", path.display()))?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(path)
    }

    /// Load a keypair from a file path or a stored key name.
    pub fn load(&self, reference: &str) -> Result<Keypair> {
        let direct = Path::new(reference);
        let path = if direct.is_file() {
            direct.to_path_buf()
        } else {
            self.path_of(reference)
        };
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("no key {reference} (looked for {})", path.display()))?;
        Keypair::from_hex(contents.trim())
            .with_context(|| format!("malformed key file {}", path.display()))
    }

    /// A base58 address as-is, otherwise the public key of a stored key.
    pub fn resolve_address(&self, reference: &str) -> Result<Pubkey> {
        if let Ok(address) = Pubkey::from_str(reference) {
            return Ok(address);
        }
        Ok(self.load(reference)?.pubkey())
    }
}
