//! On-disk seed for the software device.
//!
//! The seed is stored as 64 hex characters in `~/.age-plugin-ledger/device_seed`
//! with 0600 permissions.

use anyhow::Context;
use rand::{CryptoRng, RngCore};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

pub const SEED_LEN: usize = 32;

pub fn key_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".age-plugin-ledger"))
}

pub fn seed_path() -> anyhow::Result<PathBuf> {
    Ok(key_dir()?.join("device_seed"))
}

pub fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {} directory", dir.display()))?;
    }
    Ok(())
}

/// Write a seed to disk atomically (write to temp then rename) and set 0600 permissions.
pub fn write_seed_atomic(seed: &[u8; SEED_LEN], dest: &Path) -> anyhow::Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Seed destination path has no parent directory"))?;

    let tmp = parent.join(".device_seed.tmp");
    let encoded = Zeroizing::new(hex::encode(seed));

    std::fs::write(&tmp, encoded.as_bytes())
        .with_context(|| format!("Failed to write seed to {}", tmp.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set 0600 permissions on {}", tmp.display()))?;
    }

    if let Err(e) = std::fs::rename(&tmp, dest) {
        let _ = std::fs::remove_file(&tmp);
        return Err(anyhow::Error::new(e)
            .context(format!("Failed to move seed into place at {}", dest.display())));
    }

    Ok(())
}

/// Load a seed, refusing files readable by group or others.
pub fn load_seed(path: &Path) -> anyhow::Result<Zeroizing<[u8; SEED_LEN]>> {
    check_key_permissions(path)?;
    let content = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed from {}", path.display()))?,
    );
    let raw = Zeroizing::new(
        hex::decode(content.trim())
            .with_context(|| format!("Seed file {} is not valid hex", path.display()))?,
    );
    if raw.len() != SEED_LEN {
        anyhow::bail!(
            "Seed file {} holds {} bytes, expected {}",
            path.display(),
            raw.len(),
            SEED_LEN
        );
    }
    let mut seed = Zeroizing::new([0u8; SEED_LEN]);
    seed.copy_from_slice(&raw);
    Ok(seed)
}

/// Load the seed at `path`, generating and persisting a fresh one if none exists.
///
/// Returns the seed and whether it was newly created.
pub fn load_or_create_seed<R: RngCore + CryptoRng>(
    path: &Path,
    rng: &mut R,
) -> anyhow::Result<(Zeroizing<[u8; SEED_LEN]>, bool)> {
    if path.exists() {
        return Ok((load_seed(path)?, false));
    }
    ensure_parent_dir(path)?;
    let mut seed = Zeroizing::new([0u8; SEED_LEN]);
    rng.fill_bytes(&mut seed[..]);
    write_seed_atomic(&seed, path)?;
    Ok((seed, true))
}

/// Check that the seed file has exactly 0600 permissions (Unix only).
#[cfg(unix)]
pub fn check_key_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;
    let mode = metadata.permissions().mode() & 0o777;
    if mode != 0o600 {
        anyhow::bail!(
            "Seed file {} has insecure permissions {:04o} (expected 0600). Fix with: chmod 600 {}",
            path.display(),
            mode,
            path.display()
        );
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn check_key_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_load_seed() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("device_seed");
        let seed = [0x2au8; SEED_LEN];
        write_seed_atomic(&seed, &path).expect("Failed to write seed");
        let loaded = load_seed(&path).expect("Failed to load seed");
        assert_eq!(*loaded, seed);
    }

    #[test]
    fn test_load_or_create_is_stable() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("device_seed");
        let mut rng = rand::rngs::OsRng;
        let (first, created) = load_or_create_seed(&path, &mut rng).expect("create");
        assert!(created, "first call must create the seed");
        let (second, created) = load_or_create_seed(&path, &mut rng).expect("load");
        assert!(!created, "second call must reuse the seed");
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_load_seed_rejects_wrong_length() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("device_seed");
        write_seed_atomic(&[1u8; SEED_LEN], &path).expect("write");
        std::fs::write(&path, "abcd").expect("overwrite");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .expect("Failed to set permissions");
        }
        let err = load_seed(&path).expect_err("short seed must fail");
        assert!(err.to_string().contains("expected 32"), "got: {}", err);
    }

    #[cfg(unix)]
    #[test]
    fn test_enforce_permissions_rejects_0644() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("device_seed");
        write_seed_atomic(&[3u8; SEED_LEN], &path).expect("write");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))
            .expect("Failed to set permissions");
        let err = load_seed(&path).expect_err("0644 seed must be refused");
        assert!(
            err.to_string().contains("permissions"),
            "Error message should contain 'permissions', got: {}",
            err
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_write_seed_atomic_sets_0600() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("device_seed");
        write_seed_atomic(&[9u8; SEED_LEN], &path).expect("write");
        let mode = std::fs::metadata(&path)
            .expect("Failed to read metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600, "Expected 0600 permissions, got {:04o}", mode);
    }
}
