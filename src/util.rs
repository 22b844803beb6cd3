//! Shared helpers for the CLI commands.

use std::io::Read;

use age_plugin_ledger::crypto::{FileKey, FILE_KEY_LEN};
use anyhow::Context;
use zeroize::Zeroizing;

/// Parse a 16-byte file key given as 32 hex characters.
pub fn parse_file_key(s: &str) -> anyhow::Result<FileKey> {
    let raw = Zeroizing::new(hex::decode(s.trim()).context("File key is not valid hex")?);
    if raw.len() != FILE_KEY_LEN {
        anyhow::bail!(
            "File key must be {} bytes ({} hex characters), got {} bytes",
            FILE_KEY_LEN,
            FILE_KEY_LEN * 2,
            raw.len()
        );
    }
    let mut key = Zeroizing::new([0u8; FILE_KEY_LEN]);
    key.copy_from_slice(&raw);
    Ok(key)
}

pub fn read_stdin() -> anyhow::Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read from stdin")?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_key() {
        let key = parse_file_key("000102030405060708090a0b0c0d0e0f\n").expect("valid key");
        assert_eq!(key[15], 0x0f);
    }

    #[test]
    fn test_parse_file_key_wrong_length() {
        let err = parse_file_key("0001").expect_err("short key");
        assert!(err.to_string().contains("16 bytes"), "got: {}", err);
    }

    #[test]
    fn test_parse_file_key_not_hex() {
        assert!(parse_file_key("zz0102030405060708090a0b0c0d0e0f").is_err());
    }
}
