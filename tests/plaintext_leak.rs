//! Plaintext leak detection tests.
//!
//! A wrapped stanza must never carry the file key in any readable form:
//! raw bytes, hex or base64.

use age_plugin_ledger::device::{AutoApprove, Device};
use age_plugin_ledger::keys::RecipientKey;
use age_plugin_ledger::wrap;
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use rand::rngs::OsRng;

const FILE_KEY: [u8; 16] = *b"KNOWN-FILE-KEY!!";

fn recipient() -> RecipientKey {
    Device::from_seed(&[0x2a; 32], AutoApprove)
        .expect("device from seed should succeed")
        .recipient()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn test_stanza_body_contains_no_file_key_bytes() {
    let stanza = wrap::wrap(&recipient(), &FILE_KEY, &mut OsRng);
    assert!(
        !contains(&stanza.body, &FILE_KEY),
        "sealed body must not contain the file key bytes"
    );
    assert!(
        !contains(&stanza.ephemeral_share, &FILE_KEY),
        "ephemeral share must not contain the file key bytes"
    );
}

#[test]
fn test_stanza_text_contains_no_encoded_file_key() {
    for _ in 0..8 {
        let text = wrap::wrap(&recipient(), &FILE_KEY, &mut OsRng).encode();
        assert!(!text.contains("KNOWN-FILE-KEY"), "raw file key in stanza text");
        assert!(
            !text.to_ascii_lowercase().contains(&hex::encode(FILE_KEY)),
            "hex file key in stanza text"
        );
        // Standalone base64 of the key.
        let b64 = STANDARD_NO_PAD.encode(FILE_KEY);
        assert!(!text.contains(&b64[..12]), "base64 file key in stanza text");
    }
}
