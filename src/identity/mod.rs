//! Identity codec: bech32 encodings for identity tags and recipient strings.
//!
//! An identity is `AGE-PLUGIN-LEDGER-1…`, the bech32 encoding of a 32-byte tag
//! equal to SHA-256 of the device's uncompressed recipient key. A recipient
//! string is `age1ledger1…`, the bech32 encoding of the compressed key.

use std::fmt;
use std::str::FromStr;

use bech32::{FromBase32, ToBase32, Variant};
use sha2::{Digest, Sha256};

use crate::crypto::POINT_LEN;
use crate::error::LedgerError;

/// Human-readable part of identity strings (the separator `1` follows it).
pub const IDENTITY_HRP: &str = "age-plugin-ledger-";

/// Human-readable part of recipient strings.
pub const RECIPIENT_HRP: &str = "age1ledger";

pub const TAG_LEN: usize = 32;

/// Length of a compressed SEC1 point.
pub const COMPRESSED_POINT_LEN: usize = 33;

/// 32-byte tag binding an identity string to a recipient key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IdentityTag([u8; TAG_LEN]);

impl IdentityTag {
    pub fn from_bytes(bytes: [u8; TAG_LEN]) -> Self {
        IdentityTag(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }

    /// SHA-256 over the 65-byte uncompressed recipient key.
    pub fn for_recipient(recipient: &[u8; POINT_LEN]) -> Self {
        let digest = Sha256::digest(recipient);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&digest);
        IdentityTag(tag)
    }
}

impl fmt::Display for IdentityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_identity(self))
    }
}

impl FromStr for IdentityTag {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_identity(s)
    }
}

/// Encode a tag as an upper-case identity string.
pub fn encode_identity(tag: &IdentityTag) -> String {
    bech32::encode(IDENTITY_HRP, tag.0.to_base32(), Variant::Bech32)
        .expect("bech32 encode is infallible for fixed-length input")
        // age identities are conventionally shown upper case
        .to_ascii_uppercase()
}

/// Decode an identity string back to its tag.
///
/// Accepts all-upper or all-lower case. Rejects checksum failures, a foreign
/// HRP, the bech32m variant and payloads that are not exactly 32 bytes.
pub fn decode_identity(s: &str) -> Result<IdentityTag, LedgerError> {
    let bytes = decode_payload(s.trim(), IDENTITY_HRP, "identity")?;
    let len = bytes.len();
    let tag: [u8; TAG_LEN] = bytes.try_into().map_err(|_| {
        LedgerError::invalid(format!(
            "identity payload must be {} bytes, got {}",
            TAG_LEN, len
        ))
    })?;
    Ok(IdentityTag(tag))
}

/// Encode a compressed recipient key as a lower-case `age1ledger1…` string.
pub fn encode_recipient(compressed: &[u8; COMPRESSED_POINT_LEN]) -> String {
    bech32::encode(RECIPIENT_HRP, compressed.to_base32(), Variant::Bech32)
        .expect("bech32 encode is infallible for fixed-length input")
}

/// Decode a recipient string to its compressed key bytes.
///
/// Only the encoding is checked here; curve membership is the caller's concern.
pub fn decode_recipient(s: &str) -> Result<[u8; COMPRESSED_POINT_LEN], LedgerError> {
    let bytes = decode_payload(s.trim(), RECIPIENT_HRP, "recipient")?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        LedgerError::invalid(format!(
            "recipient payload must be {} bytes, got {}",
            COMPRESSED_POINT_LEN, len
        ))
    })
}

fn decode_payload(s: &str, expected_hrp: &str, what: &str) -> Result<Vec<u8>, LedgerError> {
    let (hrp, data, variant) = bech32::decode(s)
        .map_err(|e| LedgerError::invalid(format!("invalid {} encoding: {}", what, e)))?;
    if hrp != expected_hrp {
        return Err(LedgerError::invalid(format!(
            "invalid {} prefix '{}', expected '{}'",
            what, hrp, expected_hrp
        )));
    }
    if variant != Variant::Bech32 {
        return Err(LedgerError::invalid(format!(
            "{} must use bech32, not bech32m",
            what
        )));
    }
    Vec::<u8>::from_base32(&data)
        .map_err(|e| LedgerError::invalid(format!("invalid {} payload: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_vectors::*;

    const FIXTURE_IDENTITY: &str =
        "AGE-PLUGIN-LEDGER-1WH90T6PD06QN907ADRARJTDMR20K7K8HQQVY8RX7PSVGS5P3Q7PQLHDJXV";
    const FIXTURE_RECIPIENT: &str = "04c6b1fec4cbbb3a3b1ff505959b4e2164760dd5b309139f2e7e60bde118969d07986c1829490c6a0d0b614816e22f204572a97708465e38b1a2a49fa3133c80c2";

    #[test]
    fn test_fixture_identity_is_sha256_of_recipient() {
        let tag = decode_identity(FIXTURE_IDENTITY).expect("fixture identity should decode");
        let expected = IdentityTag::for_recipient(&bytes(FIXTURE_RECIPIENT));
        assert_eq!(tag, expected);
    }

    #[test]
    fn test_encode_identity_reproduces_fixture() {
        let tag = IdentityTag::for_recipient(&bytes(FIXTURE_RECIPIENT));
        assert_eq!(encode_identity(&tag), FIXTURE_IDENTITY);
    }

    #[test]
    fn test_identity_round_trip_edge_tags() {
        for tag in [[0u8; 32], [0xffu8; 32], bytes::<32>(DEVICE_TAG)] {
            let tag = IdentityTag::from_bytes(tag);
            let decoded = decode_identity(&encode_identity(&tag)).expect("round trip");
            assert_eq!(decoded, tag);
        }
    }

    #[test]
    fn test_identity_round_trip_random_tags() {
        use rand::RngCore;

        let mut rng = rand::rngs::OsRng;
        for _ in 0..256 {
            let mut raw = [0u8; TAG_LEN];
            rng.fill_bytes(&mut raw);
            let tag = IdentityTag::from_bytes(raw);
            let encoded = encode_identity(&tag);
            assert!(encoded.starts_with("AGE-PLUGIN-LEDGER-1"), "got {}", encoded);
            assert_eq!(decode_identity(&encoded).expect("round trip"), tag);
            assert_eq!(
                decode_identity(&encoded.to_ascii_lowercase()).expect("lower-case round trip"),
                tag
            );
        }
    }

    #[test]
    fn test_device_identity_vector() {
        let tag = IdentityTag::for_recipient(&bytes(DEVICE_RECIPIENT));
        assert_eq!(hex::encode(tag.as_bytes()), DEVICE_TAG);
        assert_eq!(tag.to_string(), DEVICE_IDENTITY);
    }

    #[test]
    fn test_decode_identity_accepts_lower_case() {
        let lower = FIXTURE_IDENTITY.to_ascii_lowercase();
        assert_eq!(
            decode_identity(&lower).expect("lower case should decode"),
            decode_identity(FIXTURE_IDENTITY).expect("upper case should decode")
        );
    }

    #[test]
    fn test_decode_identity_rejects_bad_checksum() {
        let mut corrupted = FIXTURE_IDENTITY.to_string();
        corrupted.pop();
        corrupted.push('Q');
        let err = decode_identity(&corrupted).expect_err("bad checksum must fail");
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_decode_identity_rejects_wrong_hrp() {
        let tag = IdentityTag::from_bytes([7u8; 32]);
        let foreign = bech32::encode("age-plugin-yubikey-", tag.as_bytes().to_base32(), Variant::Bech32)
            .expect("encode");
        let err = decode_identity(&foreign).expect_err("foreign HRP must fail");
        assert!(err.to_string().contains("prefix"), "got: {}", err);
    }

    #[test]
    fn test_decode_identity_rejects_bech32m() {
        let encoded = bech32::encode(IDENTITY_HRP, [7u8; 32].to_base32(), Variant::Bech32m)
            .expect("encode");
        let err = decode_identity(&encoded).expect_err("bech32m must fail");
        assert!(err.to_string().contains("bech32m"), "got: {}", err);
    }

    #[test]
    fn test_decode_identity_rejects_wrong_length() {
        let short = bech32::encode(IDENTITY_HRP, [7u8; 31].to_base32(), Variant::Bech32)
            .expect("encode");
        let err = decode_identity(&short).expect_err("31-byte payload must fail");
        assert!(err.to_string().contains("32 bytes"), "got: {}", err);
    }

    #[test]
    fn test_recipient_string_vector() {
        let compressed = decode_recipient(DEVICE_RECIPIENT_STRING).expect("vector should decode");
        assert_eq!(encode_recipient(&compressed), DEVICE_RECIPIENT_STRING);
        assert!(compressed[0] == 0x02 || compressed[0] == 0x03);
    }

    #[test]
    fn test_recipient_string_rejects_identity_hrp() {
        let result = decode_recipient(DEVICE_IDENTITY);
        assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
    }
}
