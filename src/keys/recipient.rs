use std::fmt;
use std::str::FromStr;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;

use crate::crypto::{self, POINT_LEN};
use crate::error::LedgerError;
use crate::identity::{self, IdentityTag, COMPRESSED_POINT_LEN, RECIPIENT_HRP};

/// A device's long-term secp256k1 public key.
///
/// Always carried as a validated curve point; the wire form is the 65-byte
/// uncompressed encoding returned by Get Recipient and Confirm Recipient.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RecipientKey(PublicKey);

impl RecipientKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        crypto::parse_point(bytes).map(RecipientKey)
    }

    pub fn to_bytes(&self) -> [u8; POINT_LEN] {
        crypto::encode_point(&self.0)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.0
    }

    pub fn tag(&self) -> IdentityTag {
        IdentityTag::for_recipient(&self.to_bytes())
    }

    /// `age1ledger1…` form.
    pub fn to_recipient_string(&self) -> String {
        let encoded = self.0.to_encoded_point(true);
        let mut compressed = [0u8; COMPRESSED_POINT_LEN];
        compressed.copy_from_slice(encoded.as_bytes());
        identity::encode_recipient(&compressed)
    }
}

impl From<PublicKey> for RecipientKey {
    fn from(point: PublicKey) -> Self {
        RecipientKey(point)
    }
}

impl fmt::Display for RecipientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

/// Parses either an `age1ledger1…` recipient string or the 130-character hex
/// encoding of the uncompressed key.
impl FromStr for RecipientKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.to_ascii_lowercase().starts_with(RECIPIENT_HRP) {
            let compressed = identity::decode_recipient(s)?;
            let point = PublicKey::from_sec1_bytes(&compressed)
                .map_err(|_| LedgerError::invalid("recipient is not a point on secp256k1"))?;
            return Ok(RecipientKey(point));
        }
        let raw = hex::decode(s)
            .map_err(|e| LedgerError::invalid(format!("invalid recipient hex: {}", e)))?;
        RecipientKey::from_bytes(&raw)
    }
}
