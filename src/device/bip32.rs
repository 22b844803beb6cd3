//! BIP32 private child derivation on secp256k1.
//!
//! Only what the device needs: master key from seed, then CKDpriv along a
//! path. Extended keys never leave this module.

use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, NonZeroScalar, PublicKey, Scalar};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::LedgerError;

type HmacSha512 = Hmac<Sha512>;

pub const HARDENED: u32 = 0x8000_0000;

/// `m/6383461'/0'/0`
pub const AGE_PATH: [u32; 3] = [6_383_461 | HARDENED, HARDENED, 0];

const MASTER_KEY: &[u8] = b"Bitcoin seed";

/// Both halves are wiped when a node is dropped.
struct ExtendedKey {
    key: Zeroizing<NonZeroScalar>,
    chain_code: Zeroizing<[u8; 32]>,
}

impl ExtendedKey {
    fn master(seed: &[u8]) -> Result<Self, LedgerError> {
        let i = hmac_sha512(MASTER_KEY, seed);
        ExtendedKey::from_output(&i, None)
    }

    /// Split `I = IL || IR`; the key is `IL` (plus the parent key for children),
    /// the chain code is `IR`.
    fn from_output(i: &[u8; 64], parent: Option<&NonZeroScalar>) -> Result<Self, LedgerError> {
        let mut il = FieldBytes::default();
        il.copy_from_slice(&i[..32]);
        let tweak: Option<Scalar> = Scalar::from_repr(il).into();
        let tweak =
            Zeroizing::new(tweak.ok_or_else(|| LedgerError::invalid("derived key is out of range"))?);

        let scalar = Zeroizing::new(match parent {
            Some(parent) => *tweak + *parent.as_ref(),
            None => *tweak,
        });
        let key: Option<NonZeroScalar> = NonZeroScalar::new(*scalar).into();
        let key = Zeroizing::new(key.ok_or_else(|| LedgerError::invalid("derived key is zero"))?);

        let mut chain_code = Zeroizing::new([0u8; 32]);
        chain_code.copy_from_slice(&i[32..]);
        Ok(ExtendedKey { key, chain_code })
    }

    fn child(&self, index: u32) -> Result<Self, LedgerError> {
        let mut data = Zeroizing::new(Vec::with_capacity(37));
        if index & HARDENED != 0 {
            data.push(0u8);
            data.extend_from_slice(&self.key.to_repr());
        } else {
            let point = PublicKey::from_secret_scalar(&self.key).to_encoded_point(true);
            data.extend_from_slice(point.as_bytes());
        }
        data.extend_from_slice(&index.to_be_bytes());

        let i = hmac_sha512(&self.chain_code[..], &data[..]);
        ExtendedKey::from_output(&i, Some(&*self.key))
    }
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Zeroizing<[u8; 64]> {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Derive the private scalar at `path` from `seed`.
pub fn derive_path(seed: &[u8], path: &[u32]) -> Result<Zeroizing<NonZeroScalar>, LedgerError> {
    let mut node = ExtendedKey::master(seed)?;
    for &index in path {
        node = node.child(index)?;
    }
    Ok(node.key)
}
