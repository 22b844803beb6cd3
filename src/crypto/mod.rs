//! Crypto module: secp256k1 point handling, ECDH, wrap-key derivation and the
//! ChaCha20-Poly1305 seal used for file keys.
//!
//! Points cross module boundaries as raw 65-byte uncompressed SEC1 encodings;
//! scalars stay inside `k256::NonZeroScalar` and never leave this crate as bytes.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{NonZeroScalar, PublicKey};
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::LedgerError;

/// Length of an uncompressed SEC1 point: 0x04 || X || Y.
pub const POINT_LEN: usize = 65;

/// Length of the X coordinate returned by the device for Get Shared Secret.
pub const SHARED_SECRET_LEN: usize = 32;

/// Length of an age file key.
pub const FILE_KEY_LEN: usize = 16;

/// Sealed file key: 16 bytes ciphertext plus the 16-byte Poly1305 tag.
pub const WRAPPED_FILE_KEY_LEN: usize = FILE_KEY_LEN + 16;

/// HKDF info string for wrap key derivation.
const WRAP_KEY_INFO: &[u8] = b"ledger";

/// Each wrap key seals exactly one file key.
const ZERO_NONCE: [u8; 12] = [0u8; 12];

const UNCOMPRESSED_TAG: u8 = 0x04;

pub type FileKey = Zeroizing<[u8; FILE_KEY_LEN]>;

/// Parse a 65-byte uncompressed secp256k1 point.
///
/// Rejects wrong lengths, compressed or hybrid prefixes and points that are
/// not on the curve.
pub fn parse_point(bytes: &[u8]) -> Result<PublicKey, LedgerError> {
    if bytes.len() != POINT_LEN {
        return Err(LedgerError::invalid(format!(
            "expected a {}-byte uncompressed point, got {} bytes",
            POINT_LEN,
            bytes.len()
        )));
    }
    if bytes[0] != UNCOMPRESSED_TAG {
        return Err(LedgerError::invalid(format!(
            "expected point prefix 0x04, got {:#04x}",
            bytes[0]
        )));
    }
    PublicKey::from_sec1_bytes(bytes)
        .map_err(|_| LedgerError::invalid("point is not on secp256k1"))
}

/// Encode a point in uncompressed SEC1 form.
pub fn encode_point(point: &PublicKey) -> [u8; POINT_LEN] {
    let encoded = point.to_encoded_point(false);
    let mut out = [0u8; POINT_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// `secret * G`
pub fn public_share(secret: &NonZeroScalar) -> PublicKey {
    PublicKey::from_secret_scalar(secret)
}

/// X coordinate of `secret * point`.
pub fn shared_x(secret: &NonZeroScalar, point: &PublicKey) -> Zeroizing<[u8; SHARED_SECRET_LEN]> {
    let shared = k256::ecdh::diffie_hellman(*secret, point.as_affine());
    let mut x = Zeroizing::new([0u8; SHARED_SECRET_LEN]);
    x.copy_from_slice(shared.raw_secret_bytes());
    x
}

/// Derive the 32-byte wrap key.
///
/// HKDF-SHA256 with the shared X coordinate as input keying material,
/// `ephemeral_share || recipient` as salt and `"ledger"` as info.
pub fn derive_wrap_key(
    shared_x: &[u8; SHARED_SECRET_LEN],
    ephemeral_share: &[u8; POINT_LEN],
    recipient: &[u8; POINT_LEN],
) -> Zeroizing<[u8; 32]> {
    let mut salt = [0u8; 2 * POINT_LEN];
    salt[..POINT_LEN].copy_from_slice(ephemeral_share);
    salt[POINT_LEN..].copy_from_slice(recipient);

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared_x);
    let mut okm = Zeroizing::new([0u8; 32]);
    hkdf.expand(WRAP_KEY_INFO, &mut okm[..])
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    okm
}

/// Seal a file key under a wrap key. Output is ciphertext || tag (32 bytes).
pub fn seal_file_key(wrap_key: &[u8; 32], file_key: &[u8; FILE_KEY_LEN]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(wrap_key));
    cipher
        .encrypt(Nonce::from_slice(&ZERO_NONCE), file_key.as_slice())
        .expect("ChaCha20-Poly1305 encryption of a 16-byte message is infallible")
}

/// Open a sealed file key.
///
/// Any tag mismatch is reported as `AuthenticationFailure` and no plaintext is
/// returned.
pub fn open_file_key(wrap_key: &[u8; 32], body: &[u8]) -> Result<FileKey, LedgerError> {
    if body.len() != WRAPPED_FILE_KEY_LEN {
        return Err(LedgerError::invalid(format!(
            "wrapped file key must be {} bytes, got {}",
            WRAPPED_FILE_KEY_LEN,
            body.len()
        )));
    }
    let cipher = ChaCha20Poly1305::new(Key::from_slice(wrap_key));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&ZERO_NONCE), body)
            .map_err(|_| LedgerError::AuthenticationFailure)?,
    );

    let mut file_key = Zeroizing::new([0u8; FILE_KEY_LEN]);
    file_key.copy_from_slice(&plaintext);
    Ok(file_key)
}

/// Draw a fresh file key from the given CSPRNG.
pub fn generate_file_key<R: RngCore + CryptoRng>(rng: &mut R) -> FileKey {
    let mut file_key = Zeroizing::new([0u8; FILE_KEY_LEN]);
    rng.fill_bytes(&mut file_key[..]);
    file_key
}
