//! Wrapping a file key to a device recipient, and unwrapping it with the
//! device's help.
//!
//! Wrap is purely local. Unwrap needs the device for exactly one secret
//! operation (Get Shared Secret); everything else happens on the host.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use k256::NonZeroScalar;
use rand::{CryptoRng, RngCore};
use tracing::debug;
use zeroize::Zeroizing;

use crate::client::LedgerClient;
use crate::crypto::{self, FileKey, FILE_KEY_LEN, POINT_LEN, WRAPPED_FILE_KEY_LEN};
use crate::error::LedgerError;
use crate::identity::IdentityTag;
use crate::keys::RecipientKey;
use crate::transport::Transport;

/// First argument of the stanza line.
pub const STANZA_TAG: &str = "ledger";

/// A wrapped file key: the ephemeral share and the sealed body.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Stanza {
    pub ephemeral_share: [u8; POINT_LEN],
    pub body: Vec<u8>,
}

impl Stanza {
    /// Text form:
    ///
    /// ```text
    /// -> ledger <base64 ephemeral share>
    /// <base64 body>
    /// ```
    pub fn encode(&self) -> String {
        format!(
            "-> {} {}\n{}\n",
            STANZA_TAG,
            STANDARD_NO_PAD.encode(self.ephemeral_share),
            STANDARD_NO_PAD.encode(&self.body)
        )
    }

    pub fn parse(text: &str) -> Result<Self, LedgerError> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let header = lines
            .next()
            .ok_or_else(|| LedgerError::invalid("stanza is empty"))?;
        let args: Vec<&str> = header.split_whitespace().collect();
        match args.as_slice() {
            ["->", tag, share] if *tag == STANZA_TAG => {
                let share = decode_b64(share, "ephemeral share")?;
                let ephemeral_share: [u8; POINT_LEN] = share.try_into().map_err(|v: Vec<u8>| {
                    LedgerError::invalid(format!(
                        "ephemeral share must be {} bytes, got {}",
                        POINT_LEN,
                        v.len()
                    ))
                })?;
                let body: String = lines.collect();
                if body.is_empty() {
                    return Err(LedgerError::invalid("stanza has no body"));
                }
                let body = decode_b64(&body, "body")?;
                Ok(Stanza {
                    ephemeral_share,
                    body,
                })
            }
            ["->", tag, ..] if *tag != STANZA_TAG => Err(LedgerError::invalid(format!(
                "not a {} stanza: {}",
                STANZA_TAG, tag
            ))),
            _ => Err(LedgerError::invalid("malformed stanza header")),
        }
    }

    /// Checks that need no device: share on the curve, body of sealed length.
    pub fn validate(&self) -> Result<(), LedgerError> {
        crypto::parse_point(&self.ephemeral_share)?;
        if self.body.len() != WRAPPED_FILE_KEY_LEN {
            return Err(LedgerError::invalid(format!(
                "stanza body must be {} bytes, got {}",
                WRAPPED_FILE_KEY_LEN,
                self.body.len()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Stanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Stanza {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stanza::parse(s)
    }
}

fn decode_b64(s: &str, what: &str) -> Result<Vec<u8>, LedgerError> {
    STANDARD_NO_PAD
        .decode(s)
        .map_err(|e| LedgerError::invalid(format!("invalid base64 in stanza {}: {}", what, e)))
}

// ── Wrap ───────────────────────────────────────────────────────────────────

/// Wrap `file_key` to `recipient` under a fresh ephemeral scalar.
pub fn wrap<R: RngCore + CryptoRng>(
    recipient: &RecipientKey,
    file_key: &[u8; FILE_KEY_LEN],
    rng: &mut R,
) -> Stanza {
    let ephemeral = Zeroizing::new(NonZeroScalar::random(rng));
    wrap_with_ephemeral(recipient, file_key, &ephemeral)
}

/// Wrap a freshly drawn file key. Returns the key alongside its stanza.
pub fn wrap_new_file_key<R: RngCore + CryptoRng>(
    recipient: &RecipientKey,
    rng: &mut R,
) -> (FileKey, Stanza) {
    let file_key = crypto::generate_file_key(rng);
    let stanza = wrap(recipient, &file_key, rng);
    (file_key, stanza)
}

pub(crate) fn wrap_with_ephemeral(
    recipient: &RecipientKey,
    file_key: &[u8; FILE_KEY_LEN],
    ephemeral: &NonZeroScalar,
) -> Stanza {
    let ephemeral_share = crypto::encode_point(&crypto::public_share(ephemeral));
    let x = crypto::shared_x(ephemeral, recipient.public_key());
    let wrap_key = crypto::derive_wrap_key(&x, &ephemeral_share, &recipient.to_bytes());
    Stanza {
        ephemeral_share,
        body: crypto::seal_file_key(&wrap_key, file_key),
    }
}

// ── Unwrap ─────────────────────────────────────────────────────────────────

/// Unwrap using an identity: the device confirms it owns the key behind
/// `identity`, then computes the shared secret.
pub fn unwrap<T: Transport>(
    client: &mut LedgerClient<T>,
    identity: &IdentityTag,
    stanza: &Stanza,
) -> Result<FileKey, LedgerError> {
    stanza.validate()?;
    let recipient = client.confirm_recipient(identity)?;
    debug!(recipient = %recipient, "identity confirmed by device");
    open(client, &recipient, stanza)
}

/// Unwrap when the caller already knows the device's recipient key.
pub fn unwrap_with_recipient<T: Transport>(
    client: &mut LedgerClient<T>,
    recipient: &RecipientKey,
    stanza: &Stanza,
) -> Result<FileKey, LedgerError> {
    stanza.validate()?;
    open(client, recipient, stanza)
}

fn open<T: Transport>(
    client: &mut LedgerClient<T>,
    recipient: &RecipientKey,
    stanza: &Stanza,
) -> Result<FileKey, LedgerError> {
    let x = client.shared_secret(&stanza.ephemeral_share)?;
    let wrap_key = crypto::derive_wrap_key(&x, &stanza.ephemeral_share, &recipient.to_bytes());
    crypto::open_file_key(&wrap_key, &stanza.body)
}
