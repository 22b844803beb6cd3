//! Software rendition of the hardware wallet application.
//!
//! The device holds one secp256k1 key derived from its seed at
//! `m/6383461'/0'/0` and answers three instructions:
//!
//! | INS  | Name             | Data in             | Data out           |
//! |------|------------------|---------------------|--------------------|
//! | 0x01 | Confirm Recipient| 32-byte tag         | 65-byte recipient  |
//! | 0x02 | Get Recipient    | none                | 65-byte recipient  |
//! | 0x03 | Get Shared Secret| 65-byte point       | 32-byte X          |
//!
//! Every failure is answered with a status word; the device stays usable
//! after any error.

pub mod approval;
pub mod bip32;
pub mod server;

use k256::elliptic_curve::subtle::ConstantTimeEq;
use k256::NonZeroScalar;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::apdu::{ApduAnswer, ApduCommand, Instruction, StatusWord, CLA};
use crate::crypto::{self, POINT_LEN};
use crate::error::LedgerError;
use crate::identity::TAG_LEN;
use crate::keys::RecipientKey;
use crate::transport::Transport;

pub use approval::{Approver, AutoApprove, DenyAll};

const RECIPIENT_PROMPT: &str = "Send recipient";
const SHARED_SECRET_PROMPT: &str = "Send decryption key";

pub struct Device<A: Approver = AutoApprove> {
    secret: Zeroizing<NonZeroScalar>,
    recipient: RecipientKey,
    approver: A,
}

impl<A: Approver> Device<A> {
    pub fn from_seed(seed: &[u8], approver: A) -> Result<Self, LedgerError> {
        let secret = bip32::derive_path(seed, &bip32::AGE_PATH)?;
        let recipient = RecipientKey::from(crypto::public_share(&secret));
        debug!(recipient = %recipient, "device key derived");
        Ok(Device {
            secret,
            recipient,
            approver,
        })
    }

    pub fn recipient(&self) -> RecipientKey {
        self.recipient
    }

    /// Handle one raw APDU and return the encoded answer.
    pub fn process(&mut self, raw: &[u8]) -> Vec<u8> {
        let answer = match ApduCommand::decode(raw) {
            Ok(command) => self.handle(&command),
            Err(sw) => {
                warn!(len = raw.len(), sw = ?sw, "malformed APDU");
                ApduAnswer::error(sw)
            }
        };
        answer.encode()
    }

    pub fn handle(&mut self, command: &ApduCommand) -> ApduAnswer {
        match self.dispatch(command) {
            Ok(data) => ApduAnswer::success(data),
            Err(sw) => {
                warn!(ins = command.ins, sw = ?sw, "request refused");
                ApduAnswer::error(sw)
            }
        }
    }

    fn dispatch(&mut self, command: &ApduCommand) -> Result<Vec<u8>, StatusWord> {
        if command.cla != CLA {
            return Err(StatusWord::ClaNotSupported);
        }
        match Instruction::try_from(command.ins)? {
            Instruction::ConfirmRecipient => self.confirm_recipient(&command.data),
            Instruction::GetRecipient => self.get_recipient(),
            Instruction::GetSharedSecret => self.get_shared_secret(&command.data),
        }
    }

    // ── Instructions ───────────────────────────────────────────────────────

    /// No user approval: the host already proved it knows the tag.
    fn confirm_recipient(&mut self, data: &[u8]) -> Result<Vec<u8>, StatusWord> {
        if data.len() != TAG_LEN {
            return Err(StatusWord::DataError);
        }
        let tag = self.recipient.tag();
        if !bool::from(data.ct_eq(&tag.as_bytes()[..])) {
            return Err(StatusWord::TagMismatch);
        }
        debug!("identity tag confirmed");
        Ok(self.recipient.to_bytes().to_vec())
    }

    fn get_recipient(&mut self) -> Result<Vec<u8>, StatusWord> {
        if !self.approver.approve(RECIPIENT_PROMPT) {
            return Err(StatusWord::DeniedByUser);
        }
        Ok(self.recipient.to_bytes().to_vec())
    }

    fn get_shared_secret(&mut self, data: &[u8]) -> Result<Vec<u8>, StatusWord> {
        if data.len() != POINT_LEN {
            return Err(StatusWord::DataError);
        }
        let share = crypto::parse_point(data).map_err(|_| StatusWord::InvalidPoint)?;
        if !self.approver.approve(SHARED_SECRET_PROMPT) {
            return Err(StatusWord::DeniedByUser);
        }
        let x = crypto::shared_x(&self.secret, &share);
        debug!("shared secret released");
        Ok(x.to_vec())
    }
}

/// In-process transport: commands still cross the APDU codec.
impl<A: Approver> Transport for Device<A> {
    fn exchange(&mut self, command: &ApduCommand) -> Result<ApduAnswer, LedgerError> {
        let raw = command.encode()?;
        ApduAnswer::decode(&self.process(&raw))
    }
}
