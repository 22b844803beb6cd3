//! Host-side client for the device application.
//!
//! Owns one transport and issues one command per call. Answers are checked
//! for shape before anything is returned to the caller.

use tracing::debug;
use zeroize::Zeroizing;

use crate::apdu::{ApduCommand, Instruction};
use crate::crypto::{self, POINT_LEN, SHARED_SECRET_LEN};
use crate::error::LedgerError;
use crate::identity::IdentityTag;
use crate::keys::RecipientKey;
use crate::transport::Transport;

pub struct LedgerClient<T: Transport> {
    transport: T,
}

impl<T: Transport> LedgerClient<T> {
    pub fn new(transport: T) -> Self {
        LedgerClient { transport }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Get Recipient (0x02). May prompt on the device.
    pub fn get_recipient(&mut self) -> Result<RecipientKey, LedgerError> {
        let data = self.call(Instruction::GetRecipient, Vec::new())?;
        recipient_from_answer(&data)
    }

    /// Confirm Recipient (0x01): ask the device to prove it owns the key
    /// behind `tag`.
    pub fn confirm_recipient(&mut self, tag: &IdentityTag) -> Result<RecipientKey, LedgerError> {
        let data = self.call(Instruction::ConfirmRecipient, tag.as_bytes().to_vec())?;
        let recipient = recipient_from_answer(&data)?;
        if recipient.tag() != *tag {
            return Err(LedgerError::UnexpectedResponse(
                "confirmed key does not hash to the identity tag".into(),
            ));
        }
        Ok(recipient)
    }

    /// Get Shared Secret (0x03): X coordinate of `d · ephemeral_share`.
    pub fn shared_secret(
        &mut self,
        ephemeral_share: &[u8; POINT_LEN],
    ) -> Result<Zeroizing<[u8; SHARED_SECRET_LEN]>, LedgerError> {
        crypto::parse_point(ephemeral_share)?;
        let data = Zeroizing::new(self.call(Instruction::GetSharedSecret, ephemeral_share.to_vec())?);
        if data.len() != SHARED_SECRET_LEN {
            return Err(LedgerError::UnexpectedResponse(format!(
                "shared secret must be {} bytes, got {}",
                SHARED_SECRET_LEN,
                data.len()
            )));
        }
        let mut secret = Zeroizing::new([0u8; SHARED_SECRET_LEN]);
        secret.copy_from_slice(&data);
        Ok(secret)
    }

    fn call(&mut self, ins: Instruction, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        debug!(?ins, len = data.len(), "sending command");
        let answer = self.transport.exchange(&ApduCommand::new(ins, data))?;
        debug!(?ins, sw = answer.retcode(), len = answer.data().len(), "answer received");
        answer.into_result()
    }
}

fn recipient_from_answer(data: &[u8]) -> Result<RecipientKey, LedgerError> {
    if data.len() != POINT_LEN {
        return Err(LedgerError::UnexpectedResponse(format!(
            "recipient key must be {} bytes, got {}",
            POINT_LEN,
            data.len()
        )));
    }
    RecipientKey::from_bytes(data).map_err(|_| {
        LedgerError::UnexpectedResponse("recipient key is not a point on secp256k1".into())
    })
}
