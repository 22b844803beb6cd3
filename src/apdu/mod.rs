//! APDU wire codec shared by the host client and the device handler.
//!
//! Command layout (short form, ISO 7816-4):
//!
//! ```text
//! Offset  Size  Field
//! 0       1     CLA  (0xE0)
//! 1       1     INS  (instruction code)
//! 2       1     P1   (0x00)
//! 3       1     P2   (0x00)
//! 4       1     Lc   (data length, may be omitted when there is no data)
//! 5       Lc    data
//! ```
//!
//! Answers are `data || SW1 SW2`.

use crate::error::LedgerError;

pub const CLA: u8 = 0xE0;

/// Largest payload a short APDU can carry.
pub const MAX_DATA_LEN: usize = 255;

const HEADER_LEN: usize = 4;

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    ConfirmRecipient = 0x01,
    GetRecipient = 0x02,
    GetSharedSecret = 0x03,
}

impl TryFrom<u8> for Instruction {
    type Error = StatusWord;

    fn try_from(ins: u8) -> Result<Self, Self::Error> {
        match ins {
            0x01 => Ok(Instruction::ConfirmRecipient),
            0x02 => Ok(Instruction::GetRecipient),
            0x03 => Ok(Instruction::GetSharedSecret),
            _ => Err(StatusWord::InsNotSupported),
        }
    }
}

/// Status words emitted by the device.
#[repr(u16)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StatusWord {
    Ok = 0x9000,
    /// Confirm Recipient tag does not match the device key.
    TagMismatch = 0x6af0,
    /// Payload has the wrong size for the instruction.
    DataError = 0x6e77,
    /// The user rejected the request on the device.
    DeniedByUser = 0x69f0,
    /// Payload is well-sized but not a point on secp256k1.
    InvalidPoint = 0x6a80,
    InsNotSupported = 0x6d00,
    ClaNotSupported = 0x6e00,
    /// APDU shorter than its header or inconsistent with Lc.
    WrongLength = 0x6700,
}

impl StatusWord {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        let sw = match code {
            0x9000 => StatusWord::Ok,
            0x6af0 => StatusWord::TagMismatch,
            0x6e77 => StatusWord::DataError,
            0x69f0 => StatusWord::DeniedByUser,
            0x6a80 => StatusWord::InvalidPoint,
            0x6d00 => StatusWord::InsNotSupported,
            0x6e00 => StatusWord::ClaNotSupported,
            0x6700 => StatusWord::WrongLength,
            _ => return None,
        };
        Some(sw)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    pub fn new(ins: Instruction, data: Vec<u8>) -> Self {
        ApduCommand {
            cla: CLA,
            ins: ins as u8,
            p1: 0,
            p2: 0,
            data,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        if self.data.len() > MAX_DATA_LEN {
            return Err(LedgerError::invalid(format!(
                "APDU payload of {} bytes exceeds {}",
                self.data.len(),
                MAX_DATA_LEN
            )));
        }
        let mut raw = Vec::with_capacity(HEADER_LEN + 1 + self.data.len());
        raw.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);
        raw.push(self.data.len() as u8);
        raw.extend_from_slice(&self.data);
        Ok(raw)
    }

    /// Parse a raw command. Errors are the status word the device answers with.
    pub fn decode(raw: &[u8]) -> Result<Self, StatusWord> {
        if raw.len() < HEADER_LEN {
            return Err(StatusWord::WrongLength);
        }
        let data = match raw.get(HEADER_LEN) {
            None => Vec::new(),
            Some(&lc) => {
                let body = &raw[HEADER_LEN + 1..];
                if body.len() != lc as usize {
                    return Err(StatusWord::WrongLength);
                }
                body.to_vec()
            }
        };
        Ok(ApduCommand {
            cla: raw[0],
            ins: raw[1],
            p1: raw[2],
            p2: raw[3],
            data,
        })
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ApduAnswer {
    data: Vec<u8>,
    retcode: u16,
}

impl ApduAnswer {
    pub fn new(data: Vec<u8>, retcode: u16) -> Self {
        ApduAnswer { data, retcode }
    }

    pub fn success(data: Vec<u8>) -> Self {
        ApduAnswer::new(data, StatusWord::Ok.code())
    }

    pub fn error(sw: StatusWord) -> Self {
        ApduAnswer::new(Vec::new(), sw.code())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn retcode(&self) -> u16 {
        self.retcode
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.data.len() + 2);
        raw.extend_from_slice(&self.data);
        raw.extend_from_slice(&self.retcode.to_be_bytes());
        raw
    }

    pub fn decode(raw: &[u8]) -> Result<Self, LedgerError> {
        if raw.len() < 2 {
            return Err(LedgerError::UnexpectedResponse(format!(
                "answer of {} bytes has no status word",
                raw.len()
            )));
        }
        let (data, sw) = raw.split_at(raw.len() - 2);
        Ok(ApduAnswer::new(data.to_vec(), u16::from_be_bytes([sw[0], sw[1]])))
    }

    /// Payload on `0x9000`, otherwise the matching error.
    pub fn into_result(self) -> Result<Vec<u8>, LedgerError> {
        match StatusWord::from_code(self.retcode) {
            Some(StatusWord::Ok) => Ok(self.data),
            Some(StatusWord::TagMismatch) => Err(LedgerError::UnrecognizedIdentity),
            Some(StatusWord::DeniedByUser) => Err(LedgerError::DeniedByUser),
            Some(StatusWord::DataError) => Err(LedgerError::invalid(
                "device rejected the payload length",
            )),
            Some(StatusWord::InvalidPoint) => Err(LedgerError::invalid(
                "device rejected the point as not on secp256k1",
            )),
            Some(StatusWord::WrongLength) => {
                Err(LedgerError::invalid("device rejected a malformed APDU"))
            }
            _ => Err(LedgerError::Device(self.retcode)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_recipient_encoding() {
        let raw = ApduCommand::new(Instruction::GetRecipient, vec![])
            .encode()
            .expect("encode");
        assert_eq!(raw, vec![0xe0, 0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_command_decode_with_data() {
        let raw = [0xe0, 0x03, 0x00, 0x00, 0x02, 0xaa, 0xbb];
        let cmd = ApduCommand::decode(&raw).expect("decode");
        assert_eq!(cmd.ins, 0x03);
        assert_eq!(cmd.data, vec![0xaa, 0xbb]);
    }

    #[test]
    fn test_command_decode_without_lc() {
        let cmd = ApduCommand::decode(&[0xe0, 0x02, 0x00, 0x00]).expect("decode");
        assert!(cmd.data.is_empty());
    }

    #[test]
    fn test_command_decode_rejects_inconsistent_lc() {
        let raw = [0xe0, 0x03, 0x00, 0x00, 0x05, 0xaa];
        assert_eq!(ApduCommand::decode(&raw), Err(StatusWord::WrongLength));
        assert_eq!(ApduCommand::decode(&[0xe0, 0x02]), Err(StatusWord::WrongLength));
    }

    #[test]
    fn test_command_encode_rejects_oversized_payload() {
        let cmd = ApduCommand::new(Instruction::GetSharedSecret, vec![0u8; 256]);
        assert!(matches!(cmd.encode(), Err(LedgerError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_instruction() {
        assert_eq!(Instruction::try_from(0x04), Err(StatusWord::InsNotSupported));
        assert_eq!(Instruction::try_from(0x01), Ok(Instruction::ConfirmRecipient));
    }

    #[test]
    fn test_answer_decode_splits_status_word() {
        let answer = ApduAnswer::decode(&[0x01, 0x02, 0x90, 0x00]).expect("decode");
        assert_eq!(answer.data(), &[0x01, 0x02]);
        assert_eq!(answer.retcode(), 0x9000);
        assert_eq!(answer.encode(), vec![0x01, 0x02, 0x90, 0x00]);
    }

    #[test]
    fn test_answer_decode_rejects_short() {
        assert!(matches!(
            ApduAnswer::decode(&[0x90]),
            Err(LedgerError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_status_word_mapping() {
        let cases = [
            (StatusWord::TagMismatch, "UnrecognizedIdentity"),
            (StatusWord::DeniedByUser, "DeniedByUser"),
            (StatusWord::DataError, "InvalidInput"),
            (StatusWord::InvalidPoint, "InvalidInput"),
        ];
        for (sw, expected) in cases {
            let err = ApduAnswer::error(sw).into_result().expect_err("must fail");
            assert!(
                format!("{:?}", err).starts_with(expected),
                "{:?} should map to {}, got {:?}",
                sw,
                expected,
                err
            );
        }

        let err = ApduAnswer::new(vec![], 0x6f00).into_result().expect_err("must fail");
        assert!(matches!(err, LedgerError::Device(0x6f00)));
    }
}
