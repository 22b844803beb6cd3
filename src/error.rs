use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Identity is not bound to this device")]
    UnrecognizedIdentity,

    #[error("Authentication failed: file key could not be unwrapped")]
    AuthenticationFailure,

    #[error("Request denied on the device")]
    DeniedByUser,

    #[error("Timed out waiting for the device")]
    Timeout,

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Device returned status word {0:#06x}")]
    Device(u16),

    #[error("Unexpected response from device: {0}")]
    UnexpectedResponse(String),
}

impl LedgerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::InvalidInput(msg.into())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => LedgerError::Timeout,
            _ => LedgerError::Transport(err.to_string()),
        }
    }
}
