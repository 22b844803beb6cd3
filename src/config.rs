//! Connection settings for reaching a device.

use std::time::Duration;

use crate::client::LedgerClient;
use crate::error::LedgerError;
use crate::transport::TcpTransport;

/// Speculos' default APDU port.
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:9999";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl DeviceConfig {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, LedgerError> {
        if timeout_secs == 0 {
            return Err(LedgerError::invalid("timeout must be at least one second"));
        }
        Ok(DeviceConfig {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn connect(&self) -> Result<LedgerClient<TcpTransport>, LedgerError> {
        let transport = TcpTransport::connect(&self.endpoint, self.timeout)?;
        Ok(LedgerClient::new(transport))
    }
}
