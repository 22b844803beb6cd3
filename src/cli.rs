use std::path::PathBuf;

use age_plugin_ledger::config::{DeviceConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "age-plugin-ledger",
    version,
    about = "Wrap and unwrap age file keys with a Ledger-style secp256k1 device"
)]
pub struct Cli {
    /// Device APDU endpoint (host:port)
    #[arg(
        long,
        global = true,
        value_name = "HOST:PORT",
        env = "AGE_PLUGIN_LEDGER_ENDPOINT",
        default_value = DEFAULT_ENDPOINT
    )]
    pub endpoint: String,

    /// Seconds to wait for the device before giving up
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        env = "AGE_PLUGIN_LEDGER_TIMEOUT",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub timeout: u64,

    /// Log every command exchanged with the device
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn device_config(&self) -> anyhow::Result<DeviceConfig> {
        Ok(DeviceConfig::new(self.endpoint.clone(), self.timeout)?)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask the device for its recipient key and identity
    Recipient(RecipientArgs),
    /// Check that an identity belongs to the connected device
    Confirm(ConfirmArgs),
    /// Wrap a file key to a recipient (no device needed)
    Wrap(WrapArgs),
    /// Unwrap a stanza read from stdin using the device
    Unwrap(UnwrapArgs),
    /// Run a software device on a TCP port
    Emulate(EmulateArgs),
}

#[derive(Parser)]
pub struct RecipientArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ConfirmArgs {
    /// AGE-PLUGIN-LEDGER-1… identity string
    #[arg(value_name = "IDENTITY")]
    pub identity: String,
}

#[derive(Parser)]
pub struct WrapArgs {
    /// age1ledger1… recipient string or 130-character hex key
    #[arg(value_name = "RECIPIENT")]
    pub recipient: String,

    /// 16-byte file key as hex (a fresh one is drawn if omitted)
    #[arg(long, value_name = "HEX")]
    pub file_key: Option<String>,
}

#[derive(Parser)]
pub struct UnwrapArgs {
    /// AGE-PLUGIN-LEDGER-1… identity string
    #[arg(value_name = "IDENTITY")]
    pub identity: String,
}

#[derive(Parser)]
pub struct EmulateArgs {
    /// Address to listen on
    #[arg(long, value_name = "ADDR", default_value = DEFAULT_ENDPOINT)]
    pub bind: String,

    /// Seed file (defaults to ~/.age-plugin-ledger/device_seed)
    #[arg(long, value_name = "PATH")]
    pub seed_file: Option<PathBuf>,

    /// Approve every request without prompting
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "age-plugin-ledger",
            "recipient",
            "--json",
            "--endpoint",
            "10.0.0.2:40000",
            "--timeout",
            "5",
        ])
        .expect("parse");
        assert_eq!(cli.endpoint, "10.0.0.2:40000");
        assert_eq!(cli.timeout, 5);
        assert!(matches!(cli.command, Commands::Recipient(RecipientArgs { json: true })));
    }

    #[test]
    fn test_wrap_args() {
        let cli = Cli::try_parse_from([
            "age-plugin-ledger",
            "wrap",
            "age1ledger1xyz",
            "--file-key",
            "000102030405060708090a0b0c0d0e0f",
        ])
        .expect("parse");
        match cli.command {
            Commands::Wrap(args) => {
                assert_eq!(args.recipient, "age1ledger1xyz");
                assert_eq!(
                    args.file_key.as_deref(),
                    Some("000102030405060708090a0b0c0d0e0f")
                );
            }
            _ => panic!("expected wrap"),
        }
    }
}
