use anyhow::Context;

use age_plugin_ledger::config::DeviceConfig;
use age_plugin_ledger::identity::IdentityTag;
use age_plugin_ledger::wrap::{self, Stanza};

use crate::cli::UnwrapArgs;
use crate::util::read_stdin;

/// Read a stanza from stdin and print the recovered file key as hex.
pub fn run_unwrap(config: &DeviceConfig, args: UnwrapArgs) -> anyhow::Result<()> {
    let tag: IdentityTag = args.identity.parse().context("Invalid identity")?;
    let input = read_stdin()?;
    let stanza: Stanza = input.parse().context("Invalid stanza on stdin")?;
    // Reject a malformed stanza before dialing the device.
    stanza.validate().context("Invalid stanza on stdin")?;

    let mut client = config
        .connect()
        .with_context(|| format!("Failed to reach device at {}", config.endpoint))?;

    eprintln!("Approve \"Send decryption key\" on the device...");
    let file_key = wrap::unwrap(&mut client, &tag, &stanza).context("Failed to unwrap file key")?;
    println!("{}", hex::encode(&file_key[..]));

    Ok(())
}
