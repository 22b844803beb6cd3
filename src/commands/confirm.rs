use anyhow::Context;
use owo_colors::{OwoColorize, Stream::Stdout};

use age_plugin_ledger::config::DeviceConfig;
use age_plugin_ledger::identity::IdentityTag;
use age_plugin_ledger::keys::fingerprint;

use crate::cli::ConfirmArgs;

pub fn run_confirm(config: &DeviceConfig, args: ConfirmArgs) -> anyhow::Result<()> {
    let tag: IdentityTag = args.identity.parse().context("Invalid identity")?;

    let mut client = config
        .connect()
        .with_context(|| format!("Failed to reach device at {}", config.endpoint))?;
    let key = client
        .confirm_recipient(&tag)
        .context("Device did not confirm the identity")?;

    println!(
        "{} identity belongs to this device ({})",
        "Confirmed:".if_supports_color(Stdout, |t| t.green()),
        fingerprint::short_fingerprint(&key)
    );
    println!("Recipient:   {}", key.to_recipient_string());

    Ok(())
}
