use anyhow::Context;
use owo_colors::{OwoColorize, Stream::Stdout};
use serde::Serialize;

use age_plugin_ledger::config::DeviceConfig;
use age_plugin_ledger::keys::{fingerprint, RecipientKey};

use crate::cli::RecipientArgs;

#[derive(Serialize)]
struct RecipientReport {
    recipient: String,
    identity: String,
    public_key: String,
    fingerprint: String,
}

impl From<&RecipientKey> for RecipientReport {
    fn from(key: &RecipientKey) -> Self {
        RecipientReport {
            recipient: key.to_recipient_string(),
            identity: key.tag().to_string(),
            public_key: key.to_string(),
            fingerprint: fingerprint::short_fingerprint(key),
        }
    }
}

pub fn run_recipient(config: &DeviceConfig, args: RecipientArgs) -> anyhow::Result<()> {
    let mut client = config
        .connect()
        .with_context(|| format!("Failed to reach device at {}", config.endpoint))?;

    eprintln!("Approve \"Send recipient\" on the device...");
    let key = client
        .get_recipient()
        .context("Device did not return its recipient key")?;
    let report = RecipientReport::from(&key);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Recipient:   {}",
        report.recipient.if_supports_color(Stdout, |t| t.cyan())
    );
    println!("Identity:    {}", report.identity);
    println!("Public Key:  {}", report.public_key);
    println!("Fingerprint: {}", report.fingerprint);

    Ok(())
}
