use anyhow::Context;
use rand::rngs::OsRng;

use age_plugin_ledger::keys::RecipientKey;
use age_plugin_ledger::wrap;

use crate::cli::WrapArgs;
use crate::util::parse_file_key;

/// Wrap locally and print the stanza. A generated file key goes to stderr so
/// stdout carries only the stanza.
pub fn run_wrap(args: WrapArgs) -> anyhow::Result<()> {
    let recipient: RecipientKey = args.recipient.parse().context("Invalid recipient")?;

    let stanza = match &args.file_key {
        Some(hex) => wrap::wrap(&recipient, &*parse_file_key(hex)?, &mut OsRng),
        None => {
            let (file_key, stanza) = wrap::wrap_new_file_key(&recipient, &mut OsRng);
            eprintln!("File key: {}", hex::encode(&file_key[..]));
            stanza
        }
    };
    print!("{}", stanza);

    Ok(())
}
