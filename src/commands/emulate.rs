//! Emulate command: runs the software device behind a TCP listener speaking
//! the same framing as the Speculos emulator.
//!
//! The device seed lives in `~/.age-plugin-ledger/device_seed` unless
//! `--seed-file` is given, and is created on first run.

use std::io::IsTerminal;
use std::net::TcpListener;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream::Stdout};
use rand::rngs::OsRng;

use age_plugin_ledger::device::{server, Approver, AutoApprove, Device};
use age_plugin_ledger::keys::{fingerprint, store};

use crate::cli::EmulateArgs;

/// Asks on the terminal, standing in for the device's buttons.
struct TerminalApprover;

impl Approver for TerminalApprover {
    fn approve(&mut self, prompt: &str) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(format!("Device: {}?", prompt))
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

pub fn run_emulate(args: EmulateArgs) -> anyhow::Result<()> {
    if !args.yes && !std::io::stdin().is_terminal() {
        anyhow::bail!("Use --yes to approve requests in non-interactive mode");
    }

    let seed_path = match &args.seed_file {
        Some(path) => path.clone(),
        None => store::seed_path()?,
    };
    let (seed, created) = store::load_or_create_seed(&seed_path, &mut OsRng)?;
    if created {
        println!("Created device seed at {}", seed_path.display());
    }

    let approver: Box<dyn Approver> = if args.yes {
        Box::new(AutoApprove)
    } else {
        Box::new(TerminalApprover)
    };
    let mut device = Device::from_seed(&seed[..], approver).context("Failed to derive device key")?;
    let recipient = device.recipient();

    let listener = TcpListener::bind(&args.bind)
        .with_context(|| format!("Failed to listen on {}", args.bind))?;

    println!(
        "{} on {}",
        "Device ready".if_supports_color(Stdout, |t| t.green()),
        args.bind.if_supports_color(Stdout, |t| t.bold())
    );
    println!("Recipient:   {}", recipient.to_recipient_string());
    println!("Identity:    {}", recipient.tag());
    println!("Fingerprint: {}", fingerprint::short_fingerprint(&recipient));
    if args.yes {
        println!(
            "{}",
            "All requests are approved automatically.".if_supports_color(Stdout, |t| t.yellow())
        );
    }

    server::serve(&listener, &mut device).context("Device server stopped")?;
    Ok(())
}
