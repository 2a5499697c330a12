//! Confirmation gate for destructive flashes.
//!
//! The user must type the exact device path; the typed value becomes the
//! confirmation token, so a confirmation for one device can never arm a
//! flash of another.

use anyhow::{bail, Context, Result};
use dialoguer::Input;

pub fn prompt_device_confirmation(device: &str) -> Result<String> {
    println!();
    println!("⚠️  WARNING ⚠️");
    println!("You are about to ERASE {}", device);
    println!("This action is IRREVERSIBLE.");
    confirm_with(device, |prompt| {
        Input::new()
            .with_prompt(prompt)
            .interact_text()
            .context("Failed to read confirmation input")
    })
}

/// Same gate with an injectable reader, so tests don't need a terminal.
pub fn confirm_with<F>(device: &str, read: F) -> Result<String>
where
    F: FnOnce(&str) -> Result<String>,
{
    let prompt = format!("Type the device path ({}) to continue", device);
    let typed = read(&prompt)?;
    let typed = typed.trim();
    if typed != device {
        bail!(
            "Device confirmation failed (typed '{}', expected '{}')",
            typed,
            device
        );
    }
    Ok(typed.to_string())
}
