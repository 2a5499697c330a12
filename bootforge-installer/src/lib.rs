use anyhow::{bail, Result};
use bootforge_core::advisor;
use bootforge_core::cli::{Cli, Command};
use bootforge_core::device::DeviceEnumerator;
use bootforge_core::flash::{ConfirmationToken, FlashController, FlashOutcome, FlashRequest};
use bootforge_core::image::ImageDescriptor;
use bootforge_core::logging;
use bootforge_core::progress::SessionState;
use bootforge_hal::{FlashHal, LinuxHal};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};

pub mod confirm;
pub mod history;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with(cli.log_file.clone());

    let hal: Arc<dyn FlashHal> = Arc::new(LinuxHal::new());

    match &cli.command {
        Command::List { all } => cmd_list(hal, *all),
        Command::Advisor => {
            let report = advisor::collect(&*hal)?;
            print!("{}", report);
            Ok(())
        }
        Command::History { limit } => history::show(&cli.history_file, *limit),
        Command::Flash {
            image,
            tree,
            device,
            confirm,
            chunk_size,
        } => cmd_flash(
            hal,
            &cli.history_file,
            image.clone(),
            tree.clone(),
            device,
            confirm.as_deref(),
            *chunk_size,
        ),
    }
}

fn cmd_list(hal: Arc<dyn FlashHal>, all: bool) -> Result<()> {
    let devices = DeviceEnumerator::new(hal).list()?;
    let mut shown = 0;
    for device in &devices {
        if !all && !device.is_removable {
            continue;
        }
        shown += 1;
        let gib = device.size_bytes as f64 / (1024.0 * 1024.0 * 1024.0);
        let mut flags = Vec::new();
        if device.is_removable {
            flags.push("removable");
        }
        if device.is_system_volume {
            flags.push("⚠️ SYSTEM");
        }
        println!(
            "{:<14} {:>8.1} GiB  {:<24} {}",
            device.id,
            gib,
            device.label,
            flags.join(", ")
        );
    }
    if shown == 0 {
        println!("No candidate devices found. (Use --all to include internal drives.)");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_flash(
    hal: Arc<dyn FlashHal>,
    history_file: &std::path::Path,
    image: Option<PathBuf>,
    tree: Option<PathBuf>,
    device: &str,
    confirm: Option<&str>,
    chunk_size: usize,
) -> Result<()> {
    let descriptor = match (image, tree) {
        (Some(path), None) => ImageDescriptor::File(path),
        (None, Some(path)) => ImageDescriptor::Tree(path),
        _ => bail!("Provide exactly one of --image or --tree"),
    };

    // The typed device path is the confirmation token; the guard re-checks it
    // against the freshly-resolved target.
    let confirmed = match confirm {
        Some(value) => value.to_string(),
        None => confirm::prompt_device_confirmation(device)?,
    };
    let token = ConfirmationToken::for_device(confirmed);

    let controller = FlashController::new(hal);
    let (tx, rx) = mpsc::sync_channel(64);

    let mut request = FlashRequest::new(device.to_string(), descriptor, token);
    request.chunk_size = chunk_size;
    request.progress_tx = Some(tx);

    let printer = std::thread::spawn(move || {
        let mut last_percent = -5i64;
        for event in rx {
            match event.state {
                SessionState::Writing => {
                    let percent = event.percent() as i64;
                    if percent / 5 > last_percent / 5 {
                        info!(
                            "💾 {}% ({} / {} bytes)",
                            percent, event.bytes_written, event.total_bytes
                        );
                        last_percent = percent;
                    }
                }
                SessionState::Verifying => info!("🔎 Verifying written data..."),
                state if state.is_terminal() => info!("📍 Session state: {}", state),
                _ => {}
            }
        }
    });

    let flash = controller.start_flash(request);
    let _ = printer.join();
    let result = flash?;

    if let Some(entry) = controller.audit_log().snapshot().last() {
        history::append(history_file, entry)?;
    }

    match result.outcome {
        FlashOutcome::Succeeded => {
            info!(
                "🎉 Flash complete: {} bytes written and verified on {}",
                result.bytes_written, result.device_id
            );
            Ok(())
        }
        FlashOutcome::Cancelled => {
            info!(
                "🛑 Flash cancelled after {} bytes; {} contains incomplete data",
                result.bytes_written, result.device_id
            );
            Ok(())
        }
        FlashOutcome::Failed => match result.error_detail {
            Some(err) => bail!("Flash failed: {err}"),
            None => bail!("Flash failed"),
        },
    }
}
