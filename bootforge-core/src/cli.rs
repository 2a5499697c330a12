//! CLI argument parsing for BootForge.

use crate::flash::DEFAULT_CHUNK_SIZE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bootforge")]
#[command(about = "🔥 BootForge - bootable USB installer creator")]
#[command(long_about = "🔥 BootForge - bootable USB installer creator\n\n\
    Writes installer images to removable drives with pre-flight safety\n\
    checks, chunked progress reporting and post-write verification.\n\
    Every flash is recorded in a local history file.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Flash history file (line-delimited JSON)
    #[arg(long, default_value = "bootforge-history.jsonl", global = true)]
    pub history_file: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// 🔍 List candidate target devices
    List {
        /// Include non-removable devices in the listing
        #[arg(long)]
        all: bool,
    },

    /// 💾 Flash an installer image to a device (DESTRUCTIVE)
    Flash {
        /// Path to the image file (.img, or .img.xz for compressed images)
        #[arg(long, required_unless_present = "tree", conflicts_with = "tree")]
        image: Option<PathBuf>,

        /// Build the image from a directory tree instead of a file
        #[arg(long)]
        tree: Option<PathBuf>,

        /// Target device (e.g. /dev/sdb)
        #[arg(long)]
        device: String,

        /// Confirm the target by repeating its path; prompted interactively
        /// when omitted
        #[arg(long)]
        confirm: Option<String>,

        /// Write chunk size in bytes
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// 🧠 Report host system information
    Advisor,

    /// 📜 Show past flash operations (most recent first)
    History {
        /// Maximum entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_requires_an_image_source() {
        let err = Cli::try_parse_from(["bootforge", "flash", "--device", "/dev/sdb"]);
        assert!(err.is_err());
    }

    #[test]
    fn flash_parses_file_image_with_defaults() {
        let cli = Cli::try_parse_from([
            "bootforge",
            "flash",
            "--image",
            "fedora.img",
            "--device",
            "/dev/sdb",
        ])
        .unwrap();
        match cli.command {
            Command::Flash {
                image,
                tree,
                device,
                confirm,
                chunk_size,
            } => {
                assert_eq!(image, Some(PathBuf::from("fedora.img")));
                assert_eq!(tree, None);
                assert_eq!(device, "/dev/sdb");
                assert_eq!(confirm, None);
                assert_eq!(chunk_size, DEFAULT_CHUNK_SIZE);
            }
            _ => panic!("expected flash command"),
        }
    }

    #[test]
    fn image_and_tree_are_mutually_exclusive() {
        let err = Cli::try_parse_from([
            "bootforge",
            "flash",
            "--image",
            "a.img",
            "--tree",
            "payload/",
            "--device",
            "/dev/sdb",
        ]);
        assert!(err.is_err());
    }
}
