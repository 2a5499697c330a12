//! 🔥 BootForge core library.
//!
//! The device flash engine: device enumeration, image sources, safety
//! certification, chunked write sessions with post-write verification, and
//! the audit log. Binaries and UIs stay thin; everything destructive runs
//! through [`flash::FlashController`].

pub mod advisor;
pub mod cli;
pub mod device;
pub mod errors;
pub mod flash;
pub mod image;
pub mod logging;
pub mod progress;
