//! Flash engine - sessions, safety certification, orchestration, audit.

mod audit;
mod cancel;
mod controller;
mod safety;
mod session;

pub use audit::{AuditEntry, AuditLog};
pub use cancel::CancelHandle;
pub use controller::{FlashController, FlashRequest};
pub use safety::{CertificationToken, ConfirmationToken, SafetyGuard};
pub use session::{chunk_count, FlashOutcome, FlashResult, WriteSession, DEFAULT_CHUNK_SIZE};
