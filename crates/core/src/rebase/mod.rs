//! Rebase orchestration: the session state machine and the driver loop.

pub mod driver;
pub mod session;

pub use driver::RebaseDriver;
pub use session::{RebaseSession, RebaseSummary, SessionState};
