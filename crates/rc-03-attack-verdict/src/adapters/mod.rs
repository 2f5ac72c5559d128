pub mod commit_hook;
pub mod log;

pub use commit_hook::VerdictCommitHook;
pub use log::{JsonlVerdictLog, MemoryVerdictLog};
