pub mod history;
pub mod shared;

pub use history::{AuditLog, HistoryWindow, RetentionPolicy};
pub use shared::{Drained, LinkStatus, SharedState, Snapshot};
