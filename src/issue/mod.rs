pub mod format;
pub mod manager;

pub use format::IssueFormatter;
pub use manager::{IssueManager, IssueOutcome, IssueRequest};
