pub mod status;
pub mod summary;

pub use status::ResultStatus;
pub use summary::{FailureSummary, RunMetadata, TestFailure};
