//! # jsoncheck core
//!
//! Syntax-only validation of the JSON files staged for a commit.
//!
//! ## Pipeline
//!
//! ```text
//! git diff-index --cached --name-only
//!     │
//!     ├──> Coordinator (one line at a time, `.json` filter)
//!     │      └─> one blocking validation task per file
//!     │
//!     ├──> FileValidator (streaming decode)
//!     │      └─> on failure: raise signal, read ≤4 KiB around the offset,
//!     │          extract context lines, log the diagnostic
//!     │
//!     └──> AggregateStatus (single writer)
//!            └─> CheckSummary → exit code
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use jsoncheck_core::{check_staged, CoordinatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let summary = check_staged(CoordinatorConfig::default(), None).await?;
//!     std::process::exit(summary.exit_code());
//! }
//! ```

mod coordinator;
mod error;
mod limits;
mod outcome;
mod signal;
mod staged;
mod validator;

pub use coordinator::{is_candidate, CheckSummary, Coordinator, CoordinatorConfig, Separator};
pub use error::{CheckError, Result};
pub use limits::{ConcurrencyLimit, JOBS_ENV};
pub use outcome::{Diagnostic, ParseOutcome};
pub use signal::{AggregateReport, AggregateStatus, FailureSignal};
pub use staged::{check_staged, diff_base, toplevel, EMPTY_TREE};
pub use validator::{FileValidator, ValidatorOptions, WINDOW_SIZE};
