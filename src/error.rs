//! Unified error taxonomy for the search core.
//!
//! Every component in this crate funnels its failures through one enum so
//! that `PreliminaryEngine::find_error` has a single type to hand back to
//! callers, per the error-handling design: construction-time failures
//! (matrix, table, effective lengths) return directly; per-worker runtime
//! failures are recorded and surfaced after join.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown substitution matrix: {0}")]
    UnknownMatrix(String),

    #[error("allocation failed: {0}")]
    AllocFailed(String),

    /// Raised both by `LookupTableBuilder::index_query` after `finalize()`
    /// and by `HspCollector::insert`/`trim` after `freeze()` — both are
    /// "mutation attempted on a sealed structure" (see DESIGN.md Open
    /// Question 4).
    #[error("operation attempted on a finalized/frozen structure")]
    FinalizedTable,

    #[error("subject source I/O error: {0}")]
    IoError(String),

    #[error("degenerate search space: {0}")]
    Degenerate(String),

    #[error("search cancelled")]
    Cancelled,
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::IoError(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
