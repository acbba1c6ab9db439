//! The typed failure surface shared by the parser and the core (§7).
//!
//! Theory conflict and SAT conflict are *not* errors — they are normal
//! outcomes carried by [`crate::dpllt::DecisionResult`]. This enum is only
//! for things that indicate either a malformed surface program or a bug.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    /// Raised only by the `parser` collaborator; THE CORE never constructs this.
    #[error("malformed input: {message}")]
    MalformedInput { message: String },

    /// A theory atom reached a theory call outside the fixed §3 vocabulary,
    /// e.g. a negative `Relu` literal surviving into a cube (see §4.5).
    #[error("unsupported atom: {detail}")]
    UnsupportedAtom { detail: String },

    /// The per-invocation pivot budget was exceeded. Callers at the
    /// `dpllt`/`reluplex` boundary catch this and report `UNKNOWN`, they do
    /// not propagate it as a hard failure.
    #[error("pivot budget exceeded at {at}")]
    BudgetExceeded { at: &'static str },

    /// An I-invariant from §3 was detected broken. Always a bug; always fatal.
    #[error("internal invariant {which} violated: {detail}")]
    InternalInvariant {
        which: &'static str,
        detail: String,
    },
}

impl SolverError {
    pub fn invariant(which: &'static str, detail: impl Into<String>) -> Self {
        SolverError::InternalInvariant {
            which,
            detail: detail.into(),
        }
    }
}
