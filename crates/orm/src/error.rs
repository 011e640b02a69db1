//! Errors

use thiserror::Error;

/// Mapping and paging failures raised by this crate.
///
/// Public operations return `anyhow::Result`; use `downcast_ref::<Error>()`
/// to inspect the cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A bare column could bind to the same-named member of more than one
    /// related object. Qualify the column with a prefix (`Rel__Column`).
    #[error("ambiguous column '{column}': it matches members of {}; prefix it to choose one", candidates.join(", "))]
    AmbiguousColumn {
        /// Column label as returned by the query.
        column: String,
        /// Related-object members that could receive the column.
        candidates: Vec<String>,
    },

    /// A prefixed column names a member that does not exist on the target
    /// type graph.
    #[error("column '{column}' cannot be mapped: '{segment}' is not a member of {type_name}")]
    UnresolvablePath {
        /// Column label as returned by the query.
        column: String,
        /// Path segment that failed to resolve.
        segment: String,
        /// Type on which the segment was looked up.
        type_name: &'static str,
    },

    /// Two columns resolve to the same destination member.
    #[error("columns '{first}' and '{second}' both map to {type_name}.{member}")]
    DuplicateBinding {
        /// Column that claimed the member first.
        first: String,
        /// Column that collided with it.
        second: String,
        /// Type owning the member.
        type_name: &'static str,
        /// Member name.
        member: &'static str,
    },

    /// Two declared members of one type normalise to the same name.
    #[error("{type_name} declares members '{first}' and '{second}' which map to the same column")]
    DuplicateMember {
        /// Type declaring the members.
        type_name: &'static str,
        /// First member.
        first: &'static str,
        /// Second member.
        second: &'static str,
    },

    /// The statement could not be safely rewritten for counting or windowing.
    #[error("statement cannot be rewritten for paging: {reason}")]
    MalformedStatement {
        /// What prevented the rewrite.
        reason: String,
    },

    /// Page number or page size out of their valid range.
    #[error("invalid page request: {0}")]
    InvalidPage(String),

    /// A query returned a number of rows the operation cannot accept.
    #[error("expected {expected}, found {found} rows")]
    RowCount {
        /// Accepted row count, e.g. "exactly one row".
        expected: &'static str,
        /// Number of rows returned.
        found: usize,
    },
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedStatement {
            reason: reason.into(),
        }
    }
}
