use crate::EntityKind;

/// Every way parsing or reconciling a poll can fail.
///
/// Nothing here is retried or swallowed internally; the caller decides.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A line is not `Key=Value ...` and is not a registered malformed token.
    #[error("unparseable scontrol line {line_no}: {line:?}")]
    UnparseableLine { line_no: usize, line: String },

    /// A raw key has no rule in the kind's field table.
    #[error("unknown field in {kind} output: {field}")]
    UnknownField { kind: EntityKind, field: String },

    #[error("unknown time limit format: {value:?}")]
    InvalidTimeLimit { value: String },

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// A job state outside the coarse-state table.
    #[error("job {job_id}: state {state:?} has no coarse state")]
    UnmappedJobState { job_id: String, state: String },

    /// A record lacks a field a state manager needs.
    #[error("{kind} record has no {field:?} field")]
    MissingField { kind: EntityKind, field: String },

    /// The transport collaborator failed to deliver a poll's dumps.
    #[error("fetching dumps for cluster {cluster} failed: {reason}")]
    Fetch { cluster: String, reason: String },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
