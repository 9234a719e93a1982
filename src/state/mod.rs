//! Poll-to-poll state.
//!
//! A state manager folds one poll's full set of records into an observable
//! value: a per-account job tally or a node/reservation diff. Updates are
//! split in two so a failure never leaves a half-applied poll behind:
//!
//! ```text
//! records ──▶ prepare (pure, may fail) ──▶ commit (infallible, replaces state)
//! ```
//!
//! When a poll fails, managers keep their last-good value and flag it stale
//! until the next successful commit.

mod jobs;
mod snapshot;

pub use jobs::{CoarseState, JobPoll, JobStateManager, JobTally, PreparedJobs, StateCounts, Transition};
pub use snapshot::{
    AttributeChange, EntityChange, NODE_TRACKED, RESERVATION_TRACKED, Snapshot, SnapshotDiff, SnapshotManager,
};

use crate::{Record, Result};

/// Something that folds a poll's records into running state.
pub trait StateManager {
    /// Result of a successful `prepare`, consumed by `commit`.
    type Prepared;
    /// What a committed poll reports to the caller.
    type Output;

    fn prepare(&self, records: &[Record]) -> Result<Self::Prepared>;

    fn commit(&mut self, prepared: Self::Prepared) -> Self::Output;

    /// Keep the current value but report it as stale.
    fn mark_stale(&mut self);

    /// Prepare and commit in one go. A failure leaves the state untouched
    /// and marks it stale.
    fn update(&mut self, records: &[Record]) -> Result<Self::Output> {
        match self.prepare(records) {
            Ok(prepared) => Ok(self.commit(prepared)),
            Err(err) => {
                self.mark_stale();
                Err(err)
            }
        }
    }
}

/// A manager's last committed value, as seen by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed<'a, T> {
    pub value: &'a T,
    /// The most recent poll failed; `value` comes from an earlier one.
    pub stale: bool,
    /// Number of successful commits so far.
    pub polls: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct LastGood<T> {
    value: Option<T>,
    stale: bool,
    polls: u64,
}

impl<T> LastGood<T> {
    pub(crate) fn new() -> Self {
        LastGood { value: None, stale: false, polls: 0 }
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub(crate) fn replace(&mut self, value: T) {
        self.value = Some(value);
        self.stale = false;
        self.polls += 1;
    }

    pub(crate) fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.stale
    }

    pub(crate) fn observed(&self) -> Option<Observed<'_, T>> {
        self.value.as_ref().map(|value| Observed { value, stale: self.stale, polls: self.polls })
    }
}
