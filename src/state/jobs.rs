//! Job state tallies.
//!
//! Every poll rebuilds, from scratch, a per-account count of jobs in each
//! coarse state. It is a point-in-time picture, not a cumulative counter.
//! The manager also remembers each job's coarse state so it can report how
//! many jobs moved between states since the previous poll.

use super::{LastGood, Observed, StateManager};
use crate::{EntityKind, Error, Record, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Four-bucket simplification of Slurm's job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoarseState {
    Pending,
    Running,
    Completed,
    Error,
}

impl CoarseState {
    /// Coarse bucket for a raw `JobState`, or `None` for a state outside the
    /// table. There is no catch-all bucket.
    pub fn from_raw(state: &str) -> Option<Self> {
        match state {
            "PENDING" => Some(CoarseState::Pending),
            "RUNNING" | "COMPLETING" => Some(CoarseState::Running),
            "COMPLETED" => Some(CoarseState::Completed),
            "OUT_OF_MEMORY" | "TIMEOUT" | "FAILED" | "CANCELLED" => Some(CoarseState::Error),
            _ => None,
        }
    }
}

/// Job counts for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    #[serde(rename = "PENDING")]
    pub pending: usize,
    #[serde(rename = "RUNNING")]
    pub running: usize,
    #[serde(rename = "COMPLETED")]
    pub completed: usize,
    #[serde(rename = "ERROR")]
    pub error: usize,
}

impl StateCounts {
    pub fn get(&self, state: CoarseState) -> usize {
        match state {
            CoarseState::Pending => self.pending,
            CoarseState::Running => self.running,
            CoarseState::Completed => self.completed,
            CoarseState::Error => self.error,
        }
    }

    fn bump(&mut self, state: CoarseState) {
        match state {
            CoarseState::Pending => self.pending += 1,
            CoarseState::Running => self.running += 1,
            CoarseState::Completed => self.completed += 1,
            CoarseState::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.running + self.completed + self.error
    }
}

/// Account to counts, for one poll.
pub type JobTally = BTreeMap<String, StateCounts>;

/// Number of jobs that went from one coarse state to another between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: CoarseState,
    pub to: CoarseState,
    pub count: usize,
}

/// What a committed job poll reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobPoll {
    pub tally: JobTally,
    /// Only jobs seen in both polls; sorted by `(from, to)`.
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone)]
pub struct PreparedJobs {
    poll: JobPoll,
    states: HashMap<String, CoarseState>,
}

#[derive(Debug, Clone)]
pub struct JobStateManager {
    tally_field: String,
    states: HashMap<String, CoarseState>,
    last: LastGood<JobTally>,
}

impl JobStateManager {
    /// `tally_field` names the record field jobs are grouped by, e.g.
    /// `account` or the context's username slot.
    pub fn new(tally_field: impl Into<String>) -> Self {
        JobStateManager { tally_field: tally_field.into(), states: HashMap::new(), last: LastGood::new() }
    }

    pub fn tally_field(&self) -> &str {
        &self.tally_field
    }

    pub fn tally(&self) -> Option<Observed<'_, JobTally>> {
        self.last.observed()
    }

    pub fn is_stale(&self) -> bool {
        self.last.is_stale()
    }

    fn require<'r>(&self, record: &'r Record, field: &str) -> Result<&'r str> {
        record.text(field).ok_or_else(|| Error::MissingField { kind: EntityKind::Job, field: field.to_string() })
    }
}

impl StateManager for JobStateManager {
    type Prepared = PreparedJobs;
    type Output = JobPoll;

    fn prepare(&self, records: &[Record]) -> Result<PreparedJobs> {
        // A job listed twice counts once, with its last entry.
        let mut latest: HashMap<&str, (&str, CoarseState)> = HashMap::with_capacity(records.len());
        for record in records {
            let job_id = self.require(record, "job_id")?;
            let raw_state = self.require(record, "job_state")?;
            let state = CoarseState::from_raw(raw_state)
                .ok_or_else(|| Error::UnmappedJobState { job_id: job_id.to_string(), state: raw_state.to_string() })?;
            let owner = self.require(record, &self.tally_field)?;

            if latest.insert(job_id, (owner, state)).is_some() {
                tracing::debug!(job_id, "job listed twice in one poll");
            }
        }

        let mut tally = JobTally::new();
        let mut states = HashMap::with_capacity(latest.len());
        for (job_id, (owner, state)) in latest {
            tally.entry(owner.to_string()).or_default().bump(state);
            states.insert(job_id.to_string(), state);
        }

        let mut moved: BTreeMap<(CoarseState, CoarseState), usize> = BTreeMap::new();
        for (job_id, to) in &states {
            if let Some(from) = self.states.get(job_id) {
                if from != to {
                    *moved.entry((*from, *to)).or_default() += 1;
                }
            }
        }
        let transitions = moved.into_iter().map(|((from, to), count)| Transition { from, to, count }).collect();

        Ok(PreparedJobs { poll: JobPoll { tally, transitions }, states })
    }

    fn commit(&mut self, prepared: PreparedJobs) -> JobPoll {
        tracing::debug!(jobs = prepared.states.len(), accounts = prepared.poll.tally.len(), "job tally replaced");
        self.states = prepared.states;
        self.last.replace(prepared.poll.tally.clone());
        prepared.poll
    }

    fn mark_stale(&mut self) {
        self.last.mark_stale();
    }
}
