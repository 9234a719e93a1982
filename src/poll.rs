//! One cluster's poll cycle.
//!
//! The transport (ssh, a local `scontrol`, a fixture file) is not modelled
//! here; the poller only receives what it produced:
//!
//! ```text
//! fetch result ─┬─ Err ──▶ every manager keeps its state, flagged stale
//!               └─ Ok ───▶ nodes        : parse ▶ prepare ▶ commit | stale
//!                          reservations : parse ▶ prepare ▶ commit | stale
//!                          jobs         : parse ▶ prepare ▶ commit | stale
//! ```
//!
//! Once the dumps are in, each kind moves on its own. A job state the tally
//! cannot place, or a reservation line that does not parse, holds back only
//! that kind's manager; node monitoring keeps going.

use crate::config::{Allocations, ClusterConfig};
use crate::state::{JobPoll, JobStateManager, SnapshotDiff, SnapshotManager, StateManager};
use crate::{EntityKind, Error, ParseContext, Record, Result, parse};
use std::fmt::Display;
use tracing::{info, warn};

/// Raw `scontrol show` output for one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDumps {
    pub nodes: String,
    pub reservations: String,
    pub jobs: String,
}

/// Per-manager outcome of a poll whose dumps were fetched.
///
/// An `Err` means that manager kept its previous state and is now stale.
#[derive(Debug)]
pub struct PollReport {
    pub cluster: String,
    pub nodes: Result<SnapshotDiff>,
    pub reservations: Result<SnapshotDiff>,
    pub jobs: Result<JobPoll>,
}

impl PollReport {
    /// True when every manager committed.
    pub fn is_complete(&self) -> bool {
        self.nodes.is_ok() && self.reservations.is_ok() && self.jobs.is_ok()
    }

    /// Managers that did not commit, with the reason.
    pub fn failures(&self) -> Vec<(EntityKind, &Error)> {
        let mut out = Vec::new();
        if let Err(err) = &self.nodes {
            out.push((EntityKind::Node, err));
        }
        if let Err(err) = &self.reservations {
            out.push((EntityKind::Reservation, err));
        }
        if let Err(err) = &self.jobs {
            out.push((EntityKind::Job, err));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct ClusterPoller {
    cluster: String,
    context: ParseContext,
    allocations: Allocations,
    nodes: SnapshotManager,
    reservations: SnapshotManager,
    jobs: JobStateManager,
    failures: u32,
}

impl ClusterPoller {
    /// Poller whose job tally is grouped by the context's username slot.
    pub fn new(cluster: impl Into<String>, context: ParseContext) -> Self {
        let jobs = JobStateManager::new(context.username_slot());
        ClusterPoller {
            cluster: cluster.into(),
            context,
            allocations: Allocations::default(),
            nodes: SnapshotManager::nodes(),
            reservations: SnapshotManager::reservations(),
            jobs,
            failures: 0,
        }
    }

    pub fn from_config(cluster: impl Into<String>, config: &ClusterConfig) -> Result<Self> {
        let mut poller = Self::new(cluster, config.context()?);
        poller.jobs = JobStateManager::new(config.tally_field());
        poller.allocations = config.allocations.clone();
        Ok(poller)
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &ParseContext {
        &self.context
    }

    pub fn allocations(&self) -> &Allocations {
        &self.allocations
    }

    pub fn nodes(&self) -> &SnapshotManager {
        &self.nodes
    }

    pub fn reservations(&self) -> &SnapshotManager {
        &self.reservations
    }

    pub fn jobs(&self) -> &JobStateManager {
        &self.jobs
    }

    /// True when at least one manager holds data from an earlier poll.
    pub fn is_stale(&self) -> bool {
        self.nodes.is_stale() || self.reservations.is_stale() || self.jobs.is_stale()
    }

    /// Polls since the last one in which every manager committed.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Fold one fetch result into the managers.
    ///
    /// Only a fetch failure is returned as `Err`. Once the dumps are in, each
    /// kind commits or goes stale on its own and the report says which.
    pub fn apply<E: Display>(&mut self, fetched: std::result::Result<RawDumps, E>) -> Result<PollReport> {
        let dumps = match fetched {
            Ok(dumps) => dumps,
            Err(err) => {
                let err = Error::Fetch { cluster: self.cluster.clone(), reason: err.to_string() };
                self.nodes.mark_stale();
                self.reservations.mark_stale();
                self.jobs.mark_stale();
                self.failures = self.failures.saturating_add(1);
                warn!(
                    cluster = %self.cluster,
                    failures = self.failures,
                    error = %err,
                    "fetch failed, keeping last state"
                );
                return Err(err);
            }
        };

        let report = PollReport {
            cluster: self.cluster.clone(),
            nodes: refresh(&mut self.nodes, EntityKind::Node, &dumps.nodes, &self.context),
            reservations: refresh(&mut self.reservations, EntityKind::Reservation, &dumps.reservations, &self.context),
            jobs: refresh(&mut self.jobs, EntityKind::Job, &dumps.jobs, &self.context),
        };

        if report.is_complete() {
            self.failures = 0;
        } else {
            self.failures = self.failures.saturating_add(1);
            for (kind, err) in report.failures() {
                warn!(
                    cluster = %self.cluster,
                    %kind,
                    failures = self.failures,
                    error = %err,
                    "update failed, keeping last state"
                );
            }
        }
        let nodes_changed =
            report.nodes.as_ref().map_or(0, |d| d.appeared.len() + d.disappeared.len() + d.changed.len());
        info!(
            cluster = %self.cluster,
            nodes_changed,
            reservations_changed = report.reservations.as_ref().map_or(0, |d| d.changed.len()),
            accounts = report.jobs.as_ref().map_or(0, |p| p.tally.len()),
            complete = report.is_complete(),
            "poll applied"
        );
        Ok(report)
    }
}

/// Parse one dump and fold it into `manager`. Any failure leaves the manager's
/// state untouched and flags it stale.
fn refresh<M: StateManager>(manager: &mut M, kind: EntityKind, dump: &str, ctx: &ParseContext) -> Result<M::Output> {
    match parse(kind, dump.lines(), ctx).collect::<Result<Vec<Record>>>() {
        Ok(records) => manager.update(&records),
        Err(err) => {
            manager.mark_stale();
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const NODES: &str = "\
NodeName=cn-a001 Arch=x86_64 State=IDLE
   Gres=gpu:2

NodeName=cn-a002 Arch=x86_64 State=MIXED
";

    const RESERVATIONS: &str = "\
ReservationName=maint StartTime=2023-06-01T10:00:00 EndTime=2023-06-01T12:00:00 Duration=02:00:00
   Nodes=cn-a001 NodeCnt=1 CoreCnt=8 Features=(null) PartitionName=(null) Flags=MAINT
   TRES=cpu=8 Users=root Groups=(null) Accounts=(null) Licenses=(null) State=INACTIVE BurstBuffer=(null) Watts=n/a
";

    const JOBS: &str = "\
JobId=1 JobName=train UserId=alice(1001) Account=def-a JobState=RUNNING

JobId=2 JobName=eval UserId=alice(1001) Account=def-a JobState=PENDING
";

    fn dumps(jobs: &str) -> RawDumps {
        RawDumps { nodes: NODES.to_string(), reservations: RESERVATIONS.to_string(), jobs: jobs.to_string() }
    }

    fn poller() -> ClusterPoller {
        ClusterPoller::new("mila", ParseContext::default())
    }

    #[test]
    fn successful_poll_commits_every_manager() {
        let mut poller = poller();
        let report = poller.apply(Ok::<_, String>(dumps(JOBS))).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.cluster, "mila");
        assert_eq!(report.nodes.unwrap().appeared, vec!["cn-a001", "cn-a002"]);
        assert_eq!(report.reservations.unwrap().appeared, vec!["maint"]);
        let jobs = report.jobs.unwrap();
        assert_eq!(jobs.tally["alice"].running, 1);
        assert_eq!(jobs.tally["alice"].pending, 1);
        assert!(!poller.is_stale());
    }

    #[test]
    fn fetch_failure_keeps_state_and_flags_stale() {
        let mut poller = poller();
        poller.apply(Ok::<_, String>(dumps(JOBS))).unwrap();

        let err = poller.apply(Err("ssh: connection refused")).unwrap_err();
        match err {
            Error::Fetch { cluster, reason } => {
                assert_eq!(cluster, "mila");
                assert_eq!(reason, "ssh: connection refused");
            }
            other => panic!("expected Fetch error, got {other:?}"),
        }

        assert!(poller.nodes().is_stale());
        assert!(poller.reservations().is_stale());
        assert!(poller.jobs().is_stale());
        assert_eq!(poller.consecutive_failures(), 1);
        let nodes = poller.nodes().snapshot().unwrap();
        assert_eq!(nodes.value.len(), 2);
        assert_eq!(poller.jobs().tally().unwrap().value["alice"].total(), 2);
    }

    #[test]
    fn unmapped_job_state_does_not_hold_back_nodes() {
        let mut poller = poller();
        poller.apply(Ok::<_, String>(dumps(JOBS))).unwrap();

        let mut next = dumps("JobId=3 UserId=bob(1002) JobState=SUSPENDED\n");
        next.nodes = "NodeName=cn-a001 State=DOWN\n\nNodeName=cn-b001 State=IDLE\n".to_string();
        let report = poller.apply(Ok::<_, String>(next)).unwrap();

        assert!(!report.is_complete());
        assert!(matches!(report.jobs, Err(Error::UnmappedJobState { ref state, .. }) if state == "SUSPENDED"));
        let failures: Vec<_> = report.failures().into_iter().map(|(kind, _)| kind).collect();
        assert_eq!(failures, vec![EntityKind::Job]);

        let diff = report.nodes.as_ref().unwrap();
        assert_eq!(diff.appeared, vec!["cn-b001"]);
        assert_eq!(diff.disappeared, vec!["cn-a002"]);
        assert_eq!(diff.changed.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["cn-a001"]);

        let nodes = poller.nodes().snapshot().unwrap();
        assert!(!nodes.stale);
        assert_eq!(nodes.polls, 2);
        assert_eq!(nodes.value["cn-a001"].text("state"), Some("DOWN"));
        assert!(!poller.reservations().is_stale());

        let tally = poller.jobs().tally().unwrap();
        assert!(tally.stale);
        assert_eq!(tally.value["alice"].total(), 2);
        assert!(poller.is_stale());
        assert_eq!(poller.consecutive_failures(), 1);
    }

    #[test]
    fn unparseable_reservation_dump_only_stales_reservations() {
        let mut poller = poller();
        poller.apply(Ok::<_, String>(dumps(JOBS))).unwrap();

        let mut next = dumps(JOBS);
        next.reservations = "garbage without pairs\n".to_string();
        let report = poller.apply(Ok::<_, String>(next)).unwrap();

        assert!(matches!(report.reservations, Err(Error::UnparseableLine { line_no: 1, .. })));
        assert!(report.nodes.as_ref().unwrap().is_quiet());
        assert!(report.jobs.is_ok());
        assert!(poller.reservations().is_stale());
        assert!(!poller.nodes().is_stale());
        assert!(!poller.jobs().is_stale());
        assert_eq!(poller.reservations().snapshot().unwrap().value.len(), 1);
    }

    #[test]
    fn recovery_clears_staleness() {
        let mut poller = poller();
        poller.apply(Ok::<_, String>(dumps(JOBS))).unwrap();
        poller.apply(Err("timeout")).unwrap_err();
        poller.apply(Ok::<_, String>(dumps("JobId=9 UserId=eve(9) JobState=PREEMPTED\n"))).unwrap();
        assert_eq!(poller.consecutive_failures(), 2);

        let report = poller.apply(Ok::<_, String>(dumps(JOBS))).unwrap();
        assert!(report.is_complete());
        assert!(report.nodes.unwrap().is_quiet());
        assert!(!poller.is_stale());
        assert_eq!(poller.consecutive_failures(), 0);
    }

    #[test]
    fn from_config_uses_cluster_settings() {
        let cfg = Config::from_toml_str(
            "[clusters.beluga]\nallocations = [\"def-a\"]\nusername_slot = \"cc_account_username\"\ntally_field = \"account\"\n",
        )
        .unwrap();
        let mut poller = ClusterPoller::from_config("beluga", cfg.cluster("beluga").unwrap()).unwrap();
        assert!(poller.allocations().contains("def-a"));
        assert_eq!(poller.context().username_slot(), "cc_account_username");

        let report = poller.apply(Ok::<_, String>(dumps(JOBS))).unwrap();
        assert_eq!(report.jobs.unwrap().tally["def-a"].total(), 2);
    }
}
