//! Field table for `scontrol show job`.

use super::transcoders::{account, dyn_rename, identity, ignore, rename, time_limit, timestamp};
use crate::ParseContext;

field_table! {
    /// Every key `scontrol show job` prints, with what becomes of it.
    pub enum JobField {
        "JobId" => JobId: rename(identity, "job_id"),
        // maybe we shouldn't ignore the array fields
        "ArrayJobId" => ArrayJobId: ignore(),
        "ArrayTaskId" => ArrayTaskId: ignore(),
        "ArrayTaskThrottle" => ArrayTaskThrottle: ignore(),
        "JobName" => JobName: rename(identity, "name"),
        "UserId" => UserId: dyn_rename(account, ParseContext::username_slot),
        "GroupId" => GroupId: ignore(),
        "MCS_label" => McsLabel: ignore(),
        "Priority" => Priority: ignore(),
        "Nice" => Nice: ignore(),
        "Account" => Account: rename(identity, "account"),
        "QOS" => Qos: ignore(),
        "JobState" => JobState: rename(identity, "job_state"),
        "Reason" => Reason: ignore(),
        "Dependency" => Dependency: ignore(),
        "Requeue" => Requeue: ignore(),
        "Restarts" => Restarts: ignore(),
        "BatchFlag" => BatchFlag: ignore(),
        "Reboot" => Reboot: ignore(),
        "ExitCode" => ExitCode: rename(identity, "exit_code"),
        "RunTime" => RunTime: ignore(),
        "TimeLimit" => TimeLimit: rename(time_limit, "time_limit"),
        "TimeMin" => TimeMin: ignore(),
        "SubmitTime" => SubmitTime: rename(timestamp, "submit_time"),
        "EligibleTime" => EligibleTime: ignore(),
        "AccrueTime" => AccrueTime: ignore(),
        "StartTime" => StartTime: rename(timestamp, "start_time"),
        "EndTime" => EndTime: rename(timestamp, "end_time"),
        "Deadline" => Deadline: ignore(),
        "PreemptEligibleTime" => PreemptEligibleTime: ignore(),
        "PreemptTime" => PreemptTime: ignore(),
        "SuspendTime" => SuspendTime: ignore(),
        "SecsPreSuspend" => SecsPreSuspend: ignore(),
        "LastSchedEval" => LastSchedEval: ignore(),
        "ResizeTime" => ResizeTime: ignore(),
        "Scheduler" => Scheduler: ignore(),
        "Partition" => Partition: rename(identity, "partition"),
        "AllocNode:Sid" => AllocNodeSid: ignore(),
        "ReqNodeList" => ReqNodeList: ignore(),
        "ExcNodeList" => ExcNodeList: ignore(),
        "NodeList" => NodeList: rename(identity, "nodes"),
        "SchedNodeList" => SchedNodeList: ignore(),
        "BatchHost" => BatchHost: ignore(),
        "NumNodes" => NumNodes: ignore(),
        "NumCPUs" => NumCpus: ignore(),
        "NumTasks" => NumTasks: ignore(),
        "CPUs/Task" => CpusPerTask: ignore(),
        "ReqB:S:C:T" => ReqBsct: ignore(),
        "TRES" => Tres: ignore(),
        "Socks/Node" => SocksPerNode: ignore(),
        "NtasksPerN:B:S:C" => NtasksPerNbsc: ignore(),
        "NtasksPerTRES" => NtasksPerTres: ignore(),
        "CoreSpec" => CoreSpec: ignore(),
        "MinCPUsNode" => MinCpusNode: ignore(),
        "MinMemoryCPU" => MinMemoryCpu: ignore(),
        "MinMemoryNode" => MinMemoryNode: ignore(),
        "MinTmpDiskNode" => MinTmpDiskNode: ignore(),
        "Features" => Features: ignore(),
        "DelayBoot" => DelayBoot: ignore(),
        "Reservation" => Reservation: rename(identity, "resv_name"),
        "OverSubscribe" => OverSubscribe: ignore(),
        "Contiguous" => Contiguous: ignore(),
        "Licenses" => Licenses: ignore(),
        "Network" => Network: ignore(),
        "Command" => Command: rename(identity, "command"),
        "WorkDir" => WorkDir: rename(identity, "work_dir"),
        "Comment" => Comment: ignore(),
        "AdminComment" => AdminComment: ignore(),
        "StdErr" => StdErr: rename(identity, "stderr"),
        "StdIn" => StdIn: rename(identity, "stdin"),
        "StdOut" => StdOut: rename(identity, "stdout"),
        "Power" => Power: ignore(),
        "CpusPerTres" => CpusPerTres: ignore(),
        "MemPerTres" => MemPerTres: ignore(),
        "TresPerJob" => TresPerJob: ignore(),
        "TresPerNode" => TresPerNode: ignore(),
        "TresPerTask" => TresPerTask: ignore(),
        "Container" => Container: ignore(),
        "MailUser" => MailUser: ignore(),
        "MailType" => MailType: ignore(),
    }
}
