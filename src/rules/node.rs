//! Field table for `scontrol show node`.

use super::transcoders::{identity, ignore, rename};

field_table! {
    pub enum NodeField {
        "NodeName" => NodeName: rename(identity, "name"),
        "Arch" => Arch: rename(identity, "arch"),
        "CoresPerSocket" => CoresPerSocket: ignore(),
        "CPUAlloc" => CpuAlloc: ignore(),
        "CPUEfctv" => CpuEfctv: ignore(),
        "CPUTot" => CpuTot: ignore(),
        "CPULoad" => CpuLoad: ignore(),
        "AvailableFeatures" => AvailableFeatures: rename(identity, "features"),
        "ActiveFeatures" => ActiveFeatures: ignore(),
        "Gres" => Gres: rename(identity, "gres"),
        "NodeAddr" => NodeAddr: rename(identity, "addr"),
        "NodeHostName" => NodeHostName: ignore(),
        "Version" => Version: ignore(),
        "OS" => Os: ignore(),
        "RealMemory" => RealMemory: rename(identity, "memory"),
        "AllocMem" => AllocMem: ignore(),
        "FreeMem" => FreeMem: ignore(),
        "MemSpecLimit" => MemSpecLimit: ignore(),
        "Sockets" => Sockets: ignore(),
        "Boards" => Boards: ignore(),
        "State" => State: rename(identity, "state"),
        "ThreadsPerCore" => ThreadsPerCore: ignore(),
        "TmpDisk" => TmpDisk: ignore(),
        "Weight" => Weight: ignore(),
        "Owner" => Owner: ignore(),
        "MCS_label" => McsLabel: ignore(),
        "Partitions" => Partitions: ignore(),
        "BootTime" => BootTime: ignore(),
        "SlurmdStartTime" => SlurmdStartTime: ignore(),
        "LastBusyTime" => LastBusyTime: ignore(),
        "ResumeAfterTime" => ResumeAfterTime: ignore(),
        // Probably better to parse the TRES strings into counters.
        "CfgTRES" => CfgTres: rename(identity, "cfg_tres"),
        "AllocTRES" => AllocTres: rename(identity, "alloc_tres"),
        "CapWatts" => CapWatts: ignore(),
        "CurrentWatts" => CurrentWatts: ignore(),
        "AveWatts" => AveWatts: ignore(),
        "ExtSensorsJoules" => ExtSensorsJoules: ignore(),
        "ExtSensorsWatts" => ExtSensorsWatts: ignore(),
        "ExtSensorsTemp" => ExtSensorsTemp: ignore(),
        "Reason" => Reason: rename(identity, "reason"),
        "Comment" => Comment: ignore(),
    }
}
