//! Field table for `scontrol show reservation`.

use super::transcoders::{duration, identity, ignore, rename, timestamp};

field_table! {
    pub enum ReservationField {
        "ReservationName" => ReservationName: rename(identity, "name"),
        "StartTime" => StartTime: rename(timestamp, "start_time"),
        "EndTime" => EndTime: rename(timestamp, "end_time"),
        "Duration" => Duration: rename(duration, "duration"),
        "Nodes" => Nodes: rename(identity, "nodes"),
        "NodeCnt" => NodeCnt: rename(identity, "node_count"),
        "CoreCnt" => CoreCnt: ignore(),
        "Features" => Features: rename(identity, "features"),
        "PartitionName" => PartitionName: rename(identity, "partition"),
        "Flags" => Flags: rename(identity, "flags"),
        "TRES" => Tres: rename(identity, "tres"),
        "Users" => Users: rename(identity, "users"),
        "Groups" => Groups: ignore(),
        "Accounts" => Accounts: rename(identity, "accounts"),
        "Licenses" => Licenses: ignore(),
        "State" => State: rename(identity, "state"),
        "BurstBuffer" => BurstBuffer: ignore(),
        "Watts" => Watts: ignore(),
        "MaxStartDelay" => MaxStartDelay: ignore(),
        "Comment" => Comment: ignore(),
    }
}
