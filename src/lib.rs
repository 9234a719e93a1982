extern crate self as slurm_state;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[macro_use]
mod macros;
mod api;
pub mod config;
mod engine;
mod error;
pub mod poll;
mod rules;
pub mod state;

pub use api::{parse, parse_reader, update};
pub use engine::{Blocks, KNOWN_MALFORMED_TOKENS, Records, map_block};
pub use error::{Error, Result};
pub use rules::{JobField, NodeField, ReservationField};

// --- Entity kinds -----------------------------------------------------------

/// The kind of `scontrol show` listing a block came from.
///
/// Each kind owns one field table; a key missing from that table is a hard
/// error rather than silently dropped data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Job,
    Node,
    Reservation,
}

impl EntityKind {
    /// Look up the rule registered for a raw `scontrol` key.
    pub fn rule_for(self, key: &str) -> Option<FieldRule> {
        match self {
            EntityKind::Job => JobField::from_key(key).map(JobField::rule),
            EntityKind::Node => NodeField::from_key(key).map(NodeField::rule),
            EntityKind::Reservation => ReservationField::from_key(key).map(ReservationField::rule),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Job => "job",
            EntityKind::Node => "node",
            EntityKind::Reservation => "reservation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// --- Raw blocks -------------------------------------------------------------

/// One entity's `Key=Value` pairs before interpretation, in input order.
///
/// A repeated key keeps its first position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBlock {
    fields: Vec<(String, String)>,
}

impl RawBlock {
    pub fn new() -> Self {
        RawBlock { fields: Vec::new() }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// --- Normalized records -----------------------------------------------------

/// A converted field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Passed through (or lightly trimmed) text.
    Text(String),
    /// A duration in seconds, decoded from `[[D-]HH:]MM:SS`.
    Seconds(u64),
    /// A timestamp with the cluster's offset attached.
    Timestamp(DateTime<FixedOffset>),
    /// Slurm's `Unknown` sentinel for a time not known yet.
    Unknown,
    /// `UNLIMITED`, printed for a duration without an end.
    Unlimited,
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seconds(&self) -> Option<u64> {
        match self {
            FieldValue::Seconds(s) => Some(*s),
            _ => None,
        }
    }

    /// Re-encode the value in the grammar `scontrol` prints it in.
    ///
    /// ```text
    /// Text("gpu:2")            -> gpu:2
    /// Seconds(90123)           -> 1-01:02:03
    /// Timestamp(..+00:00)      -> 2023-06-01T10:00:00
    /// Unknown                  -> Unknown
    /// Unlimited                -> UNLIMITED
    /// ```
    pub fn to_scontrol(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Seconds(total) => {
                let (days, rest) = (total / 86_400, total % 86_400);
                let (hours, minutes, seconds) = (rest / 3600, rest % 3600 / 60, rest % 60);
                if days > 0 {
                    format!("{days}-{hours:02}:{minutes:02}:{seconds:02}")
                } else {
                    format!("{hours:02}:{minutes:02}:{seconds:02}")
                }
            }
            FieldValue::Timestamp(ts) => ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
            FieldValue::Unknown => "Unknown".to_string(),
            FieldValue::Unlimited => "UNLIMITED".to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Seconds(s) => write!(f, "{s}"),
            FieldValue::Timestamp(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, false)),
            FieldValue::Unknown => f.write_str("Unknown"),
            FieldValue::Unlimited => f.write_str("UNLIMITED"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Seconds(s) => serializer.serialize_u64(*s),
            other => serializer.collect_str(other),
        }
    }
}

/// A block after field mapping: canonical field name to converted value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Record { fields: BTreeMap::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text value of `name`, if present and textual.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, FieldValue)>>(iter: T) -> Self {
        Record { fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

// --- Parse context ----------------------------------------------------------

/// The clock a cluster's `scontrol` prints local times in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterTimezone {
    /// A constant offset, for clusters running on UTC or a zone without DST.
    Fixed(FixedOffset),
    /// An IANA zone such as `America/Montreal`; the offset follows DST.
    Named(Tz),
}

impl ClusterTimezone {
    /// Attach this zone to a naive local time.
    ///
    /// ```text
    /// unique local time        -> that instant
    /// ambiguous (DST fall back) -> the earlier instant, i.e. the summer offset
    /// skipped (DST spring gap)  -> None
    /// ```
    pub fn resolve(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            ClusterTimezone::Fixed(offset) => naive.and_local_timezone(*offset).single(),
            ClusterTimezone::Named(tz) => naive.and_local_timezone(*tz).earliest().map(|dt| dt.fixed_offset()),
        }
    }
}

impl From<FixedOffset> for ClusterTimezone {
    fn from(offset: FixedOffset) -> Self {
        ClusterTimezone::Fixed(offset)
    }
}

impl From<Tz> for ClusterTimezone {
    fn from(tz: Tz) -> Self {
        ClusterTimezone::Named(tz)
    }
}

impl Default for ClusterTimezone {
    fn default() -> Self {
        ClusterTimezone::Fixed(Utc.fix())
    }
}

impl fmt::Display for ClusterTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterTimezone::Fixed(offset) => write!(f, "{offset}"),
            ClusterTimezone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Ambient state transcoders need but cannot read from the raw value.
///
/// One per parse invocation; never shared between clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContext {
    /// Zone attached to the naive timestamps `scontrol` prints.
    pub timezone: ClusterTimezone,
    /// Output name under which a job's `UserId` is stored.
    pub username_slot: String,
}

pub const DEFAULT_USERNAME_SLOT: &str = "cluster_username";

impl ParseContext {
    pub fn new(timezone: impl Into<ClusterTimezone>, username_slot: impl Into<String>) -> Self {
        ParseContext { timezone: timezone.into(), username_slot: username_slot.into() }
    }

    pub fn username_slot(&self) -> &str {
        &self.username_slot
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        ParseContext { timezone: ClusterTimezone::default(), username_slot: DEFAULT_USERNAME_SLOT.to_string() }
    }
}

// --- Field rules ------------------------------------------------------------

/// Converts one raw value, possibly consulting the context.
pub type Transcoder = fn(&str, &ParseContext) -> Result<FieldValue>;

/// What to do with one raw key.
#[derive(Clone, Copy)]
pub enum FieldRule {
    /// Drop the field.
    Ignore,
    /// Transcode and store under a fixed canonical name.
    Rename { transcode: Transcoder, target: &'static str },
    /// Transcode and store under a name resolved from the context.
    DynamicRename { transcode: Transcoder, target: fn(&ParseContext) -> &str },
}

impl FieldRule {
    /// Apply the rule to `raw`, writing at most one entry into `out`.
    pub fn apply(&self, raw: &str, ctx: &ParseContext, out: &mut Record) -> Result<()> {
        match self {
            FieldRule::Ignore => {}
            FieldRule::Rename { transcode, target } => out.insert(*target, transcode(raw, ctx)?),
            FieldRule::DynamicRename { transcode, target } => {
                let value = transcode(raw, ctx)?;
                out.insert(target(ctx), value);
            }
        }
        Ok(())
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self, FieldRule::Ignore)
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRule::Ignore => f.write_str("Ignore"),
            FieldRule::Rename { target, .. } => {
                f.debug_struct("Rename").field("transcode", &"<function>").field("target", target).finish()
            }
            FieldRule::DynamicRename { .. } => f
                .debug_struct("DynamicRename")
                .field("transcode", &"<function>")
                .field("target", &"<context>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn raw_block_keeps_first_position_last_value() {
        let mut block = RawBlock::new();
        block.insert("JobId", "1");
        block.insert("JobName", "a");
        block.insert("JobId", "2");

        let pairs: Vec<_> = block.iter().collect();
        assert_eq!(pairs, vec![("JobId", "2"), ("JobName", "a")]);
    }

    #[test]
    fn field_value_serializes_by_shape() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let record: Record = vec![
            ("name", FieldValue::Text("job".into())),
            ("time_limit", FieldValue::Seconds(60)),
            ("start_time", FieldValue::Timestamp(tz.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap())),
            ("end_time", FieldValue::Unknown),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"end_time":"Unknown","name":"job","start_time":"2023-06-01T10:00:00+00:00","time_limit":60}"#
        );
    }

    #[test]
    fn seconds_reencode_with_day_prefix_only_when_needed() {
        assert_eq!(FieldValue::Seconds(3723).to_scontrol(), "01:02:03");
        assert_eq!(FieldValue::Seconds(90123).to_scontrol(), "1-01:02:03");
        assert_eq!(FieldValue::Unlimited.to_scontrol(), "UNLIMITED");
    }

    #[test]
    fn named_zone_follows_daylight_saving() {
        let montreal = ClusterTimezone::from(chrono_tz::America::Montreal);
        let at = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap();

        let summer = montreal.resolve(at("2023-06-01T10:00:00")).unwrap();
        assert_eq!(summer.offset().local_minus_utc(), -4 * 3600);
        let winter = montreal.resolve(at("2023-12-01T10:00:00")).unwrap();
        assert_eq!(winter.offset().local_minus_utc(), -5 * 3600);

        // 01:30 happens twice on 2023-11-05; the first one is still on EDT.
        let repeated = montreal.resolve(at("2023-11-05T01:30:00")).unwrap();
        assert_eq!(repeated.offset().local_minus_utc(), -4 * 3600);
        // 02:30 never happens on 2023-03-12.
        assert_eq!(montreal.resolve(at("2023-03-12T02:30:00")), None);
    }

    #[test]
    fn dynamic_rename_uses_context_slot() {
        let ctx = ParseContext::new(FixedOffset::east_opt(0).unwrap(), "mila_cluster_username");
        let rule = FieldRule::DynamicRename {
            transcode: |raw, _| Ok(FieldValue::Text(raw.to_string())),
            target: ParseContext::username_slot,
        };
        let mut out = Record::new();
        rule.apply("alice", &ctx, &mut out).unwrap();
        assert_eq!(out.text("mila_cluster_username"), Some("alice"));
    }
}
