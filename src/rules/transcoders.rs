//! Value transcoders and rule constructors used by the field tables.

use crate::{Error, FieldRule, FieldValue, ParseContext, Result, Transcoder};
use chrono::NaiveDateTime;

/// Slurm's placeholder for a time that is not known yet.
pub const UNKNOWN_SENTINEL: &str = "Unknown";

pub const UNLIMITED_SENTINEL: &str = "UNLIMITED";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn ignore() -> FieldRule {
    FieldRule::Ignore
}

pub fn rename(transcode: Transcoder, target: &'static str) -> FieldRule {
    FieldRule::Rename { transcode, target }
}

pub fn dyn_rename(transcode: Transcoder, target: fn(&ParseContext) -> &str) -> FieldRule {
    FieldRule::DynamicRename { transcode, target }
}

/// Return the field as-is.
pub fn identity(raw: &str, _ctx: &ParseContext) -> Result<FieldValue> {
    Ok(FieldValue::Text(raw.to_string()))
}

/// Strip the `(uid)` suffix identity fields carry: `alice(1234)` -> `alice`.
pub fn account(raw: &str, _ctx: &ParseContext) -> Result<FieldValue> {
    let name = raw.split('(').next().unwrap_or(raw);
    Ok(FieldValue::Text(name.to_string()))
}

/// Decode `[[D-]HH:]MM:SS` into seconds.
///
/// Groups are read right to left; a missing group counts as zero, so
/// `02:03` is two minutes and three seconds.
pub fn time_limit(raw: &str, _ctx: &ParseContext) -> Result<FieldValue> {
    let invalid = || Error::InvalidTimeLimit { value: raw.to_string() };
    let caps = regex!(r"^(?:(?:(?:([0-9]+)-)?([0-9]{2}):)?([0-9]{2}):)?([0-9]{2})$").captures(raw).ok_or_else(invalid)?;

    let group = |idx: usize| -> Result<u64> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().map_err(|_| invalid()),
            None => Ok(0),
        }
    };
    let (days, hours, minutes, seconds) = (group(1)?, group(2)?, group(3)?, group(4)?);

    days.checked_mul(86_400)
        .and_then(|d| d.checked_add(hours * 3600 + minutes * 60 + seconds))
        .map(FieldValue::Seconds)
        .ok_or_else(invalid)
}

/// Like [`time_limit`], but `UNLIMITED` decodes to [`FieldValue::Unlimited`].
///
/// Reservations without an end print `Duration=UNLIMITED`.
pub fn duration(raw: &str, ctx: &ParseContext) -> Result<FieldValue> {
    if raw == UNLIMITED_SENTINEL {
        return Ok(FieldValue::Unlimited);
    }
    time_limit(raw, ctx)
}

/// Attach the context's zone to a naive `YYYY-MM-DDTHH:MM:SS` timestamp.
///
/// `Unknown` is kept as the sentinel rather than rejected. A local time that
/// falls twice takes the earlier instant; one inside a DST gap is rejected.
pub fn timestamp(raw: &str, ctx: &ParseContext) -> Result<FieldValue> {
    if raw == UNKNOWN_SENTINEL {
        return Ok(FieldValue::Unknown);
    }
    let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|err| Error::InvalidTimestamp { value: raw.to_string(), reason: err.to_string() })?;
    ctx.timezone.resolve(naive).map(FieldValue::Timestamp).ok_or_else(|| Error::InvalidTimestamp {
        value: raw.to_string(),
        reason: format!("local time does not exist in {}", ctx.timezone),
    })
}
