//! Per-cluster configuration.
//!
//! Loaded once at startup and read-only afterwards:
//!
//! ```toml
//! [clusters.mila]
//! allocations = "*"
//! timezone = "America/Montreal"
//! username_slot = "mila_cluster_username"
//!
//! [clusters.beluga]
//! allocations = ["rrg-bengioy-ad_gpu", "def-bengioy_cpu"]
//! username_slot = "cc_account_username"
//! ```

use crate::{ClusterTimezone, DEFAULT_USERNAME_SLOT, Error, ParseContext, Result};
use chrono::FixedOffset;
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterConfig>,
}

/// One cluster's section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    /// `"*"` for every allocation of the cluster, or an explicit list.
    pub allocations: Allocations,

    /// Zone of the cluster's clock: an IANA name, `UTC`, `Z` or `±HH:MM`.
    /// Default: UTC.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Name under which a job's `UserId` is stored.
    #[serde(default = "default_username_slot")]
    pub username_slot: String,

    /// Record field job tallies are grouped by. Default: `username_slot`.
    #[serde(default)]
    pub tally_field: Option<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_username_slot() -> String {
    DEFAULT_USERNAME_SLOT.to_string()
}

/// Allocation names of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAllocations")]
pub enum Allocations {
    /// The `"*"` wildcard.
    All,
    Only(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAllocations {
    Wildcard(String),
    List(Vec<String>),
}

impl TryFrom<RawAllocations> for Allocations {
    type Error = String;

    fn try_from(raw: RawAllocations) -> std::result::Result<Self, String> {
        match raw {
            RawAllocations::Wildcard(s) if s == "*" => Ok(Allocations::All),
            RawAllocations::Wildcard(s) => Err(format!("allocations must be \"*\" or a list of names, got {s:?}")),
            RawAllocations::List(names) => Ok(Allocations::Only(names)),
        }
    }
}

impl Default for Allocations {
    fn default() -> Self {
        Allocations::Only(Vec::new())
    }
}

impl Allocations {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Allocations::All)
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            Allocations::All => true,
            Allocations::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

impl ClusterConfig {
    /// Build the parse context for this cluster's dumps.
    pub fn context(&self) -> Result<ParseContext> {
        Ok(ParseContext::new(parse_timezone(&self.timezone)?, self.username_slot.clone()))
    }

    pub fn tally_field(&self) -> &str {
        self.tally_field.as_deref().unwrap_or(&self.username_slot)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_toml_str(&data).map_err(|err| match err {
            Error::Config { reason } => Error::Config { reason: format!("{}: {reason}", path.display()) },
            other => other,
        })
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(data).map_err(|err| Error::Config { reason: err.to_string() })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, cluster) in &self.clusters {
            parse_timezone(&cluster.timezone)
                .map_err(|err| Error::Config { reason: format!("clusters.{name}.timezone: {err}") })?;
            if cluster.username_slot.is_empty() {
                return Err(Error::Config { reason: format!("clusters.{name}.username_slot must not be empty") });
            }
        }
        Ok(())
    }

    pub fn cluster(&self, name: &str) -> Option<&ClusterConfig> {
        self.clusters.get(name)
    }

    /// Allocations of `cluster`; an unconfigured cluster has none.
    pub fn allocations(&self, cluster: &str) -> Allocations {
        self.cluster(cluster).map(|c| c.allocations.clone()).unwrap_or_default()
    }
}

/// Parse an IANA zone name (`America/Montreal`), `UTC`, `GMT`, `Z`, or a
/// `±HH:MM` / `±HHMM` offset.
pub fn parse_timezone(value: &str) -> Result<ClusterTimezone> {
    let invalid =
        || Error::Config { reason: format!("invalid timezone {value:?} (expected an IANA name, UTC or ±HH:MM)") };
    if matches!(value.to_ascii_uppercase().as_str(), "UTC" | "GMT" | "Z") {
        return FixedOffset::east_opt(0).map(ClusterTimezone::Fixed).ok_or_else(invalid);
    }

    let Some(caps) = regex!(r"^([+-])([0-9]{2}):?([0-9]{2})$").captures(value) else {
        return value.parse::<Tz>().map(ClusterTimezone::Named).map_err(|_| invalid());
    };
    let hours: i32 = caps[2].parse().map_err(|_| invalid())?;
    let minutes: i32 = caps[3].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    let seconds = hours * 3600 + minutes * 60;
    let seconds = if &caps[1] == "-" { -seconds } else { seconds };
    FixedOffset::east_opt(seconds).map(ClusterTimezone::Fixed).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[clusters.mila]
allocations = "*"
timezone = "-04:00"
username_slot = "mila_cluster_username"

[clusters.beluga]
allocations = ["rrg-bengioy-ad_gpu", "def-bengioy_cpu"]
username_slot = "cc_account_username"
tally_field = "account"
"#;

    #[test]
    fn parses_wildcard_and_lists() {
        let cfg = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.allocations("mila"), Allocations::All);
        assert!(cfg.allocations("mila").contains("anything"));
        assert_eq!(
            cfg.allocations("beluga"),
            Allocations::Only(vec!["rrg-bengioy-ad_gpu".to_string(), "def-bengioy_cpu".to_string()])
        );
        assert!(!cfg.allocations("beluga").contains("other"));
    }

    #[test]
    fn unknown_cluster_has_no_allocations() {
        let cfg = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.allocations("graham"), Allocations::Only(Vec::new()));
        assert!(!cfg.allocations("graham").contains("x"));
    }

    #[test]
    fn cluster_builds_its_context() {
        let cfg = Config::from_toml_str(SAMPLE).unwrap();
        let mila = cfg.cluster("mila").unwrap();
        let ctx = mila.context().unwrap();
        assert_eq!(ctx.timezone, ClusterTimezone::Fixed(FixedOffset::west_opt(4 * 3600).unwrap()));
        assert_eq!(ctx.username_slot(), "mila_cluster_username");
        assert_eq!(mila.tally_field(), "mila_cluster_username");

        let beluga = cfg.cluster("beluga").unwrap();
        assert_eq!(beluga.context().unwrap().timezone, ClusterTimezone::default());
        assert_eq!(beluga.tally_field(), "account");
    }

    #[test]
    fn rejects_non_wildcard_string() {
        let err = Config::from_toml_str("[clusters.x]\nallocations = \"all\"\n").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn rejects_bad_timezone() {
        let err = Config::from_toml_str("[clusters.x]\nallocations = \"*\"\ntimezone = \"Mars/Olympus\"\n").unwrap_err();
        match err {
            Error::Config { reason } => assert!(reason.contains("clusters.x.timezone"), "{reason}"),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn timezone_forms() {
        let fixed = |secs| ClusterTimezone::Fixed(FixedOffset::east_opt(secs).unwrap());
        assert_eq!(parse_timezone("utc").unwrap(), fixed(0));
        assert_eq!(parse_timezone("+0530").unwrap(), fixed(5 * 3600 + 1800));
        assert_eq!(parse_timezone("-05:00").unwrap(), fixed(-5 * 3600));
        assert_eq!(parse_timezone("America/Montreal").unwrap(), ClusterTimezone::Named(chrono_tz::America::Montreal));
        assert!(parse_timezone("+24:00").is_err());
        assert!(parse_timezone("5").is_err());
    }

    #[test]
    fn named_zone_is_accepted_in_config() {
        let cfg =
            Config::from_toml_str("[clusters.mila]\nallocations = \"*\"\ntimezone = \"America/Toronto\"\n").unwrap();
        let ctx = cfg.cluster("mila").unwrap().context().unwrap();
        assert_eq!(ctx.timezone, ClusterTimezone::Named(chrono_tz::America::Toronto));
    }
}
