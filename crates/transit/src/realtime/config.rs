//! Configuration of the snapshot source.

use chrono::Duration;
use chrono_tz::Tz;

/// Service dates this many days before today are purged.
pub const RETENTION_DAYS: u64 = 2;

/// How delays are propagated to stops before the first updated stop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum BackwardsDelayPropagationType {
    /// Only as far back as needed to keep times increasing, flagging the
    /// earlier stops as having no data.
    #[default]
    RequiredNoData,
    /// Only as far back as needed to keep times increasing.
    Required,
    /// The first updated stop's delay is given to every earlier stop.
    Always,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct TimetableSnapshotSourceConfig {
    /// Minimum time between two published snapshots.
    pub max_snapshot_frequency_ms: u64,
    pub purge_expired_data: bool,
    /// Log the running total of applied updates every this many updates.
    pub log_frequency: u64,
    pub backwards_delay_propagation: BackwardsDelayPropagationType,
    /// Time zone of the schedule; defines service-day midnight and "today".
    pub timezone: Tz,
}

impl Default for TimetableSnapshotSourceConfig {
    fn default() -> Self {
        Self {
            max_snapshot_frequency_ms: 1000,
            purge_expired_data: true,
            log_frequency: 2000,
            backwards_delay_propagation: BackwardsDelayPropagationType::default(),
            timezone: Tz::UTC,
        }
    }
}

impl TimetableSnapshotSourceConfig {
    pub fn max_snapshot_frequency(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.max_snapshot_frequency_ms).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TimetableSnapshotSourceConfig::default();
        assert_eq!(config.max_snapshot_frequency(), Duration::seconds(1));
        assert!(config.purge_expired_data);
        assert_eq!(config.log_frequency, 2000);
        assert_eq!(
            config.backwards_delay_propagation,
            BackwardsDelayPropagationType::RequiredNoData
        );
        assert_eq!(config.timezone, Tz::UTC);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_partial() {
        let config: TimetableSnapshotSourceConfig = serde_json::from_str(
            r#"{"maxSnapshotFrequencyMs": 250, "backwardsDelayPropagation": "ALWAYS", "timezone": "Europe/Oslo"}"#,
        )
        .unwrap();
        assert_eq!(config.max_snapshot_frequency_ms, 250);
        assert_eq!(config.backwards_delay_propagation, BackwardsDelayPropagationType::Always);
        assert_eq!(config.timezone, chrono_tz::Europe::Oslo);
        assert!(config.purge_expired_data);
    }
}
