use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Key prefix used when none is configured
pub const DEFAULT_KEY_PREFIX: &str = "requestCount";

/// Window granularity - how wall-clock time is cut into fixed windows
///
/// Windows are aligned to calendar boundaries (a new minute starts a new
/// window), never to the first request seen.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One window per minute, keyed by minute-of-hour (0-59).
    ///
    /// Windows exactly an hour apart share a key.
    MinuteOfHour,
    /// One window per minute, keyed by minutes since the Unix epoch
    #[default]
    EpochMinute,
    /// One window per hour, keyed by hours since the Unix epoch
    EpochHour,
    /// One window per UTC day, keyed by days since the Unix epoch
    EpochDay,
}

impl Granularity {
    /// Length of a single window
    pub fn window_length(&self) -> Duration {
        match self {
            Granularity::MinuteOfHour | Granularity::EpochMinute => Duration::from_secs(60),
            Granularity::EpochHour => Duration::from_secs(3_600),
            Granularity::EpochDay => Duration::from_secs(86_400),
        }
    }

    /// Time left until the window containing `now` closes
    pub fn reset_after(&self, now: &DateTime<Utc>) -> Duration {
        let length = self.window_length().as_millis() as i64;
        let elapsed = now.timestamp_millis().rem_euclid(length);
        Duration::from_millis((length - elapsed) as u64)
    }

    fn window_index(&self, now: &DateTime<Utc>) -> i64 {
        let secs = now.timestamp();
        match self {
            Granularity::MinuteOfHour => i64::from(now.minute()),
            Granularity::EpochMinute => secs.div_euclid(60),
            Granularity::EpochHour => secs.div_euclid(3_600),
            Granularity::EpochDay => secs.div_euclid(86_400),
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Granularity::MinuteOfHour => "",
            Granularity::EpochMinute => "m",
            Granularity::EpochHour => "h",
            Granularity::EpochDay => "d",
        }
    }
}

/// Maps wall-clock time to the counter store key of the window it falls in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowKeyDeriver {
    prefix: String,
    granularity: Granularity,
}

impl WindowKeyDeriver {
    /// Create a new key deriver
    pub fn new(prefix: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            prefix: prefix.into(),
            granularity,
        }
    }

    /// Derive the key of the window containing `now`
    pub fn derive_key(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}:{}{}",
            self.prefix,
            self.granularity.tag(),
            self.granularity.window_index(&now)
        )
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for WindowKeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX, Granularity::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_same_window_same_key() {
        let deriver = WindowKeyDeriver::default();
        assert_eq!(
            deriver.derive_key(at(12, 30, 0)),
            deriver.derive_key(at(12, 30, 59))
        );
    }

    #[test]
    fn test_adjacent_windows_differ() {
        let deriver = WindowKeyDeriver::default();
        assert_ne!(
            deriver.derive_key(at(12, 30, 59)),
            deriver.derive_key(at(12, 31, 0))
        );
    }

    #[test]
    fn test_minute_of_hour_matches_reference_keys() {
        let deriver = WindowKeyDeriver::new("requestCount", Granularity::MinuteOfHour);
        assert_eq!(deriver.derive_key(at(12, 7, 42)), "requestCount:7");

        // Known aliasing: an hour later lands on the same key
        assert_eq!(
            deriver.derive_key(at(12, 7, 0)),
            deriver.derive_key(at(13, 7, 0))
        );
    }

    #[test]
    fn test_epoch_minute_does_not_alias_across_hours() {
        let deriver = WindowKeyDeriver::new("requestCount", Granularity::EpochMinute);
        let key = deriver.derive_key(at(12, 7, 0));
        assert!(key.starts_with("requestCount:m"));
        assert_ne!(key, deriver.derive_key(at(13, 7, 0)));
    }

    #[test]
    fn test_hour_and_day_granularity() {
        let hourly = WindowKeyDeriver::new("rc", Granularity::EpochHour);
        assert_eq!(hourly.derive_key(at(12, 0, 0)), hourly.derive_key(at(12, 59, 59)));
        assert_ne!(hourly.derive_key(at(12, 59, 59)), hourly.derive_key(at(13, 0, 0)));

        let daily = WindowKeyDeriver::new("rc", Granularity::EpochDay);
        assert_eq!(daily.derive_key(at(0, 0, 0)), daily.derive_key(at(23, 59, 59)));
        assert_eq!(daily.derive_key(Utc.timestamp_opt(86_400, 0).unwrap()), "rc:d1");
    }

    #[test]
    fn test_pre_epoch_timestamps() {
        let deriver = WindowKeyDeriver::new("rc", Granularity::EpochMinute);
        assert_eq!(deriver.derive_key(Utc.timestamp_opt(-1, 0).unwrap()), "rc:m-1");
        assert_eq!(deriver.derive_key(Utc.timestamp_opt(0, 0).unwrap()), "rc:m0");
    }

    #[test]
    fn test_reset_after() {
        let minute = Granularity::EpochMinute;
        assert_eq!(minute.reset_after(&at(12, 0, 15)), Duration::from_secs(45));
        assert_eq!(minute.reset_after(&at(12, 0, 0)), Duration::from_secs(60));
        assert_eq!(
            Granularity::EpochHour.reset_after(&at(12, 30, 0)),
            Duration::from_secs(1_800)
        );
    }

    #[test]
    fn test_granularity_deserialize() {
        let g: Granularity = serde_yaml::from_str("minute_of_hour").unwrap();
        assert_eq!(g, Granularity::MinuteOfHour);
        assert_eq!(Granularity::default(), Granularity::EpochMinute);
    }
}
