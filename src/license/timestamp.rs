/// Timestamp encoding used inside license claims
///
/// Written as RFC 3339 in UTC with as many fractional digits as needed.
/// Naive ISO-8601 values (no offset) from older issuers are read as local
/// time.
use chrono::{DateTime, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::LicenseError;

const NEVER: &str = "never";

/// How far back to look for the offset in force before a skipped hour
const GAP_LOOKBACK_HOURS: i64 = 3;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Lossless text form of a timestamp
pub fn format(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Parse RFC 3339, naive ISO-8601 (local time) or a bare date (local midnight)
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    resolve_local(naive, |n| {
        Local
            .from_local_datetime(n)
            .map(|dt| dt.with_timezone(&dt.offset().fix()))
    })
}

/// Pin a wall-clock time to an instant using `local` as the zone rules
///
/// Repeated times take the earlier instant. A time skipped by a forward
/// transition uses the offset in force just before the transition, so
/// 02:30 in a 02:00-03:00 gap lands on the same instant as 03:30.
fn resolve_local<F>(naive: NaiveDateTime, local: F) -> Option<DateTime<Utc>>
where
    F: Fn(&NaiveDateTime) -> LocalResult<DateTime<FixedOffset>>,
{
    if let Some(dt) = local(&naive).earliest() {
        return Some(dt.with_timezone(&Utc));
    }

    let before = naive.checked_sub_signed(chrono::Duration::hours(GAP_LOOKBACK_HOURS))?;
    let offset = *local(&before).earliest()?.offset();
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `#[serde(with)]` adapter for `DateTime<Utc>` fields
pub mod rfc3339 {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format_args!("invalid timestamp: {}", raw)))
    }
}

/// License expiry: a point in time or `"never"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    #[default]
    Never,
    At(DateTime<Utc>),
}

impl Expiry {
    /// True once `now` is strictly past the expiry instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(at) => now > *at,
        }
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiry::Never => None,
            Expiry::At(at) => Some(*at),
        }
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::Never => f.write_str(NEVER),
            Expiry::At(at) => f.write_str(&format(at)),
        }
    }
}

impl FromStr for Expiry {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(NEVER) {
            return Ok(Expiry::Never);
        }
        parse(s)
            .map(Expiry::At)
            .ok_or_else(|| LicenseError::MalformedClaim(format!("invalid expiry: {}", s)))
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == NEVER {
            return Ok(Expiry::Never);
        }
        parse(&raw)
            .map(Expiry::At)
            .ok_or_else(|| de::Error::custom(format_args!("invalid expires_at: {}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_roundtrip_keeps_precision() {
        let now = Utc::now();
        assert_eq!(parse(&format(&now)), Some(now));
    }

    #[test]
    fn test_skipped_local_time_is_shifted() {
        let standard = FixedOffset::east_opt(3600).unwrap();
        let summer = FixedOffset::east_opt(7200).unwrap();
        let day = NaiveDate::from_ymd_opt(2030, 3, 31).unwrap();
        let gap_start = day.and_hms_opt(2, 0, 0).unwrap();
        let gap_end = day.and_hms_opt(3, 0, 0).unwrap();

        let rules = |n: &NaiveDateTime| {
            if *n < gap_start {
                standard.from_local_datetime(n)
            } else if *n < gap_end {
                LocalResult::None
            } else {
                summer.from_local_datetime(n)
            }
        };

        let in_gap = resolve_local(day.and_hms_opt(2, 30, 0).unwrap(), rules).unwrap();
        let after_gap = resolve_local(day.and_hms_opt(3, 30, 0).unwrap(), rules).unwrap();
        assert_eq!(in_gap, after_gap);
        assert_eq!(in_gap, Utc.with_ymd_and_hms(2030, 3, 31, 1, 30, 0).unwrap());

        let before_gap = resolve_local(day.and_hms_opt(1, 30, 0).unwrap(), rules).unwrap();
        assert_eq!(before_gap, Utc.with_ymd_and_hms(2030, 3, 31, 0, 30, 0).unwrap());
    }

    #[test]
    fn test_repeated_local_time_takes_earlier_instant() {
        let summer = FixedOffset::east_opt(7200).unwrap();
        let standard = FixedOffset::east_opt(3600).unwrap();
        let naive = NaiveDate::from_ymd_opt(2030, 10, 27).unwrap().and_hms_opt(2, 30, 0).unwrap();

        let rules = |n: &NaiveDateTime| {
            LocalResult::Ambiguous(
                summer.from_local_datetime(n).unwrap(),
                standard.from_local_datetime(n).unwrap(),
            )
        };
        assert_eq!(
            resolve_local(naive, rules),
            Some(Utc.with_ymd_and_hms(2030, 10, 27, 0, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_variants() {
        assert!(parse("2030-01-01T00:00:00+00:00").is_some());
        assert!(parse("2030-01-01T00:00:00Z").is_some());
        assert!(parse("2030-01-01T12:30:00.123456").is_some());
        assert!(parse("2030-01-01 12:30:00").is_some());
        assert!(parse("2030-01-01").is_some());
        assert!(parse("next tuesday").is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        assert!(Expiry::At(now - Duration::seconds(1)).is_expired_at(now));
        assert!(!Expiry::At(now).is_expired_at(now));
        assert!(!Expiry::At(now + Duration::hours(1)).is_expired_at(now));
        assert!(!Expiry::Never.is_expired_at(now + Duration::days(365 * 100)));
    }

    #[test]
    fn test_expiry_json() {
        assert_eq!(serde_json::to_string(&Expiry::Never).unwrap(), "\"never\"");
        let parsed: Expiry = serde_json::from_str("\"2030-06-01T00:00:00+00:00\"").unwrap();
        assert_eq!(parsed.to_string(), "2030-06-01T00:00:00+00:00");
        assert!(serde_json::from_str::<Expiry>("\"soon\"").is_err());
    }

    #[test]
    fn test_expiry_from_str() {
        assert_eq!("NEVER".parse::<Expiry>().unwrap(), Expiry::Never);
        assert!("2030-01-01".parse::<Expiry>().is_ok());
        assert!("garbage".parse::<Expiry>().is_err());
    }
}
