//! Self-description carried in front of the audio payload

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Metadata line of a framed blob.
///
/// Field names are part of the stored format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
    /// ISO-8601 (UTC) creation time
    #[serde(default)]
    pub timestamp: String,
    /// Human-readable, timezone-qualified creation time
    #[serde(rename = "timestampWithTZ", default)]
    pub timestamp_with_tz: String,
    /// Best-effort length in whole seconds
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub duration: u64,
}

impl Metadata {
    /// Metadata stamped with the given instant
    pub fn at(title: impl Into<String>, duration: u64, now: DateTime<Utc>) -> Self {
        let local = now.with_timezone(&Local);
        Self {
            title: title.into(),
            timestamp: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            timestamp_with_tz: local.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
            duration,
        }
    }

    /// Metadata stamped with the current time
    pub fn now(title: impl Into<String>, duration: u64) -> Self {
        Self::at(title, duration, Utc::now())
    }
}

/// Older writers stored fractional or null durations
fn lenient_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(0);
    };
    if let Some(seconds) = number.as_u64() {
        return Ok(seconds);
    }
    Ok(number
        .as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wire_field_names() {
        let m = Metadata {
            title: "t".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            timestamp_with_tz: "2026-01-01 00:00:00 +00:00".into(),
            duration: 4,
        };
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(
            json,
            r#"{"title":"t","timestamp":"2026-01-01T00:00:00.000Z","timestampWithTZ":"2026-01-01 00:00:00 +00:00","duration":4}"#
        );
    }

    #[test]
    fn fractional_and_null_durations_are_accepted() {
        let m: Metadata = serde_json::from_str(r#"{"title":"a","duration":3.6}"#).unwrap();
        assert_eq!(m.duration, 4);
        let m: Metadata = serde_json::from_str(r#"{"title":"a","duration":null}"#).unwrap();
        assert_eq!(m.duration, 0);
        let m: Metadata = serde_json::from_str(r#"{"title":"a","duration":-2}"#).unwrap();
        assert_eq!(m.duration, 0);
    }

    #[test]
    fn large_durations_keep_every_digit() {
        let m: Metadata =
            serde_json::from_str(r#"{"title":"a","duration":9007199254740993}"#).unwrap();
        assert_eq!(m.duration, (1u64 << 53) + 1);
    }

    #[test]
    fn stamped_with_utc_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let m = Metadata::at("clip", 9, now);
        assert_eq!(m.timestamp, "2026-03-04T05:06:07.000Z");
        assert!(!m.timestamp_with_tz.is_empty());
        assert_eq!(m.duration, 9);
    }
}
