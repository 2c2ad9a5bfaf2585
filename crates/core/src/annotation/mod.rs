//! Shot-change annotation: the service seam and its wire types.

pub mod auth;
pub mod video_intelligence;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    error::DetectionServiceError,
    types::{ShotBoundary, round_millis},
};

pub use auth::{ServiceAccountCredentials, StaticToken, TokenSource, resolve_token_source};
pub use video_intelligence::VideoIntelligenceClient;

pub const SHOT_CHANGE_FEATURE: &str = "SHOT_CHANGE_DETECTION";

/// External annotation service that finds shot changes in a video payload.
#[async_trait]
pub trait ShotAnnotator: Send + Sync {
    /// Submit `payload` and wait for that job to complete.
    async fn annotate(&self, payload: Vec<u8>) -> Result<Vec<ShotAnnotation>, DetectionServiceError>;
}

/// Whole seconds plus a nanosecond remainder.
///
/// Accepts `{"seconds": 12, "nanos": 500000000}` (seconds may also be a
/// string) and protobuf JSON durations such as `"12.5s"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawOffset")]
pub struct TimeOffset {
    pub seconds: i64,
    pub nanos: i32,
}

impl TimeOffset {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn to_seconds(self) -> f64 {
        round_millis(self.seconds as f64 + self.nanos as f64 * 1e-9)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOffset {
    Text(String),
    Parts {
        #[serde(default)]
        seconds: Option<RawSeconds>,
        #[serde(default)]
        nanos: Option<i64>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSeconds {
    Number(i64),
    Text(String),
}

impl TryFrom<RawOffset> for TimeOffset {
    type Error = String;

    fn try_from(raw: RawOffset) -> Result<Self, Self::Error> {
        match raw {
            RawOffset::Text(text) => parse_duration_text(&text),
            RawOffset::Parts { seconds, nanos } => {
                let seconds = match seconds {
                    None => 0,
                    Some(RawSeconds::Number(n)) => n,
                    Some(RawSeconds::Text(t)) => t
                        .trim()
                        .parse()
                        .map_err(|_| format!("invalid seconds value {t:?}"))?,
                };
                let nanos = i32::try_from(nanos.unwrap_or(0))
                    .map_err(|_| "nanos out of range".to_string())?;
                Ok(TimeOffset { seconds, nanos })
            }
        }
    }
}

fn parse_duration_text(text: &str) -> Result<TimeOffset, String> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_suffix('s')
        .ok_or_else(|| format!("duration {trimmed:?} lacks the 's' suffix"))?;
    let (negative, body) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("duration {trimmed:?} has no digits"));
    }

    let seconds: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| format!("invalid duration {trimmed:?}"))?
    };
    if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid fractional seconds in {trimmed:?}"));
    }
    let nanos: i32 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<9}")
            .parse()
            .map_err(|_| format!("invalid duration {trimmed:?}"))?
    };

    Ok(if negative {
        TimeOffset::new(-seconds, -nanos)
    } else {
        TimeOffset::new(seconds, nanos)
    })
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotAnnotation {
    #[serde(default)]
    pub start_time_offset: TimeOffset,
    #[serde(default)]
    pub end_time_offset: TimeOffset,
}

impl ShotAnnotation {
    pub fn to_boundary(&self) -> ShotBoundary {
        ShotBoundary::new(
            self.start_time_offset.to_seconds(),
            self.end_time_offset.to_seconds(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_seconds_and_nanos_with_millisecond_rounding() {
        assert_eq!(TimeOffset::new(12, 345_678_901).to_seconds(), 12.346);
        assert_eq!(TimeOffset::new(0, 999_600_000).to_seconds(), 1.0);
        assert_eq!(TimeOffset::new(7, 0).to_seconds(), 7.0);
        assert_eq!(TimeOffset::default().to_seconds(), 0.0);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let shot: ShotAnnotation = serde_json::from_str(
            r#"{"startTimeOffset": {"nanos": 500000000}, "endTimeOffset": {"seconds": "4"}}"#,
        )
        .unwrap();
        assert_eq!(shot.to_boundary(), ShotBoundary::new(0.5, 4.0));

        let empty: ShotAnnotation = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.to_boundary(), ShotBoundary::new(0.0, 0.0));
    }

    #[test]
    fn accepts_protobuf_duration_strings() {
        let shot: ShotAnnotation = serde_json::from_str(
            r#"{"startTimeOffset": "10.041708s", "endTimeOffset": "25s"}"#,
        )
        .unwrap();
        assert_eq!(shot.start_time_offset, TimeOffset::new(10, 41_708_000));
        assert_eq!(shot.to_boundary(), ShotBoundary::new(10.042, 25.0));

        let neg: TimeOffset = serde_json::from_str(r#""-1.5s""#).unwrap();
        assert_eq!(neg.to_seconds(), -1.5);
    }

    #[test]
    fn rejects_garbage_durations() {
        assert!(serde_json::from_str::<TimeOffset>(r#""12.5""#).is_err());
        assert!(serde_json::from_str::<TimeOffset>(r#""s""#).is_err());
        assert!(serde_json::from_str::<TimeOffset>(r#""1.2x3s""#).is_err());
        assert!(serde_json::from_str::<TimeOffset>(r#"{"seconds": "ten"}"#).is_err());
    }
}
