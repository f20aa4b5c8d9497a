//! Tag-encoded lifecycle state.
//!
//! The escalation state of an instance lives in one tag value:
//!
//! ```text
//! <stage>|<entered_at>[|<metadata>]
//! notify1|2020-03-04 01:30PM UTC
//! notify2|2020-03-05 09:00AM UTC|mailed ops@example.com
//! start|
//! ```
//!
//! `entered_at` uses a fixed minute-precision, 12-hour, always-UTC format
//! and may be empty. Tags are owned by the provider, so anyone can edit or
//! delete them. Decoding therefore never fails: an empty or malformed tag
//! decodes to [`LifecycleState::Untracked`].

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Timelike, Utc};
use tracing::warn;

use crate::error::{CodecError, CodecResult};

/// Field separator inside the tag value.
pub const SEPARATOR: char = '|';

/// `chrono` format of the `entered_at` field.
pub const TIME_FORMAT: &str = "%Y-%m-%d %I:%M%p UTC";

/// A named escalation stage.
///
/// The ordering of stages is a policy concern; the codec round-trips any
/// token, including ones it has no variant for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    Notify1,
    Notify2,
    Ignore,
    Whitelist,
    /// A token written by some other tool or a newer version of this one.
    Custom(String),
}

impl Stage {
    /// Parse a stage token. Well-known tokens match case-insensitively.
    pub fn parse(token: &str) -> CodecResult<Self> {
        if token.is_empty() {
            return Err(CodecError::EmptyStage);
        }
        if token.contains(SEPARATOR) {
            return Err(CodecError::ReservedSeparator(token.to_string()));
        }
        let stage = match token.to_ascii_lowercase().as_str() {
            "start" => Stage::Start,
            "notify1" => Stage::Notify1,
            "notify2" => Stage::Notify2,
            "ignore" => Stage::Ignore,
            "whitelist" => Stage::Whitelist,
            _ => Stage::Custom(token.to_string()),
        };
        Ok(stage)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Stage::Start => "start",
            Stage::Notify1 => "notify1",
            Stage::Notify2 => "notify2",
            Stage::Ignore => "ignore",
            Stage::Whitelist => "whitelist",
            Stage::Custom(token) => token,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Governance state of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// No usable `REAPER` tag: never governed, or the tag was clobbered.
    #[default]
    Untracked,
    Tracked {
        stage: Stage,
        entered_at: Option<DateTime<Utc>>,
        metadata: Option<String>,
    },
}

impl LifecycleState {
    /// A tracked state entered at `entered_at`, truncated to the minute.
    pub fn tracked(stage: Stage, entered_at: Option<DateTime<Utc>>) -> Self {
        LifecycleState::Tracked {
            stage,
            entered_at: entered_at.map(truncate_to_minute),
            metadata: None,
        }
    }

    /// Attach free-form metadata. Has no effect on an untracked state.
    pub fn with_metadata(self, value: impl Into<String>) -> CodecResult<Self> {
        let value = value.into();
        if value.contains(SEPARATOR) {
            return Err(CodecError::ReservedSeparator(value));
        }
        Ok(match self {
            LifecycleState::Untracked => LifecycleState::Untracked,
            LifecycleState::Tracked {
                stage, entered_at, ..
            } => LifecycleState::Tracked {
                stage,
                entered_at,
                metadata: (!value.is_empty()).then_some(value),
            },
        })
    }

    pub fn is_tracked(&self) -> bool {
        matches!(self, LifecycleState::Tracked { .. })
    }

    pub fn stage(&self) -> Option<&Stage> {
        match self {
            LifecycleState::Tracked { stage, .. } => Some(stage),
            LifecycleState::Untracked => None,
        }
    }

    pub fn entered_at(&self) -> Option<DateTime<Utc>> {
        match self {
            LifecycleState::Tracked { entered_at, .. } => *entered_at,
            LifecycleState::Untracked => None,
        }
    }

    pub fn metadata(&self) -> Option<&str> {
        match self {
            LifecycleState::Tracked { metadata, .. } => metadata.as_deref(),
            LifecycleState::Untracked => None,
        }
    }

    /// Time spent in the current stage, if the stage carries a timestamp.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.entered_at().map(|entered| now - entered)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}

/// Decode a tag value. Never fails; see [`try_decode`] for the reason a
/// tag was rejected.
pub fn decode(tag: &str) -> LifecycleState {
    match try_decode(tag) {
        Ok(state) => state,
        Err(e) => {
            warn!(%tag, error = %e, "malformed lifecycle tag, treating instance as untracked");
            LifecycleState::Untracked
        }
    }
}

/// Decode a tag value, reporting why a malformed one was rejected.
///
/// An empty (or all-whitespace) tag is not an error: it decodes to
/// [`LifecycleState::Untracked`].
pub fn try_decode(tag: &str) -> CodecResult<LifecycleState> {
    if tag.trim().is_empty() {
        return Ok(LifecycleState::Untracked);
    }

    let fields: Vec<&str> = tag.split(SEPARATOR).collect();
    let (token, timestamp, metadata) = match fields.as_slice() {
        [token, timestamp] => (*token, *timestamp, None),
        [token, timestamp, metadata] => (*token, *timestamp, Some(*metadata)),
        _ => return Err(CodecError::FieldCount(fields.len())),
    };

    let stage = Stage::parse(token)?;
    let entered_at = if timestamp.is_empty() {
        None
    } else {
        let naive = NaiveDateTime::parse_from_str(timestamp, TIME_FORMAT).map_err(|e| {
            CodecError::Timestamp {
                value: timestamp.to_string(),
                reason: e.to_string(),
            }
        })?;
        Some(naive.and_utc())
    };

    Ok(LifecycleState::Tracked {
        stage,
        entered_at,
        metadata: metadata.filter(|m| !m.is_empty()).map(str::to_string),
    })
}

/// Encode a state into its canonical tag value.
///
/// [`LifecycleState::Untracked`] encodes to the empty string, which is how
/// an instance that was never governed looks.
pub fn encode(state: &LifecycleState) -> String {
    match state {
        LifecycleState::Untracked => String::new(),
        LifecycleState::Tracked {
            stage,
            entered_at,
            metadata,
        } => {
            let mut out = String::from(stage.as_str());
            out.push(SEPARATOR);
            if let Some(ts) = entered_at {
                out.push_str(&ts.format(TIME_FORMAT).to_string());
            }
            if let Some(meta) = metadata {
                out.push(SEPARATOR);
                out.push_str(meta);
            }
            out
        }
    }
}

/// Encode a state, rejecting values that would not decode back to
/// themselves.
///
/// Only hand-built values can fail: a `Custom` stage that is empty,
/// contains the separator, or spells a well-known stage; metadata that is
/// empty or contains the separator; a timestamp with seconds or outside
/// four-digit years.
pub fn try_encode(state: &LifecycleState) -> CodecResult<String> {
    if let LifecycleState::Tracked {
        stage,
        entered_at,
        metadata,
    } = state
    {
        if Stage::parse(stage.as_str())? != *stage {
            return Err(CodecError::NotCanonical(stage.as_str().to_string()));
        }
        match metadata.as_deref() {
            Some(meta) if meta.contains(SEPARATOR) => {
                return Err(CodecError::ReservedSeparator(meta.to_string()));
            }
            Some("") => return Err(CodecError::NotCanonical(String::new())),
            _ => {}
        }
        if let Some(ts) = entered_at {
            if *ts != truncate_to_minute(*ts) || !(0..=9999).contains(&ts.year()) {
                return Err(CodecError::NotCanonical(ts.to_rfc3339()));
            }
        }
    }
    Ok(encode(state))
}

fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 4, h, m, 0).unwrap()
    }

    #[test]
    fn empty_and_garbage_decode_to_untracked() {
        assert_eq!(decode(""), LifecycleState::Untracked);
        assert_eq!(decode("   "), LifecycleState::Untracked);
        assert_eq!(decode("not-a-valid-tag-string"), LifecycleState::Untracked);
        assert_eq!(decode(""), decode("not-a-valid-tag-string"));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(try_decode("start"), Err(CodecError::FieldCount(1)));
        assert_eq!(try_decode("a|b|c|d"), Err(CodecError::FieldCount(4)));
        assert_eq!(decode("a|b|c|d"), LifecycleState::Untracked);
    }

    #[test]
    fn rejects_bad_timestamp() {
        assert!(matches!(
            try_decode("notify1|yesterday"),
            Err(CodecError::Timestamp { .. })
        ));
        // RFC 3339 is not the tag format.
        assert_eq!(decode("notify1|2020-03-04T13:30:00Z"), LifecycleState::Untracked);
    }

    #[test]
    fn rejects_empty_stage() {
        assert_eq!(try_decode("|2020-03-04 01:30PM UTC"), Err(CodecError::EmptyStage));
    }

    #[test]
    fn decodes_legacy_two_field_tag() {
        let state = decode("notify2|2020-03-04 01:30PM UTC");
        assert_eq!(state, LifecycleState::tracked(Stage::Notify2, Some(at(13, 30))));
        assert_eq!(state.metadata(), None);
    }

    #[test]
    fn decodes_metadata_and_empty_timestamp() {
        let state = decode("ignore||owner asked");
        assert_eq!(state.stage(), Some(&Stage::Ignore));
        assert_eq!(state.entered_at(), None);
        assert_eq!(state.metadata(), Some("owner asked"));
    }

    #[test]
    fn known_stages_match_case_insensitively() {
        assert_eq!(decode("Notify1|").stage(), Some(&Stage::Notify1));
        assert_eq!(decode("START|").stage(), Some(&Stage::Start));
        assert_eq!(
            decode("quarantine|").stage(),
            Some(&Stage::Custom("quarantine".to_string()))
        );
    }

    #[test]
    fn midnight_and_noon_use_twelve_hour_clock() {
        assert_eq!(encode(&LifecycleState::tracked(Stage::Start, Some(at(0, 5)))), "start|2020-03-04 12:05AM UTC");
        assert_eq!(encode(&LifecycleState::tracked(Stage::Start, Some(at(12, 5)))), "start|2020-03-04 12:05PM UTC");
    }

    #[test]
    fn round_trips_decoded_values() {
        let tags = [
            "",
            "start|",
            "notify1|2020-03-04 01:30PM UTC",
            "notify2|2020-03-04 12:00AM UTC|second notice",
            "whitelist||",
            "ignore||manual",
            "Quarantine|2019-12-31 11:59PM UTC",
            "garbage",
        ];
        for tag in tags {
            let state = decode(tag);
            assert_eq!(decode(&encode(&state)), state, "tag {tag:?}");
        }
    }

    #[test]
    fn tracked_truncates_to_minute() {
        let precise = Utc.with_ymd_and_hms(2020, 3, 4, 13, 30, 59).unwrap();
        let state = LifecycleState::tracked(Stage::Notify1, Some(precise));
        assert_eq!(state.entered_at(), Some(at(13, 30)));
        assert_eq!(decode(&encode(&state)), state);
    }

    #[test]
    fn metadata_rejects_separator() {
        let state = LifecycleState::tracked(Stage::Start, None);
        assert!(matches!(
            state.clone().with_metadata("a|b"),
            Err(CodecError::ReservedSeparator(_))
        ));
        let state = state.with_metadata("note").unwrap();
        assert_eq!(encode(&state), "start||note");
    }

    #[test]
    fn try_encode_rejects_hand_built_separators() {
        let bad_stage = LifecycleState::tracked(Stage::Custom("a|b".to_string()), None);
        assert!(matches!(try_encode(&bad_stage), Err(CodecError::ReservedSeparator(_))));

        let empty_stage = LifecycleState::tracked(Stage::Custom(String::new()), None);
        assert_eq!(try_encode(&empty_stage), Err(CodecError::EmptyStage));

        let bad_meta = LifecycleState::Tracked {
            stage: Stage::Start,
            entered_at: None,
            metadata: Some("x|y".to_string()),
        };
        assert!(try_encode(&bad_meta).is_err());

        let ok = LifecycleState::tracked(Stage::Notify1, Some(at(9, 15)));
        assert_eq!(try_encode(&ok).unwrap(), "notify1|2020-03-04 09:15AM UTC");
        assert_eq!(try_encode(&LifecycleState::Untracked).unwrap(), "");
    }

    #[test]
    fn try_encode_rejects_custom_spelling_of_known_stage() {
        for token in ["start", "Notify1", "NOTIFY2", "Ignore", "whitelist"] {
            let state = LifecycleState::tracked(Stage::Custom(token.to_string()), None);
            assert_eq!(
                try_encode(&state),
                Err(CodecError::NotCanonical(token.to_string())),
                "token {token:?}"
            );
        }
        let custom = LifecycleState::tracked(Stage::Custom("quarantine".to_string()), None);
        let tag = try_encode(&custom).unwrap();
        assert_eq!(decode(&tag), custom);
    }

    #[test]
    fn try_encode_rejects_values_encode_would_alter() {
        let empty_meta = LifecycleState::Tracked {
            stage: Stage::Ignore,
            entered_at: None,
            metadata: Some(String::new()),
        };
        assert!(matches!(try_encode(&empty_meta), Err(CodecError::NotCanonical(_))));

        let with_seconds = LifecycleState::Tracked {
            stage: Stage::Start,
            entered_at: Some(Utc.with_ymd_and_hms(2020, 3, 4, 13, 30, 59).unwrap()),
            metadata: None,
        };
        assert!(matches!(try_encode(&with_seconds), Err(CodecError::NotCanonical(_))));

        let far_future = LifecycleState::tracked(
            Stage::Start,
            Some(Utc.with_ymd_and_hms(12_000, 1, 1, 0, 0, 0).unwrap()),
        );
        assert!(matches!(try_encode(&far_future), Err(CodecError::NotCanonical(_))));
    }

    #[test]
    fn round_trips_across_stages_hours_and_metadata() {
        let tokens = ["start", "Start", "NOTIFY1", "notify2", "Ignore", "whitelist", "Quarantine"];
        let metadata = [None, Some("paged ops"), Some("")];
        for token in tokens {
            for hour in 0..24 {
                for meta in metadata {
                    let clock = (hour + 11) % 12 + 1;
                    let meridiem = if hour < 12 { "AM" } else { "PM" };
                    let mut tag = format!("{token}|2021-07-15 {clock:02}:{:02}{meridiem} UTC", hour * 2);
                    if let Some(meta) = meta {
                        tag.push(SEPARATOR);
                        tag.push_str(meta);
                    }
                    let state = try_decode(&tag).unwrap();
                    assert_eq!(state.entered_at().map(|t| t.hour()), Some(hour), "tag {tag:?}");

                    let encoded = try_encode(&state).unwrap();
                    assert_eq!(decode(&encoded), state, "tag {tag:?}");
                    assert_eq!(encode(&decode(&encoded)), encoded, "tag {tag:?}");
                }
            }
        }
    }

    #[test]
    fn age_since_entry() {
        let state = LifecycleState::tracked(Stage::Notify1, Some(at(10, 0)));
        assert_eq!(state.age(at(12, 0)), Some(Duration::hours(2)));
        assert_eq!(LifecycleState::Untracked.age(at(12, 0)), None);
    }
}
