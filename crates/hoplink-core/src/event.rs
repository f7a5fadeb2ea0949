use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A click event emitted on every successful resolution.
///
/// Published once per resolve on the `url.clicked` subject and
/// delivered at least once to the analytics ingester, which fills in
/// the derived fields (geo, device taxonomy, uniqueness).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub short_code: ShortCode,
    pub long_url: String,
    pub client_address: String,
    pub user_agent: String,
    pub referrer: String,
    #[serde(with = "unix_seconds")]
    pub occurred_at: Timestamp,
    /// Coarse identity proxy derived from the client address and a
    /// time window; see [`crate::session::session_bucket`].
    pub session_id: String,
}

/// Serializes timestamps as integer Unix seconds, matching the wire
/// convention used everywhere else in the platform.
mod unix_seconds {
    use jiff::Timestamp;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(ts.as_second())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let seconds = i64::deserialize(deserializer)?;
        Timestamp::from_second(seconds).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_integer_timestamp() {
        let event = ClickEvent {
            short_code: ShortCode::new_unchecked("abc1234"),
            long_url: "https://example.com".to_string(),
            client_address: "203.0.113.7".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            referrer: String::new(),
            occurred_at: Timestamp::from_second(1_700_000_000).unwrap(),
            session_id: "deadbeefdeadbeef".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"occurred_at\":1700000000"));

        let back: ClickEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
