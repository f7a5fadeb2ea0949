use crate::{analytics, shortener};
use hoplink_core::{ClickEvent, ShortCode, UrlMapping};
use jiff::Timestamp;
use thiserror::Error;

/// Failure to convert a wire value into its domain counterpart.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("invalid short code: {0}")]
    ShortCode(String),
    #[error("invalid timestamp {0}: {1}")]
    Timestamp(i64, String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

pub(crate) fn timestamp_from_wire(seconds: i64) -> Result<Timestamp, ConversionError> {
    Timestamp::from_second(seconds)
        .map_err(|e| ConversionError::Timestamp(seconds, e.to_string()))
}

impl From<&UrlMapping> for shortener::v1::UrlMapping {
    fn from(mapping: &UrlMapping) -> Self {
        Self {
            short_code: mapping.short_code.to_string(),
            long_url: mapping.long_url.clone(),
            owner_id: mapping.owner_id.clone(),
            created_at: mapping.created_at.as_second(),
            expires_at: mapping.expires_at.map(|ts| ts.as_second()),
            click_count: mapping.click_count as i64,
            last_accessed: mapping.last_accessed.map(|ts| ts.as_second()),
            active: mapping.active,
            metadata: mapping
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl From<&ClickEvent> for analytics::v1::ClickEventMessage {
    fn from(event: &ClickEvent) -> Self {
        Self {
            short_code: event.short_code.to_string(),
            long_url: event.long_url.clone(),
            client_address: event.client_address.clone(),
            user_agent: event.user_agent.clone(),
            referrer: event.referrer.clone(),
            occurred_at: event.occurred_at.as_second(),
            session_id: event.session_id.clone(),
        }
    }
}

impl TryFrom<analytics::v1::ClickEventMessage> for ClickEvent {
    type Error = ConversionError;

    fn try_from(message: analytics::v1::ClickEventMessage) -> Result<Self, Self::Error> {
        let short_code = ShortCode::new(message.short_code.as_str())
            .map_err(|e| ConversionError::ShortCode(e.to_string()))?;
        let occurred_at = timestamp_from_wire(message.occurred_at)?;

        Ok(Self {
            short_code,
            long_url: message.long_url,
            client_address: message.client_address,
            user_agent: message.user_agent,
            referrer: message.referrer,
            occurred_at,
            session_id: message.session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn mapping_survives_the_wire() {
        let mut metadata = BTreeMap::new();
        metadata.insert("campaign".to_string(), "spring".to_string());

        let mapping = UrlMapping {
            short_code: ShortCode::new_unchecked("abc1234"),
            long_url: "https://example.com".to_string(),
            owner_id: "u1".to_string(),
            created_at: Timestamp::from_second(1_700_000_000).unwrap(),
            expires_at: Some(Timestamp::from_second(1_700_003_600).unwrap()),
            click_count: 3,
            last_accessed: None,
            active: true,
            metadata,
        };

        let wire: shortener::v1::UrlMapping = (&mapping).into();
        assert_eq!(wire.short_code, "abc1234");
        assert_eq!(wire.created_at, 1_700_000_000);
        assert_eq!(wire.expires_at, Some(1_700_003_600));
        assert_eq!(wire.click_count, 3);
        assert_eq!(wire.metadata.get("campaign").map(String::as_str), Some("spring"));
    }

    #[test]
    fn click_event_round_trips() {
        let event = ClickEvent {
            short_code: ShortCode::new_unchecked("abc1234"),
            long_url: "https://example.com".to_string(),
            client_address: "203.0.113.7".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            referrer: String::new(),
            occurred_at: Timestamp::from_second(1_700_000_000).unwrap(),
            session_id: "deadbeefdeadbeef".to_string(),
        };

        let wire: analytics::v1::ClickEventMessage = (&event).into();
        let back: ClickEvent = wire.try_into().unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn invalid_wire_short_code_is_rejected() {
        let message = analytics::v1::ClickEventMessage {
            short_code: "no".to_string(),
            long_url: String::new(),
            client_address: String::new(),
            user_agent: String::new(),
            referrer: String::new(),
            occurred_at: 0,
            session_id: String::new(),
        };

        let result: Result<ClickEvent, _> = message.try_into();
        assert!(matches!(result, Err(ConversionError::ShortCode(_))));
    }
}
