use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hoplink_core::{BusError, ClickEvent};

type Result<T> = std::result::Result<T, BusError>;

/// Serializes a click event for the wire.
pub fn encode_click_payload(event: &ClickEvent) -> Result<Vec<u8>> {
    serde_json::to_vec(event).map_err(|e| BusError::Publish(format!("failed to encode event: {e}")))
}

/// Decodes a click payload, accepting both encodings seen on the wire:
/// raw JSON, and a JSON string wrapping base64-encoded JSON (some
/// publishers re-wrap byte payloads that way). A leading quote marks
/// the wrapped form.
pub fn decode_click_payload(payload: &[u8]) -> Result<ClickEvent> {
    if payload.is_empty() {
        return Err(BusError::Decode("empty payload".to_string()));
    }

    let raw: Vec<u8>;
    let json = if payload[0] == b'"' {
        let wrapped: String = serde_json::from_slice(payload)
            .map_err(|e| BusError::Decode(format!("invalid wrapped payload: {e}")))?;
        raw = BASE64
            .decode(wrapped.as_bytes())
            .map_err(|e| BusError::Decode(format!("invalid base64 payload: {e}")))?;
        raw.as_slice()
    } else {
        payload
    };

    serde_json::from_slice(json).map_err(|e| BusError::Decode(format!("invalid click event: {e}")))
}
