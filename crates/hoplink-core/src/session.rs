use jiff::Timestamp;
use std::time::Duration;
use xxhash_rust::xxh64::xxh64;

/// Default width of the session bucket window.
pub const DEFAULT_SESSION_WINDOW: Duration = Duration::from_secs(300);

/// Derives a session identifier from the client address and a time
/// window.
///
/// Clicks from the same address within one window share a session id,
/// approximating unique visitors without persistent identifiers. The
/// address is hashed so it never appears verbatim in analytics rows.
pub fn session_bucket(client_address: &str, now: Timestamp, window: Duration) -> String {
    let window_secs = window.as_secs().max(1) as i64;
    let bucket = now.as_second().div_euclid(window_secs);
    format!(
        "{:016x}",
        xxh64(format!("{client_address}:{bucket}").as_bytes(), 0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    #[test]
    fn same_window_same_session() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let later = now + SignedDuration::from_secs(120);
        let a = session_bucket("203.0.113.7", now, DEFAULT_SESSION_WINDOW);
        let b = session_bucket("203.0.113.7", later, DEFAULT_SESSION_WINDOW);
        assert_eq!(a, b);
    }

    #[test]
    fn next_window_changes_session() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let later = now + SignedDuration::from_secs(300);
        let a = session_bucket("203.0.113.7", now, DEFAULT_SESSION_WINDOW);
        let b = session_bucket("203.0.113.7", later, DEFAULT_SESSION_WINDOW);
        assert_ne!(a, b);
    }

    #[test]
    fn different_addresses_differ() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let a = session_bucket("203.0.113.7", now, DEFAULT_SESSION_WINDOW);
        let b = session_bucket("203.0.113.8", now, DEFAULT_SESSION_WINDOW);
        assert_ne!(a, b);
    }

    #[test]
    fn session_id_is_fixed_width_hex() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let id = session_bucket("203.0.113.7", now, DEFAULT_SESSION_WINDOW);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
