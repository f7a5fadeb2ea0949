use woothee::parser::Parser;

/// Device taxonomy extracted from a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    /// One of `desktop`, `mobile`, `tablet`.
    pub device_type: String,
    pub browser: String,
    pub os: String,
}

const UNKNOWN: &str = "Unknown";

/// Parses a user agent into the analytics taxonomy.
///
/// woothee supplies browser/OS families; the device class adds a
/// substring check because the taxonomy folds tablets into the
/// smartphone category.
pub fn parse_user_agent(user_agent: &str) -> UserAgentInfo {
    let lower = user_agent.to_ascii_lowercase();
    let parsed = Parser::new().parse(user_agent);

    let category = parsed.as_ref().map(|p| p.category).unwrap_or_default();
    let device_type = if lower.contains("ipad") || lower.contains("tablet") {
        "tablet"
    } else if matches!(category, "smartphone" | "mobilephone")
        || lower.contains("mobile")
        || lower.contains("iphone")
        || lower.contains("android")
    {
        "mobile"
    } else {
        "desktop"
    };

    let browser = match parsed.as_ref().map(|p| p.name) {
        Some(name) if !name.is_empty() && name != "UNKNOWN" => name.to_string(),
        _ => UNKNOWN.to_string(),
    };

    let os = match parsed.as_ref().map(|p| p.os) {
        Some(os) if !os.is_empty() && os != "UNKNOWN" => os.to_string(),
        _ => UNKNOWN.to_string(),
    };

    UserAgentInfo {
        device_type: device_type.to_string(),
        browser,
        os,
    }
}
