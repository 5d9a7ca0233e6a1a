//! User-agent classification
//!
//! Maps a raw `User-Agent` header to a short label such as
//! `"Desktop · Chrome"`. The label is computed once when a visit is ingested
//! and stored with the record.

/// Number of leading user-agent characters inspected by the classifier
const SCAN_PREFIX: usize = 200;

/// Stateless mapping from a raw user agent to a device label
pub trait DeviceClassifier: Send + Sync {
    fn classify(&self, user_agent: &str) -> String;
}

/// Substring-based classifier covering the common browsers
#[derive(Debug, Clone, Copy, Default)]
pub struct UserAgentClassifier;

impl UserAgentClassifier {
    fn device(ua: &str) -> &'static str {
        if ua.contains("tablet") || ua.contains("ipad") {
            "Tablet"
        } else if ua.contains("mobile") || ua.contains("android") {
            "Mobile"
        } else {
            "Desktop"
        }
    }

    // Order matters: Edge and Opera both advertise "chrome".
    fn browser(ua: &str) -> &'static str {
        if ua.contains("edg/") {
            "Edge"
        } else if ua.contains("opr/") || ua.contains("opera") {
            "Opera"
        } else if ua.contains("chrome") && !ua.contains("chromium") {
            "Chrome"
        } else if ua.contains("firefox") {
            "Firefox"
        } else if ua.contains("safari") && !ua.contains("chrome") {
            "Safari"
        } else {
            "Other"
        }
    }
}

impl DeviceClassifier for UserAgentClassifier {
    fn classify(&self, user_agent: &str) -> String {
        if user_agent.is_empty() {
            return "Unknown".to_string();
        }

        let scanned: String = user_agent.chars().take(SCAN_PREFIX).collect();
        let ua = scanned.to_lowercase();

        format!("{} · {}", Self::device(&ua), Self::browser(&ua))
    }
}
