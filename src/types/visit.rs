//! Visit record types and ingestion normalization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DeviceClassifier;
use crate::utils::{time::iso_seconds, truncate_chars, truncate_to_seconds};

/// Maximum stored length of the raw user agent
pub const MAX_USER_AGENT_LEN: usize = 400;
/// Maximum stored length of the referrer
pub const MAX_REFERRER_LEN: usize = 500;
/// Maximum stored length of the language tag
pub const MAX_LANGUAGE_LEN: usize = 32;

/// Address recorded when none could be resolved
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// One logged page view
///
/// JSON keys follow the dashboard's on-disk format (`time`, `ip`, ...).
/// Records are immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    #[serde(rename = "time", with = "iso_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "ip")]
    pub source_address: String,
    #[serde(rename = "userAgent", default)]
    pub user_agent: String,
    #[serde(default)]
    pub referrer: String,
    #[serde(rename = "device", default)]
    pub device_class: String,
    #[serde(default)]
    pub screen: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Raw visit data handed over by the HTTP layer
///
/// `source_address` is already resolved from forwarding headers.
#[derive(Debug, Clone, Default)]
pub struct VisitInput {
    pub source_address: String,
    pub user_agent: String,
    pub referrer: String,
    pub screen_width: Option<u64>,
    pub screen_height: Option<u64>,
    pub language: Option<String>,
}

impl VisitRecord {
    /// Normalize raw input into a storable record
    ///
    /// Truncates the user agent, referrer and language, derives the device
    /// label from the full user agent and drops sub-second precision from
    /// `now`. The screen is recorded only when both dimensions are known.
    pub fn ingest(
        input: VisitInput,
        classifier: &dyn DeviceClassifier,
        now: DateTime<Utc>,
    ) -> Self {
        let device_class = classifier.classify(&input.user_agent);

        let source_address = match input.source_address.trim() {
            "" => UNKNOWN_ADDRESS.to_string(),
            addr => addr.to_string(),
        };

        let screen = match (input.screen_width, input.screen_height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        };

        Self {
            timestamp: truncate_to_seconds(now),
            source_address,
            user_agent: truncate_chars(&input.user_agent, MAX_USER_AGENT_LEN),
            referrer: truncate_chars(&input.referrer, MAX_REFERRER_LEN),
            device_class,
            screen,
            language: input
                .language
                .map(|lang| truncate_chars(&lang, MAX_LANGUAGE_LEN)),
        }
    }
}
