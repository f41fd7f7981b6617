//! Records shared between the store, the cache manager and the reconciler.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Class of a cached network resource. Each class has its own cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Image,
    Api,
    Static,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 3] = [ResourceClass::Image, ResourceClass::Api, ResourceClass::Static];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::Image => "image",
            ResourceClass::Api => "api",
            ResourceClass::Static => "static",
        }
    }

    /// Name of the cache generation holding this class at `version`.
    pub fn generation(&self, version: &str) -> String {
        format!("showbell-{}-{version}", self.as_str())
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceClass {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(ResourceClass::Image),
            "api" => Ok(ResourceClass::Api),
            "static" => Ok(ResourceClass::Static),
            other => Err(crate::Error::CorruptRecord(format!("unknown resource class: {other}"))),
        }
    }
}

/// A cached network response.
///
/// At most one exists per `request_key`; every successful refresh overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub request_key: String,
    pub generation: String,
    pub url: String,
    pub method: String,
    pub resource_class: ResourceClass,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

/// A show on the user's watchlist, mirrored from the host app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub show_id: i64,
    pub title: String,
    #[serde(default)]
    pub poster_url: Option<String>,
}

/// An upcoming episode reported by the show metadata provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeCandidate {
    pub show_id: i64,
    pub season_number: u32,
    pub episode_number: u32,
    pub air_date: DateTime<Utc>,
    pub title: String,
}

impl EpisodeCandidate {
    /// Ledger key for this episode.
    pub fn dedup_key(&self) -> String {
        episode_key(self.show_id, self.season_number, self.episode_number)
    }
}

/// `{showId}-{season}-{episode}`
pub fn episode_key(show_id: i64, season: u32, episode: u32) -> String {
    format!("{show_id}-{season}-{episode}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
}

/// Lead time offered to free-tier users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum FreeTierTiming {
    #[serde(rename = "24-hours-before")]
    TwentyFourHoursBefore,
    #[serde(rename = "7-days-before")]
    SevenDaysBefore,
    /// Any other value the host sent. Not the same as notifications being off.
    #[serde(other)]
    Unset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ShowOverride {
    pub enabled: bool,
}

/// Notification preferences, owned by the host app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub global_enabled: bool,

    /// Keyed by show id.
    #[serde(default)]
    pub per_show_override: BTreeMap<String, ShowOverride>,

    #[serde(default)]
    pub tier: Tier,

    #[serde(default)]
    pub free_tier_timing: Option<FreeTierTiming>,

    #[serde(default = "default_pro_tier_lead_hours")]
    pub pro_tier_lead_hours: u32,
}

fn default_pro_tier_lead_hours() -> u32 {
    24
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            global_enabled: false,
            per_show_override: BTreeMap::new(),
            tier: Tier::Free,
            free_tier_timing: None,
            pro_tier_lead_hours: default_pro_tier_lead_hours(),
        }
    }
}

impl NotificationSettings {
    /// Whether notifications are on for `show_id`.
    pub fn show_enabled(&self, show_id: i64) -> bool {
        self.global_enabled
            && self
                .per_show_override
                .get(&show_id.to_string())
                .is_none_or(|o| o.enabled)
    }

    /// How long before air a notification becomes due.
    ///
    /// Returns `None` for a free tier without a recognised timing.
    pub fn lead_time(&self) -> Option<Duration> {
        match self.tier {
            Tier::Pro => Some(Duration::hours(i64::from(self.pro_tier_lead_hours))),
            Tier::Free => match self.free_tier_timing {
                Some(FreeTierTiming::TwentyFourHoursBefore) => Some(Duration::hours(24)),
                Some(FreeTierTiming::SevenDaysBefore) => Some(Duration::days(7)),
                Some(FreeTierTiming::Unset) | None => None,
            },
        }
    }
}

/// Ledger row proving an episode was announced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentNotificationRecord {
    pub key: String,
    pub sent_at: String,
}

/// A one-off notification the host asked to show at `fire_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledNotification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
    pub show_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(json: &str) -> NotificationSettings {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_episode_key_format() {
        assert_eq!(episode_key(42, 2, 5), "42-2-5");
    }

    #[test]
    fn test_generation_name() {
        assert_eq!(ResourceClass::Image.generation("v3"), "showbell-image-v3");
        assert_eq!("api".parse::<ResourceClass>().unwrap(), ResourceClass::Api);
        assert!("video".parse::<ResourceClass>().is_err());
    }

    #[test]
    fn test_settings_deserialize_host_shape() {
        let s = settings(
            r#"{
                "globalEnabled": true,
                "perShowOverride": {"42": {"enabled": false}},
                "tier": "free",
                "freeTierTiming": "7-days-before",
                "proTierLeadHours": 12
            }"#,
        );
        assert!(s.global_enabled);
        assert_eq!(s.free_tier_timing, Some(FreeTierTiming::SevenDaysBefore));
        assert!(!s.show_enabled(42));
        assert!(s.show_enabled(7));
    }

    #[test]
    fn test_unknown_free_timing_is_unset() {
        let s = settings(r#"{"globalEnabled": true, "tier": "free", "freeTierTiming": "1-hour-before"}"#);
        assert_eq!(s.free_tier_timing, Some(FreeTierTiming::Unset));
        assert_eq!(s.lead_time(), None);
        assert!(s.show_enabled(1));
    }

    #[test]
    fn test_lead_time_by_tier() {
        let pro = settings(r#"{"globalEnabled": true, "tier": "pro", "proTierLeadHours": 36}"#);
        assert_eq!(pro.lead_time(), Some(Duration::hours(36)));

        let free_day = settings(r#"{"globalEnabled": true, "freeTierTiming": "24-hours-before"}"#);
        assert_eq!(free_day.lead_time(), Some(Duration::hours(24)));

        let free_unset = settings(r#"{"globalEnabled": true}"#);
        assert_eq!(free_unset.lead_time(), None);
    }

    #[test]
    fn test_global_disable_wins_over_override() {
        let s = settings(r#"{"globalEnabled": false, "perShowOverride": {"42": {"enabled": true}}}"#);
        assert!(!s.show_enabled(42));
    }
}
