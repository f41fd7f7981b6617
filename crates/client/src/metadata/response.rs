//! Show details response types and normalization into episode candidates.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use showbell_core::EpisodeCandidate;

/// Raw `GET /tv/{id}` response. Only the fields the reconciler needs.
#[derive(Debug, Deserialize)]
pub struct ShowDetailsResponse {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub next_episode_to_air: Option<EpisodeResponse>,
    #[serde(default)]
    pub upcoming_episodes: Option<Vec<EpisodeResponse>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeResponse {
    pub season_number: u32,
    pub episode_number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
}

impl ShowDetailsResponse {
    /// Normalize into candidates for `show_id`.
    ///
    /// Duplicate (season, episode) pairs keep their first occurrence and
    /// episodes without a usable air date are dropped.
    pub fn into_candidates(self, show_id: i64, air_hour_utc: u32) -> Vec<EpisodeCandidate> {
        let mut seen = HashSet::new();
        self.next_episode_to_air
            .into_iter()
            .chain(self.upcoming_episodes.unwrap_or_default())
            .filter(|ep| seen.insert((ep.season_number, ep.episode_number)))
            .filter_map(|ep| {
                let Some(air_date) = ep.air_date.as_deref().and_then(|raw| parse_air_date(raw, air_hour_utc)) else {
                    tracing::debug!(
                        show_id,
                        season = ep.season_number,
                        episode = ep.episode_number,
                        "episode has no usable air date"
                    );
                    return None;
                };
                let title = ep
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("Episode {}", ep.episode_number));
                Some(EpisodeCandidate {
                    show_id,
                    season_number: ep.season_number,
                    episode_number: ep.episode_number,
                    air_date,
                    title,
                })
            })
            .collect()
    }
}

/// Parse an air date: a full RFC 3339 timestamp, or `YYYY-MM-DD` taken at
/// `air_hour_utc` on that day.
pub fn parse_air_date(raw: &str, air_hour_utc: u32) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(air_hour_utc, 0, 0))
        .map(|dt| dt.and_utc())
}
