use super::{parse_f64, parse_u32, ProfileSource};
use crate::api::client::HttpTransport;
use crate::api::endpoints;
use crate::api::models::{LeetifyProfileDto, LeetifyRecentMatchDto};
use crate::error::AppError;
use crate::profile::{normalize_map_name, rank_top_maps, MapStats, PlayerProfile};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Profiles keyed by Steam64 id, served by a single combined endpoint.
pub struct LeetifySource {
    transport: Arc<dyn HttpTransport>,
    api_base: String,
}

impl LeetifySource {
    pub fn new(transport: Arc<dyn HttpTransport>, api_base: &str) -> Self {
        LeetifySource {
            transport,
            api_base: api_base.to_string(),
        }
    }
}

#[async_trait]
impl ProfileSource for LeetifySource {
    fn name(&self) -> &'static str {
        "leetify"
    }

    async fn fetch_profile(&self, id: &str) -> Result<PlayerProfile, AppError> {
        let url = endpoints::leetify_profile_url(&self.api_base, id);
        let response = self.transport.get(&url).await?;

        if response.status == 429 {
            warn!(player = %id, "rate limited");
            return Err(AppError::RateLimited);
        }
        if !response.is_success() {
            info!(player = %id, status = response.status, "player not found or upstream error");
            return Err(AppError::PlayerNotFound(id.to_string()));
        }

        let data: LeetifyProfileDto = response.json()?;
        if let Some(error) = data.error.as_ref().filter(|e| !e.is_null()) {
            info!(player = %id, %error, "upstream reported an error");
            return Err(AppError::PlayerNotFound(id.to_string()));
        }

        let profile = build_profile(id, data);
        info!(player = %id, rating = ?profile.leetify_rating, "profile loaded");
        Ok(profile)
    }
}

fn build_profile(id: &str, data: LeetifyProfileDto) -> PlayerProfile {
    let ranks = data.ranks.unwrap_or_default();
    let rating = data.rating.unwrap_or_default();
    let stats = data.stats.unwrap_or_default();

    PlayerProfile {
        steam_id: Some(id.to_string()),
        nickname: data
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),

        leetify_rating: parse_f64(&ranks.leetify),
        premier_rank: parse_f64(&ranks.premier),
        skill_level: parse_f64(&ranks.faceit),
        faceit_elo: parse_f64(&ranks.faceit_elo),

        aim: parse_f64(&rating.aim),
        utility: parse_f64(&rating.utility),
        positioning: parse_f64(&rating.positioning),
        clutch: parse_f64(&rating.clutch),
        opening: parse_f64(&rating.opening),
        ct_rating: parse_f64(&rating.ct_leetify),
        t_rating: parse_f64(&rating.t_leetify),

        matches: parse_u32(&data.total_matches),
        // upstream reports a fraction
        win_rate: parse_f64(&data.winrate).map(|w| w * 100.0),
        headshot_pct: parse_f64(&stats.accuracy_head),
        reaction_time_ms: parse_f64(&stats.reaction_time_ms),

        has_bans: data.bans.as_array().is_some_and(|b| !b.is_empty()),
        top_maps: map_stats_from_recent(&data.recent_matches),
        ..Default::default()
    }
}

#[derive(Default)]
struct Tally {
    wins: u32,
    losses: u32,
    ties: u32,
}

/// Per-map records tallied from the recent match list, in first-seen order
/// before ranking.
fn map_stats_from_recent(recent: &[LeetifyRecentMatchDto]) -> Vec<MapStats> {
    let mut tallies: Vec<(String, Tally)> = Vec::new();

    for m in recent {
        let Some(map_name) = m.map_name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let idx = match tallies.iter().position(|(name, _)| name == map_name) {
            Some(idx) => idx,
            None => {
                tallies.push((map_name.to_string(), Tally::default()));
                tallies.len() - 1
            }
        };

        let tally = &mut tallies[idx].1;
        match m.outcome.as_deref() {
            Some("win") => tally.wins += 1,
            Some("loss") => tally.losses += 1,
            Some("tie") => tally.ties += 1,
            _ => {}
        }
    }

    let rows = tallies
        .into_iter()
        .map(|(name, t)| {
            let total = t.wins + t.losses + t.ties;
            MapStats {
                map_name: normalize_map_name(&name),
                matches: total,
                wins: t.wins,
                win_rate: if total > 0 {
                    t.wins as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
                avg_kills: None,
                avg_deaths: None,
                avg_kd: None,
                avg_hs: None,
            }
        })
        .collect();

    rank_top_maps(rows)
}
