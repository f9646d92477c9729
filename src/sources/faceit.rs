use super::{field_f64, field_u32, parse_f64, secondary, ProfileSource};
use crate::api::client::HttpTransport;
use crate::api::endpoints;
use crate::api::models::{HistoryDto, LifetimeStatsDto, PlayerDto, SegmentDto};
use crate::error::AppError;
use crate::profile::{normalize_map_name, rank_top_maps, MapStats, PlayerProfile};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Profiles keyed by platform player id, assembled from the identity,
/// lifetime-stats and match-history endpoints.
pub struct FaceitSource {
    transport: Arc<dyn HttpTransport>,
    api_base: String,
}

impl FaceitSource {
    pub fn new(transport: Arc<dyn HttpTransport>, api_base: &str) -> Self {
        FaceitSource {
            transport,
            api_base: api_base.to_string(),
        }
    }
}

#[async_trait]
impl ProfileSource for FaceitSource {
    fn name(&self) -> &'static str {
        "faceit"
    }

    async fn fetch_profile(&self, id: &str) -> Result<PlayerProfile, AppError> {
        let player_url = endpoints::player_url(&self.api_base, id);
        let stats_url = endpoints::stats_url(&self.api_base, id);
        let history_url = endpoints::history_url(&self.api_base, id);

        let (player_res, stats_res, history_res) = tokio::join!(
            self.transport.get(&player_url),
            self.transport.get(&stats_url),
            self.transport.get(&history_url),
        );

        let player_res = player_res?;
        if player_res.status == 429 {
            return Err(AppError::RateLimited);
        }
        if !player_res.is_success() {
            info!(player = %id, status = player_res.status, "player not found");
            return Err(AppError::PlayerNotFound(id.to_string()));
        }
        let player: PlayerDto = player_res.json()?;

        let stats: Option<LifetimeStatsDto> = secondary(stats_res, "stats", id);
        let history: Option<HistoryDto> = secondary(history_res, "history", id);

        let profile = build_profile(id, player, stats, history);
        info!(
            player = %id,
            elo = ?profile.faceit_elo,
            win_rate = ?profile.win_rate,
            "profile loaded"
        );
        Ok(profile)
    }
}

fn build_profile(
    id: &str,
    player: PlayerDto,
    stats: Option<LifetimeStatsDto>,
    history: Option<HistoryDto>,
) -> PlayerProfile {
    let cs2 = player.games.and_then(|g| g.cs2);
    let stats = stats.unwrap_or_default();
    let lifetime = &stats.lifetime;

    PlayerProfile {
        player_id: Some(id.to_string()),
        steam_id: cs2
            .as_ref()
            .and_then(|g| g.game_player_id.clone())
            .filter(|s| !s.is_empty()),
        nickname: player
            .nickname
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        country: player.country.filter(|c| !c.is_empty()),

        faceit_elo: cs2.as_ref().and_then(|g| parse_f64(&g.faceit_elo)),
        skill_level: cs2.as_ref().and_then(|g| parse_f64(&g.skill_level)),

        matches: field_u32(lifetime, "Matches"),
        wins: field_u32(lifetime, "Wins"),
        win_rate: field_f64(lifetime, "Win Rate %"),
        kd_ratio: field_f64(lifetime, "Average K/D Ratio"),
        kr_ratio: field_f64(lifetime, "Average K/R Ratio"),
        headshot_pct: field_f64(lifetime, "Average Headshots %"),
        avg_kills: field_f64(lifetime, "Average Kills"),
        avg_deaths: field_f64(lifetime, "Average Deaths"),
        longest_win_streak: field_u32(lifetime, "Longest Win Streak"),
        current_win_streak: field_u32(lifetime, "Current Win Streak"),

        top_maps: map_stats_from_segments(&stats.segments),
        recent_win_rate: history.as_ref().and_then(|h| recent_win_rate(h, id)),
        ..Default::default()
    }
}

fn map_stats_from_segments(segments: &[SegmentDto]) -> Vec<MapStats> {
    let rows = segments
        .iter()
        .filter(|s| s.kind.as_deref() == Some("Map"))
        .filter_map(|s| {
            let stats = s.stats.as_ref()?;
            let map_name = s
                .label
                .as_deref()
                .map(normalize_map_name)
                .or_else(|| s.segment_id.clone())?;
            let matches = field_u32(stats, "Matches").unwrap_or(0);
            let wins = field_u32(stats, "Wins").unwrap_or(0);
            // derive the rate when the segment omits it; rows with no
            // matches are dropped by the ranking anyway
            let win_rate = field_f64(stats, "Win Rate %").unwrap_or_else(|| {
                if matches > 0 {
                    wins as f64 / matches as f64 * 100.0
                } else {
                    0.0
                }
            });

            Some(MapStats {
                map_name,
                matches,
                wins,
                win_rate,
                avg_kills: field_f64(stats, "Average Kills"),
                avg_deaths: field_f64(stats, "Average Deaths"),
                avg_kd: field_f64(stats, "Average K/D Ratio"),
                avg_hs: field_f64(stats, "Average Headshots %"),
            })
        })
        .collect();

    rank_top_maps(rows)
}

/// Share of the history page this player won, as a percentage. A match is a
/// win only when the side listing the player is the reported winner.
fn recent_win_rate(history: &HistoryDto, id: &str) -> Option<f64> {
    if history.items.is_empty() {
        return None;
    }

    let wins = history
        .items
        .iter()
        .filter(|m| {
            let winner = m.results.as_ref().and_then(|r| r.winner.as_deref());
            let side = m.teams.iter().find_map(|(side, team)| {
                team.players
                    .iter()
                    .any(|p| p.player_id.as_deref() == Some(id))
                    .then_some(side.as_str())
            });
            side.is_some() && side == winner
        })
        .count();

    Some(wins as f64 / history.items.len() as f64 * 100.0)
}
