use serde::{Deserialize, Serialize};

/// Most map rows kept on a profile.
pub const MAX_TOP_MAPS: usize = 5;
/// Fewest recorded matches for a map row to be kept.
pub const MIN_MAP_MATCHES: u32 = 3;

/// Per-map record. Only `map_name`, `matches`, `wins` and `win_rate` are
/// guaranteed; the averages are only reported by the lifetime-stats upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapStats {
    pub map_name: String,
    pub matches: u32,
    pub wins: u32,
    pub win_rate: f64,
    pub avg_kills: Option<f64>,
    pub avg_deaths: Option<f64>,
    pub avg_kd: Option<f64>,
    pub avg_hs: Option<f64>,
}

/// Canonical player record built from either upstream.
///
/// `None` means the upstream did not provide the field. It is never
/// interchangeable with `Some(0.0)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerProfile {
    // identity
    pub player_id: Option<String>,
    pub steam_id: Option<String>,
    pub nickname: String,
    pub country: Option<String>,

    // ratings / ranks
    pub faceit_elo: Option<f64>,
    pub skill_level: Option<f64>,
    pub leetify_rating: Option<f64>,
    pub premier_rank: Option<f64>,

    // aggregate performance
    pub matches: Option<u32>,
    pub wins: Option<u32>,
    pub win_rate: Option<f64>,
    pub kd_ratio: Option<f64>,
    pub kr_ratio: Option<f64>,
    pub headshot_pct: Option<f64>,
    pub avg_kills: Option<f64>,
    pub avg_deaths: Option<f64>,
    pub longest_win_streak: Option<u32>,
    pub current_win_streak: Option<u32>,
    pub reaction_time_ms: Option<f64>,

    // sub-ratings
    pub aim: Option<f64>,
    pub utility: Option<f64>,
    pub positioning: Option<f64>,
    pub clutch: Option<f64>,
    pub opening: Option<f64>,
    pub ct_rating: Option<f64>,
    pub t_rating: Option<f64>,

    pub has_bans: bool,
    pub top_maps: Vec<MapStats>,
    pub recent_win_rate: Option<f64>,
}

impl PlayerProfile {
    /// Looks up a map row by name, ignoring case and `de_`/`cs_` prefixes.
    pub fn map_stats(&self, map_name: &str) -> Option<&MapStats> {
        let wanted = normalize_map_name(map_name).to_lowercase();
        self.top_maps
            .iter()
            .find(|m| m.map_name.to_lowercase() == wanted)
    }
}

/// Drops the `de_` / `cs_` prefixes upstreams put on map identifiers.
pub fn normalize_map_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix("de_")
        .or_else(|| trimmed.strip_prefix("cs_"))
        .unwrap_or(trimmed);
    stripped.to_string()
}

/// Keeps rows with enough matches, ordered by matches played, capped.
pub fn rank_top_maps(mut maps: Vec<MapStats>) -> Vec<MapStats> {
    maps.retain(|m| m.matches >= MIN_MAP_MATCHES);
    // stable sort keeps upstream order between equal sample sizes
    maps.sort_by(|a, b| b.matches.cmp(&a.matches));
    maps.truncate(MAX_TOP_MAPS);
    maps
}
