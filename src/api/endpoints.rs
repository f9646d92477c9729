// URL builders for the stats proxy and the match room API.

pub fn player_url(api_base: &str, player_id: &str) -> String {
    format!("{}/player/{}", api_base, player_id)
}

pub fn stats_url(api_base: &str, player_id: &str) -> String {
    format!("{}/stats/{}", api_base, player_id)
}

pub fn history_url(api_base: &str, player_id: &str) -> String {
    format!("{}/history/{}", api_base, player_id)
}

pub fn leetify_profile_url(api_base: &str, steam64_id: &str) -> String {
    format!("{}/profile/{}", api_base, steam64_id)
}

pub fn match_url(match_api_base: &str, match_id: &str) -> String {
    format!("{}/{}", match_api_base, match_id)
}
