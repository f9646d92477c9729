use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// Upstream payloads are loosely typed: numbers arrive as JSON numbers or as
// strings, and whole sub-objects may be missing or null. Numeric fields are
// kept as raw `Value`s here and parsed at the normalization boundary.

/// Null or wrongly typed values fall back to the default instead of failing
/// the whole payload.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Keeps the readable elements of a list. Anything but an array is empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Identifiers arrive as strings or bare numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

// Stats proxy: /player/{id}
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlayerDto {
    #[serde(deserialize_with = "lenient")]
    pub nickname: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub country: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub games: Option<GamesDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GamesDto {
    #[serde(deserialize_with = "lenient")]
    pub cs2: Option<Cs2GameDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Cs2GameDto {
    #[serde(deserialize_with = "lenient_id")]
    pub game_player_id: Option<String>,
    pub faceit_elo: Value,
    pub skill_level: Value,
}

// Stats proxy: /stats/{id}
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LifetimeStatsDto {
    #[serde(deserialize_with = "lenient")]
    pub lifetime: Map<String, Value>,
    #[serde(deserialize_with = "lenient_list")]
    pub segments: Vec<SegmentDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SegmentDto {
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub label: Option<String>,
    #[serde(deserialize_with = "lenient_id")]
    pub segment_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub stats: Option<Map<String, Value>>,
}

// Stats proxy: /history/{id}
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistoryDto {
    #[serde(deserialize_with = "lenient_list")]
    pub items: Vec<HistoryMatchDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistoryMatchDto {
    #[serde(deserialize_with = "lenient")]
    pub teams: BTreeMap<String, HistoryTeamDto>,
    #[serde(deserialize_with = "lenient")]
    pub results: Option<MatchResultsDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MatchResultsDto {
    #[serde(deserialize_with = "lenient")]
    pub winner: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistoryTeamDto {
    #[serde(deserialize_with = "lenient_list")]
    pub players: Vec<HistoryPlayerDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistoryPlayerDto {
    #[serde(deserialize_with = "lenient_id")]
    pub player_id: Option<String>,
}

// Stats proxy: /profile/{steam64}
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LeetifyProfileDto {
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    pub error: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    pub ranks: Option<LeetifyRanksDto>,
    #[serde(deserialize_with = "lenient")]
    pub rating: Option<LeetifyRatingDto>,
    #[serde(deserialize_with = "lenient")]
    pub stats: Option<LeetifyStatsDto>,
    pub total_matches: Value,
    pub winrate: Value,
    #[serde(deserialize_with = "lenient_list")]
    pub recent_matches: Vec<LeetifyRecentMatchDto>,
    // only a non-empty array means bans; other shapes are ignored
    pub bans: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LeetifyRanksDto {
    pub leetify: Value,
    pub premier: Value,
    pub faceit: Value,
    pub faceit_elo: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LeetifyRatingDto {
    pub aim: Value,
    pub utility: Value,
    pub positioning: Value,
    pub clutch: Value,
    pub opening: Value,
    pub ct_leetify: Value,
    pub t_leetify: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LeetifyStatsDto {
    pub accuracy_head: Value,
    pub reaction_time_ms: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LeetifyRecentMatchDto {
    #[serde(deserialize_with = "lenient")]
    pub map_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub outcome: Option<String>,
}

// Match room API: /match/{id}
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MatchRoomDto {
    pub payload: Option<MatchPayloadDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchPayloadDto {
    // keyed by faction; BTreeMap keeps faction1 ahead of faction2
    #[serde(deserialize_with = "lenient")]
    pub teams: Option<BTreeMap<String, RoomTeamDto>>,
    #[serde(deserialize_with = "lenient")]
    pub voting: Option<VotingDto>,
    #[serde(deserialize_with = "lenient")]
    pub configuration_override: Option<ConfigurationOverrideDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoomTeamDto {
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub roster: Vec<RosterPlayerDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RosterPlayerDto {
    #[serde(deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub nickname: Option<String>,
    #[serde(deserialize_with = "lenient_id")]
    pub game_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VotingDto {
    #[serde(deserialize_with = "lenient")]
    pub map: Option<MapVoteDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MapVoteDto {
    #[serde(deserialize_with = "lenient_list")]
    pub pick: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigurationOverrideDto {
    pub entity_custom: Option<EntityCustomDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EntityCustomDto {
    pub map: Option<String>,
}
