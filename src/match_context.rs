use crate::api::client::HttpTransport;
use crate::api::endpoints;
use crate::api::models::{MatchRoomDto, RoomTeamDto};
use crate::error::AppError;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

fn room_pattern() -> &'static Regex {
    static ROOM: OnceLock<Regex> = OnceLock::new();
    ROOM.get_or_init(|| Regex::new(r"(?i)/room/([a-f0-9-]+)").expect("room pattern is valid"))
}

/// Extracts the match id from a room page address.
pub fn room_match_id(page_url: &str) -> Option<String> {
    room_pattern()
        .captures(page_url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn is_room_page(page_url: &str) -> bool {
    room_pattern().is_match(page_url)
}

/// Which roster field identifies a player to the profile source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterKey {
    PlayerId,
    /// Steam64 id; players without one are left out of the context.
    SteamId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterPlayer {
    pub player_id: String,
    pub steam_id: Option<String>,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    pub name: String,
    pub players: Vec<RosterPlayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchContext {
    pub page_url: String,
    pub match_id: String,
    pub team1: Team,
    pub team2: Team,
    /// Nickname or player id to the identifier the profile source expects.
    pub name_to_identifier: HashMap<String, String>,
    /// Identifier back to nickname.
    pub identifier_to_name: HashMap<String, String>,
    pub map_name: Option<String>,
}

impl MatchContext {
    pub fn identifier_for(&self, name: &str) -> Option<&str> {
        self.name_to_identifier.get(name).map(String::as_str)
    }

    pub fn nickname_for(&self, identifier: &str) -> Option<&str> {
        self.identifier_to_name.get(identifier).map(String::as_str)
    }

    /// Profile identifiers for one team, in roster order.
    pub fn identifiers(&self, team: &Team, key: RosterKey) -> Vec<String> {
        team.players
            .iter()
            .filter_map(|p| match key {
                RosterKey::PlayerId => Some(p.player_id.clone()),
                RosterKey::SteamId => p.steam_id.clone(),
            })
            .collect()
    }

    pub fn player_count(&self) -> usize {
        self.team1.players.len() + self.team2.players.len()
    }
}

/// Builds a context from the room API payload.
pub fn build_context(
    page_url: &str,
    match_id: &str,
    room: MatchRoomDto,
    key: RosterKey,
) -> Result<MatchContext, AppError> {
    let payload = room
        .payload
        .ok_or_else(|| AppError::MatchNotFound(format!("{}: empty payload", match_id)))?;
    let teams = payload
        .teams
        .ok_or_else(|| AppError::MatchNotFound(format!("{}: no teams in response", match_id)))?;

    let mut factions = teams.into_values();
    let (Some(first), Some(second)) = (factions.next(), factions.next()) else {
        return Err(AppError::MatchNotFound(format!("{}: fewer than two teams", match_id)));
    };

    let mut name_to_identifier = HashMap::new();
    let mut identifier_to_name = HashMap::new();
    let mut build_team = |team: RoomTeamDto| {
        let mut players = Vec::new();
        for player in team.roster {
            let Some(player_id) = player.id.filter(|id| !id.is_empty()) else {
                continue;
            };
            let steam_id = player.game_id.filter(|g| !g.is_empty());
            let identifier = match key {
                RosterKey::PlayerId => player_id.clone(),
                RosterKey::SteamId => match &steam_id {
                    Some(steam) => steam.clone(),
                    None => continue,
                },
            };
            let nickname = player.nickname.unwrap_or_else(|| player_id.clone());

            name_to_identifier.insert(player_id.clone(), identifier.clone());
            name_to_identifier.insert(nickname.clone(), identifier.clone());
            identifier_to_name.insert(identifier, nickname.clone());

            players.push(RosterPlayer {
                player_id,
                steam_id,
                nickname,
            });
        }
        Team {
            name: team
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Team".to_string()),
            players,
        }
    };

    let team1 = build_team(first);
    let team2 = build_team(second);

    let picked = payload
        .voting
        .and_then(|v| v.map)
        .and_then(|m| m.pick.into_iter().next());
    let overridden = payload
        .configuration_override
        .and_then(|c| c.entity_custom)
        .and_then(|e| e.map);
    let map_name = picked
        .filter(|m| !m.is_empty())
        .or_else(|| overridden.filter(|m| !m.is_empty()));

    Ok(MatchContext {
        page_url: page_url.to_string(),
        match_id: match_id.to_string(),
        team1,
        team2,
        name_to_identifier,
        identifier_to_name,
        map_name,
    })
}

type ContextWaiter = oneshot::Sender<Option<MatchContext>>;

#[derive(Default)]
struct ContextState {
    cached: Option<MatchContext>,
    // waiters per page URL
    pending: HashMap<String, Vec<ContextWaiter>>,
    epoch: u64,
}

struct ContextInner {
    transport: Arc<dyn HttpTransport>,
    match_api_base: String,
    key: RosterKey,
    state: Mutex<ContextState>,
}

/// Caches the context for the most recent page URL. Any other URL misses.
#[derive(Clone)]
pub struct MatchContextCache {
    inner: Arc<ContextInner>,
}

impl MatchContextCache {
    pub fn new(transport: Arc<dyn HttpTransport>, match_api_base: &str, key: RosterKey) -> Self {
        MatchContextCache {
            inner: Arc::new(ContextInner {
                transport,
                match_api_base: match_api_base.to_string(),
                key,
                state: Mutex::new(ContextState::default()),
            }),
        }
    }

    pub async fn fetch(&self, page_url: &str) -> Option<MatchContext> {
        let rx = {
            let mut state = self.inner.state.lock().await;
            if let Some(ctx) = state.cached.as_ref().filter(|c| c.page_url == page_url) {
                return Some(ctx.clone());
            }

            let match_id = room_match_id(page_url)?;

            let (tx, rx) = oneshot::channel();
            match state.pending.get_mut(page_url) {
                Some(waiters) => waiters.push(tx),
                None => {
                    state.pending.insert(page_url.to_string(), vec![tx]);
                    let epoch = state.epoch;
                    tokio::spawn(load(
                        Arc::clone(&self.inner),
                        page_url.to_string(),
                        match_id,
                        epoch,
                    ));
                }
            }
            rx
        };

        rx.await.ok().flatten()
    }

    pub async fn cached(&self) -> Option<MatchContext> {
        self.inner.state.lock().await.cached.clone()
    }

    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;
        state.epoch += 1;
        state.cached = None;
        state.pending.clear();
    }
}

async fn load(inner: Arc<ContextInner>, page_url: String, match_id: String, epoch: u64) {
    info!(%match_id, "fetching match data");
    let url = endpoints::match_url(&inner.match_api_base, &match_id);

    let result = match inner.transport.get(&url).await {
        Ok(resp) if resp.is_success() => resp
            .json::<MatchRoomDto>()
            .and_then(|room| build_context(&page_url, &match_id, room, inner.key)),
        Ok(resp) => Err(AppError::MatchNotFound(format!(
            "{}: match API returned {}",
            match_id, resp.status
        ))),
        Err(e) => Err(e),
    };

    let context = match result {
        Ok(ctx) => {
            info!(
                %match_id,
                players = ctx.player_count(),
                map = ?ctx.map_name,
                "match data loaded"
            );
            Some(ctx)
        }
        Err(e) => {
            warn!(%match_id, error = %e, "failed to load match data");
            None
        }
    };

    let mut state = inner.state.lock().await;
    if state.epoch != epoch {
        debug!(%match_id, "discarding match data from before reset");
        return;
    }
    if let Some(ctx) = &context {
        state.cached = Some(ctx.clone());
    }
    if let Some(waiters) = state.pending.remove(&page_url) {
        for waiter in waiters {
            let _ = waiter.send(context.clone());
        }
    }
}
