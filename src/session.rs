//! One integration's data layer for a browsing session.
//!
//! A [`Session`] owns the profile store, the match-context cache and the
//! scoring model for one integration. Callers construct it once and call
//! [`Session::reset_caches`] (or [`Session::observe_page`]) on navigation.

use crate::analysis::model::{ScoringModel, WinProbability};
use crate::analysis::team::{build_team_aggregate, TeamAggregate};
use crate::api::client::HttpTransport;
use crate::config::Config;
use crate::match_context::{is_room_page, MatchContext, MatchContextCache, RosterKey};
use crate::profile::PlayerProfile;
use crate::rate_limit::DrainPolicy;
use crate::sources::{FaceitSource, LeetifySource, ProfileSource};
use crate::store::{ProfileStore, StoreStats};
use clap::ValueEnum;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Integration {
    /// FACEIT player ids, three-endpoint profiles, batched queue
    Faceit,
    /// Steam64 ids, single-endpoint profiles, serial queue
    Leetify,
}

impl Integration {
    pub fn roster_key(self) -> RosterKey {
        match self {
            Integration::Faceit => RosterKey::PlayerId,
            Integration::Leetify => RosterKey::SteamId,
        }
    }

    pub fn drain_policy(self, config: &Config) -> DrainPolicy {
        match self {
            Integration::Faceit => config.batch_policy(),
            Integration::Leetify => config.serial_policy(),
        }
    }

    pub fn scoring_model(self) -> ScoringModel {
        match self {
            Integration::Faceit => ScoringModel::faceit(),
            Integration::Leetify => ScoringModel::leetify(),
        }
    }

    pub fn source(self, transport: Arc<dyn HttpTransport>, config: &Config) -> Arc<dyn ProfileSource> {
        match self {
            Integration::Faceit => Arc::new(FaceitSource::new(transport, &config.api_base)),
            Integration::Leetify => Arc::new(LeetifySource::new(transport, &config.api_base)),
        }
    }
}

/// Reference players shown next to a profile for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProPlayer {
    Donk,
}

impl ProPlayer {
    pub fn steam_id(self) -> &'static str {
        match self {
            ProPlayer::Donk => "76561198386265483",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProPlayer::Donk => "donk",
        }
    }

    pub fn team(self) -> &'static str {
        match self {
            ProPlayer::Donk => "Team Spirit",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchPrediction {
    pub team1: TeamAggregate,
    pub team2: TeamAggregate,
    pub probability: WinProbability,
    pub map_name: Option<String>,
}

pub struct Session {
    integration: Integration,
    profiles: ProfileStore,
    contexts: MatchContextCache,
    model: ScoringModel,
    last_page: Mutex<Option<String>>,
    pro_profiles: Mutex<HashMap<String, Option<PlayerProfile>>>,
}

impl Session {
    pub fn new(integration: Integration, transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        let source = integration.source(Arc::clone(&transport), config);
        let profiles = ProfileStore::new(source, integration.drain_policy(config), config.cache_ttl);
        Self::with_parts(integration, profiles, transport, config)
    }

    /// Builds a session around an existing store, e.g. one with a custom clock.
    pub fn with_parts(
        integration: Integration,
        profiles: ProfileStore,
        transport: Arc<dyn HttpTransport>,
        config: &Config,
    ) -> Self {
        Session {
            integration,
            profiles,
            contexts: MatchContextCache::new(transport, &config.match_api_base, integration.roster_key()),
            model: integration.scoring_model(),
            last_page: Mutex::new(None),
            pro_profiles: Mutex::new(HashMap::new()),
        }
    }

    pub fn integration(&self) -> Integration {
        self.integration
    }

    pub async fn fetch_profile(&self, id: &str) -> Option<PlayerProfile> {
        self.profiles.fetch_profile(id).await
    }

    pub async fn fetch_match_context(&self, page_url: &str) -> Option<MatchContext> {
        self.contexts.fetch(page_url).await
    }

    pub async fn reset_caches(&self) {
        self.profiles.reset().await;
        self.contexts.reset().await;
        self.pro_profiles.lock().await.clear();
    }

    /// Records a navigation. Leaving the previous page resets every cache.
    /// Returns whether the new page is a match room.
    pub async fn observe_page(&self, page_url: &str) -> bool {
        let changed = {
            let mut last = self.last_page.lock().await;
            let changed = last.as_deref() != Some(page_url);
            if changed {
                *last = Some(page_url.to_string());
            }
            changed
        };

        if changed {
            debug!(%page_url, "page changed, resetting caches");
            self.reset_caches().await;
        }
        is_room_page(page_url)
    }

    pub fn build_team_aggregate<I, P>(&self, profiles: I, team_name: &str, map_name: Option<&str>) -> TeamAggregate
    where
        I: IntoIterator<Item = P>,
        P: Into<Option<PlayerProfile>>,
    {
        build_team_aggregate(profiles, team_name, map_name)
    }

    pub fn estimate_win_probability(&self, team_a: &TeamAggregate, team_b: &TeamAggregate) -> WinProbability {
        self.model.estimate(team_a, team_b)
    }

    /// Fetches both rosters and scores them. `None` when no player on
    /// either side has a profile.
    pub async fn predict(&self, context: &MatchContext) -> Option<MatchPrediction> {
        let key = self.integration.roster_key();
        let team1_ids = context.identifiers(&context.team1, key);
        let team2_ids = context.identifiers(&context.team2, key);
        if team1_ids.is_empty() || team2_ids.is_empty() {
            return None;
        }

        let (team1, team2) = futures::join!(
            join_all(team1_ids.iter().map(|id| self.fetch_profile(id))),
            join_all(team2_ids.iter().map(|id| self.fetch_profile(id))),
        );

        if team1.iter().all(Option::is_none) && team2.iter().all(Option::is_none) {
            info!(match_id = %context.match_id, "no profiles available for either team");
            return None;
        }

        let map_name = context.map_name.as_deref();
        let team1 = self.build_team_aggregate(team1, &context.team1.name, map_name);
        let team2 = self.build_team_aggregate(team2, &context.team2.name, map_name);
        let probability = self.estimate_win_probability(&team1, &team2);

        info!(
            match_id = %context.match_id,
            model = self.model.name,
            team1 = probability.team_a,
            team2 = probability.team_b,
            "prediction ready"
        );
        Some(MatchPrediction {
            team1,
            team2,
            probability,
            map_name: context.map_name.clone(),
        })
    }

    /// Reference-player profile. Skips the queue, is remembered for the
    /// rest of the session, and still lands in the shared profile cache.
    /// Only Leetify sessions can look it up: the id is a Steam64 id.
    pub async fn fetch_pro_profile(&self, pro: ProPlayer) -> Option<PlayerProfile> {
        if self.integration != Integration::Leetify {
            debug!(pro = pro.name(), integration = ?self.integration, "pro profiles need a Steam id source");
            return None;
        }

        let steam_id = pro.steam_id();
        if let Some(known) = self.pro_profiles.lock().await.get(steam_id) {
            return known.clone();
        }

        let profile = self.profiles.fetch_now(steam_id).await;
        self.pro_profiles
            .lock()
            .await
            .insert(steam_id.to_string(), profile.clone());
        profile
    }

    pub async fn store_stats(&self) -> StoreStats {
        self.profiles.stats().await
    }
}
