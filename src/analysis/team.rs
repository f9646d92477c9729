use crate::profile::PlayerProfile;
use serde::Serialize;
use std::collections::BTreeMap;

/// Players needed with enough games on a map before the team gets a map win rate.
pub const MIN_MAP_PLAYERS: usize = 2;
/// Games a player needs on the map to count towards the team's map win rate.
pub const MIN_PLAYER_MAP_GAMES: u32 = 3;

/// A per-player statistic that teams are averaged over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stat {
    FaceitElo,
    SkillLevel,
    KdRatio,
    WinRate,
    RecentWinRate,
    HeadshotPct,
    LeetifyRating,
    PremierRank,
    Aim,
}

impl Stat {
    pub const ALL: [Stat; 9] = [
        Stat::FaceitElo,
        Stat::SkillLevel,
        Stat::KdRatio,
        Stat::WinRate,
        Stat::RecentWinRate,
        Stat::HeadshotPct,
        Stat::LeetifyRating,
        Stat::PremierRank,
        Stat::Aim,
    ];

    pub fn extract(self, profile: &PlayerProfile) -> Option<f64> {
        match self {
            Stat::FaceitElo => profile.faceit_elo,
            Stat::SkillLevel => profile.skill_level,
            Stat::KdRatio => profile.kd_ratio,
            Stat::WinRate => profile.win_rate,
            Stat::RecentWinRate => profile.recent_win_rate,
            Stat::HeadshotPct => profile.headshot_pct,
            Stat::LeetifyRating => profile.leetify_rating,
            Stat::PremierRank => profile.premier_rank,
            Stat::Aim => profile.aim,
        }
    }

    /// Team value used when no player reports the statistic.
    pub fn fallback(self) -> f64 {
        match self {
            Stat::FaceitElo => 1500.0,
            Stat::SkillLevel => 5.0,
            Stat::KdRatio => 1.0,
            Stat::WinRate => 50.0,
            Stat::RecentWinRate => 50.0,
            Stat::HeadshotPct => 50.0,
            Stat::LeetifyRating => 0.0,
            Stat::PremierRank => 10000.0,
            Stat::Aim => 50.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stat::FaceitElo => "ELO",
            Stat::SkillLevel => "Level",
            Stat::KdRatio => "K/D",
            Stat::WinRate => "Win Rate",
            Stat::RecentWinRate => "Recent Form",
            Stat::HeadshotPct => "HS %",
            Stat::LeetifyRating => "Leetify",
            Stat::PremierRank => "Premier",
            Stat::Aim => "Aim",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamAggregate {
    pub name: String,
    pub players: Vec<PlayerProfile>,
    averages: BTreeMap<Stat, f64>,
    /// Only set when enough players have history on the map.
    pub map_win_rate: Option<f64>,
}

impl TeamAggregate {
    pub fn avg(&self, stat: Stat) -> f64 {
        self.averages
            .get(&stat)
            .copied()
            .unwrap_or_else(|| stat.fallback())
    }

    /// Map win rate when known, otherwise overall win rate.
    pub fn headline_win_rate(&self) -> f64 {
        self.map_win_rate.unwrap_or_else(|| self.avg(Stat::WinRate))
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Averages each statistic over the players that report it. Absent profiles
/// are skipped; a statistic nobody reports takes its fallback.
pub fn build_team_aggregate<I, P>(profiles: I, team_name: &str, map_name: Option<&str>) -> TeamAggregate
where
    I: IntoIterator<Item = P>,
    P: Into<Option<PlayerProfile>>,
{
    let players: Vec<PlayerProfile> = profiles
        .into_iter()
        .filter_map(Into::<Option<PlayerProfile>>::into)
        .collect();

    let averages = Stat::ALL
        .iter()
        .map(|&stat| {
            let values: Vec<f64> = players.iter().filter_map(|p| stat.extract(p)).collect();
            (stat, mean(&values).unwrap_or_else(|| stat.fallback()))
        })
        .collect();

    let map_win_rate = map_name.filter(|m| !m.trim().is_empty()).and_then(|map| {
        let rates: Vec<f64> = players
            .iter()
            .filter_map(|p| p.map_stats(map))
            .filter(|m| m.matches >= MIN_PLAYER_MAP_GAMES)
            .map(|m| m.win_rate)
            .collect();
        if rates.len() >= MIN_MAP_PLAYERS {
            mean(&rates)
        } else {
            None
        }
    });

    TeamAggregate {
        name: team_name.to_string(),
        players,
        averages,
        map_win_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MapStats;

    fn with_elo(elo: Option<f64>) -> PlayerProfile {
        PlayerProfile {
            faceit_elo: elo,
            ..Default::default()
        }
    }

    fn with_map(name: &str, matches: u32, win_rate: f64) -> PlayerProfile {
        PlayerProfile {
            top_maps: vec![MapStats {
                map_name: name.to_string(),
                matches,
                wins: 0,
                win_rate,
                avg_kills: None,
                avg_deaths: None,
                avg_kd: None,
                avg_hs: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_values_excluded_from_mean() {
        let team = build_team_aggregate(vec![with_elo(Some(1200.0)), with_elo(None)], "A", None);
        assert_eq!(team.avg(Stat::FaceitElo), 1200.0);
    }

    #[test]
    fn test_fallback_when_nobody_reports() {
        let team = build_team_aggregate(vec![with_elo(None), with_elo(None)], "A", None);
        assert_eq!(team.avg(Stat::FaceitElo), 1500.0);
        assert_eq!(team.avg(Stat::WinRate), 50.0);
        assert_eq!(team.avg(Stat::KdRatio), 1.0);
        assert_eq!(team.avg(Stat::PremierRank), 10000.0);
    }

    #[test]
    fn test_zero_is_a_value() {
        let players = vec![
            PlayerProfile { win_rate: Some(0.0), ..Default::default() },
            PlayerProfile { win_rate: Some(60.0), ..Default::default() },
        ];
        let team = build_team_aggregate(players, "A", None);
        assert_eq!(team.avg(Stat::WinRate), 30.0);
    }

    #[test]
    fn test_absent_profiles_skipped() {
        let team = build_team_aggregate(
            vec![Some(with_elo(Some(2000.0))), None, Some(with_elo(Some(1000.0)))],
            "A",
            None,
        );
        assert_eq!(team.players.len(), 2);
        assert_eq!(team.avg(Stat::FaceitElo), 1500.0);
    }

    #[test]
    fn test_map_win_rate_needs_two_players() {
        let one = build_team_aggregate(vec![with_map("mirage", 10, 60.0)], "A", Some("de_mirage"));
        assert_eq!(one.map_win_rate, None);

        let two = build_team_aggregate(
            vec![
                with_map("mirage", 10, 60.0),
                with_map("Mirage", 4, 40.0),
                with_map("nuke", 20, 90.0),
            ],
            "A",
            Some("de_mirage"),
        );
        assert_eq!(two.map_win_rate, Some(50.0));
        assert_eq!(two.headline_win_rate(), 50.0);
    }

    #[test]
    fn test_map_win_rate_ignores_small_samples() {
        let team = build_team_aggregate(
            vec![with_map("inferno", 2, 100.0), with_map("inferno", 5, 40.0)],
            "A",
            Some("inferno"),
        );
        assert_eq!(team.map_win_rate, None);
        assert_eq!(team.headline_win_rate(), 50.0);
    }

    #[test]
    fn test_no_map_name_no_map_rate() {
        let team = build_team_aggregate(
            vec![with_map("inferno", 9, 70.0), with_map("inferno", 9, 70.0)],
            "A",
            None,
        );
        assert_eq!(team.map_win_rate, None);
    }
}
