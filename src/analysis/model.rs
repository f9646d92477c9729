use super::team::{Stat, TeamAggregate};
use serde::Serialize;

/// Largest deviation from an even split the estimator will produce.
pub const MAX_SWING: f64 = 0.35;

/// What a scoring category reads off a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    Stat(Stat),
    MapWinRate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weight {
    Fixed(f64),
    /// Zeroed unless both teams have the data.
    WhenAvailable(f64),
    /// Depends on whether any `WhenAvailable` category is live for this pairing.
    Contextual { with_context: f64, without_context: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Category {
    pub factor: Factor,
    pub weight: Weight,
    /// Values are mapped linearly onto [0, 1] across this band and clamped.
    pub band: (f64, f64),
}

impl Category {
    fn new(factor: Factor, weight: Weight, band: (f64, f64)) -> Self {
        Category { factor, weight, band }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WinProbability {
    pub team_a: u32,
    pub team_b: u32,
}

/// Weighted team-strength model turning two aggregates into a win split.
#[derive(Debug, Clone)]
pub struct ScoringModel {
    pub name: &'static str,
    pub categories: Vec<Category>,
    /// Rescale live weights to sum to 1 after unavailable categories are zeroed.
    pub renormalize: bool,
    pub max_swing: f64,
}

impl ScoringModel {
    /// Model used next to FACEIT profiles. Renormalizes.
    pub fn faceit() -> Self {
        ScoringModel {
            name: "faceit",
            categories: vec![
                Category::new(Factor::Stat(Stat::FaceitElo), Weight::Fixed(0.30), (500.0, 4000.0)),
                Category::new(Factor::Stat(Stat::WinRate), Weight::Fixed(0.20), (30.0, 70.0)),
                Category::new(Factor::Stat(Stat::KdRatio), Weight::Fixed(0.15), (0.5, 2.0)),
                Category::new(
                    Factor::Stat(Stat::RecentWinRate),
                    Weight::WhenAvailable(0.15),
                    (0.0, 100.0),
                ),
                Category::new(Factor::MapWinRate, Weight::WhenAvailable(0.10), (30.0, 70.0)),
                Category::new(Factor::Stat(Stat::HeadshotPct), Weight::Fixed(0.05), (30.0, 70.0)),
                Category::new(
                    Factor::Stat(Stat::SkillLevel),
                    Weight::Contextual { with_context: 0.05, without_context: 0.20 },
                    (1.0, 10.0),
                ),
            ],
            renormalize: true,
            max_swing: MAX_SWING,
        }
    }

    /// Model used next to Leetify profiles. Leaves weights as they are.
    // NOTE: the two models disagree on renormalization; kept as-is until
    // product decides which output is intended.
    pub fn leetify() -> Self {
        ScoringModel {
            name: "leetify",
            categories: vec![
                Category::new(Factor::Stat(Stat::LeetifyRating), Weight::Fixed(0.25), (-10.0, 10.0)),
                Category::new(Factor::Stat(Stat::PremierRank), Weight::Fixed(0.20), (0.0, 35000.0)),
                Category::new(Factor::Stat(Stat::FaceitElo), Weight::Fixed(0.25), (500.0, 4000.0)),
                Category::new(Factor::Stat(Stat::Aim), Weight::Fixed(0.15), (0.0, 100.0)),
                Category::new(
                    Factor::Stat(Stat::WinRate),
                    Weight::Contextual { with_context: 0.05, without_context: 0.15 },
                    (0.0, 100.0),
                ),
                Category::new(Factor::MapWinRate, Weight::WhenAvailable(0.10), (0.0, 100.0)),
            ],
            renormalize: false,
            max_swing: MAX_SWING,
        }
    }

    fn available(factor: Factor, a: &TeamAggregate, b: &TeamAggregate) -> bool {
        match factor {
            Factor::MapWinRate => a.map_win_rate.is_some() && b.map_win_rate.is_some(),
            Factor::Stat(Stat::RecentWinRate) => {
                a.avg(Stat::RecentWinRate) > 0.0 && b.avg(Stat::RecentWinRate) > 0.0
            }
            Factor::Stat(_) => true,
        }
    }

    /// Effective weight per category for this pairing, in category order.
    pub fn weights(&self, a: &TeamAggregate, b: &TeamAggregate) -> Vec<f64> {
        let context = self.categories.iter().any(|c| {
            matches!(c.weight, Weight::WhenAvailable(_)) && Self::available(c.factor, a, b)
        });

        let raw: Vec<f64> = self
            .categories
            .iter()
            .map(|c| match c.weight {
                Weight::Fixed(w) => w,
                Weight::WhenAvailable(w) if Self::available(c.factor, a, b) => w,
                Weight::WhenAvailable(_) => 0.0,
                Weight::Contextual { with_context, without_context } => {
                    if context {
                        with_context
                    } else {
                        without_context
                    }
                }
            })
            .collect();

        let total: f64 = raw.iter().sum();
        if self.renormalize && total > 0.0 {
            raw.iter().map(|w| w / total).collect()
        } else {
            raw
        }
    }

    /// Weighted sum of band-normalized statistics.
    pub fn score(&self, team: &TeamAggregate, weights: &[f64]) -> f64 {
        self.categories
            .iter()
            .zip(weights)
            .filter_map(|(c, &w)| {
                let value = match c.factor {
                    Factor::Stat(stat) => Some(team.avg(stat)),
                    Factor::MapWinRate => team.map_win_rate,
                };
                value.map(|v| normalize(v, c.band) * w)
            })
            .sum()
    }

    pub fn estimate(&self, a: &TeamAggregate, b: &TeamAggregate) -> WinProbability {
        let weights = self.weights(a, b);
        let score_a = self.score(a, &weights);
        let score_b = self.score(b, &weights);
        split_from_scores(score_a, score_b, self.max_swing)
    }
}

pub fn normalize(value: f64, (min, max): (f64, f64)) -> f64 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Turns two team scores into whole-percent win chances. Each side is
/// rounded on its own, so the pair may sum to 99 or 101.
pub fn split_from_scores(score_a: f64, score_b: f64, max_swing: f64) -> WinProbability {
    if score_a + score_b == 0.0 {
        return WinProbability { team_a: 50, team_b: 50 };
    }

    let swing = ((score_a - score_b).abs() * 2.0).min(max_swing);
    let prob_a = if score_a > score_b {
        0.5 + swing
    } else if score_b > score_a {
        0.5 - swing
    } else {
        0.5
    };

    WinProbability {
        team_a: (prob_a * 100.0).round() as u32,
        team_b: ((1.0 - prob_a) * 100.0).round() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::team::build_team_aggregate;
    use crate::profile::{MapStats, PlayerProfile};

    fn faceit_player(elo: f64, win_rate: f64, kd: f64, recent: Option<f64>) -> PlayerProfile {
        PlayerProfile {
            faceit_elo: Some(elo),
            skill_level: Some((elo / 400.0).min(10.0)),
            win_rate: Some(win_rate),
            kd_ratio: Some(kd),
            headshot_pct: Some(48.0),
            recent_win_rate: recent,
            ..Default::default()
        }
    }

    fn team(players: Vec<PlayerProfile>, map: Option<&str>) -> TeamAggregate {
        build_team_aggregate(players, "T", map)
    }

    #[test]
    fn test_identical_teams_split_evenly() {
        for model in [ScoringModel::faceit(), ScoringModel::leetify()] {
            let a = team(vec![faceit_player(2100.0, 55.0, 1.1, Some(60.0))], None);
            let b = a.clone();
            assert_eq!(model.estimate(&a, &b), WinProbability { team_a: 50, team_b: 50 });
        }
    }

    #[test]
    fn test_swing_from_score_gap() {
        assert_eq!(
            split_from_scores(0.6, 0.5, MAX_SWING),
            WinProbability { team_a: 70, team_b: 30 }
        );
        assert_eq!(
            split_from_scores(0.5, 0.6, MAX_SWING),
            WinProbability { team_a: 30, team_b: 70 }
        );
    }

    #[test]
    fn test_swing_is_capped() {
        assert_eq!(
            split_from_scores(1.0, 0.0, MAX_SWING),
            WinProbability { team_a: 85, team_b: 15 }
        );
        assert_eq!(split_from_scores(0.0, 0.0, MAX_SWING), WinProbability { team_a: 50, team_b: 50 });
    }

    #[test]
    fn test_output_stays_in_band() {
        let strong = team(vec![faceit_player(4000.0, 80.0, 2.5, Some(100.0))], None);
        let weak = team(vec![faceit_player(500.0, 20.0, 0.3, Some(1.0))], None);
        for model in [ScoringModel::faceit(), ScoringModel::leetify()] {
            let p = model.estimate(&strong, &weak);
            assert!((15..=85).contains(&p.team_a));
            assert!((15..=85).contains(&p.team_b));
            let q = model.estimate(&weak, &strong);
            assert!((15..=85).contains(&q.team_a));
        }
    }

    #[test]
    fn test_stronger_team_favored() {
        let model = ScoringModel::faceit();
        let a = team(vec![faceit_player(2600.0, 56.0, 1.2, Some(60.0))], None);
        let b = team(vec![faceit_player(2400.0, 52.0, 1.1, Some(50.0))], None);
        let p = model.estimate(&a, &b);
        assert!(p.team_a > 50);
        assert!(p.team_b < 50);
    }

    #[test]
    fn test_faceit_weights_renormalize_without_context() {
        let model = ScoringModel::faceit();
        // recent form zero for one side, no map data
        let a = team(vec![faceit_player(2000.0, 50.0, 1.0, Some(0.0))], None);
        let b = team(vec![faceit_player(2000.0, 50.0, 1.0, Some(55.0))], None);

        let weights = model.weights(&a, &b);
        let total: f64 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        // recent form and map zeroed, skill level expanded before rescaling
        assert_eq!(weights[3], 0.0);
        assert_eq!(weights[4], 0.0);
        assert!((weights[6] - 0.20 / 0.90).abs() < 1e-9);
    }

    #[test]
    fn test_faceit_weights_with_full_context() {
        let model = ScoringModel::faceit();
        let map_player = |rate: f64| PlayerProfile {
            recent_win_rate: Some(50.0),
            top_maps: vec![MapStats {
                map_name: "mirage".to_string(),
                matches: 10,
                wins: 5,
                win_rate: rate,
                avg_kills: None,
                avg_deaths: None,
                avg_kd: None,
                avg_hs: None,
            }],
            ..Default::default()
        };
        let a = team(vec![map_player(50.0), map_player(60.0)], Some("de_mirage"));
        let b = team(vec![map_player(40.0), map_player(45.0)], Some("de_mirage"));

        let weights = model.weights(&a, &b);
        let expected = [0.30, 0.20, 0.15, 0.15, 0.10, 0.05, 0.05];
        for (w, e) in weights.iter().zip(expected) {
            assert!((w - e).abs() < 1e-9);
        }
    }

    #[test]
    fn test_leetify_weights_not_renormalized() {
        let model = ScoringModel::leetify();
        let a = team(vec![PlayerProfile::default()], None);
        let b = team(vec![PlayerProfile::default()], None);

        let weights = model.weights(&a, &b);
        assert_eq!(weights, vec![0.25, 0.20, 0.25, 0.15, 0.15, 0.0]);
    }

    #[test]
    fn test_normalize_clamps() {
        assert_eq!(normalize(250.0, (500.0, 4000.0)), 0.0);
        assert_eq!(normalize(5000.0, (500.0, 4000.0)), 1.0);
        assert_eq!(normalize(50.0, (30.0, 70.0)), 0.5);
        assert_eq!(normalize(1.0, (2.0, 2.0)), 0.0);
    }
}
