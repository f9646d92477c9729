use crate::analysis::team::{Stat, TeamAggregate};
use crate::match_context::MatchContext;
use crate::profile::PlayerProfile;
use crate::session::{MatchPrediction, ProPlayer};
use colored::*;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct StatRow {
    stat: String,
    value: String,
}

#[derive(Tabled)]
struct MapRow {
    map: String,
    matches: String,
    win_rate: String,
    kd: String,
}

#[derive(Tabled)]
struct PlayerRow {
    player: String,
    elo: String,
    rating: String,
    kd: String,
    win_rate: String,
    form: String,
}

#[derive(Tabled)]
struct CompareRow {
    stat: String,
    player: String,
    pro: String,
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}

fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}%", v),
        None => "N/A".to_string(),
    }
}

fn signed(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 0.0 => format!("+{:.2}", v),
        Some(v) => format!("{:.2}", v),
        None => "N/A".to_string(),
    }
}

fn win_rate_colored(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 55.0 => pct(value).green().to_string(),
        Some(v) if v < 45.0 => pct(value).red().to_string(),
        _ => pct(value),
    }
}

fn team_label(name: &str, probability: u32) -> String {
    format!("{}: {}%", name, probability)
}

pub fn display_error(error: &str) {
    eprintln!("{} {}", "❌ Error:".red().bold(), error);
}

pub fn display_info(message: &str) {
    println!("{} {}", "ℹ️".cyan(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn display_profile(profile: &PlayerProfile) {
    let mut header = format!("🎮 {}", profile.nickname);
    if let Some(country) = &profile.country {
        header.push_str(&format!(" ({})", country.to_uppercase()));
    }
    println!("\n{}", header.bold().cyan());
    println!("{}\n", "=".repeat(60).cyan());

    if profile.has_bans {
        println!("{}\n", "⚠️  Account has bans on record".red().bold());
    }

    let mut rows = vec![];
    let mut push = |stat: &str, value: String, present: bool| {
        if present {
            rows.push(StatRow {
                stat: stat.to_string(),
                value,
            });
        }
    };

    push("ELO", opt(profile.faceit_elo, 0), profile.faceit_elo.is_some());
    push("Level", opt(profile.skill_level, 0), profile.skill_level.is_some());
    push("Leetify", signed(profile.leetify_rating), profile.leetify_rating.is_some());
    push("Premier", opt(profile.premier_rank, 0), profile.premier_rank.is_some());
    push(
        "Matches",
        profile.matches.map(|m| m.to_string()).unwrap_or_default(),
        profile.matches.is_some(),
    );
    push("Win Rate", win_rate_colored(profile.win_rate), true);
    push("Recent Form", win_rate_colored(profile.recent_win_rate), profile.recent_win_rate.is_some());
    push("K/D", opt(profile.kd_ratio, 2), profile.kd_ratio.is_some());
    push("K/R", opt(profile.kr_ratio, 2), profile.kr_ratio.is_some());
    push("HS %", pct(profile.headshot_pct), profile.headshot_pct.is_some());
    push("Aim", opt(profile.aim, 1), profile.aim.is_some());
    push("Reaction", format!("{} ms", opt(profile.reaction_time_ms, 0)), profile.reaction_time_ms.is_some());
    push(
        "Win Streak",
        format!(
            "{} (best {})",
            profile.current_win_streak.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
            profile.longest_win_streak.map(|s| s.to_string()).unwrap_or_else(|| "-".into())
        ),
        profile.current_win_streak.is_some() || profile.longest_win_streak.is_some(),
    );

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    display_top_maps(profile);
}

fn display_top_maps(profile: &PlayerProfile) {
    if profile.top_maps.is_empty() {
        return;
    }

    println!("\n{}", "🗺️  Top Maps".bold().yellow());
    let rows: Vec<MapRow> = profile
        .top_maps
        .iter()
        .map(|m| MapRow {
            map: m.map_name.clone(),
            matches: m.matches.to_string(),
            win_rate: win_rate_colored(Some(m.win_rate)),
            kd: opt(m.avg_kd, 2),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}\n", table);
}

pub fn display_match_context(context: &MatchContext) {
    println!(
        "\n{}",
        format!("🏟️  {} vs {}", context.team1.name, context.team2.name)
            .bold()
            .cyan()
    );
    println!("{}", "=".repeat(60).cyan());
    match &context.map_name {
        Some(map) => println!("{} {}\n", "Map:".bold(), map),
        None => println!("{} {}\n", "Map:".bold(), "not picked yet".dimmed()),
    }
}

fn team_rows(team: &TeamAggregate) -> Vec<PlayerRow> {
    team.players
        .iter()
        .map(|p| PlayerRow {
            player: p.nickname.clone(),
            elo: opt(p.faceit_elo, 0),
            rating: signed(p.leetify_rating),
            kd: opt(p.kd_ratio, 2),
            win_rate: win_rate_colored(p.win_rate),
            form: win_rate_colored(p.recent_win_rate),
        })
        .collect()
}

pub fn display_prediction(prediction: &MatchPrediction) {
    for (team, probability) in [
        (&prediction.team1, prediction.probability.team_a),
        (&prediction.team2, prediction.probability.team_b),
    ] {
        let label = team_label(&team.name, probability);
        let label = if probability > 52 {
            label.green().bold()
        } else if probability < 48 {
            label.red().bold()
        } else {
            label.normal().bold()
        };
        println!("\n{}", label);

        let rows = team_rows(team);
        if rows.is_empty() {
            println!("{}", "  no profiles available".dimmed());
        } else {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }

        let win_label = if team.map_win_rate.is_some() {
            "Map Win Rate"
        } else {
            "Avg Win Rate"
        };
        println!(
            "  Avg {} {:.0} · Avg {} {:.2} · {} {:.0}%",
            Stat::FaceitElo.label(),
            team.avg(Stat::FaceitElo),
            Stat::KdRatio.label(),
            team.avg(Stat::KdRatio),
            win_label,
            team.headline_win_rate()
        );
    }

    println!("\n{}", "Prediction".bold().yellow());
    println!(
        "• {} {}% / {}% {}",
        prediction.team1.name, prediction.probability.team_a, prediction.probability.team_b, prediction.team2.name
    );
    println!("• Based on rating, win rate, K/D and recent/map form; not a guarantee\n");
}

pub fn display_pro_comparison(profile: &PlayerProfile, pro: ProPlayer, pro_profile: &PlayerProfile) {
    println!(
        "\n{}",
        format!("⭐ {} vs {} ({})", profile.nickname, pro.name(), pro.team())
            .bold()
            .cyan()
    );

    let stats: [(&str, fn(&PlayerProfile) -> String); 5] = [
        ("Leetify", |p| signed(p.leetify_rating)),
        ("Aim", |p| opt(p.aim, 1)),
        ("HS %", |p| pct(p.headshot_pct)),
        ("Reaction", |p| opt(p.reaction_time_ms, 0)),
        ("Win Rate", |p| pct(p.win_rate)),
    ];
    let rows: Vec<CompareRow> = stats
        .iter()
        .map(|(stat, render)| CompareRow {
            stat: stat.to_string(),
            player: render(profile),
            pro: render(pro_profile),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}\n", table);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_label() {
        assert_eq!(team_label("Team Spirit", 62), "Team Spirit: 62%");
    }

    #[test]
    fn test_missing_values_render_as_na() {
        assert_eq!(opt(None, 2), "N/A");
        assert_eq!(pct(Some(54.6)), "55%");
        assert_eq!(signed(Some(1.5)), "+1.50");
        assert_eq!(signed(Some(-0.25)), "-0.25");
    }
}
