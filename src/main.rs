use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use leetlens::api::client::UreqTransport;
use leetlens::config::Config;
use leetlens::display::output::{
    display_error, display_info, display_match_context, display_prediction, display_pro_comparison,
    display_profile, display_success,
};
use leetlens::match_context::MatchContext;
use leetlens::{Integration, ProPlayer, Session};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "LeetLens")]
#[command(about = "Player stats and win predictions for FACEIT match rooms", long_about = None)]
struct Cli {
    /// Which stats integration to use
    #[arg(short, long, value_enum, default_value = "faceit", global = true)]
    source: Integration,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up a single player profile
    Profile {
        /// Player id (faceit) or Steam64 id (leetify)
        id: String,

        /// Print the profile as JSON
        #[arg(long)]
        json: bool,

        /// Compare against a reference pro player
        #[arg(long, value_enum)]
        compare: Option<ProPlayer>,
    },

    /// Show rosters and a win prediction for a match room URL
    Room {
        /// Match room address, e.g. https://www.faceit.com/en/cs2/room/1-...
        url: String,

        /// Print the prediction as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a reference pro player's profile
    Pro {
        #[arg(value_enum, default_value = "donk")]
        player: ProPlayer,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    let transport = Arc::new(UreqTransport::new(&config));
    let session = Session::new(cli.source, transport, &config);

    match cli.command {
        Command::Profile { id, json, compare } => {
            let Some(profile) = session.fetch_profile(&id).await else {
                bail!("no profile found for {}", id);
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
                return Ok(());
            }
            display_profile(&profile);

            if let Some(pro) = compare {
                if session.integration() != Integration::Leetify {
                    display_info("Pro comparison uses Leetify ratings; run with --source leetify");
                } else if let Some(pro_profile) = session.fetch_pro_profile(pro).await {
                    display_pro_comparison(&profile, pro, &pro_profile);
                } else {
                    display_info(&format!("{} profile unavailable right now", pro.name()));
                }
            }
        }

        Command::Room { url, json } => {
            if !session.observe_page(&url).await {
                bail!(leetlens::AppError::InvalidRoomUrl(url));
            }

            let Some(context) = session.fetch_match_context(&url).await else {
                bail!("could not load match data for {}", url);
            };

            if !json {
                display_match_context(&context);
                warm_profiles(&session, &context).await;
            }

            let Some(prediction) = session.predict(&context).await else {
                bail!("no player profiles available for this match");
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                display_prediction(&prediction);
            }
        }

        Command::Pro { player } => {
            if session.integration() != Integration::Leetify {
                display_info("Pro profiles come from Leetify; switching source");
            }
            let session = if session.integration() == Integration::Leetify {
                session
            } else {
                Session::new(Integration::Leetify, Arc::new(UreqTransport::new(&config)), &config)
            };

            let Some(profile) = session.fetch_pro_profile(player).await else {
                bail!("{} profile unavailable right now", player.name());
            };
            display_profile(&profile);
        }
    }

    Ok(())
}

/// Fetches every roster profile up front with a progress bar, so the
/// prediction step is served from cache.
async fn warm_profiles(session: &Session, context: &MatchContext) {
    let key = session.integration().roster_key();
    let ids: Vec<String> = context
        .identifiers(&context.team1, key)
        .into_iter()
        .chain(context.identifiers(&context.team2, key))
        .collect();

    if ids.is_empty() {
        return;
    }

    let pb = ProgressBar::new(ids.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}") {
        pb.set_style(style);
    }
    pb.set_message("Fetching player profiles");

    let results = join_all(ids.iter().map(|id| {
        let pb = pb.clone();
        async move {
            let profile = session.fetch_profile(id).await;
            pb.inc(1);
            profile
        }
    }))
    .await;

    pb.finish_and_clear();
    let found = results.iter().filter(|p| p.is_some()).count();
    display_success(&format!("Loaded {}/{} player profiles", found, ids.len()));
}
