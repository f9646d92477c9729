//! Player statistics and match-outcome estimates for FACEIT match rooms.
//!
//! The data layer sits between a page (or the CLI) and two upstream stats
//! services. Profiles go through a TTL cache, single-flight deduplication and
//! a paced drain queue; match rosters are cached per page URL; team
//! aggregates feed a weighted scoring model that yields a win split.

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod display;
pub mod error;
pub mod match_context;
pub mod profile;
pub mod rate_limit;
pub mod session;
pub mod sources;
pub mod store;

pub use analysis::model::{ScoringModel, WinProbability};
pub use analysis::team::{build_team_aggregate, Stat, TeamAggregate};
pub use error::AppError;
pub use match_context::MatchContext;
pub use profile::{MapStats, PlayerProfile};
pub use session::{Integration, MatchPrediction, ProPlayer, Session};
