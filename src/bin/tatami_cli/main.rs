// ABOUTME: Tatami CLI - command-line access to performance analysis and recommendation review
// ABOUTME: Runs analysis, generates recommendations, and drives the review workflow against the configured database
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors
//!
//! Usage:
//! ```bash
//! # Analyse the last 30 days of an athlete
//! tatami-cli analyze 7 --days 30
//!
//! # Analyse, evaluate rules, and store PENDING recommendations
//! tatami-cli generate 7 --cycle 3
//!
//! # Review a recommendation
//! tatami-cli review start 12 --actor 2
//! tatami-cli review approve 12 --actor 2 --comment "Looks right"
//! tatami-cli review reject 12 --actor 2 --reason "Competition week" --alternative "Defer"
//! tatami-cli review amend 12 --actor 2 --justification "Shorter" --amendments '{"session":{"durationMinutes":45}}'
//!
//! # Audit trail, statistics, and rejection feedback
//! tatami-cli history 12
//! tatami-cli stats
//! tatami-cli feedback --limit 50
//! ```

mod commands;
mod helpers;

use clap::{Parser, Subcommand};
use tatami_core::constants::workflow::DEFAULT_FEEDBACK_LIMIT;
use tatami_core::models::{AthleteId, CycleId, RecommendationId, UserId};
use tatami_insights::{
    config::environment::{DatabaseUrl, ServerConfig},
    database::Database,
    errors::AppResult,
    logging::LoggingConfig,
    services::InsightsService,
};
use tracing::info;

type Result<T> = AppResult<T>;

#[derive(Parser)]
#[command(
    name = "tatami-cli",
    about = "Tatami Insights analysis and review CLI",
    long_about = "Analyse athlete performance, generate training recommendations, and review them."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Analyse an athlete's recent performance
    Analyze {
        /// Athlete id
        athlete_id: AthleteId,

        /// Window length in days (defaults to `ANALYSIS_WINDOW_DAYS`)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Analyse, evaluate rules, and store the resulting recommendations
    Generate {
        /// Athlete id
        athlete_id: AthleteId,

        /// Window length in days (defaults to `ANALYSIS_WINDOW_DAYS`)
        #[arg(long)]
        days: Option<u32>,

        /// Training cycle the recommendations affect
        #[arg(long)]
        cycle: Option<CycleId>,
    },

    /// List open recommendations, most urgent first
    Open {
        /// Restrict to one athlete
        #[arg(long)]
        athlete: Option<AthleteId>,
    },

    /// Review workflow commands
    Review {
        #[command(subcommand)]
        action: ReviewCommand,
    },

    /// Show the audit trail of a recommendation
    History {
        /// Recommendation id
        recommendation_id: RecommendationId,
    },

    /// Show recommendation statistics
    Stats,

    /// Show feedback from recently rejected recommendations
    Feedback {
        /// Maximum number of entries
        #[arg(long, default_value_t = DEFAULT_FEEDBACK_LIMIT)]
        limit: u32,
    },
}

#[non_exhaustive]
#[derive(Subcommand)]
enum ReviewCommand {
    /// Take a PENDING recommendation into review
    Start {
        /// Recommendation id
        recommendation_id: RecommendationId,

        /// Reviewer user id
        #[arg(long)]
        actor: UserId,
    },

    /// Approve a recommendation under review
    Approve {
        /// Recommendation id
        recommendation_id: RecommendationId,

        /// Reviewer user id
        #[arg(long)]
        actor: UserId,

        /// Review comment
        #[arg(long)]
        comment: Option<String>,
    },

    /// Reject a recommendation under review
    Reject {
        /// Recommendation id
        recommendation_id: RecommendationId,

        /// Reviewer user id
        #[arg(long)]
        actor: UserId,

        /// Why the recommendation was rejected
        #[arg(long)]
        reason: Option<String>,

        /// What should be done instead
        #[arg(long)]
        alternative: Option<String>,
    },

    /// Apply a recommendation with changes
    Amend {
        /// Recommendation id
        recommendation_id: RecommendationId,

        /// Reviewer user id
        #[arg(long)]
        actor: UserId,

        /// Why the recommendation was amended
        #[arg(long)]
        justification: String,

        /// Amendments as JSON (`session`, `changes`, `instructions`)
        #[arg(long, default_value = "{}")]
        amendments: String,

        /// Extra comment for the audit trail
        #[arg(long)]
        comment: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        "debug".clone_into(&mut logging.level);
    }
    logging.init()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = DatabaseUrl::parse_url(&url);
    }
    config.init_all_configs()?;
    info!("{}", config.summary());

    let database = Database::new(&config.database_url.to_connection_string()).await?;
    let service = InsightsService::from_server_config(database, &config);
    let default_days = service.default_window_days();

    match cli.command {
        Command::Analyze { athlete_id, days } => {
            commands::analysis::analyze(&service, athlete_id, days.unwrap_or(default_days))
                .await?;
        }
        Command::Generate {
            athlete_id,
            days,
            cycle,
        } => {
            commands::analysis::generate(
                &service,
                athlete_id,
                days.unwrap_or(default_days),
                cycle,
            )
            .await?;
        }
        Command::Open { athlete } => commands::review::open(&service, athlete).await?,
        Command::Review { action } => match action {
            ReviewCommand::Start {
                recommendation_id,
                actor,
            } => commands::review::start(&service, recommendation_id, actor).await?,
            ReviewCommand::Approve {
                recommendation_id,
                actor,
                comment,
            } => commands::review::approve(&service, recommendation_id, actor, comment).await?,
            ReviewCommand::Reject {
                recommendation_id,
                actor,
                reason,
                alternative,
            } => {
                commands::review::reject(&service, recommendation_id, actor, reason, alternative)
                    .await?;
            }
            ReviewCommand::Amend {
                recommendation_id,
                actor,
                justification,
                amendments,
                comment,
            } => {
                commands::review::amend(
                    &service,
                    recommendation_id,
                    actor,
                    &amendments,
                    justification,
                    comment,
                )
                .await?;
            }
        },
        Command::History { recommendation_id } => {
            commands::review::history(&service, recommendation_id).await?;
        }
        Command::Stats => commands::review::stats(&service).await?,
        Command::Feedback { limit } => commands::review::feedback(&service, limit).await?,
    }

    Ok(())
}
