//! Learning insight CLI
//!
//! A command-line tool for checking the insight service, browsing the
//! cluster profiles and fetching or predicting learner insights.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{insights, status};

/// Learning insight CLI
#[derive(Parser)]
#[command(name = "lia")]
#[command(author, version, about = "CLI for the Learning Insight service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via LIA_API_URL env var)
    #[arg(long, env = "LIA_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show whether the model and dataset are loaded
    Health,

    /// List the learner cluster profiles
    Clusters,

    /// Show the stored insight for a developer
    Insight {
        /// Developer ID
        developer_id: i64,
    },

    /// List stored insights in dataset order
    List {
        /// Number of insights to return (1-100)
        #[arg(long, short, default_value_t = 10)]
        limit: i64,
    },

    /// Predict a cluster from learning activity features
    Predict {
        /// Total number of active learning days
        #[arg(long)]
        active_days: f64,

        /// Average hours spent per module
        #[arg(long)]
        avg_time_hours: f64,

        /// Number of completed journeys
        #[arg(long)]
        journeys: f64,

        /// Share of rejected submissions (0-1)
        #[arg(long)]
        rejection_ratio: f64,

        /// Average exam score
        #[arg(long)]
        score: f64,

        /// Developer ID to echo in the response
        #[arg(long)]
        developer_id: Option<i64>,

        /// Developer name to echo in the response
        #[arg(long)]
        developer_name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<client::ApiError>() {
            Some(api_err) if api_err.is_not_found() => {
                output::print_error(&format!("Not found: {}", api_err.message))
            }
            Some(api_err) if api_err.is_unavailable() => {
                output::print_error(&format!("Service unavailable: {}", api_err.message))
            }
            _ => output::print_error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Health => status::show_health(&client, cli.format).await?,
        Commands::Clusters => status::list_clusters(&client, cli.format).await?,
        Commands::Insight { developer_id } => {
            insights::get_insight(&client, developer_id, cli.format).await?
        }
        Commands::List { limit } => insights::list_insights(&client, limit, cli.format).await?,
        Commands::Predict {
            active_days,
            avg_time_hours,
            journeys,
            rejection_ratio,
            score,
            developer_id,
            developer_name,
        } => {
            let request = client::PredictRequest {
                total_active_days: active_days,
                avg_completion_time_hours: avg_time_hours,
                total_journeys_completed: journeys,
                rejection_ratio,
                avg_exam_score: score,
                developer_id,
                developer_name,
            };
            insights::predict(&client, request, cli.format).await?
        }
    }

    Ok(())
}
