mod config;
mod errors;
mod extractor;
mod popup;
mod scoring;
mod store;
mod tab;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::popup::{render_result, CycleOutcome, Popup};
use crate::scoring::ScoringClient;
use crate::store::LocalStore;
use crate::tab::{CommandLineTab, TabHandle};

/// Resumelytics popup - score the job posting in front of you against your resume
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the JD from a page and score it against a resume
    Analyze {
        /// Page under analysis: an http(s) URL or a saved HTML file
        #[arg(long)]
        tab: Option<String>,

        /// Resume text (defaults to the last resume used)
        #[arg(long, conflicts_with = "resume_file")]
        resume: Option<String>,

        /// Read the resume text from a file
        #[arg(long)]
        resume_file: Option<PathBuf>,

        /// Years of candidate experience; blank or non-numeric is sent as null
        #[arg(long)]
        experience: Option<String>,
    },

    /// Print the last cached scoring result
    Last,

    /// Check that the local scoring service is up
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Resumelytics popup v{}", env!("CARGO_PKG_VERSION"));

    let scoring = ScoringClient::new(&config.score_endpoint, config.request_timeout)?;
    let store = LocalStore::new(&config.store_path);

    match cli.command {
        Command::Analyze {
            tab,
            resume,
            resume_file,
            experience,
        } => {
            let tabs = CommandLineTab::new(
                tab.as_deref().and_then(TabHandle::parse),
                scoring.http().clone(),
            );
            let popup = Popup::new(scoring, Arc::new(tabs), store);
            let cached = popup.initialize().await;

            let resume_text = match resume_file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read resume file {}", path.display()))?,
                None => resume
                    .or(cached.last_resume_text)
                    .unwrap_or_default(),
            };

            let mut status_rx = popup.subscribe();
            let status_log = tokio::spawn(async move {
                while status_rx.changed().await.is_ok() {
                    let status = status_rx.borrow_and_update().clone();
                    info!(status = %status, "popup status");
                }
            });

            let outcome = popup
                .run_analysis(&resume_text, experience.as_deref().unwrap_or(""))
                .await;
            status_log.abort();

            println!("{}", popup.state().await.status);
            Ok(match outcome {
                CycleOutcome::Done(_) => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            })
        }
        Command::Last => {
            let cached = store
                .load_cached_state()
                .await
                .with_context(|| format!("Failed to read store {}", store.path().display()))?;
            match cached.last_result {
                Some(result) => println!("{}", render_result(&result)),
                None => println!("No cached result."),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => {
            info!("Probing scoring service at {}", scoring.endpoint());
            match scoring.health().await {
                Ok(()) => {
                    println!("Scoring service is up.");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    println!("{}", e.user_message());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
