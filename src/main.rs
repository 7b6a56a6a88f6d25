mod commands;
mod config;
mod deck;
mod dictionary;
mod error;
mod game;
mod gateway;
mod models;
mod render;
mod routes;
mod session;
mod storage;
mod transport;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use commands::Dispatcher;
use config::{Config, QuizConfig};
use deck::{validate::check_quiz, DeckStore};
use dictionary::Dictionary;
use game::QuizEngine;
use gateway::Gateway;
use render::TextOnly;
use session::SessionRegistry;
use storage::Settings;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{DiscordTransport, Messenger};

#[derive(Debug, Parser)]
#[command(name = "kanji-quiz-bot", version, about = "Discord bot running kanji reading quizzes")]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Connect to Discord and run quizzes (default)
    Serve,
    /// Check quiz files for duplicate questions and answers
    Validate {
        /// Quizzes to check, all when empty
        quizzes: Vec<String>,
        /// Write merged decks next to the originals as `<file>.fix`
        #[arg(long)]
        fix: bool,
    },
}

/// Application state shared across all handlers
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub started_at: DateTime<Utc>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kanji_quiz_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command.unwrap_or(CliCommand::Serve) {
        CliCommand::Serve => serve().await,
        CliCommand::Validate { quizzes, fix } => validate(quizzes, fix).await,
    }
}

async fn serve() -> Result<()> {
    tracing::info!("Starting Kanji Quiz Bot...");

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let dictionary = match Dictionary::load(&config.quiz.dictionary_path).await {
        Ok(dict) => dict,
        Err(e) => {
            tracing::warn!("Failed to load dictionary: {}. Word scrambles are disabled.", e);
            tracing::warn!(
                "Download a word list to {} to enable them",
                config.quiz.dictionary_path
            );
            Dictionary::empty()
        }
    };
    if dictionary.is_empty() {
        tracing::warn!("Dictionary has no usable words, word scrambles are disabled");
    }

    let decks = Arc::new(DeckStore::new(&config.quiz.quiz_folder, &config.quiz.quiz_list_path));
    if let Err(e) = decks.reload().await {
        tracing::warn!("Failed to load quiz list: {}. No quizzes available until reload.", e);
    }
    let settings = Arc::new(Settings::load(&config.quiz.storage_path));

    // Create shared HTTP client for reusing connections
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let transport = Arc::new(DiscordTransport::new(
        http_client,
        config.discord.api_url.as_str(),
        config.discord.token.as_str(),
    ));

    let registry = SessionRegistry::new();
    let engine = Arc::new(QuizEngine::new(
        registry.clone(),
        decks,
        Arc::new(dictionary),
        Arc::new(TextOnly),
        settings,
        Messenger::new(transport),
        config.quiz.engine_settings(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        engine,
        config.quiz.command_prefix.as_str(),
        config.discord.owner_id.clone(),
    ));

    let gateway = Gateway::new(
        config.discord.gateway_url.as_str(),
        config.discord.token.as_str(),
        dispatcher,
        registry.presence(),
    );
    tokio::spawn(gateway.run());

    let state = Arc::new(AppState {
        registry,
        started_at: Utc::now(),
    });
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Offline check of the quiz files
async fn validate(quizzes: Vec<String>, fix: bool) -> Result<()> {
    let config = QuizConfig::from_env()?;
    let decks = DeckStore::new(&config.quiz_folder, &config.quiz_list_path);
    decks.reload().await.context("could not load the quiz list")?;

    let ids = if quizzes.is_empty() {
        decks.list_quiz_ids()
    } else {
        quizzes
    };

    let mut failing = 0;
    for id in &ids {
        match check_quiz(&decks, id, fix).await {
            Ok(report) if report.is_clean() => {}
            Ok(_) => failing += 1,
            Err(e) => {
                tracing::error!("{}: {}", id, e);
                failing += 1;
            }
        }
    }

    if failing > 0 {
        anyhow::bail!("{} of {} quizzes have problems", failing, ids.len());
    }
    tracing::info!("All {} quizzes are clean", ids.len());
    Ok(())
}
