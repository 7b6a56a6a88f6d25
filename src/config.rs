use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, str::FromStr, time::Duration};

use crate::game::EngineSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    pub server: ServerConfig,
    pub quiz: QuizConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    /// User allowed to run the owner commands
    pub owner_id: Option<String>,
    pub api_url: String,
    pub gateway_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizConfig {
    pub command_prefix: String,
    pub quiz_folder: String,
    pub quiz_list_path: String,
    pub dictionary_path: String,
    pub storage_path: String,
    /// Seconds
    pub round_timeout: u64,
    pub scramble_timeout: u64,
    pub gauntlet_duration: u64,
    pub timeout_limit: u32,
}

/// Read a variable, falling back to `default` when unset
fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let discord = DiscordConfig {
            token: env::var("DISCORD_TOKEN").context("DISCORD_TOKEN must be set")?,
            owner_id: env::var("OWNER_ID").ok().filter(|id| !id.is_empty()),
            api_url: env::var("DISCORD_API_URL")
                .unwrap_or_else(|_| "https://discord.com/api/v10".to_string()),
            gateway_url: env::var("DISCORD_GATEWAY_URL")
                .unwrap_or_else(|_| "wss://gateway.discord.gg/?v=10&encoding=json".to_string()),
        };

        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: var_or("PORT", 3000)?,
        };

        Ok(Config {
            discord,
            server,
            quiz: QuizConfig::from_env()?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl QuizConfig {
    /// Quiz settings only, enough for offline deck validation
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(QuizConfig {
            command_prefix: env::var("COMMAND_PREFIX").unwrap_or_else(|_| "kq!".to_string()),
            quiz_folder: env::var("QUIZ_FOLDER").unwrap_or_else(|_| "./quizzes".to_string()),
            quiz_list_path: env::var("QUIZ_LIST_PATH").unwrap_or_else(|_| "./quizzes/quizlist.json".to_string()),
            dictionary_path: env::var("DICTIONARY_PATH").unwrap_or_else(|_| "./dictionary.txt".to_string()),
            storage_path: env::var("STORAGE_PATH").unwrap_or_else(|_| "./storage.json".to_string()),
            round_timeout: var_or("ROUND_TIMEOUT", 20)?,
            scramble_timeout: var_or("SCRAMBLE_TIMEOUT", 30)?,
            gauntlet_duration: var_or("GAUNTLET_DURATION", 120)?,
            timeout_limit: var_or("TIMEOUT_LIMIT", 5)?,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            round_timeout: Duration::from_secs(self.round_timeout),
            scramble_timeout: Duration::from_secs(self.scramble_timeout),
            gauntlet_duration: Duration::from_secs(self.gauntlet_duration),
            timeout_limit: self.timeout_limit.max(1),
        }
    }
}
