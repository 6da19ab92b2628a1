//! Application configuration loaded from environment variables.

use std::str::FromStr;

use crate::errors::{Result, SantaError};

/// How the draw turns a participant list into giver/receiver pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    /// Shuffle, then pair every participant with the next one (wrapping).
    /// Always yields a single cycle through the whole group.
    #[default]
    Cycle,
    /// Uniform over every derangement of the group, including ones made of
    /// several disjoint cycles.
    Uniform,
}

impl FromStr for DrawMode {
    type Err = SantaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cycle" => Ok(Self::Cycle),
            "uniform" => Ok(Self::Uniform),
            other => Err(SantaError::Config(format!(
                "Invalid DRAW_MODE '{other}' (expected 'cycle' or 'uniform')"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Mail-send endpoint of the email provider
    pub email_api_url: String,
    /// API key sent as a bearer token to the email provider
    pub email_api_key: String,
    /// Address every notification is sent from
    pub from_email: String,
    /// Display name paired with `from_email`
    pub from_name: String,
    /// Timeout for outbound email requests
    pub email_timeout_secs: u64,
    pub draw_mode: DrawMode,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./santa.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| SantaError::Config("Invalid API_PORT".to_string()))?,
            email_api_url: env_var("EMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.sendgrid.com/v3/mail/send".to_string()),
            email_api_key: env_var("SENDGRID_API_KEY").map_err(|_| {
                SantaError::Config("SENDGRID_API_KEY environment variable is required".to_string())
            })?,
            from_email: env_var("SENDGRID_FROM_EMAIL").map_err(|_| {
                SantaError::Config(
                    "SENDGRID_FROM_EMAIL environment variable is required".to_string(),
                )
            })?,
            from_name: env_var("SENDGRID_FROM_NAME").unwrap_or_else(|_| "Secret Santa".to_string()),
            email_timeout_secs: env_var("EMAIL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| SantaError::Config("Invalid EMAIL_TIMEOUT_SECS".to_string()))?,
            draw_mode: env_var("DRAW_MODE")
                .unwrap_or_else(|_| "cycle".to_string())
                .parse()?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| SantaError::Config(format!("Missing env var: {key}")))
}
