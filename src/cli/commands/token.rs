use chrono::Utc;
use clap::Subcommand;

use crate::auth::{token_status, verify_token};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Decode a token's subject and expiry")]
    Inspect {
        #[arg(help = "Access token")]
        token: String,
        #[arg(long, help = "Minutes before expiry that count as expiring soon")]
        threshold: Option<i64>,
    },

    #[command(about = "Verify a token against SUPABASE_JWT_SECRET")]
    Verify {
        #[arg(help = "Access token")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    match cmd {
        TokenCommands::Inspect { token, threshold } => {
            let threshold = threshold.unwrap_or(config.security.token_expiry_threshold_minutes);
            let status = token_status(&token, threshold, Utc::now())?;
            output_record(&output_format, &serde_json::to_value(status)?)
        }
        TokenCommands::Verify { token } => {
            let Some(secret) = config.supabase.jwt_secret.as_deref() else {
                anyhow::bail!("SUPABASE_JWT_SECRET is not set");
            };
            match verify_token(&token, secret) {
                Ok(claims) => output_record(&output_format, &serde_json::to_value(claims)?),
                Err(e) => {
                    output_error(&output_format, &e.to_string(), Some("INVALID_TOKEN"))?;
                    anyhow::bail!("token rejected")
                }
            }
        }
    }
}
