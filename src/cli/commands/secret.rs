use clap::Subcommand;
use serde_json::json;

use crate::auth::secret::{generate_key, generate_readable_key, validate_key};
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum SecretCommands {
    #[command(about = "Generate a new secret key")]
    Generate {
        #[arg(long, help = "Alphanumeric key instead of URL-safe base64")]
        readable: bool,
        #[arg(long, default_value_t = 32, help = "Random bytes (base64) or characters (readable)")]
        length: usize,
    },

    #[command(about = "Validate an existing secret key")]
    Validate {
        #[arg(help = "Key to validate")]
        key: String,
    },
}

pub async fn handle(cmd: SecretCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SecretCommands::Generate { readable, length } => {
            let key = if readable {
                generate_readable_key(length)
            } else {
                generate_key(length)
            };

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Generated secret key",
                    Some(json!({ "key": key, "length": key.len(), "readable": readable })),
                ),
                OutputFormat::Text => {
                    println!("{}", key);
                    Ok(())
                }
            }
        }
        SecretCommands::Validate { key } => match validate_key(&key) {
            Ok(()) => output_success(
                &output_format,
                &format!("Valid secret key ({} characters)", key.len()),
                Some(json!({ "length": key.len() })),
            ),
            Err(e) => {
                output_error(&output_format, &e.to_string(), Some("INVALID_SECRET"))?;
                anyhow::bail!("invalid secret key")
            }
        },
    }
}
