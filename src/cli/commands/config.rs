use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::{AppConfig, ConfigError};

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Validate the environment and report problems")]
    Check,

    #[command(about = "Print the effective configuration (secrets omitted)")]
    Show,
}

pub async fn handle(cmd: ConfigCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    match cmd {
        ConfigCommands::Check => match config.validate() {
            Ok(()) => output_success(
                &output_format,
                &format!("Configuration is valid ({:?})", config.environment),
                Some(json!({ "environment": config.environment })),
            ),
            Err(ConfigError::Invalid(problems)) => {
                match output_format {
                    OutputFormat::Json => println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "success": false, "problems": problems }))?
                    ),
                    OutputFormat::Text => {
                        for problem in &problems {
                            eprintln!("✗ {}", problem);
                        }
                    }
                }
                anyhow::bail!("{} configuration problem(s)", problems.len())
            }
        },
        ConfigCommands::Show => output_record(&output_format, &serde_json::to_value(&config)?),
    }
}
