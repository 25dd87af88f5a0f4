use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::tenant::{resolve, FeatureFlag, TenantConfig, TenantRegistry, TenantsFile};

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "List registered tenants")]
    List {
        #[arg(long, help = "Tenants YAML file (defaults to TENANTS_FILE or the built-in set)")]
        file: Option<PathBuf>,
        #[arg(long, help = "Only tenants with this feature enabled, e.g. marketplace")]
        feature: Option<FeatureFlag>,
    },

    #[command(about = "Show one tenant's configuration")]
    Show {
        #[arg(help = "Tenant id")]
        id: String,
        #[arg(long, help = "Tenants YAML file (defaults to TENANTS_FILE or the built-in set)")]
        file: Option<PathBuf>,
    },

    #[command(about = "Show which tenant a request would resolve to")]
    Resolve {
        #[arg(help = "Request path, e.g. /app1/api/v1/app")]
        path: String,
        #[arg(long, help = "Host header value")]
        host: Option<String>,
        #[arg(long, help = "Tenants YAML file (defaults to TENANTS_FILE or the built-in set)")]
        file: Option<PathBuf>,
    },
}

fn load(file: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<TenantRegistry> {
    let registry = match file {
        Some(path) => TenantRegistry::from_settings(TenantsFile::load(&path)?)?,
        None => crate::load_registry(config)?,
    };
    Ok(registry)
}

fn with_feature(registry: &TenantRegistry, feature: Option<FeatureFlag>) -> Vec<&Arc<TenantConfig>> {
    registry
        .iter()
        .filter(|tenant| feature.map_or(true, |flag| tenant.has_feature(flag)))
        .collect()
}

pub async fn handle(cmd: TenantCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    match cmd {
        TenantCommands::List { file, feature } => {
            let registry = load(file, &config)?;
            let selected = with_feature(&registry, feature);

            match output_format {
                OutputFormat::Json => {
                    let tenants: Vec<_> = selected.iter().map(|tenant| tenant.as_ref()).collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "tenants": tenants,
                            "fingerprint": registry.fingerprint(),
                        }))?
                    );
                }
                OutputFormat::Text => {
                    println!("{:<15} {:<28} {:<15} {}", "ID", "DISPLAY NAME", "SCHEMA", "FEATURES");
                    println!("{}", "-".repeat(90));
                    for tenant in &selected {
                        let features: Vec<_> = tenant.enabled_features.iter().map(|f| f.as_str()).collect();
                        println!(
                            "{:<15} {:<28} {:<15} {}",
                            tenant.id,
                            tenant.display_name,
                            tenant.storage_schema_name,
                            features.join(",")
                        );
                    }
                    println!("\nfingerprint: {}", registry.fingerprint());
                }
            }
            Ok(())
        }
        TenantCommands::Show { id, file } => {
            let registry = load(file, &config)?;
            let Some(tenant) = registry.get(&id) else {
                output_error(&output_format, &format!("Tenant '{}' not found", id), Some("TENANT_NOT_FOUND"))?;
                anyhow::bail!("tenant '{}' not found", id);
            };
            output_record(&output_format, &serde_json::to_value(tenant.as_ref())?)
        }
        TenantCommands::Resolve { path, host, file } => {
            let registry = load(file, &config)?;
            let resolution = resolve(&path, host.as_deref(), &registry, &config.api.default_tenant);
            let registered = registry.contains(&resolution.tenant_id);
            output_record(
                &output_format,
                &json!({
                    "tenant_id": resolution.tenant_id,
                    "source": resolution.source,
                    "registered": registered,
                }),
            )
        }
    }
}
