use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::cli::utils::*;
use crate::cli::OutputFormat;

pub async fn handle(url: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let endpoint = format!("{}/health", url.trim_end_matches('/'));
    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;

    let started = Instant::now();
    let response = client.get(&endpoint).send().await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match response {
        Ok(response) => {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);
            if status.is_success() {
                output_success(
                    &output_format,
                    &format!("{} is healthy ({} ms)", url, elapsed_ms),
                    Some(json!({ "status": status.as_u16(), "elapsed_ms": elapsed_ms, "body": body })),
                )
            } else {
                output_error(
                    &output_format,
                    &format!("{} answered {} ({} ms)", url, status, elapsed_ms),
                    Some("UNHEALTHY"),
                )?;
                anyhow::bail!("gateway unhealthy")
            }
        }
        Err(e) => {
            output_error(&output_format, &format!("{} unreachable: {}", url, e), Some("UNREACHABLE"))?;
            anyhow::bail!("gateway unreachable")
        }
    }
}
