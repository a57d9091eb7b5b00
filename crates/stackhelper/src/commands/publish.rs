use crate::cli::PublishArgs;
use crate::init::aws_sdk_config;
use anyhow::{bail, Context, Result};
use stackhelper_config::RuntimeConfig;
use stackhelper_core::{Publisher, RemoteParameter};
use tracing::info;

pub(super) async fn run(args: PublishArgs, config: &RuntimeConfig) -> Result<()> {
    let parameters = args.parameters.load()?;

    let content = std::fs::read_to_string(&args.records)
        .with_context(|| format!("Failed to read records file: {}", args.records.display()))?;
    let records: Vec<RemoteParameter> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse records file: {}", args.records.display()))?;

    let sdk_config = aws_sdk_config(&config.aws).await;
    let publisher = Publisher::new(aws_sdk_ssm::Client::new(&sdk_config), parameters);

    let report = publisher.put_all(&records).await;
    info!(
        succeeded = report.succeeded(),
        total = report.results.len(),
        "Publish finished"
    );

    if !report.is_success() {
        let failed: Vec<&str> = report.failed().map(|r| r.name.as_str()).collect();
        bail!(
            "{} of {} parameters failed to publish: {}",
            failed.len(),
            report.results.len(),
            failed.join(", ")
        );
    }
    Ok(())
}
