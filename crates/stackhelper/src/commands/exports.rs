use crate::cli::ExportsArgs;
use crate::init::aws_sdk_config;
use anyhow::{Context, Result};
use stackhelper_config::RuntimeConfig;
use stackhelper_core::ExportReader;
use tracing::info;

/// Fetch the exports, then dump them to stdout or write the output file
pub async fn run(args: ExportsArgs, config: &RuntimeConfig) -> Result<()> {
    let sdk_config = aws_sdk_config(&config.aws).await;
    let reader = ExportReader::new(aws_sdk_cloudformation::Client::new(&sdk_config));

    let exports = reader
        .fetch(&args.app_name, &args.environment)
        .await
        .context("Failed to read CloudFormation exports")?;

    if args.dump {
        println!("{}", exports.to_json(true)?);
        return Ok(());
    }

    exports
        .write(&args.output, args.pretty)
        .context("Failed to write exports")?;
    info!(
        path = %args.output.display(),
        exports = exports.len(),
        "Exports written"
    );
    Ok(())
}
