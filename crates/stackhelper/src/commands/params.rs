use crate::cli::{ParamsArgs, ParamsFormat};
use anyhow::Result;
use stackhelper_core::ParameterSet;

pub(super) fn run(args: ParamsArgs) -> Result<()> {
    let parameters = args.parameters.load()?;
    println!("{}", render(&parameters, args.format));
    Ok(())
}

/// Text printed by `stackhelper params`
pub fn render(parameters: &ParameterSet, format: ParamsFormat) -> String {
    match format {
        ParamsFormat::Json => parameters.to_json(),
        ParamsFormat::Cli => parameters.to_cli_string(),
        ParamsFormat::Flat => parameters.to_flat_string(),
    }
}
