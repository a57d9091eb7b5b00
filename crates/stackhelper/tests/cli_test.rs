use clap::Parser;
use stackhelper::cli::{AppExportsCli, Cli, Command, GlobalArgs, ParamsFormat};
use stackhelper::commands::render_params;
use stackhelper_core::StackAction;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn parameters_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn stack_command_parses_actions_and_repeated_options() {
    let cli = Cli::try_parse_from([
        "stackhelper",
        "--region",
        "eu-central-1",
        "stack",
        "createChangeSet",
        "--stack-name",
        "billing-prod",
        "--template",
        "stack.yaml",
        "--parameters-file",
        "params.json",
        "--token",
        "Env=prod",
        "--token",
        "Bucket=data",
        "--key",
        "AppName",
        "--key",
        "Environment",
        "--generate-only",
    ])
    .unwrap();

    assert_eq!(cli.global.region.as_deref(), Some("eu-central-1"));
    let Command::Stack(args) = cli.command else {
        panic!("expected stack command");
    };
    assert_eq!(args.stack_name, "billing-prod");
    assert_eq!(args.template, PathBuf::from("stack.yaml"));
    assert_eq!(
        args.stack_action(),
        StackAction::CreateChangeSet {
            generate_only: true
        }
    );
    assert_eq!(args.parameters.tokens.len(), 2);
    assert_eq!(args.parameters.keys, vec!["AppName", "Environment"]);
    assert!(!args.wait);
}

#[test]
fn unknown_stack_action_is_rejected() {
    let err = Cli::try_parse_from([
        "stackhelper",
        "stack",
        "destroy",
        "--stack-name",
        "s",
        "--template",
        "t.yaml",
        "--parameters-file",
        "p.json",
    ])
    .unwrap_err();
    assert!(err.to_string().contains("destroy"));
}

#[test]
fn help_is_not_an_error_exit() {
    let err = AppExportsCli::try_parse_from(["app-exports", "--help"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    assert_eq!(err.exit_code(), 0);
}

#[test]
fn app_exports_defaults() {
    let cli = AppExportsCli::try_parse_from(["app-exports", "--app-name", "App1"]).unwrap();
    assert_eq!(cli.exports.app_name, "App1");
    assert_eq!(cli.exports.environment, "");
    assert_eq!(cli.exports.output, PathBuf::from("./exports.json"));
    assert!(!cli.exports.dump);
    assert!(!cli.exports.pretty);
}

#[test]
fn app_exports_accepts_hyphenated_environment_and_short_flags() {
    let cli = AppExportsCli::try_parse_from([
        "app-exports",
        "--app-name",
        "App1",
        "--environment",
        "-Prod",
        "-o",
        "out.json",
        "-p",
    ])
    .unwrap();
    assert_eq!(cli.exports.environment, "-Prod");
    assert_eq!(cli.exports.output, PathBuf::from("out.json"));
    assert!(cli.exports.pretty);
}

#[test]
fn app_exports_requires_app_name() {
    let err = AppExportsCli::try_parse_from(["app-exports", "-d"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}

#[test]
fn token_flags_override_tokens_file() {
    let tokens = parameters_file(r#"{"Env": "staging", "Bucket": "logs"}"#);
    let params = parameters_file(
        r#"[
            {"ParameterKey": "Environment", "ParameterValue": "${Env}"},
            {"ParameterKey": "Bucket", "ParameterValue": "${Bucket}-${Env}"}
        ]"#,
    );

    let cli = Cli::try_parse_from([
        "stackhelper",
        "params",
        "--parameters-file",
        params.path().to_str().unwrap(),
        "--tokens-file",
        tokens.path().to_str().unwrap(),
        "--token",
        "Env=prod",
        "--format",
        "flat",
    ])
    .unwrap();
    let Command::Params(args) = cli.command else {
        panic!("expected params command");
    };

    let set = args.parameters.load().unwrap();
    assert_eq!(
        render_params(&set, args.format),
        "Environment=prod Bucket=logs-prod "
    );
}

#[test]
fn params_rendering_formats() {
    let params = parameters_file(
        r#"[
            {"ParameterKey": "Name", "ParameterValue": "web"},
            {"ParameterKey": "Unused", "ParameterValue": ""}
        ]"#,
    );
    let cli = Cli::try_parse_from([
        "stackhelper",
        "params",
        "--parameters-file",
        params.path().to_str().unwrap(),
        "--strip-empty",
        "--format",
        "cli",
    ])
    .unwrap();
    let Command::Params(args) = cli.command else {
        panic!("expected params command");
    };
    assert_eq!(args.format, ParamsFormat::Cli);

    let set = args.parameters.load().unwrap();
    assert_eq!(
        render_params(&set, ParamsFormat::Json),
        r#"[{"ParameterKey":"Name","ParameterValue":"web"}]"#
    );
    assert_eq!(
        render_params(&set, ParamsFormat::Cli),
        r#"[{\"ParameterKey\":\"Name\",\"ParameterValue\":\"web\"}]"#
    );
}

#[test]
fn missing_parameters_file_names_the_path() {
    let cli = Cli::try_parse_from([
        "stackhelper",
        "params",
        "--parameters-file",
        "/nonexistent/params.json",
    ])
    .unwrap();
    let Command::Params(args) = cli.command else {
        panic!("expected params command");
    };
    let err = args.parameters.load().unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/params.json"));
}

#[test]
fn explicit_config_file_with_flag_overrides() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [aws]
        region = "eu-west-1"
        cli_path = "/opt/aws/bin/aws"

        [log]
        level = "debug"
        "#
    )
    .unwrap();

    let global = GlobalArgs {
        config: Some(file.path().to_path_buf()),
        log_level: Some("warn".to_string()),
        region: Some("us-west-2".to_string()),
    };
    let config = global.resolve_config().unwrap();
    assert_eq!(config.aws.cli_path, "/opt/aws/bin/aws");
    assert_eq!(config.aws.region, "us-west-2");
    assert_eq!(config.log.level, "warn");
}

#[test]
fn empty_region_flag_fails_validation() {
    let file = NamedTempFile::new().unwrap();
    let global = GlobalArgs {
        config: Some(file.path().to_path_buf()),
        log_level: None,
        region: Some(String::new()),
    };
    assert!(stackhelper::init(&global).is_err());
}

#[test]
fn region_flag_repairs_invalid_file_value() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[aws]\nregion = \"\"").unwrap();

    let global = GlobalArgs {
        config: Some(file.path().to_path_buf()),
        log_level: None,
        region: Some("us-east-2".to_string()),
    };
    let config = stackhelper::init(&global).unwrap();
    assert_eq!(config.aws.region, "us-east-2");
}
