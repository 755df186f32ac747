// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::{Config, parse_resource};
use mlfs_app::AppState;
use mlfs_grid::load_option_lookup;
use mlfs_testkit::DemoBackend;
use mlfs_tui::ViewOptions;
use runtime::{RemoteRuntime, SharedRemote};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_SEED: u64 = 1987;
const DEMO_ROWS_PER_RESOURCE: usize = 120;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `mlfs --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let resource = match &options.resource {
        Some(raw) => parse_resource(raw)?,
        None => config.resource()?,
    };
    let view_options = ViewOptions {
        page_size: config.page_size(),
        filter_debounce: config.filter_debounce()?,
    };

    let remote: SharedRemote = if options.demo {
        Arc::new(DemoBackend::seeded(DEMO_SEED, DEMO_ROWS_PER_RESOURCE))
    } else {
        let client = mlfs_api::Client::new(config.base_url(), config.api_timeout()?)
            .with_context(|| {
                format!(
                    "invalid [api] config in {}; fix base_url/timeout values",
                    options.config_path.display()
                )
            })?;
        Arc::new(client)
    };

    if options.check_only {
        load_option_lookup(&remote).with_context(|| {
            format!(
                "backend at {} did not answer; check [api].base_url or run with --demo",
                config.base_url()
            )
        })?;
        return Ok(());
    }

    let log_path = logging::init(&config)?;
    tracing::info!(
        resource = resource.as_str(),
        demo = options.demo,
        log = %log_path.display(),
        "starting mlfs"
    );

    let mut state = AppState {
        resource,
        ..AppState::default()
    };
    let mut runtime = RemoteRuntime::new(remote);
    let result = mlfs_tui::run_app(&mut state, &mut runtime, view_options);
    if let Err(error) = &result {
        tracing::error!(error = %format!("{error:#}"), "grid exited with error");
    }
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    resource: Option<String>,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        resource: None,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--resource" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--resource requires a name"))?;
                options.resource = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("mlfs: spreadsheet view over Multilateral Fund records");
    println!("  --config <path>          Use a specific config path");
    println!("  --resource <name>        Open a resource (business_plans, country_programme,");
    println!("                           projects, contributions)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Run against seeded in-memory data");
    println!("  --check                  Validate config and reach the backend, then exit");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/mlfs-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                resource: None,
                print_config_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_takes_resource_name() -> Result<()> {
        let options = parse_cli_args(vec!["--resource", "projects"], default_options_path())?;
        assert_eq!(options.resource.as_deref(), Some("projects"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_resource_value() {
        let error = parse_cli_args(vec!["--demo", "--resource"], default_options_path())
            .expect_err("missing resource value should fail");
        assert!(error.to_string().contains("--resource requires a name"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(!options.demo);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_demo_flag() -> Result<()> {
        let options = parse_cli_args(vec!["--demo"], default_options_path())?;
        assert!(options.demo);
        assert!(!options.check_only);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
