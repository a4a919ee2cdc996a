//! Transformer Test Studio CLI.

use clap::{ColorChoice, Parser};
use std::io::{self, IsTerminal};
use tts_cli::logging::{LogConfig, LogFormat, init_logging};
use tts_cli::session::{ConfigOverrides, resolve_config};
use tts_modules::clean_startup_caches;
use tts_persistence::PersistenceContext;

mod cli;
mod commands;

use crate::cli::{Cli, Command, LogFormatArg};
use crate::commands::{
    run_backup, run_classes, run_clear, run_export, run_get, run_health, run_import, run_levels,
    run_restore, run_set, run_stores, run_update,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Insulation tables are embedded and need neither config nor runtime.
    match cli.command {
        Command::Classes { standard } => return run_classes(standard.into()),
        Command::Levels { standard, um } => return run_levels(standard.into(), um),
        _ => {}
    }

    let overrides = ConfigOverrides {
        config: cli.connection.config,
        base_url: cli.connection.base_url,
        local_dir: cli.connection.local_dir,
    };
    let config = resolve_config(&overrides)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let context = PersistenceContext::new(&config)?;
        let removed = clean_startup_caches(context.local())?;
        if removed > 0 {
            tracing::info!(removed, "Removed outdated module caches");
        }
        match cli.command {
            Command::Health => run_health(&context).await,
            Command::Stores => run_stores(&context).await,
            Command::Get { store } => run_get(&context, &store).await,
            Command::Update { store, json } => run_update(&context, &store, &json).await,
            Command::Set { store, json } => run_set(&context, &store, &json).await,
            Command::Clear(args) => run_clear(&context, &args).await,
            Command::Export { store } => run_export(&context, &store).await,
            Command::Import { store, file } => run_import(&context, &store, &file).await,
            Command::Backup { file } => run_backup(&context, &file).await,
            Command::Restore { file } => run_restore(&context, &file).await,
            Command::Classes { .. } | Command::Levels { .. } => Ok(()),
        }
    })
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !cli.verbosity.is_present();
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
