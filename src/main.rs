//! hq-hooks command line
//!
//! Loads a hooks configuration, registers its built-in handlers and fires
//! filters or actions against them. Useful for checking a configuration
//! before deploying it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hq_hooks::hooks::{HookBroker, HooksConfig, PluginPaths};
use hq_hooks::platform_dirs;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter and action hook broker
#[derive(Parser, Debug)]
#[command(name = "hq-hooks")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to hooks.toml in the user config directory)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured level and RUST_LOG
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and report what it registers
    Check,
    /// List registrations, for one tag or all of them
    List {
        tag: Option<String>,
    },
    /// Apply a filter and print the resulting value
    Filter {
        tag: String,
        /// Initial value, parsed as JSON or taken as a string
        value: String,
        /// Extra arguments, parsed like the value
        extra: Vec<String>,
    },
    /// Fire an action
    Action {
        tag: String,
        /// Arguments, parsed as JSON or taken as strings
        args: Vec<String>,
    },
    /// Show a plugin file's basename and lifecycle tags
    Plugin {
        /// Path to the plugin's main file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (config, source) = load_config(args.config.as_deref())?;
    let _guard = init_logging(&args, &config)?;

    match &source {
        Some(path) => info!(path = %path.display(), "Loaded hooks configuration"),
        None => info!("No configuration file, using defaults"),
    }

    let broker = HookBroker::from_config(&config).context("Failed to register configured hooks")?;

    match args.command {
        Command::Check => {
            let enabled = config.handlers.iter().filter(|h| h.enabled).count();
            println!(
                "Configuration OK: {} handler(s), {} enabled, {} tag(s) registered",
                config.handlers.len(),
                enabled,
                broker.tags().len()
            );
        }
        Command::List { tag } => {
            let tags = match tag {
                Some(tag) => vec![tag],
                None => broker.tags(),
            };
            let registrations: Vec<_> = tags
                .iter()
                .flat_map(|tag| broker.registrations(tag))
                .collect();
            println!("{}", serde_json::to_string_pretty(&registrations)?);
        }
        Command::Filter { tag, value, extra } => {
            let extra: Vec<Value> = extra.iter().map(|a| parse_arg(a)).collect();
            let result = broker
                .apply_filters(&tag, parse_arg(&value), &extra)
                .with_context(|| format!("Filter '{}' failed", tag))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Action { tag, args } => {
            let args: Vec<Value> = args.iter().map(|a| parse_arg(a)).collect();
            broker
                .do_action(&tag, &args)
                .with_context(|| format!("Action '{}' failed", tag))?;
            println!("Fired '{}' ({} time(s))", tag, broker.did_action(&tag));
        }
        Command::Plugin { file } => {
            let report = plugin_report(&config, &file)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Load from `path`, or from the default location if a file exists there
fn load_config(path: Option<&Path>) -> Result<(HooksConfig, Option<PathBuf>)> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = platform_dirs::default_config_path()?;
            if !default.exists() {
                return Ok((HooksConfig::default(), None));
            }
            default
        }
    };

    let config = HooksConfig::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    Ok((config, Some(path)))
}

fn init_logging(args: &Args, config: &HooksConfig) -> Result<Option<WorkerGuard>> {
    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.system.log_level)),
    };

    let log_file = args.log_file.as_ref().or(config.system.log_file.as_ref());
    let Some(log_file) = log_file else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .init();
        return Ok(None);
    };

    let dir = match log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => platform_dirs::log_dir()?,
    };
    platform_dirs::ensure_dir(&dir)?;
    let file_name = log_file
        .file_name()
        .context("Log file path has no file name")?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(filter)
        .init();
    debug!(path = %dir.join(file_name).display(), "File logging enabled");
    Ok(Some(guard))
}

/// Basename and lifecycle tags of `file` under the configured plugin directories
fn plugin_report(config: &HooksConfig, file: &Path) -> Result<Value> {
    let mut paths = PluginPaths::from_config(&config.plugins)?;
    paths.register_realpath(file);

    let file = file.to_string_lossy();
    Ok(serde_json::json!({
        "basename": paths.plugin_basename(&file),
        "activate": paths.activation_tag(&file),
        "deactivate": paths.deactivation_tag(&file),
        "uninstall": paths.uninstall_tag(&file),
    }))
}

/// JSON if it parses, otherwise the raw string
fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
