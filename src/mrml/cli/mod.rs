//! Argument parsing and printing for the `mrml` binary. Everything here is
//! presentation; the work happens in `mrml::commands`.

mod logging;
mod print;
mod setup;

use clap::Parser;
use directories::ProjectDirs;
use logging::{init_logging, LogConfig};
use mrml::commands::{check, inspect, normalize};
use mrml::config::SceneConfig;
use mrml::error::{MrmlError, Result};
use print::{print_messages, print_nodes};
use setup::{Cli, Commands};
use std::path::PathBuf;

/// Runs the CLI and returns the process exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose));
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Inspect { file, json } => handle_inspect(&config, file, json),
        Commands::Check { file } => handle_check(&config, file),
        Commands::Normalize { file, output } => handle_normalize(&config, file, output),
    }
}

fn load_config(dir: Option<PathBuf>) -> Result<SceneConfig> {
    let dir = match dir {
        Some(dir) => dir,
        None => match ProjectDirs::from("org", "mrml", "mrml") {
            Some(dirs) => dirs.config_dir().to_path_buf(),
            None => return Ok(SceneConfig::default()),
        },
    };
    SceneConfig::load(dir)
}

fn handle_inspect(config: &SceneConfig, file: PathBuf, json: bool) -> Result<i32> {
    let result = inspect::run(&file, config)?;
    if json {
        let text = serde_json::to_string_pretty(&result.listed_nodes).map_err(MrmlError::Config)?;
        println!("{}", text);
    } else {
        print_nodes(&result.listed_nodes);
        print_messages(&result.messages);
    }
    Ok(0)
}

fn handle_check(config: &SceneConfig, file: PathBuf) -> Result<i32> {
    let result = check::run(&file, config)?;
    print_messages(&result.messages);
    Ok(if result.problems == 0 { 0 } else { 2 })
}

fn handle_normalize(config: &SceneConfig, file: PathBuf, output: Option<PathBuf>) -> Result<i32> {
    let result = normalize::run(&file, output.as_deref(), config)?;
    if let Some(text) = &result.output {
        print!("{}", text);
        for message in &result.messages {
            eprintln!("{}", message.content);
        }
    } else {
        print_messages(&result.messages);
    }
    Ok(0)
}
