//! Configuration command handlers

use crate::cli::{ConfigAction, ConfigArgs, ConfigFormat, ConfigInitArgs, ConfigShowArgs, OutputFormat};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Handle the config command
pub async fn handle_config(
    args: ConfigArgs,
    config: &Config,
    explicit_path: Option<&Path>,
    output: &mut OutputWriter,
) -> Result<()> {
    match args.action {
        ConfigAction::Init(init_args) => handle_config_init(init_args, output),
        ConfigAction::Show(show_args) => handle_config_show(show_args, config, output),
        ConfigAction::Path => handle_config_path(explicit_path, output),
    }
}

fn handle_config_init(args: ConfigInitArgs, output: &mut OutputWriter) -> Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => Config::user_config_path()?,
    };

    if path.exists() && !args.force {
        return Err(Error::config(format!(
            "{} already exists; use --force to overwrite",
            path.display()
        )));
    }

    Config::default().save(&path)?;
    output.success(&format!("Wrote default configuration to {}", path.display()))
}

fn handle_config_show(args: ConfigShowArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let shown = redacted(config);

    let rendered = match args.format {
        ConfigFormat::Yaml => serde_yaml::to_string(&shown)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&shown)?,
    };
    output.write(&rendered)?;
    if !rendered.ends_with('\n') {
        output.writeln("")?;
    }

    match config.client_config(None).resolve_base_url() {
        Ok(base_url) => output.info(&format!("Effective backend: {}", base_url)),
        Err(e) => output.warning(&format!("Backend URL is invalid: {}", e)),
    }
}

/// A copy safe to print: the stored token is masked
fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.auth.token.is_some() {
        shown.auth.token = Some("***".to_string());
    }
    shown
}

#[derive(Debug, Serialize)]
struct SearchPath {
    path: PathBuf,
    exists: bool,
}

fn handle_config_path(explicit_path: Option<&Path>, output: &mut OutputWriter) -> Result<()> {
    let candidates: Vec<SearchPath> = explicit_path
        .map(Path::to_path_buf)
        .into_iter()
        .chain(Config::default_config_paths())
        .map(|path| SearchPath {
            exists: path.exists(),
            path,
        })
        .collect();

    if output.format() != OutputFormat::Human {
        return output.data(&candidates);
    }

    output.section("Configuration search paths")?;
    for candidate in &candidates {
        let marker = if candidate.exists { "*" } else { " " };
        output.writeln(&format!("{} {}", marker, candidate.path.display()))?;
    }
    output.info("The first existing file (*) is used")
}
