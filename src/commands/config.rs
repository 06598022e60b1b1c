use colored::Colorize;

use reforma::config::Config;
use reforma::error::{ReformaError, Result};

use super::load_config;
use crate::cli::{Cli, ConfigCommands};

pub async fn run(cli: &Cli, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(cli).await,
        ConfigCommands::Path => path(cli).await,
        ConfigCommands::Init { force } => init(cli, *force).await,
    }
}

async fn show(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| ReformaError::ConfigError(e.to_string()))?;
        println!("{}", toml_str);
    }

    Ok(())
}

async fn path(cli: &Cli) -> Result<()> {
    let path = Config::config_path();

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string()
            })
        );
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

async fn init(cli: &Cli, force: bool) -> Result<()> {
    let path = Config::config_path();

    if path.exists() && !force {
        return Err(ReformaError::ConfigError(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    Config::default().save()?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "status": "written", "path": path.display().to_string() })
        );
    } else {
        println!(
            "{} Config written: {}",
            "✓".green(),
            path.display().to_string().dimmed()
        );
    }

    Ok(())
}
