use colored::Colorize;

use reforma::error::Result;
use reforma::page::normalize_page_url;
use reforma::store::restore_code::{export_restore_code, import_restore_code};

use super::{load_config, open_store};
use crate::cli::Cli;

pub async fn export(cli: &Cli, url: &str) -> Result<()> {
    let config = load_config(cli)?;
    let buckets = open_store(&config);
    let code = export_restore_code(&buckets, url).await?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "url": normalize_page_url(url), "code": code })
        );
    } else {
        println!("{}", code);
    }

    Ok(())
}

pub async fn import(cli: &Cli, url: &str, code: &str) -> Result<()> {
    let config = load_config(cli)?;
    let buckets = open_store(&config);
    let anchors = import_restore_code(&buckets, url, code).await?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "status": "imported",
                "url": normalize_page_url(url),
                "highlights": anchors.len()
            })
        );
    } else {
        println!(
            "{} Restored {} highlight(s) on {}",
            "✓".green(),
            anchors.len(),
            normalize_page_url(url).cyan()
        );
    }

    Ok(())
}
