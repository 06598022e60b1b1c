use std::path::Path;

use colored::Colorize;

use reforma::error::Result;

use super::{load_config, open_session, read_page, write_page};
use crate::cli::Cli;

pub async fn run(cli: &Cli, url: &str, file: &Path, out: Option<&Path>) -> Result<()> {
    let config = load_config(cli)?;
    let doc = read_page(file).await?;
    let mut session = open_session(&config, doc, url);
    let report = session.ready().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        if out.is_some() {
            write_page(session.document(), out).await?;
        }
        return Ok(());
    }

    write_page(session.document(), out).await?;

    let missing = report.not_found + report.failed;
    let status = if missing == 0 {
        "✓".green()
    } else {
        "!".yellow()
    };
    eprintln!(
        "{} Rendered {} highlight(s) on {}",
        status,
        report.rendered,
        session.page_key().cyan()
    );
    if missing > 0 {
        eprintln!(
            "  {} {} not found, {} could not be wrapped",
            "Skipped:".dimmed(),
            report.not_found,
            report.failed
        );
    }
    if report.malformed > 0 {
        eprintln!(
            "  {} {} malformed record(s) ignored",
            "Warning:".yellow(),
            report.malformed
        );
    }

    Ok(())
}
