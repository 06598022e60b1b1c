use std::path::Path;

use colored::Colorize;

use reforma::error::{ReformaError, Result};

use super::{load_config, open_session, read_page, write_page};
use crate::cli::Cli;

pub async fn run(
    cli: &Cli,
    url: &str,
    file: &Path,
    text: &str,
    comment: &str,
    out: Option<&Path>,
) -> Result<()> {
    let config = load_config(cli)?;
    let doc = read_page(file).await?;
    let mut session = open_session(&config, doc, url);
    session.ready().await?;

    if !session.select_text(text) {
        return Err(ReformaError::InvalidSelection(format!(
            "text not found on page: {}",
            text
        )));
    }
    let sequence_number = session.begin_capture().await?;
    let anchor = session.confirm_capture(comment).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&anchor)?);
        if out.is_some() {
            write_page(session.document(), out).await?;
        }
    } else {
        write_page(session.document(), out).await?;
        eprintln!(
            "{} Saved {} on {}",
            "✓".green(),
            format!("Comment #{}", sequence_number).bold(),
            session.page_key().cyan()
        );
        eprintln!("  {} {}", "ID:".dimmed(), anchor.id);
    }

    Ok(())
}
