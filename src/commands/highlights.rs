use colored::Colorize;

use reforma::error::{ReformaError, Result};
use reforma::page::normalize_page_url;

use super::{load_config, open_store};
use crate::cli::Cli;

pub async fn list(cli: &Cli, url: &str) -> Result<()> {
    let config = load_config(cli)?;
    let buckets = open_store(&config);
    let page_key = normalize_page_url(url);
    let bucket = buckets.load(&page_key).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&bucket.anchors)?);
        return Ok(());
    }

    if bucket.anchors.is_empty() {
        println!("{} No highlights on {}", "!".yellow(), page_key);
        return Ok(());
    }

    println!(
        "{} {} highlight(s) on {}\n",
        "✓".green(),
        bucket.anchors.len(),
        page_key.cyan()
    );

    for anchor in &bucket.anchors {
        let label = match anchor.sequence_number {
            Some(n) => format!("#{}", n),
            None => "-".to_string(),
        };
        println!(
            "{} {} {}",
            "●".cyan(),
            label.bold(),
            format!("(ID: {})", anchor.id).dimmed()
        );

        let preview: String = anchor.text.chars().take(80).collect();
        if preview.len() < anchor.text.len() {
            println!("  {} {}...", "Text:".dimmed(), preview);
        } else {
            println!("  {} {}", "Text:".dimmed(), preview);
        }
        if !anchor.comment.is_empty() {
            println!("  {} {}", "Comment:".dimmed(), anchor.comment);
        }
        println!();
    }

    if bucket.malformed > 0 {
        println!(
            "{} {} malformed record(s) skipped",
            "!".yellow(),
            bucket.malformed
        );
    }

    Ok(())
}

pub async fn delete(cli: &Cli, url: &str, id: &str) -> Result<()> {
    let config = load_config(cli)?;
    let buckets = open_store(&config);
    let page_key = normalize_page_url(url);

    if !buckets.remove(&page_key, id).await? {
        return Err(ReformaError::AnchorNotFound(id.to_string()));
    }

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "status": "deleted", "id": id, "page": page_key })
        );
    } else {
        println!("{} Deleted {}", "✓".green(), id);
    }

    Ok(())
}

pub async fn comment(cli: &Cli, url: &str, id: &str, comment: &str) -> Result<()> {
    let config = load_config(cli)?;
    let buckets = open_store(&config);
    let page_key = normalize_page_url(url);

    let anchor = buckets.update_comment(&page_key, id, comment.trim()).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&anchor)?);
    } else {
        println!("{} {}", "✓".green(), anchor.display_text());
    }

    Ok(())
}

pub async fn pages(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let buckets = open_store(&config);
    let pages = buckets.pages().await?;

    if cli.json {
        let entries: Vec<_> = pages
            .iter()
            .map(|(url, count)| serde_json::json!({ "url": url, "highlights": count }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if pages.is_empty() {
        println!("{} No highlights stored", "!".yellow());
        return Ok(());
    }

    for (url, count) in &pages {
        println!("{} {} {}", "●".cyan(), url, format!("({})", count).dimmed());
    }

    Ok(())
}
