pub mod annotate;
pub mod config;
pub mod highlights;
pub mod host;
pub mod render;
pub mod restore;

use std::path::Path;
use std::sync::Arc;

use reforma::config::Config;
use reforma::dom::{parse_html, Document};
use reforma::error::Result;
use reforma::{BucketStore, FileStore, PageSession};

use crate::cli::Cli;

/// Configuration with command-line overrides applied.
pub(crate) fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(ref store) = cli.store {
        config.storage.path = store.to_string_lossy().to_string();
    }
    Ok(config)
}

pub(crate) fn open_store(config: &Config) -> BucketStore {
    let store = FileStore::new(config.store_path());
    tracing::debug!("Using highlight store {}", store.path().display());
    BucketStore::new(Arc::new(store))
}

/// Session over a saved page. Snapshots are already fully rendered, so the
/// settle delay meant for live pages is skipped.
pub(crate) fn open_session(config: &Config, doc: Document, url: &str) -> PageSession {
    let mut settings = config.engine.clone();
    settings.settle_delay_ms = 0;
    PageSession::new(doc, url, open_store(config), settings)
}

pub(crate) async fn read_page(file: &Path) -> Result<Document> {
    let html = tokio::fs::read_to_string(file).await?;
    parse_html(&html)
}

/// Write the page to `out`, or to stdout when no file is given.
pub(crate) async fn write_page(doc: &Document, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => tokio::fs::write(path, doc.to_html()).await?,
        None => println!("{}", doc.to_html()),
    }
    Ok(())
}
