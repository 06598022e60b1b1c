use std::path::Path;

use reforma::error::Result;
use reforma::messaging::run_host;

use super::{load_config, open_session, read_page};
use crate::cli::Cli;

/// Load the page, render its highlights, then answer framed commands on
/// stdin until the browser closes it. Nothing but frames goes to stdout.
pub async fn run(cli: &Cli, url: &str, file: &Path) -> Result<()> {
    let config = load_config(cli)?;
    let doc = read_page(file).await?;
    let mut session = open_session(&config, doc, url);
    session.ready().await?;

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    run_host(&mut session, &mut stdin, &mut stdout).await?;

    Ok(())
}
