use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands;
use reforma::Result;

/// Reforma CLI - persistent text highlights and comments for web pages
#[derive(Parser)]
#[command(name = "reforma")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Highlight store file (overrides storage.path from config)
    #[arg(long, env = "REFORMA_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Highlight the first occurrence of some text and save it
    Annotate {
        /// Page URL the highlight belongs to
        #[arg(long)]
        url: String,

        /// HTML file with the page content
        #[arg(short, long)]
        file: PathBuf,

        /// Exact text to highlight
        #[arg(short, long)]
        text: String,

        /// Comment to attach (empty for a plain highlight)
        #[arg(short, long, default_value = "")]
        comment: String,

        /// Write the highlighted page here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render a page's stored highlights into its HTML
    Render {
        /// Page URL whose highlights to render
        #[arg(long)]
        url: String,

        /// HTML file with the page content
        #[arg(short, long)]
        file: PathBuf,

        /// Write the highlighted page here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List the highlights stored for a page
    List {
        /// Page URL
        #[arg(long)]
        url: String,
    },

    /// Delete a stored highlight
    Delete {
        /// Page URL
        #[arg(long)]
        url: String,

        /// Highlight id (e.g., "reforma-1718000000000-k3j9x2a")
        #[arg(long)]
        id: String,
    },

    /// Change the comment of a stored highlight
    Comment {
        /// Page URL
        #[arg(long)]
        url: String,

        /// Highlight id
        #[arg(long)]
        id: String,

        /// New comment (empty to clear)
        #[arg(short, long)]
        comment: String,
    },

    /// List every page with stored highlights
    Pages,

    /// Print a restore code for a page's highlights
    Export {
        /// Page URL
        #[arg(long)]
        url: String,
    },

    /// Replace a page's highlights from a restore code
    Import {
        /// Page URL
        #[arg(long)]
        url: String,

        /// Restore code produced by `export`
        #[arg(long)]
        code: String,
    },

    /// Serve extension commands over native messaging (stdin/stdout)
    Host {
        /// Page URL
        #[arg(long)]
        url: String,

        /// HTML file with the page content
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Annotate {
                url,
                file,
                text,
                comment,
                out,
            } => commands::annotate::run(self, url, file, text, comment, out.as_deref()).await,
            Commands::Render { url, file, out } => {
                commands::render::run(self, url, file, out.as_deref()).await
            }
            Commands::List { url } => commands::highlights::list(self, url).await,
            Commands::Delete { url, id } => commands::highlights::delete(self, url, id).await,
            Commands::Comment { url, id, comment } => {
                commands::highlights::comment(self, url, id, comment).await
            }
            Commands::Pages => commands::highlights::pages(self).await,
            Commands::Export { url } => commands::restore::export(self, url).await,
            Commands::Import { url, code } => commands::restore::import(self, url, code).await,
            Commands::Host { url, file } => commands::host::run(self, url, file).await,
            Commands::Config { command } => commands::config::run(self, command).await,
        }
    }
}
