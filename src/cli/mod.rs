pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "freshet")]
#[command(about = "Incremental feed sync with adaptive media prefetch", long_about = None)]
pub struct Cli {
    /// Override the remote API base URL
    #[arg(long, global = true)]
    pub api: Option<String>,

    /// Restrict the feed to a single author
    #[arg(long, global = true)]
    pub owner: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the cached feed without touching the network
    Show,
    /// Replace the cached feed with the newest remote page
    Refresh,
    /// Load the page after the cached feed
    More,
    /// Load the page before the cached feed
    Previous,
    /// Poll once for new content
    Poll,
    /// Move pending new content into the visible feed
    Reveal,
    /// Poll for new content in the foreground
    Watch {
        /// Poll interval (e.g., "30s", "5m", "1h")
        #[arg(short, long, default_value = "30s")]
        interval: String,
    },
    /// Show cache and device context
    Status,
    /// Drop every cached item and boundary
    Clear,
}
