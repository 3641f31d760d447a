use clap::Parser;

use crate::selector::Who;

/// Pick a random record from a Discogs collection, refreshing the local cache when
/// it no longer matches the remote collection size.
#[derive(Debug, Parser)]
#[command(name = "random-discogs-item", version)]
pub struct Cli {
    /// Whose folders to pick from
    #[arg(value_enum)]
    pub who: Who,

    /// Include singles in the selection
    #[arg(short, long)]
    pub singles: bool,

    /// Exclude shared items
    #[arg(long)]
    pub not_shared: bool,

    /// Rebuild the cache even if it looks current
    #[arg(long)]
    pub force_update: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}
