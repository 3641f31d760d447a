use clap::ValueEnum;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{CollectionError, Result};
use crate::models::Record;

/// Whose folders the pick is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Who {
    Alice,
    James,
    Both,
}

impl Who {
    /// Owners in the order their folders are pooled.
    fn owners(self) -> &'static [&'static str] {
        match self {
            Who::Alice => &["Alice"],
            Who::James => &["James"],
            Who::Both => &["James", "Alice"],
        }
    }
}

const SHARED: &str = "Shared";

pub fn filter_by_folder(records: &[Record], folder_name: &str) -> Vec<Record> {
    records
        .iter()
        .filter(|record| record.folder_name == folder_name)
        .cloned()
        .collect()
}

/// Builds the selection pool from the "<Owner> LPs" / "<Owner> Singles" folders.
///
/// Owners come first (James before Alice for `Both`), each with LPs then Singles,
/// followed by the shared pair unless `exclude_shared` is set.
pub fn select_group(
    records: &[Record],
    who: Who,
    include_singles: bool,
    exclude_shared: bool,
) -> Vec<Record> {
    let mut owners: Vec<&str> = who.owners().to_vec();
    if !exclude_shared {
        owners.push(SHARED);
    }

    let mut pool = Vec::new();
    for owner in owners {
        pool.extend(filter_by_folder(records, &format!("{} LPs", owner)));
        if include_singles {
            pool.extend(filter_by_folder(records, &format!("{} Singles", owner)));
        }
    }
    pool
}

/// Uniform pick over `records`.
pub fn choose_random<'r, R: Rng + ?Sized>(records: &'r [Record], rng: &mut R) -> Result<&'r Record> {
    records.choose(rng).ok_or(CollectionError::NoRecords)
}
