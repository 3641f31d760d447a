use std::time::Instant;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{AuthContext, Record};
use crate::sources::CollectionSource;
use crate::storage::CacheStore;

/// What a reconciliation did to the snapshot.
#[derive(Debug, PartialEq)]
pub enum SyncOutcome {
    /// Cached length already matched the remote count; nothing was written.
    Fresh { count: usize },
    /// The snapshot was replaced with a full fetch.
    Rebuilt { records: usize },
}

/// Keeps the cache snapshot consistent with the remote collection count.
pub struct Reconciler<'a, S> {
    source: &'a S,
    store: &'a CacheStore,
    auth: &'a AuthContext,
}

impl<'a, S: CollectionSource + Sync> Reconciler<'a, S> {
    pub fn new(source: &'a S, store: &'a CacheStore, auth: &'a AuthContext) -> Self {
        Self { source, store, auth }
    }

    /// Rebuilds the snapshot when its length differs from the remote count, or
    /// unconditionally with `force_update`.
    pub async fn reconcile(&self, force_update: bool) -> Result<SyncOutcome> {
        // Compare remote count with the cached snapshot
        let remote_count = self.source.collection_length(self.auth).await?;
        let local_count = self.store.length().await?;

        if local_count == remote_count && !force_update {
            debug!("Cache is up to date ({} records), no need to update", local_count);
            return Ok(SyncOutcome::Fresh { count: local_count });
        }

        if force_update {
            info!("🔄 Forced cache update ({} cached, {} remote)", local_count, remote_count);
        } else {
            info!(
                "🔄 Cached records is a different length ({} vs {}), updating cache...",
                local_count, remote_count
            );
        }

        // Full rebuild; saved only once every folder succeeded
        let started = Instant::now();
        let records = self.fetch_all().await?;
        self.store.save(&records).await?;

        info!(
            "✅ Cache rebuilt with {} records in {}",
            records.len(),
            humantime::format_duration(started.elapsed())
        );
        Ok(SyncOutcome::Rebuilt {
            records: records.len(),
        })
    }

    /// Fetches every folder except "All", one after another, in remote order.
    ///
    /// Nothing is returned unless every folder succeeds.
    async fn fetch_all(&self) -> Result<Vec<Record>> {
        let folders = self.source.list_folders(self.auth).await?;
        let mut records = Vec::new();

        for folder in folders.iter().filter(|folder| !folder.is_all()) {
            debug!(
                "Folder ID: {}, Name: {}, Count: {}, Resource URL: {}",
                folder.id, folder.name, folder.count, folder.resource_url
            );
            let items = self
                .source
                .fetch_folder_items(self.auth, folder.id, &folder.name)
                .await?;
            records.extend(items);
        }

        Ok(records)
    }
}
