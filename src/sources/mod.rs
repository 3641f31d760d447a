pub mod discogs;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AuthContext, Folder, Record};

pub use discogs::DiscogsClient;

/// Remote source of truth for the collection.
///
/// Every call is a network round trip authenticated with an already resolved
/// [`AuthContext`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionSource {
    /// Folders in the order the remote returns them, including "All".
    async fn list_folders(&self, auth: &AuthContext) -> Result<Vec<Folder>>;

    /// Every page of a folder, each record stamped with `folder_name`.
    async fn fetch_folder_items(
        &self,
        auth: &AuthContext,
        folder_id: u64,
        folder_name: &str,
    ) -> Result<Vec<Record>>;

    /// Authoritative item count of the whole collection.
    async fn collection_length(&self, auth: &AuthContext) -> Result<usize>;
}
