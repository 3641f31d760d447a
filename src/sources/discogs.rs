use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info};
use url::Url;

use super::CollectionSource;
use crate::config::Config;
use crate::error::{CollectionError, Result};
use crate::models::{AuthContext, Folder, Record};

/// Folder id the API reserves for the whole collection.
const ALL_FOLDER_ID: u64 = 0;

#[derive(Debug, Deserialize)]
struct Identity {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FolderList {
    #[serde(default)]
    folders: Vec<Folder>,
}

#[derive(Debug, Deserialize)]
struct FolderSummary {
    count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    pages: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ReleasePage {
    #[serde(default)]
    releases: Vec<Record>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

/// Client for the Discogs collection endpoints.
pub struct DiscogsClient {
    client: reqwest::Client,
    api_url: Url,
    token: String,
}

impl DiscogsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CollectionError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            token: config.token.clone(),
        })
    }

    /// Resolves the username bound to the configured token.
    ///
    /// The returned context is meant to be built once and shared by every later call.
    pub async fn resolve_identity(&self) -> Result<AuthContext> {
        let url = self.endpoint(&["oauth", "identity"])?;
        let identity: Identity = self.get_json(&self.token, url, "identity response").await?;
        let username = identity_username(identity)?;

        info!("🔑 Authenticated as {}", username);
        Ok(AuthContext {
            token: self.token.clone(),
            username,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| CollectionError::Config(format!("invalid API base URL: {}", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn folder_endpoint(&self, auth: &AuthContext, folder_id: u64) -> Result<Url> {
        let id = folder_id.to_string();
        self.endpoint(&["users", &auth.username, "collection", "folders", &id])
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &str, url: Url, context: &str) -> Result<T> {
        debug!("Fetching URL: {}", url);

        let auth_header = HeaderValue::from_str(&format!("Discogs token={}", token))
            .map_err(|_| CollectionError::Auth("token contains invalid header characters".to_string()))?;

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, auth_header)
            .send()
            .await
            .map_err(|e| CollectionError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(&url, status, body));
        }

        let body = response.bytes().await.map_err(|e| CollectionError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        serde_json::from_slice(&body).map_err(|e| CollectionError::decode(context, e))
    }
}

#[async_trait]
impl CollectionSource for DiscogsClient {
    async fn list_folders(&self, auth: &AuthContext) -> Result<Vec<Folder>> {
        let url = self.endpoint(&["users", &auth.username, "collection", "folders"])?;
        let list: FolderList = self.get_json(&auth.token, url, "folder list").await?;
        debug!("{} folders listed for {}", list.folders.len(), auth.username);
        Ok(list.folders)
    }

    async fn fetch_folder_items(
        &self,
        auth: &AuthContext,
        folder_id: u64,
        folder_name: &str,
    ) -> Result<Vec<Record>> {
        let mut base = self.folder_endpoint(auth, folder_id)?;
        base.path_segments_mut()
            .map_err(|_| CollectionError::Config(format!("invalid API base URL: {}", self.api_url)))?
            .push("releases");

        let base = &base;
        let token = auth.token.as_str();
        collect_pages(folder_name, move |page| {
            let mut url = base.clone();
            url.query_pairs_mut().append_pair("page", &page.to_string());
            self.get_json::<ReleasePage>(token, url, "folder releases page")
        })
        .await
    }

    async fn collection_length(&self, auth: &AuthContext) -> Result<usize> {
        let url = self.folder_endpoint(auth, ALL_FOLDER_ID)?;
        let summary: FolderSummary = self.get_json(&auth.token, url, "collection summary").await?;
        authoritative_count(summary)
    }
}

/// Walks pages 1, 2, ... until the reported page count is reached, stamping every
/// record with `folder_name`.
///
/// A page count of zero, or no pagination object at all, means a single page.
/// The first failing page aborts the walk and nothing collected so far is returned.
async fn collect_pages<F, Fut>(folder_name: &str, mut fetch_page: F) -> Result<Vec<Record>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<ReleasePage>>,
{
    let mut records = Vec::new();
    let mut page = 1;
    loop {
        let response = fetch_page(page).await?;
        records.extend(response.releases.into_iter().map(|mut record| {
            record.folder_name = folder_name.to_string();
            record
        }));

        let pages = response.pagination.map(|p| p.pages).unwrap_or(0);
        debug!("Folder: {} Page: {} of {}", folder_name, page, pages);
        if pages <= page {
            break;
        }
        page += 1;
    }
    Ok(records)
}

// Zero is rejected along with a missing field: the API gives no way to tell an
// empty collection from a summary that lost its count.
fn authoritative_count(summary: FolderSummary) -> Result<usize> {
    match summary.count {
        Some(count) if count > 0 => Ok(count as usize),
        _ => Err(CollectionError::MissingField("count")),
    }
}

fn identity_username(identity: Identity) -> Result<String> {
    identity
        .username
        .filter(|name| !name.is_empty())
        .ok_or(CollectionError::MissingField("username"))
}

/// 401 and 403 mean the token itself was refused.
fn status_error(url: &Url, status: StatusCode, body: String) -> CollectionError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        CollectionError::Auth(format!("{} rejected the token ({})", url, status))
    } else {
        CollectionError::Status {
            url: url.to_string(),
            status,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn page_of(ids: &[u64], pages: Option<u32>) -> ReleasePage {
        ReleasePage {
            releases: ids
                .iter()
                .map(|id| serde_json::from_value(serde_json::json!({ "id": id })).unwrap())
                .collect(),
            pagination: pages.map(|pages| Pagination { pages }),
        }
    }

    fn client() -> DiscogsClient {
        client_for("https://api.discogs.com")
    }

    fn client_for(api_url: &str) -> DiscogsClient {
        let config = Config {
            token: "tok".to_string(),
            api_url: Url::parse(api_url).unwrap(),
            user_agent: "test/0.0".to_string(),
            request_timeout: Duration::from_secs(15),
            cache_dir: "/tmp/rdi".into(),
        };
        DiscogsClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_three_pages_fetched_in_order() {
        let requested = RefCell::new(Vec::new());
        let records = collect_pages("James LPs", |page| {
            requested.borrow_mut().push(page);
            let ids: Vec<u64> = vec![page as u64 * 10, page as u64 * 10 + 1];
            async move { Ok(page_of(&ids, Some(3))) }
        })
        .await
        .unwrap();

        assert_eq!(*requested.borrow(), vec![1, 2, 3]);
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10, 11, 20, 21, 30, 31]);
        assert!(records.iter().all(|r| r.folder_name == "James LPs"));
        assert_eq!(serde_json::to_value(&records[0]).unwrap()["FolderName"], "James LPs");
    }

    #[tokio::test]
    async fn test_zero_pages_is_single_request() {
        let requested = RefCell::new(Vec::new());
        let records = collect_pages("Alice LPs", |page| {
            requested.borrow_mut().push(page);
            async move { Ok(page_of(&[1], Some(0))) }
        })
        .await
        .unwrap();

        assert_eq!(*requested.borrow(), vec![1]);
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_pagination_is_single_request() {
        let requested = RefCell::new(0);
        collect_pages("Alice LPs", |_| {
            *requested.borrow_mut() += 1;
            async move { Ok(page_of(&[1, 2], None)) }
        })
        .await
        .unwrap();

        assert_eq!(*requested.borrow(), 1);
    }

    #[tokio::test]
    async fn test_failed_page_discards_earlier_pages() {
        let result = collect_pages("Shared LPs", |page| async move {
            if page == 2 {
                Err(CollectionError::MissingField("releases"))
            } else {
                Ok(page_of(&[page as u64], Some(3)))
            }
        })
        .await;

        assert!(matches!(result, Err(CollectionError::MissingField("releases"))));
    }

    #[test]
    fn test_count_parsing() {
        let summary: FolderSummary = serde_json::from_str(r#"{"id": 0, "count": 45}"#).unwrap();
        assert_eq!(authoritative_count(summary).unwrap(), 45);

        let missing: FolderSummary = serde_json::from_str(r#"{"id": 0}"#).unwrap();
        assert!(matches!(
            authoritative_count(missing),
            Err(CollectionError::MissingField("count"))
        ));
    }

    #[test]
    fn test_zero_count_is_rejected_like_missing() {
        let summary: FolderSummary = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(matches!(
            authoritative_count(summary),
            Err(CollectionError::MissingField("count"))
        ));
    }

    #[test]
    fn test_release_page_shape() {
        let json = r#"{
            "pagination": {"page": 1, "pages": 2, "per_page": 50, "items": 51},
            "releases": [{"id": 5, "folder_id": 3, "basic_information": {"title": "A"}}]
        }"#;
        let page: ReleasePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.pagination.unwrap().pages, 2);
        assert_eq!(page.releases[0].basic_information.title, "A");
    }

    #[test]
    fn test_endpoints_escape_username() {
        let client = client();
        let auth = AuthContext {
            token: "tok".to_string(),
            username: "james smith".to_string(),
        };
        let url = client.folder_endpoint(&auth, ALL_FOLDER_ID).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.discogs.com/users/james%20smith/collection/folders/0"
        );
        assert_eq!(
            client.endpoint(&["oauth", "identity"]).unwrap().as_str(),
            "https://api.discogs.com/oauth/identity"
        );
    }

    #[test]
    fn test_identity_username() {
        let identity: Identity = serde_json::from_str(r#"{"id": 1, "username": "james"}"#).unwrap();
        assert_eq!(identity_username(identity).unwrap(), "james");

        for json in [r#"{"id": 1}"#, r#"{"username": ""}"#, r#"{"username": null}"#] {
            let identity: Identity = serde_json::from_str(json).unwrap();
            assert!(matches!(
                identity_username(identity),
                Err(CollectionError::MissingField("username"))
            ));
        }
    }

    #[test]
    fn test_status_mapping() {
        let url = Url::parse("https://api.discogs.com/oauth/identity").unwrap();
        assert!(matches!(
            status_error(&url, StatusCode::UNAUTHORIZED, String::new()),
            CollectionError::Auth(_)
        ));
        assert!(matches!(
            status_error(&url, StatusCode::FORBIDDEN, String::new()),
            CollectionError::Auth(_)
        ));
        match status_error(&url, StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()) {
            CollectionError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Serves one canned HTTP response and returns the request line it received.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request.lines().next().unwrap_or_default().to_string()
        });
        (base, handle)
    }

    #[tokio::test]
    async fn test_resolve_identity_against_server() {
        let (base, handle) = serve_once("200 OK", r#"{"id": 1, "username": "james"}"#).await;

        let auth = client_for(&base).resolve_identity().await.unwrap();

        assert_eq!(auth.username, "james");
        assert_eq!(auth.token, "tok");
        assert_eq!(handle.await.unwrap(), "GET /oauth/identity HTTP/1.1");
    }

    #[tokio::test]
    async fn test_rejected_token_is_auth_error() {
        let (base, handle) = serve_once("401 Unauthorized", r#"{"message": "You must authenticate."}"#).await;

        let result = client_for(&base).resolve_identity().await;

        assert!(matches!(result, Err(CollectionError::Auth(_))));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_is_status_error() {
        let (base, handle) = serve_once("500 Internal Server Error", "{}").await;
        let auth = AuthContext {
            token: "tok".to_string(),
            username: "james".to_string(),
        };

        let result = client_for(&base).collection_length(&auth).await;

        assert!(matches!(result, Err(CollectionError::Status { .. })));
        assert_eq!(handle.await.unwrap(), "GET /users/james/collection/folders/0 HTTP/1.1");
    }

    #[tokio::test]
    async fn test_fetch_folder_items_stamps_folder_name() {
        let (base, handle) = serve_once(
            "200 OK",
            r#"{"pagination": {"page": 1, "pages": 1}, "releases": [{"id": 5}, {"id": 6}]}"#,
        )
        .await;
        let auth = AuthContext {
            token: "tok".to_string(),
            username: "james".to_string(),
        };

        let records = client_for(&base).fetch_folder_items(&auth, 3, "Alice Singles").await.unwrap();

        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 6]);
        assert!(records.iter().all(|r| r.folder_name == "Alice Singles"));
        assert_eq!(
            handle.await.unwrap(),
            "GET /users/james/collection/folders/3/releases?page=1 HTTP/1.1"
        );
    }
}
