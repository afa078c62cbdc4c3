//! Live adapter for the `RegistryClient` port using the Docker registry v2 API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, RwLock};

use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::{Semaphore, SemaphorePermit};

use super::auth::RegistryCredential;
use crate::config::RegistrySettings;
use crate::ports::registry::{RegistryClient, RegistryFuture};
use crate::ports::PortError;

const MANIFEST_ACCEPT: &str =
    "application/vnd.oci.image.manifest.v1+json,application/vnd.docker.distribution.manifest.v2+json";
const DIGEST_HEADER: &str = "Docker-Content-Digest";

static NEXT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>;\s*rel="next""#).expect("link pattern is valid"));

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Live registry client.
///
/// All requests share one semaphore, so at most
/// `settings.max_concurrency` are in flight. Bearer tokens are cached per
/// repository; the cache is read-mostly and every writer for a repository
/// stores an equivalent token, so concurrent fills are harmless.
pub struct LiveRegistryClient {
    client: Client,
    settings: RegistrySettings,
    credential: Option<RegistryCredential>,
    tokens: RwLock<HashMap<String, String>>,
    permits: Semaphore,
    requests: AtomicUsize,
}

impl LiveRegistryClient {
    /// Creates a client for the configured registry.
    #[must_use]
    pub fn new(settings: RegistrySettings, credential: Option<RegistryCredential>) -> Self {
        let permits = Semaphore::new(settings.max_concurrency.max(1));
        Self {
            client: Client::new(),
            settings,
            credential,
            tokens: RwLock::new(HashMap::new()),
            permits,
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of HTTP requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn base_url(&self) -> String {
        self.settings.base_url()
    }

    fn cached_token(&self, repository: &str) -> Option<String> {
        self.tokens.read().ok().and_then(|cache| cache.get(repository).cloned())
    }

    fn cache_token(&self, repository: &str, token: &str) {
        if let Ok(mut cache) = self.tokens.write() {
            cache.insert(repository.to_string(), token.to_string());
        }
    }

    /// Sends a request under a concurrency permit, retrying on HTTP 429.
    ///
    /// The permit is returned with the response; callers hold it until the
    /// body has been read.
    async fn send(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<(Response, SemaphorePermit<'_>), PortError> {
        let mut attempt = 0;
        loop {
            let permit = self.permits.acquire().await?;
            self.requests.fetch_add(1, Ordering::Relaxed);
            let response = build().send().await?;
            tracing::debug!("  Response: {}", response.status());
            if response.status() == StatusCode::TOO_MANY_REQUESTS
                && attempt < self.settings.retry_limit
            {
                drop(permit);
                attempt += 1;
                tracing::warn!(
                    "Rate limited by {}, retry {attempt}/{} in {:?}",
                    self.settings.host,
                    self.settings.retry_limit,
                    self.settings.retry_delay
                );
                tokio::time::sleep(self.settings.retry_delay).await;
                continue;
            }
            return Ok((response, permit));
        }
    }

    /// Returns a pull token for `repository`, or an empty string when the
    /// token endpoint refuses (anonymous requests are then attempted).
    async fn bearer_token(&self, repository: &str) -> String {
        if let Some(token) = self.cached_token(repository) {
            tracing::debug!("Using cached token for {repository}");
            return token;
        }

        let mut headers = HeaderMap::new();
        match &self.credential {
            Some(RegistryCredential::Bearer(token)) => {
                self.cache_token(repository, token);
                return token.clone();
            }
            Some(RegistryCredential::Basic(auth)) => {
                if let Ok(value) = format!("Basic {auth}").parse() {
                    headers.insert(AUTHORIZATION, value);
                }
            }
            None => {}
        }

        let host = &self.settings.host;
        let url = format!(
            "{}/v2/auth?service={host}&scope=repository:{repository}:pull",
            self.base_url()
        );
        tracing::debug!("GET {url}");
        let result = self.send(|| self.client.get(&url).headers(headers.clone())).await;
        match result {
            Ok((resp, _permit)) if resp.status() == StatusCode::OK => {
                match resp.json::<TokenResponse>().await {
                    Ok(body) => {
                        self.cache_token(repository, &body.token);
                        tracing::debug!("  Got bearer token for {repository}");
                        body.token
                    }
                    Err(e) => {
                        tracing::warn!("Failed to get token for {repository}: {e}");
                        String::new()
                    }
                }
            }
            Ok((resp, _)) => {
                tracing::warn!("Failed to get token for {repository}: HTTP {}", resp.status());
                String::new()
            }
            Err(e) => {
                tracing::warn!("Failed to get token for {repository}: {e}");
                String::new()
            }
        }
    }

    async fn fetch_tags(&self, repository: &str) -> Result<Vec<String>, PortError> {
        let token = self.bearer_token(repository).await;
        let mut all_tags = Vec::new();
        let mut next = Some(format!("{}/v2/{repository}/tags/list", self.base_url()));
        let mut first_page = true;

        while let Some(url) = next.take() {
            tracing::debug!("GET {url}");
            let outcome = self.send(|| with_bearer(self.client.get(&url), &token)).await;
            let (response, permit) = match outcome {
                Ok((resp, permit)) if resp.status() == StatusCode::OK => (resp, permit),
                Ok((resp, _)) => {
                    let message = format!("Failed to list tags for {repository}: HTTP {}", resp.status());
                    if first_page {
                        return Err(message.into());
                    }
                    tracing::warn!("{message}");
                    break;
                }
                Err(e) => {
                    if first_page {
                        return Err(e);
                    }
                    tracing::warn!("Failed to list tags for {repository}: {e}");
                    break;
                }
            };
            first_page = false;

            let link = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
            let page: TagList = response.json().await?;
            drop(permit);
            all_tags.extend(page.tags.unwrap_or_default());

            next = link.as_deref().and_then(next_page_path).map(|path| {
                tracing::debug!("  Found next page: {path}");
                format!("{}{path}", self.base_url())
            });
        }

        Ok(all_tags)
    }

    async fn fetch_digest(&self, repository: &str, tag: &str) -> Result<Option<String>, PortError> {
        let token = self.bearer_token(repository).await;
        let url = format!("{}/v2/{repository}/manifests/{tag}", self.base_url());
        tracing::debug!("GET {url}");
        let (response, _permit) = self
            .send(|| with_bearer(self.client.get(&url).header(ACCEPT, MANIFEST_ACCEPT), &token))
            .await?;
        if response.status() != StatusCode::OK {
            return Err(format!(
                "Failed to get manifest for {repository}:{tag}: HTTP {}",
                response.status()
            )
            .into());
        }
        let digest = response
            .headers()
            .get(DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|d| !d.is_empty())
            .map(ToString::to_string);
        Ok(digest)
    }
}

fn with_bearer(request: RequestBuilder, token: &str) -> RequestBuilder {
    if token.is_empty() {
        request
    } else {
        request.bearer_auth(token)
    }
}

/// Extracts the path of the `rel="next"` entry from a `Link` header.
#[must_use]
pub fn next_page_path(link: &str) -> Option<String> {
    NEXT_LINK.captures(link).map(|caps| caps[1].to_string())
}

impl RegistryClient for LiveRegistryClient {
    fn list_tags(&self, repository: &str) -> RegistryFuture<'_, Vec<String>> {
        let repository = repository.to_string();
        Box::pin(async move { self.fetch_tags(&repository).await })
    }

    fn manifest_digest(&self, repository: &str, tag: &str) -> RegistryFuture<'_, Option<String>> {
        let repository = repository.to_string();
        let tag = tag.to_string();
        Box::pin(async move { self.fetch_digest(&repository, &tag).await })
    }
}

impl Drop for LiveRegistryClient {
    fn drop(&mut self) {
        let count = self.request_count();
        if count > 0 {
            tracing::info!("Total registry API requests: {count}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parses_next_link() {
        let link = r#"</v2/konflux-ci/tekton-catalog/task-init/tags/list?n=100&last=0.2>; rel="next""#;
        assert_eq!(
            next_page_path(link).as_deref(),
            Some("/v2/konflux-ci/tekton-catalog/task-init/tags/list?n=100&last=0.2")
        );
        assert!(next_page_path(r#"</v2/x>; rel="prev""#).is_none());
        assert!(next_page_path("").is_none());
    }

    #[tokio::test]
    async fn bearer_credential_is_cached_without_network() {
        let client = LiveRegistryClient::new(
            RegistrySettings::default(),
            Some(RegistryCredential::Bearer("tok".to_string())),
        );
        assert_eq!(client.bearer_token("konflux-ci/tekton-catalog/task-init").await, "tok");
        assert_eq!(
            client.cached_token("konflux-ci/tekton-catalog/task-init").as_deref(),
            Some("tok")
        );
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn zero_concurrency_still_allows_one_request() {
        let settings = RegistrySettings { max_concurrency: 0, ..RegistrySettings::default() };
        let client = LiveRegistryClient::new(settings, None);
        assert_eq!(client.permits.available_permits(), 1);
    }

    const REPO: &str = "ns/task-x";
    const TAGS_PATH: &str = "/v2/ns/task-x/tags/list";

    fn client_for(
        server: &mockito::ServerGuard,
        credential: RegistryCredential,
    ) -> LiveRegistryClient {
        let settings = RegistrySettings {
            scheme: "http".to_string(),
            host: server.host_with_port(),
            max_concurrency: 1,
            retry_delay: Duration::from_millis(1),
            ..RegistrySettings::default()
        };
        LiveRegistryClient::new(settings, Some(credential))
    }

    fn bearer() -> RegistryCredential {
        RegistryCredential::Bearer("t".to_string())
    }

    #[tokio::test]
    async fn rate_limited_request_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let limited = server.mock("GET", TAGS_PATH).with_status(429).expect(1).create_async().await;
        let ok = server
            .mock("GET", TAGS_PATH)
            .match_header("authorization", "Bearer t")
            .with_status(200)
            .with_body(r#"{"name":"ns/task-x","tags":["0.1"]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, bearer());
        assert_eq!(client.list_tags(REPO).await.unwrap(), vec!["0.1"]);
        assert_eq!(client.request_count(), 2);
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limit_beyond_retries_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let limited = server.mock("GET", TAGS_PATH).with_status(429).expect(2).create_async().await;

        let mut client = client_for(&server, bearer());
        client.settings.retry_limit = 1;
        assert!(client.list_tags(REPO).await.is_err());
        assert_eq!(client.request_count(), 2);
        limited.assert_async().await;
    }

    #[tokio::test]
    async fn linked_tag_pages_are_collected() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", TAGS_PATH)
            .with_status(200)
            .with_header("link", r#"</v2/ns/task-x/tags/page2>; rel="next""#)
            .with_body(r#"{"tags":["0.1","0.2"]}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v2/ns/task-x/tags/page2")
            .with_status(200)
            .with_body(r#"{"tags":["0.3"]}"#)
            .create_async()
            .await;

        let client = client_for(&server, bearer());
        assert_eq!(client.list_tags(REPO).await.unwrap(), vec!["0.1", "0.2", "0.3"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn missing_first_tag_page_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server.mock("GET", TAGS_PATH).with_status(404).create_async().await;

        let client = client_for(&server, bearer());
        let err = client.list_tags(REPO).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn failing_later_tag_page_keeps_earlier_tags() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", TAGS_PATH)
            .with_status(200)
            .with_header("link", r#"</v2/ns/task-x/tags/page2>; rel="next""#)
            .with_body(r#"{"tags":["0.1"]}"#)
            .create_async()
            .await;
        let _second =
            server.mock("GET", "/v2/ns/task-x/tags/page2").with_status(404).create_async().await;

        let client = client_for(&server, bearer());
        assert_eq!(client.list_tags(REPO).await.unwrap(), vec!["0.1"]);
    }

    #[tokio::test]
    async fn manifest_digest_comes_from_header() {
        let mut server = mockito::Server::new_async().await;
        let _with_digest = server
            .mock("GET", "/v2/ns/task-x/manifests/0.2")
            .match_header("accept", MANIFEST_ACCEPT)
            .with_status(200)
            .with_header(DIGEST_HEADER, "sha256:abc")
            .create_async()
            .await;
        let _without_digest =
            server.mock("GET", "/v2/ns/task-x/manifests/0.1").with_status(200).create_async().await;
        let _absent =
            server.mock("GET", "/v2/ns/task-x/manifests/0.9").with_status(404).create_async().await;

        let client = client_for(&server, bearer());
        let digest = client.manifest_digest(REPO, "0.2").await.unwrap();
        assert_eq!(digest.as_deref(), Some("sha256:abc"));
        assert_eq!(client.manifest_digest(REPO, "0.1").await.unwrap(), None);
        assert!(client.manifest_digest(REPO, "0.9").await.is_err());
    }

    #[tokio::test]
    async fn basic_credential_is_exchanged_once_per_repository() {
        let mut server = mockito::Server::new_async().await;
        let auth = server
            .mock("GET", mockito::Matcher::Regex(r"^/v2/auth\?".to_string()))
            .match_header("authorization", "Basic dXNlcjpwYXNz")
            .with_status(200)
            .with_body(r#"{"token":"exchanged"}"#)
            .expect(1)
            .create_async()
            .await;
        let tags = server
            .mock("GET", TAGS_PATH)
            .match_header("authorization", "Bearer exchanged")
            .with_status(200)
            .with_body(r#"{"tags":["0.1"]}"#)
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server, RegistryCredential::Basic("dXNlcjpwYXNz".to_string()));
        client.list_tags(REPO).await.unwrap();
        client.list_tags(REPO).await.unwrap();
        assert_eq!(client.request_count(), 3);
        auth.assert_async().await;
        tags.assert_async().await;
    }

    #[tokio::test]
    async fn permit_is_held_until_response_is_released() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", TAGS_PATH)
            .with_status(200)
            .with_body(r#"{"tags":[]}"#)
            .create_async()
            .await;

        let client = client_for(&server, bearer());
        let url = format!("{}{TAGS_PATH}", client.base_url());
        let (response, permit) = client.send(|| client.client.get(&url)).await.unwrap();
        assert_eq!(client.permits.available_permits(), 0);
        let page: TagList = response.json().await.unwrap();
        assert_eq!(page.tags, Some(Vec::new()));
        drop(permit);
        assert_eq!(client.permits.available_permits(), 1);
    }
}
