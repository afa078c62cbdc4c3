//! Recording adapter for the `RegistryClient` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{RegistryClient, RegistryFuture};

/// Records registry queries while delegating to an inner client.
///
/// Each interaction is recorded when its response arrives, so the cassette
/// order reflects completion order rather than call order.
pub struct RecordingRegistryClient {
    inner: Box<dyn RegistryClient>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingRegistryClient {
    /// Creates a new recording client wrapping the given implementation.
    pub fn new(inner: Box<dyn RegistryClient>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

/// Input recorded for `list_tags`; replay matches on it.
#[derive(Serialize)]
pub(crate) struct TagsInput<'a> {
    pub repository: &'a str,
}

/// Input recorded for `manifest_digest`; replay matches on it.
#[derive(Serialize)]
pub(crate) struct ManifestInput<'a> {
    pub repository: &'a str,
    pub tag: &'a str,
}

impl RegistryClient for RecordingRegistryClient {
    fn list_tags(&self, repository: &str) -> RegistryFuture<'_, Vec<String>> {
        let repository = repository.to_string();
        Box::pin(async move {
            let result = self.inner.list_tags(&repository).await;
            let input = TagsInput { repository: &repository };
            record_result(&self.recorder, "registry", "list_tags", &input, &result);
            result
        })
    }

    fn manifest_digest(&self, repository: &str, tag: &str) -> RegistryFuture<'_, Option<String>> {
        let (repository, tag) = (repository.to_string(), tag.to_string());
        Box::pin(async move {
            let result = self.inner.manifest_digest(&repository, &tag).await;
            let input = ManifestInput { repository: &repository, tag: &tag };
            record_result(&self.recorder, "registry", "manifest_digest", &input, &result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::recording::test_support::finish;
    use crate::ports::PortError;

    struct OneTag;

    impl RegistryClient for OneTag {
        fn list_tags(&self, _repository: &str) -> RegistryFuture<'_, Vec<String>> {
            Box::pin(async { Ok(vec!["0.1".to_string()]) })
        }

        fn manifest_digest(&self, _repository: &str, tag: &str) -> RegistryFuture<'_, Option<String>> {
            let result: Result<Option<String>, PortError> = if tag == "0.1" {
                Ok(Some("sha256:aaa".to_string()))
            } else {
                Err("HTTP 404".into())
            };
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn records_queries_with_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let cassette_path = dir.path().join("registry.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&cassette_path, "test", "abc")));

        {
            let client = RecordingRegistryClient::new(Box::new(OneTag), Arc::clone(&recorder));
            assert_eq!(client.list_tags("ns/task-init").await.unwrap(), ["0.1"]);
            assert!(client.manifest_digest("ns/task-init", "0.1").await.unwrap().is_some());
            assert!(client.manifest_digest("ns/task-init", "9.9").await.is_err());
        }

        let cassette = finish(recorder, &cassette_path);
        assert_eq!(cassette.interactions.len(), 3);
        assert_eq!(cassette.interactions[0].input["repository"], "ns/task-init");
        assert_eq!(cassette.interactions[1].input["tag"], "0.1");
        assert_eq!(cassette.interactions[1].output["ok"], "sha256:aaa");
        assert_eq!(cassette.interactions[2].output["err"], "HTTP 404");
    }
}
