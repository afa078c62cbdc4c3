//! Replaying adapter for the `RegistryClient` port.

use std::sync::Mutex;

use serde::Serialize;

use super::extract_result;
use crate::adapters::recording::registry::{ManifestInput, TagsInput};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{RegistryClient, RegistryFuture};

/// Replays recorded registry responses, matched by request.
pub struct ReplayingRegistryClient {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingRegistryClient {
    /// Creates a new replaying client from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn output_for(&self, method: &str, input: &impl Serialize) -> serde_json::Value {
        let input = serde_json::to_value(input).expect("failed to serialize replay input");
        let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
        replayer.find_interaction("registry", method, &input).output.clone()
    }
}

impl RegistryClient for ReplayingRegistryClient {
    fn list_tags(&self, repository: &str) -> RegistryFuture<'_, Vec<String>> {
        let output = self.output_for("list_tags", &TagsInput { repository });
        Box::pin(async move { extract_result(&output, "registry::list_tags") })
    }

    fn manifest_digest(&self, repository: &str, tag: &str) -> RegistryFuture<'_, Option<String>> {
        let output = self.output_for("manifest_digest", &ManifestInput { repository, tag });
        Box::pin(async move { extract_result(&output, "registry::manifest_digest") })
    }
}
