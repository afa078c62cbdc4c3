//! Replaying adapters that serve recorded interactions.

pub mod commands;
pub mod filesystem;
pub mod registry;

pub use commands::ReplayingCommandRunner;
pub use filesystem::ReplayingFileSystem;
pub use registry::ReplayingRegistryClient;

use crate::ports::PortError;

/// Extracts a Result from a cassette output JSON value.
///
/// Expects `{"ok": <value>}` or `{"err": "message"}`; a bare value is
/// treated as `ok`.
pub(crate) fn extract_result<T: serde::de::DeserializeOwned>(
    output: &serde_json::Value,
    context: &str,
) -> Result<T, PortError> {
    if let Some(err) = output.get("err") {
        let msg = err.as_str().unwrap_or("unknown error").to_string();
        return Err(msg.into());
    }
    let value = output.get("ok").unwrap_or(output);
    serde_json::from_value(value.clone())
        .map_err(|e| format!("{context}: failed to deserialize: {e}").into())
}
