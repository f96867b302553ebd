//! Source bundles from the sources API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the packed source file within a channel.
pub const SOURCE_FILE: &str = "main.json";

/// The unit of persistence for a project's editor content.
///
/// A bundle is always replaced as a whole: callers never field-merge one
/// into another. `source` stays `None` until the editor has produced a
/// baseline, which is what gates the first autosave cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBundle {
    pub source: Option<String>,
    pub html: Option<String>,
    /// Serialized animation list; opaque to the sync layer. `Null` means
    /// absent, so a missing field and an explicit null unpack identically.
    #[serde(default)]
    pub animations: Value,
    #[serde(default)]
    pub maker_apis_enabled: bool,
}

/// Error packing or unpacking a source bundle.
#[derive(Debug, thiserror::Error)]
#[error("malformed source bundle: {0}")]
pub struct PackError(#[from] serde_json::Error);

impl SourceBundle {
    /// Deterministic transport representation for upload and diffing.
    pub fn pack(&self) -> Result<String, PackError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Inverse of [`pack`](Self::pack). Callers that cannot fail the overall
    /// load substitute [`SourceBundle::fallback`] on error.
    pub fn unpack(data: &str) -> Result<SourceBundle, PackError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Empty default used when the stored source cannot be fetched or
    /// parsed.
    pub fn fallback() -> SourceBundle {
        SourceBundle {
            source: Some(String::new()),
            html: Some(String::new()),
            animations: Value::String(String::new()),
            maker_apis_enabled: false,
        }
    }

    pub fn has_html(&self) -> bool {
        self.html.as_deref().is_some_and(|h| !h.is_empty())
    }
}
