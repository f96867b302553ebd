//! Channel records from the channels API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A channel record as returned by the channels API.
///
/// `is_owner` and `updated_at` are populated by the server on fetch, create
/// and update responses. Unknown server fields are kept in `extra` so they
/// survive an update round trip untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether the current actor owns this channel. Absent on records that
    /// have not yet round-tripped through the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<bool>,

    #[serde(default)]
    pub frozen: bool,

    /// Hidden channels do not show up in the owner's project list.
    #[serde(default)]
    pub hidden: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Path where this particular app type is hosted, e.g. `/projects/applab`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Whether the packed source bundle for this channel lives in the
    /// sources API. Channels created before source storage moved there have
    /// this unset and are assumed to have an empty source.
    #[serde(default)]
    pub migrated_to_s3: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_firebase: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Channel {
    /// Remove identity fields before creating a copy of this channel.
    pub fn strip_identity(&mut self) {
        self.id = None;
        self.hidden = false;
        self.updated_at = None;
    }

    /// Drop legacy inline source fields that some older channel records
    /// still carry. Source content only ever comes from the sources API.
    pub fn strip_legacy_source_fields(&mut self) {
        self.extra.remove("levelSource");
        self.extra.remove("levelHtml");
        self.extra.remove("html");
    }
}

/// Abuse report for a channel (`GET <id>/abuse`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AbuseReport {
    #[serde(default)]
    pub abuse_score: u32,
}

/// Privacy/profanity moderation report for a channel
/// (`GET <id>/privacy-profanity`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrivacyProfanityReport {
    /// The server reports this as `0` or `true`.
    #[serde(default)]
    pub has_violation: Value,
}

impl PrivacyProfanityReport {
    pub fn violated(&self) -> bool {
        match &self.has_violation {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            _ => false,
        }
    }
}
