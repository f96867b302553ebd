//! Per-session project state
//!
//! One [`ProjectState`] exists per editing session and is passed explicitly
//! to everything that needs it. It owns the current channel record, the
//! current source bundle and the flags that gate saving and rendering.

use super::channel::Channel;
use super::sources::SourceBundle;

/// Whether the first successful save of this session has completed.
///
/// One-way transition: once `Saved`, never reset for the lifetime of the
/// session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaveState {
    #[default]
    NotSaved,
    Saved,
}

/// Mutable record of the currently open project.
#[derive(Debug, Default)]
pub struct ProjectState {
    /// Current channel metadata. Absent before the first successful fetch or
    /// create; replaced wholesale on every fetch and save response.
    pub channel: Option<Channel>,

    /// Last-saved (or last-loaded) source bundle.
    pub bundle: SourceBundle,

    /// Opaque version token for the packed source file. Only meaningful
    /// when the channel is migrated to source storage; `None` forces a
    /// brand-new version on the next save.
    pub source_version_id: Option<String>,

    /// Whether the workspace has changed since the last (auto)save.
    pub has_changed_since_last_save: bool,

    /// Whether this session is in edit mode. Resolved once during load and
    /// redirect handling.
    pub is_editing: bool,

    abuse_score: u32,
    has_privacy_profanity_violation: bool,
    save_state: SaveState,
}

impl ProjectState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel.as_ref()?.id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.channel.as_ref()?.name.as_deref()
    }

    /// Set the project name, creating an in-memory channel record if none
    /// exists yet. Empty names are ignored.
    pub fn set_name(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        self.channel
            .get_or_insert_with(Channel::default)
            .name = Some(name.to_string());
    }

    pub fn is_owner(&self) -> bool {
        self.channel
            .as_ref()
            .and_then(|c| c.is_owner)
            .unwrap_or(false)
    }

    /// Owner known to be someone else. Distinct from [`is_owner`](Self::is_owner):
    /// a freshly created local record has unknown ownership and may still be
    /// saved.
    pub fn owned_by_someone_else(&self) -> bool {
        self.channel
            .as_ref()
            .is_some_and(|c| c.is_owner == Some(false))
    }

    pub fn is_frozen(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.frozen)
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.channel.as_ref()?.updated_at.as_deref()
    }

    pub fn use_firebase(&self) -> bool {
        self.channel
            .as_ref()
            .and_then(|c| c.use_firebase)
            .unwrap_or(false)
    }

    pub fn maker_apis_enabled(&self) -> bool {
        self.bundle.maker_apis_enabled
    }

    /// Replace the current channel wholesale (fetch or save response for the
    /// same channel).
    pub fn adopt_channel(&mut self, channel: Channel) {
        self.channel = Some(channel);
    }

    /// Make a different channel current (copy, remix, new). Resets the
    /// source version id: versions never carry across channels.
    pub fn switch_channel(&mut self, channel: Channel) {
        self.channel = Some(channel);
        self.source_version_id = None;
    }

    pub fn abuse_score(&self) -> u32 {
        self.abuse_score
    }

    /// Refresh the abuse score from the server. Monotonic: a lower or
    /// missing score never decreases the local value.
    pub fn record_abuse_score(&mut self, score: u32) {
        self.abuse_score = self.abuse_score.max(score);
    }

    pub fn has_privacy_profanity_violation(&self) -> bool {
        self.has_privacy_profanity_violation
    }

    /// Monotonic OR: a violation can become true but is never reset locally.
    pub fn record_privacy_profanity_violation(&mut self, violated: bool) {
        self.has_privacy_profanity_violation |= violated;
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state
    }

    pub fn mark_saved(&mut self) {
        self.save_state = SaveState::Saved;
    }
}
