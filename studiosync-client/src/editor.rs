//! Host-editor seam
//!
//! The sync layer never reads editor internals directly; the embedding
//! editor implements [`SourceHandler`] and the coordinator collects content
//! through it. Source and animation reads are asynchronous because some
//! editors produce them lazily; the html and maker-flag reads are cheap and
//! synchronous.

use std::future::Future;

use serde_json::Value;

/// Callbacks provided by the embedding editor.
pub trait SourceHandler {
    /// Current program source. May be expensive for block-based editors.
    fn level_source(&self) -> impl Future<Output = anyhow::Result<String>> + Send;

    /// Current design-mode html, if this editor has any.
    fn level_html(&self) -> Option<String>;

    /// Current serialized animation list.
    fn animation_list(&self) -> impl Future<Output = anyhow::Result<Value>> + Send;

    fn maker_apis_enabled(&self) -> bool;

    /// Snapshot any editor-held resources before a remix save.
    fn prepare_for_remix(&self) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Whether a drag-and-drop interaction is currently in progress; the
    /// scheduler never saves mid-drag.
    fn drag_in_progress(&self) -> bool {
        false
    }

    /// Whether source reads are expensive enough that autosave should only
    /// collect after a change event has fired (block-based editors), as
    /// opposed to collecting every cycle (text editors).
    fn tracks_workspace_changes(&self) -> bool {
        true
    }

    fn set_initial_level_source(&mut self, _source: &str) {}
    fn set_initial_level_html(&mut self, _html: &str) {}
    fn set_initial_animation_list(&mut self, _animations: &Value) {}
    fn set_maker_apis_enabled(&mut self, _enabled: bool) {}
}
