//! Page context
//!
//! Flags the embedding page declares about itself. These are inputs to the
//! sync layer, fixed for the lifetime of a page load except for the fields
//! the load pipeline fills in from the URL (`action`, `pinned_version`).

use crate::route::ProjectAction;

/// Declared context of the embedding page.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Declared app type, e.g. `applab`, `gamelab`, `turtle`, `studio`.
    pub app: String,

    /// Skin for `studio` levels; some skins are not remixable.
    pub skin_id: Option<String>,

    /// `studio` levels with the contract editor map to the algebra game.
    pub use_contract_editor: bool,

    /// Whether the current level is a project level (a `/projects` URL).
    pub is_project_level: bool,

    /// Channel id when the page is channel-backed without being a project
    /// level (e.g. a script level with project storage).
    pub channel_backed: Option<String>,

    /// Script context, if any. Inside a script the viewer is always either
    /// the student or their teacher, so moderation hiding never applies.
    pub script_id: Option<String>,

    /// Not a security setting; only widens what the client is willing to
    /// render.
    pub is_admin: bool,

    /// Level flag that forces Maker APIs on for projects created from the
    /// maker template.
    pub makerlab_enabled: bool,

    /// Legacy share page for a standalone app.
    pub is_legacy_share: bool,

    /// Action segment of the current URL; filled in during load.
    pub action: Option<ProjectAction>,

    /// `version` query parameter, pinning a read-only historical source;
    /// filled in during load.
    pub pinned_version: Option<String>,
}

impl PageContext {
    pub fn in_script_context(&self) -> bool {
        self.script_id.is_some()
    }

    pub fn version_pinned(&self) -> bool {
        self.pinned_version.is_some()
    }
}
