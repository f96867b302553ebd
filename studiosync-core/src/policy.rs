//! Visibility policy
//!
//! Pure predicates over [`ProjectState`] and [`PageContext`] that the host
//! UI consults to decide whether the project is editable and whether it
//! should be hidden behind an abuse or policy-violation notice.

use crate::route::ProjectAction;
use crate::types::{PageContext, ProjectState};

/// Number of abuse reports at which a project is hidden from viewers.
pub const ABUSE_THRESHOLD: u32 = 10;

/// Is the current project (if any) editable by the current actor (if any)?
///
/// Pinning a historical version in the URL always forces read-only.
pub fn is_editable(state: &ProjectState, ctx: &PageContext) -> bool {
    state.channel.is_some() && state.is_owner() && !state.is_frozen() && !ctx.version_pinned()
}

/// Whether the project has been reported often enough to exceed the
/// hiding threshold.
pub fn exceeds_abuse_threshold(state: &ProjectState) -> bool {
    state.abuse_score() >= ABUSE_THRESHOLD
}

/// Whether to show the project regardless of its abuse rating or policy
/// violations.
///
/// Inside a script the viewer is always the student or their teacher, so
/// hiding never applies. Owners and admins on an edit or view page also see
/// the project (with an alert, rendered by the host) instead of the notice.
pub fn show_despite_moderation(state: &ProjectState, ctx: &PageContext) -> bool {
    if ctx.in_script_context() {
        return true;
    }
    let has_edit_permissions = state.is_owner() || ctx.is_admin;
    let is_edit_or_view_page = matches!(
        ctx.action,
        Some(ProjectAction::Edit) | Some(ProjectAction::View)
    );
    has_edit_permissions && is_edit_or_view_page
}

/// Show the abuse notice instead of the project?
pub fn hide_for_abuse(state: &ProjectState, ctx: &PageContext) -> bool {
    !show_despite_moderation(state, ctx) && exceeds_abuse_threshold(state)
}

/// Show the policy-violation notice instead of the project?
pub fn hide_for_policy_violation(state: &ProjectState, ctx: &PageContext) -> bool {
    !show_despite_moderation(state, ctx) && state.has_privacy_profanity_violation()
}
