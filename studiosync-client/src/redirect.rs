//! Redirect policy
//!
//! Runs once before the rest of the module initializes. Decides whether the
//! browser location must be rewritten: hash-style project URLs get a hard
//! navigation (halting initialization for this page load), and the edit/view
//! action segment is swapped in place to match what the current actor may
//! actually do.

use studiosync_core::policy::is_editable;
use studiosync_core::route::{PageUrl, ProjectAction, Route};
use studiosync_core::types::{PageContext, ProjectState};

/// Outcome of the redirect check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// Hard navigation; abandon initialization for this page load.
    HardNavigate(String),

    /// Soft in-place rewrite via history, flipping the session flags.
    Rewrite {
        url: String,
        editing: bool,
        readonly_workspace: bool,
    },

    /// URL already stable.
    Stay,
}

pub struct RedirectGuard;

impl RedirectGuard {
    /// Full check: hash normalization first (terminal when it fires), then
    /// the edit/view swap.
    pub fn check(url: &PageUrl, state: &ProjectState, ctx: &PageContext) -> RedirectDecision {
        if let Some(rewritten) = Self::from_hash_url(url) {
            return RedirectDecision::HardNavigate(rewritten);
        }
        Self::edit_view(url, state, ctx)
    }

    /// Hash-based project URLs are rewritten to path form and hard-navigated.
    pub fn from_hash_url(url: &PageUrl) -> Option<String> {
        let rewritten = url.href().replacen('#', "/", 1);
        (rewritten != url.href()).then_some(rewritten)
    }

    /// If the current actor owns the project, `/view` becomes `/edit`; if
    /// they do not, `/edit` becomes `/view` with a read-only workspace.
    /// No-op before a channel has loaded.
    pub fn edit_view(url: &PageUrl, state: &ProjectState, ctx: &PageContext) -> RedirectDecision {
        let route = Route::parse(url);
        let Some(action) = route.as_project().and_then(|p| p.action.as_ref()) else {
            return RedirectDecision::Stay;
        };
        if state.channel.is_none() {
            return RedirectDecision::Stay;
        }

        let editable = is_editable(state, ctx);
        let rewrite = match action {
            ProjectAction::View if editable => Some((swap_action(url, "view", "edit"), true, false)),
            ProjectAction::Edit if !editable => {
                Some((swap_action(url, "edit", "view"), false, true))
            }
            _ => None,
        };

        match rewrite {
            Some((new_url, editing, readonly_workspace)) if new_url != url.href() => {
                RedirectDecision::Rewrite {
                    url: new_url,
                    editing,
                    readonly_workspace,
                }
            }
            _ => RedirectDecision::Stay,
        }
    }
}

fn swap_action(url: &PageUrl, from: &str, to: &str) -> String {
    let pattern = regex::Regex::new(r"(/projects/[^/]+/[^/]+)/(view|edit)").unwrap();
    pattern
        .replace(url.href(), |captures: &regex::Captures| {
            if &captures[2] == from {
                format!("{}/{to}", &captures[1])
            } else {
                captures[0].to_string()
            }
        })
        .into_owned()
}
