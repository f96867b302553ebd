//! Standalone-app mapping
//!
//! Maps the page's declared app type to the standalone app (if any) capable
//! of running the project on its own `/projects/<app>` page. Projects with
//! no standalone app cannot be remixed or opened outside their level.

use crate::types::PageContext;

/// Studio skins whose projects cannot be remixed as standalone apps.
pub const NON_REMIXABLE_SKINS: [&str; 4] = ["hoc2015", "infinity", "gumball", "iceage"];

/// The standalone app hosting a project type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandaloneApp {
    Applab,
    Gamelab,
    Artist,
    Calc,
    Eval,
    AlgebraGame,
    Playlab,
    Weblab,
}

/// Error types for standalone-app resolution.
#[derive(Debug, thiserror::Error)]
pub enum AppTypeError {
    #[error("this type of project cannot be run as a standalone app")]
    NotStandalone,
}

impl StandaloneApp {
    /// The standalone app for the current page, or `None` if this project
    /// type has no standalone form.
    pub fn for_page(ctx: &PageContext) -> Option<StandaloneApp> {
        match ctx.app.as_str() {
            "applab" => Some(StandaloneApp::Applab),
            "gamelab" => Some(StandaloneApp::Gamelab),
            "turtle" => Some(StandaloneApp::Artist),
            "calc" => Some(StandaloneApp::Calc),
            "eval" => Some(StandaloneApp::Eval),
            "studio" => {
                if ctx.use_contract_editor {
                    Some(StandaloneApp::AlgebraGame)
                } else if ctx
                    .skin_id
                    .as_deref()
                    .is_some_and(|skin| NON_REMIXABLE_SKINS.contains(&skin))
                {
                    None
                } else {
                    Some(StandaloneApp::Playlab)
                }
            }
            "weblab" => Some(StandaloneApp::Weblab),
            _ => None,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            StandaloneApp::Applab => "applab",
            StandaloneApp::Gamelab => "gamelab",
            StandaloneApp::Artist => "artist",
            StandaloneApp::Calc => "calc",
            StandaloneApp::Eval => "eval",
            StandaloneApp::AlgebraGame => "algebra_game",
            StandaloneApp::Playlab => "playlab",
            StandaloneApp::Weblab => "weblab",
        }
    }

    /// Path to the app's standalone project page, e.g. `/projects/applab`.
    pub fn project_url(&self) -> String {
        format!("/projects/{}", self.slug())
    }

    /// Default name assigned to an unnamed project before a server-side
    /// remix, if this app type has one.
    pub fn default_project_name(&self) -> Option<&'static str> {
        match self {
            StandaloneApp::AlgebraGame => Some("Big Game Template"),
            StandaloneApp::Applab | StandaloneApp::Gamelab | StandaloneApp::Weblab => {
                Some("My Project")
            }
            _ => None,
        }
    }
}

/// Path to the standalone project page for the current page's app type.
pub fn app_to_project_url(ctx: &PageContext) -> Result<String, AppTypeError> {
    StandaloneApp::for_page(ctx)
        .map(|app| app.project_url())
        .ok_or(AppTypeError::NotStandalone)
}

/// URL path performing `action` on the given channel of the current app
/// type, e.g. `/projects/applab/<id>/edit`.
pub fn project_path(
    ctx: &PageContext,
    channel_id: &str,
    action: Option<&str>,
) -> Result<String, AppTypeError> {
    let mut path = format!("{}/{channel_id}", app_to_project_url(ctx)?);
    if let Some(action) = action {
        path.push('/');
        path.push_str(action);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(app: &str) -> PageContext {
        PageContext {
            app: app.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_direct_mappings() {
        assert_eq!(
            StandaloneApp::for_page(&page("applab")),
            Some(StandaloneApp::Applab)
        );
        assert_eq!(
            StandaloneApp::for_page(&page("turtle")),
            Some(StandaloneApp::Artist)
        );
        assert_eq!(
            StandaloneApp::for_page(&page("weblab")),
            Some(StandaloneApp::Weblab)
        );
        assert_eq!(StandaloneApp::for_page(&page("maze")), None);
    }

    #[test]
    fn test_studio_contract_editor_maps_to_algebra_game() {
        let mut ctx = page("studio");
        ctx.use_contract_editor = true;
        // The contract editor wins even over a denylisted skin.
        ctx.skin_id = Some("hoc2015".to_string());
        assert_eq!(
            StandaloneApp::for_page(&ctx),
            Some(StandaloneApp::AlgebraGame)
        );
    }

    #[test]
    fn test_studio_denylisted_skin_has_no_standalone_app() {
        let mut ctx = page("studio");
        ctx.skin_id = Some("gumball".to_string());
        assert_eq!(StandaloneApp::for_page(&ctx), None);
        assert!(matches!(
            app_to_project_url(&ctx),
            Err(AppTypeError::NotStandalone)
        ));
        assert!(project_path(&ctx, "abc", Some("remix")).is_err());
    }

    #[test]
    fn test_studio_default_is_playlab() {
        let mut ctx = page("studio");
        ctx.skin_id = Some("studio".to_string());
        assert_eq!(StandaloneApp::for_page(&ctx), Some(StandaloneApp::Playlab));
    }

    #[test]
    fn test_project_path() {
        let ctx = page("applab");
        assert_eq!(
            project_path(&ctx, "abc", Some("edit")).unwrap(),
            "/projects/applab/abc/edit"
        );
        assert_eq!(project_path(&ctx, "abc", None).unwrap(), "/projects/applab/abc");
    }

    #[test]
    fn test_default_project_names() {
        assert_eq!(
            StandaloneApp::AlgebraGame.default_project_name(),
            Some("Big Game Template")
        );
        assert_eq!(
            StandaloneApp::Gamelab.default_project_name(),
            Some("My Project")
        );
        assert_eq!(StandaloneApp::Artist.default_project_name(), None);
    }
}
