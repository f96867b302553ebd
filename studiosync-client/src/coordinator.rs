//! Save coordination
//!
//! Orchestrates the collect -> diff -> write-source -> write-metadata
//! pipeline and the operations built on top of it (rename, freeze, copy,
//! remix, delete), plus the load pipeline that populates the session state
//! on page entry.
//!
//! Navigation is never performed here. Operations that change the browser
//! location return a [`Navigation`] decision for the host to apply, which
//! keeps every flow testable without a browser.

use tokio::sync::watch;

use studiosync_core::app_type::{app_to_project_url, project_path, AppTypeError, StandaloneApp};
use studiosync_core::route::{creation_url, PageUrl, ProjectAction, Route};
use studiosync_core::types::{
    Channel, PackError, PageContext, ProjectState, SourceBundle, SOURCE_FILE,
};

use crate::api::{Api, ApiError};
use crate::editor::SourceHandler;
use crate::redirect::{RedirectDecision, RedirectGuard};

/// User-visible save status, broadcast over a watch channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    /// Saved; carries the server's updated-at timestamp when known.
    Saved {
        at: Option<String>,
    },
    Failed(String),
}

/// Error types for save and load operations.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// Guard against accidental data loss: an existing non-empty html must
    /// never be overwritten by an empty one.
    #[error("refusing to overwrite existing html with an empty payload")]
    HtmlWipe,

    #[error("no current channel")]
    NoChannel,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    AppType(#[from] AppTypeError),

    #[error("editor callback failed: {0}")]
    Handler(#[source] anyhow::Error),
}

/// A location change the host must apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Soft history push; the page keeps running.
    PushHistory(String),
    /// Hard navigation; the page is abandoned.
    HardNavigate(String),
}

/// Result of a copy operation.
#[derive(Debug)]
pub struct CopyOutcome {
    pub channel: Channel,
    pub navigation: Navigation,
}

/// Result of the load pipeline.
#[derive(Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Page is not project-backed; nothing to load.
    NotProjectBacked,
    /// A hard navigation is required; initialization must halt.
    Redirect(String),
    Loaded,
}

/// Orchestrates saving and loading for one editing session.
pub struct SaveCoordinator<H: SourceHandler> {
    api: Api,
    handler: H,
    state: ProjectState,
    ctx: PageContext,
    url: PageUrl,
    status_tx: watch::Sender<SaveStatus>,
}

impl<H: SourceHandler> SaveCoordinator<H> {
    pub fn new(api: Api, handler: H, ctx: PageContext, url: PageUrl) -> Self {
        let (status_tx, _) = watch::channel(SaveStatus::default());
        Self {
            api,
            handler,
            state: ProjectState::new(),
            ctx,
            url,
            status_tx,
        }
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ProjectState {
        &mut self.state
    }

    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    pub fn url(&self) -> &PageUrl {
        &self.url
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Subscribe to save-status updates.
    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.status_tx.subscribe()
    }

    /// Record a workspace change; the next autosave cycle will collect.
    pub fn note_project_changed(&mut self) {
        self.state.has_changed_since_last_save = true;
    }

    pub fn has_owner_changed_project(&self) -> bool {
        self.state.is_owner() && self.state.has_changed_since_last_save
    }

    // ------------------------------------------------------------------
    // Save pipeline
    // ------------------------------------------------------------------

    /// Save the current editor content, collecting it from the handler.
    pub async fn save(&mut self, force_new_version: bool) -> Result<Option<Channel>, SaveError> {
        self.save_with(None, force_new_version, false).await
    }

    /// Full save entry point.
    ///
    /// Skips silently when the channel is known to belong to someone else.
    /// When no bundle is supplied, one is collected from the handler; a
    /// remix save snapshots editor resources first.
    pub async fn save_with(
        &mut self,
        bundle: Option<SourceBundle>,
        force_new_version: bool,
        preparing_remix: bool,
    ) -> Result<Option<Channel>, SaveError> {
        if self.state.owned_by_someone_else() {
            return Ok(None);
        }

        let _ = self.status_tx.send(SaveStatus::Saving);

        let bundle = match bundle {
            Some(bundle) => bundle,
            None => {
                if preparing_remix {
                    self.handler
                        .prepare_for_remix()
                        .await
                        .map_err(SaveError::Handler)?;
                }
                self.collect_bundle().await?
            }
        };

        if force_new_version {
            self.state.source_version_id = None;
        }

        match self.write_bundle(bundle).await {
            Ok(channel) => {
                let _ = self.status_tx.send(SaveStatus::Saved {
                    at: channel.updated_at.clone(),
                });
                Ok(Some(channel))
            }
            Err(err) => {
                let _ = self.status_tx.send(SaveStatus::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Gather the four-field bundle from the editor: animations, then
    /// source, then the cheap html and maker-flag reads.
    async fn collect_bundle(&mut self) -> Result<SourceBundle, SaveError> {
        let animations = self
            .handler
            .animation_list()
            .await
            .map_err(SaveError::Handler)?;
        let source = self
            .handler
            .level_source()
            .await
            .map_err(SaveError::Handler)?;
        Ok(SourceBundle {
            source: Some(source),
            html: self.handler.level_html(),
            animations,
            maker_apis_enabled: self.handler.maker_apis_enabled(),
        })
    }

    /// Write the bundle to the sources API, then the channel metadata to the
    /// channels API, adopting the responses.
    async fn write_bundle(&mut self, bundle: SourceBundle) -> Result<Channel, SaveError> {
        let channel_id = self
            .state
            .channel_id()
            .map(str::to_string)
            .ok_or(SaveError::NoChannel)?;

        if self.state.bundle.has_html() && !bundle.has_html() {
            return Err(SaveError::HtmlWipe);
        }

        self.state.bundle = bundle;
        if let (Some(app), Some(channel)) = (
            StandaloneApp::for_page(&self.ctx),
            self.state.channel.as_mut(),
        ) {
            channel.level = Some(app.project_url());
        }

        let body = self.state.bundle.pack()?;
        let put = self
            .api
            .sources
            .put(
                &channel_id,
                body,
                SOURCE_FILE,
                self.state.source_version_id.as_deref(),
            )
            .await?;
        self.state.source_version_id = Some(put.version_id);

        let payload = match self.state.channel.as_mut() {
            Some(channel) => {
                channel.migrated_to_s3 = true;
                channel.clone()
            }
            None => return Err(SaveError::NoChannel),
        };
        let updated = self.api.channels.update(&channel_id, &payload).await?;
        self.state.adopt_channel(updated.clone());
        self.state.mark_saved();
        Ok(updated)
    }

    /// Explicitly clear the html, circumventing the wipe guard.
    pub fn clear_html(&mut self) {
        self.state.bundle.html = Some(String::new());
    }

    // ------------------------------------------------------------------
    // Autosave
    // ------------------------------------------------------------------

    /// One autosave cycle. Completing without a network write is success:
    /// no baseline yet, no change since the last cycle (for editors that
    /// track changes), a drag in progress, or identical content all count.
    pub async fn autosave(&mut self) -> Result<(), SaveError> {
        if self.state.bundle.source.is_none() {
            return Ok(());
        }
        if self.handler.tracks_workspace_changes() && !self.state.has_changed_since_last_save {
            return Ok(());
        }
        if self.handler.drag_in_progress() {
            return Ok(());
        }

        let fresh = self.collect_bundle().await?;
        if fresh.pack()? == self.state.bundle.pack()? {
            self.state.has_changed_since_last_save = false;
            return Ok(());
        }

        self.save_with(Some(fresh), false, false).await?;
        self.state.has_changed_since_last_save = false;
        Ok(())
    }

    /// Collect the initial program source as the autosave baseline once the
    /// editor has initialized.
    pub async fn establish_baseline(&mut self) -> Result<(), SaveError> {
        let source = self
            .handler
            .level_source()
            .await
            .map_err(SaveError::Handler)?;
        self.state.bundle.source = Some(source);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Operations on top of save
    // ------------------------------------------------------------------

    /// Rename and save.
    pub async fn rename(&mut self, new_name: &str) -> Result<Option<Channel>, SaveError> {
        self.state.set_name(new_name);
        self.save(false).await
    }

    /// Freeze and hide the project, save, then re-evaluate the edit/view
    /// redirect (a frozen project is no longer editable).
    pub async fn freeze(&mut self) -> Result<(Option<Channel>, RedirectDecision), SaveError> {
        {
            let channel = self.state.channel.as_mut().ok_or(SaveError::NoChannel)?;
            channel.frozen = true;
            channel.hidden = true;
        }
        let saved = self.save(false).await?;
        let decision = RedirectGuard::edit_view(&self.url, &self.state, &self.ctx);
        self.apply_redirect(&decision);
        Ok((saved, decision))
    }

    /// Create a copy of the project under a new name and make it current,
    /// then save the (unchanged) source bundle into it and copy assets and
    /// animations over from the source channel.
    pub async fn copy(&mut self, new_name: &str) -> Result<CopyOutcome, SaveError> {
        let src_channel = self
            .state
            .channel_id()
            .map(str::to_string)
            .ok_or(SaveError::NoChannel)?;

        let mut draft = self.state.channel.clone().ok_or(SaveError::NoChannel)?;
        draft.strip_identity();
        draft.name = Some(new_name.to_string());

        let created = self.api.channels.create(&draft).await?;
        let navigation = self.adopt_new_channel(created)?;
        let channel = match self.save(false).await? {
            Some(channel) => channel,
            None => self.state.channel.clone().ok_or(SaveError::NoChannel)?,
        };

        // Asset and animation copies ride along; their failures are surfaced
        // but never fail the copy itself.
        if let Some(dest) = self.state.channel_id().map(str::to_string) {
            if let Err(err) = self.api.assets.copy_all(&src_channel, &dest).await {
                tracing::error!("failed to copy assets from {src_channel}: {err}");
                let _ = self
                    .status_tx
                    .send(SaveStatus::Failed("error copying files".to_string()));
            }
            self.copy_animations(&src_channel, &dest).await;
        }

        Ok(CopyOutcome { channel, navigation })
    }

    async fn copy_animations(&mut self, _src_channel: &str, _dest_channel: &str) {
        // TODO: copy animation assets once they move to their own resource;
        // today they live inside the packed source bundle and travel with it.
    }

    /// Adopt a newly created channel as current. If we are already editing
    /// at an app-scoped URL the history entry is rewritten in place;
    /// otherwise (e.g. remixing from inside a script) a hard navigation to
    /// the new edit URL is required.
    fn adopt_new_channel(&mut self, channel: Channel) -> Result<Navigation, SaveError> {
        self.state.switch_channel(channel);
        let id = self.state.channel_id().ok_or(SaveError::NoChannel)?;
        let edit_path = project_path(&self.ctx, id, Some("edit"))?;

        let at_app_url = Route::parse(&self.url)
            .as_project()
            .is_some_and(|p| p.app_name.is_some());
        let navigation = if self.state.is_editing && at_app_url {
            Navigation::PushHistory(edit_path)
        } else {
            Navigation::HardNavigate(edit_path)
        };
        if let Navigation::PushHistory(url) = &navigation {
            self.url.set_href(url.clone());
        }
        Ok(navigation)
    }

    /// Hand off to the server-side remix endpoint. Owners save first (with
    /// a remix snapshot); everyone else is redirected immediately.
    pub async fn server_side_remix(&mut self) -> Result<Navigation, SaveError> {
        if self.state.channel.is_some() && self.state.name().map_or(true, str::is_empty) {
            if let Some(name) =
                StandaloneApp::for_page(&self.ctx).and_then(|app| app.default_project_name())
            {
                self.state.set_name(name);
            }
        }
        let id = self
            .state
            .channel_id()
            .map(str::to_string)
            .ok_or(SaveError::NoChannel)?;
        let remix_url = project_path(&self.ctx, &id, Some("remix"))?;
        if self.state.is_owner() {
            self.save_with(None, false, true).await?;
        }
        Ok(Navigation::HardNavigate(remix_url))
    }

    /// Save, then navigate to the app's new-project page.
    pub async fn create_new(&mut self) -> Result<Navigation, SaveError> {
        let url = format!("{}/new", app_to_project_url(&self.ctx)?);
        self.save(false).await?;
        Ok(Navigation::HardNavigate(url))
    }

    /// Delete the channel. No local state cleanup: the page is expected to
    /// navigate away.
    pub async fn delete(&mut self) -> Result<(), SaveError> {
        let id = self
            .state
            .channel_id()
            .map(str::to_string)
            .ok_or(SaveError::NoChannel)?;
        self.api.channels.delete(&id).await?;
        Ok(())
    }

    /// Admin-only: clear the channel's abuse record and zero the abuse
    /// score on every asset.
    pub async fn admin_reset_abuse_score(&mut self) -> Result<(), SaveError> {
        let id = self
            .state
            .channel_id()
            .map(str::to_string)
            .ok_or(SaveError::NoChannel)?;
        self.api.channels.delete_abuse(&id).await?;
        self.api.assets.patch_all(&id, "abuse_score=0").await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Load pipeline
    // ------------------------------------------------------------------

    /// Populate the session from the remote: redirect checks first, then
    /// channel metadata, then the packed source, then moderation state.
    pub async fn load(&mut self) -> Result<LoadOutcome, SaveError> {
        if self.ctx.is_project_level {
            match RedirectGuard::check(&self.url, &self.state, &self.ctx) {
                RedirectDecision::HardNavigate(url) => return Ok(LoadOutcome::Redirect(url)),
                decision => self.apply_redirect(&decision),
            }

            let route = Route::parse(&self.url).as_project().cloned().unwrap_or_default();
            self.ctx.action = route.action.clone();
            self.ctx.pinned_version = self.url.query_param("version").map(str::to_string);

            let Some(channel_id) = route.channel_id else {
                self.state.is_editing = true;
                return Ok(LoadOutcome::Loaded);
            };

            if route.action == Some(ProjectAction::Edit) {
                self.state.is_editing = true;
            }

            let mut channel = match self.api.channels.fetch(&channel_id).await {
                Ok(channel) => channel,
                Err(err) => {
                    // Project not found; send the user to the new-project
                    // experience rather than failing the page.
                    tracing::warn!("channel {channel_id} not found, redirecting: {err}");
                    return Ok(LoadOutcome::Redirect(creation_url(&self.url)));
                }
            };
            channel.strip_legacy_source_fields();
            self.state.adopt_channel(channel);

            self.fetch_source().await;
            if self.state.is_owner() && route.action == Some(ProjectAction::View) {
                self.state.is_editing = true;
            }
            self.apply_maker_overrides();
            self.fetch_abuse_and_privacy().await;
            // Re-run the edit/view check now that ownership is known: owners
            // on /view are promoted to /edit, everyone else on /edit is
            // demoted to a read-only /view.
            let decision = RedirectGuard::edit_view(&self.url, &self.state, &self.ctx);
            self.apply_redirect(&decision);
            Ok(LoadOutcome::Loaded)
        } else if let Some(channel_id) = self.ctx.channel_backed.clone() {
            self.state.is_editing = true;
            self.ctx.pinned_version = self.url.query_param("version").map(str::to_string);
            let mut channel = self.api.channels.fetch(&channel_id).await?;
            channel.strip_legacy_source_fields();
            self.state.adopt_channel(channel);
            self.fetch_source().await;
            self.apply_maker_overrides();
            self.fetch_abuse_and_privacy().await;
            Ok(LoadOutcome::Loaded)
        } else {
            Ok(LoadOutcome::NotProjectBacked)
        }
    }

    /// Push the loaded bundle into the editor. Editing without a channel is
    /// a brand-new project and gets the default name; a legacy share page
    /// for a standalone app gets the untitled placeholder.
    pub fn seed_editor(&mut self) {
        if !self.ctx.is_project_level && self.ctx.channel_backed.is_none() {
            if self.ctx.is_legacy_share && StandaloneApp::for_page(&self.ctx).is_some() {
                self.state.set_name("Untitled Project");
            }
            return;
        }
        let bundle = self.state.bundle.clone();
        if let Some(html) = bundle.html.as_deref().filter(|h| !h.is_empty()) {
            self.handler.set_initial_level_html(html);
        }
        if bundle.maker_apis_enabled {
            self.handler.set_maker_apis_enabled(true);
        }
        if !bundle.animations.is_null() {
            self.handler.set_initial_animation_list(&bundle.animations);
        }
        if self.state.is_editing {
            if self.state.channel.is_some() {
                if let Some(source) = bundle.source.as_deref().filter(|s| !s.is_empty()) {
                    self.handler.set_initial_level_source(source);
                }
            } else {
                self.state.set_name("My Project");
            }
        } else if self.state.channel.is_some() {
            if let Some(source) = bundle.source.as_deref() {
                self.handler.set_initial_level_source(source);
            }
        }
    }

    /// Fetch the packed source for the current channel. Channels that never
    /// migrated to source storage are assumed empty; fetch or parse
    /// failures substitute the fallback bundle rather than failing the load.
    async fn fetch_source(&mut self) {
        let Some(channel) = self.state.channel.as_ref() else {
            return;
        };
        if !channel.migrated_to_s3 {
            return;
        }
        let Some(id) = channel.id.clone() else {
            return;
        };
        let version = self.ctx.pinned_version.clone();
        match self
            .api
            .sources
            .fetch(&id, SOURCE_FILE, version.as_deref())
            .await
        {
            Ok(body) => match SourceBundle::unpack(&body) {
                Ok(bundle) => self.state.bundle = bundle,
                Err(err) => {
                    tracing::warn!("malformed project source file: {err}");
                    self.state.bundle = SourceBundle::fallback();
                }
            },
            Err(err) => {
                tracing::warn!("unable to fetch project source file: {err}");
                self.state.bundle = SourceBundle::fallback();
            }
        }
    }

    /// Level flags and query markers can force the maker-API flag either
    /// way; the query wins over the level.
    fn apply_maker_overrides(&mut self) {
        if self.ctx.makerlab_enabled {
            self.state.bundle.maker_apis_enabled = true;
        }
        if self.url.has_query_param("enableMaker") {
            self.state.bundle.maker_apis_enabled = true;
        }
        if self.url.has_query_param("disableMaker") {
            self.state.bundle.maker_apis_enabled = false;
        }
    }

    /// Fetch the abuse score, and for playlab projects the privacy/
    /// profanity status, in parallel. Failures are surfaced to monitoring
    /// but never block the load; the session keeps its defaults.
    async fn fetch_abuse_and_privacy(&mut self) {
        let Some(id) = self.state.channel_id().map(str::to_string) else {
            return;
        };
        let check_privacy =
            StandaloneApp::for_page(&self.ctx) == Some(StandaloneApp::Playlab);

        let abuse = self.api.channels.fetch_abuse(&id);
        if check_privacy {
            let privacy = self.api.channels.fetch_privacy_profanity(&id);
            let (abuse, privacy) = tokio::join!(abuse, privacy);
            match abuse {
                Ok(report) => self.state.record_abuse_score(report.abuse_score),
                Err(err) => tracing::error!("failed to fetch abuse score: {err}"),
            }
            match privacy {
                Ok(report) => self.state.record_privacy_profanity_violation(report.violated()),
                Err(err) => tracing::error!("failed to fetch privacy-profanity status: {err}"),
            }
        } else {
            match abuse.await {
                Ok(report) => self.state.record_abuse_score(report.abuse_score),
                Err(err) => tracing::error!("failed to fetch abuse score: {err}"),
            }
        }
    }

    fn apply_redirect(&mut self, decision: &RedirectDecision) {
        if let RedirectDecision::Rewrite { url, editing, .. } = decision {
            self.url.set_href(url.clone());
            self.state.is_editing = *editing;
        }
    }
}
