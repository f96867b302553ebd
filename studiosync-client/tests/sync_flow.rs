//! End-to-end save/load flows against an in-process stub of the channels,
//! sources and assets APIs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use studiosync_client::api::{Api, ApiConfig};
use studiosync_client::coordinator::{LoadOutcome, Navigation, SaveCoordinator, SaveError};
use studiosync_client::editor::SourceHandler;
use studiosync_core::route::PageUrl;
use studiosync_core::types::{Channel, PageContext, SaveState, SourceBundle};

// ----------------------------------------------------------------------
// Stub API
// ----------------------------------------------------------------------

#[derive(Default)]
struct StubState {
    channels: Mutex<HashMap<String, Value>>,
    sources: Mutex<HashMap<String, String>>,
    abuse_scores: Mutex<HashMap<String, u32>>,
    source_puts: AtomicUsize,
    channel_updates: AtomicUsize,
    channel_creates: AtomicUsize,
    asset_copies: AtomicUsize,
    last_put_version: Mutex<Option<String>>,
}

async fn fetch_channel(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
) -> Response {
    match state.channels.lock().await.get(&id) {
        Some(channel) => Json(channel.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_channel(
    State(state): State<Arc<StubState>>,
    Json(mut channel): Json<Value>,
) -> Response {
    state.channel_creates.fetch_add(1, Ordering::SeqCst);
    let id = uuid::Uuid::new_v4().simple().to_string();
    let fields = channel.as_object_mut().expect("channel body is an object");
    fields.insert("id".to_string(), json!(id));
    fields.insert("isOwner".to_string(), json!(true));
    fields.insert("updatedAt".to_string(), json!("2026-08-26T00:00:00Z"));
    state.channels.lock().await.insert(id, channel.clone());
    Json(channel).into_response()
}

async fn update_channel(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
    Json(mut channel): Json<Value>,
) -> Response {
    state.channel_updates.fetch_add(1, Ordering::SeqCst);
    let fields = channel.as_object_mut().expect("channel body is an object");
    fields.insert("updatedAt".to_string(), json!("2026-08-26T00:00:01Z"));
    state.channels.lock().await.insert(id, channel.clone());
    Json(channel).into_response()
}

async fn delete_channel(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
) -> StatusCode {
    state.channels.lock().await.remove(&id);
    StatusCode::OK
}

async fn fetch_abuse(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
) -> Response {
    let score = state
        .abuse_scores
        .lock()
        .await
        .get(&id)
        .copied()
        .unwrap_or(0);
    Json(json!({ "abuse_score": score })).into_response()
}

async fn fetch_privacy_profanity(Path(_id): Path<String>) -> Response {
    Json(json!({ "has_violation": 0 })).into_response()
}

async fn fetch_source(
    State(state): State<Arc<StubState>>,
    Path((id, _filename)): Path<(String, String)>,
) -> Response {
    match state.sources.lock().await.get(&id) {
        Some(body) => body.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn put_source(
    State(state): State<Arc<StubState>>,
    Path((id, _filename)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    state.source_puts.fetch_add(1, Ordering::SeqCst);
    *state.last_put_version.lock().await = params.get("version").cloned();
    state.sources.lock().await.insert(id, body);
    let version = uuid::Uuid::new_v4().simple().to_string();
    Json(json!({ "versionId": version })).into_response()
}

async fn copy_assets(State(state): State<Arc<StubState>>) -> StatusCode {
    state.asset_copies.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn patch_assets(Path(_id): Path<String>) -> StatusCode {
    StatusCode::OK
}

async fn start_stub(state: Arc<StubState>) -> String {
    let router = Router::new()
        .route("/v3/channels", post(create_channel))
        .route(
            "/v3/channels/:id",
            get(fetch_channel).put(update_channel).delete(delete_channel),
        )
        .route("/v3/channels/:id/abuse", get(fetch_abuse))
        .route("/v3/channels/:id/privacy-profanity", get(fetch_privacy_profanity))
        .route("/v3/sources/:id/:filename", get(fetch_source).put(put_source))
        .route("/v3/assets/copy", post(copy_assets))
        .route("/v3/assets/:id", axum::routing::patch(patch_assets))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

// ----------------------------------------------------------------------
// Test editor
// ----------------------------------------------------------------------

struct TestHandler {
    source: String,
    html: Option<String>,
    animations: Value,
    maker: bool,
    drag: bool,
    remix_preps: AtomicUsize,
}

impl Default for TestHandler {
    fn default() -> Self {
        Self {
            source: "var x = 1;".to_string(),
            html: None,
            animations: Value::Null,
            maker: false,
            drag: false,
            remix_preps: AtomicUsize::new(0),
        }
    }
}

impl SourceHandler for TestHandler {
    async fn level_source(&self) -> anyhow::Result<String> {
        Ok(self.source.clone())
    }

    fn level_html(&self) -> Option<String> {
        self.html.clone()
    }

    async fn animation_list(&self) -> anyhow::Result<Value> {
        Ok(self.animations.clone())
    }

    fn maker_apis_enabled(&self) -> bool {
        self.maker
    }

    async fn prepare_for_remix(&self) -> anyhow::Result<()> {
        self.remix_preps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn drag_in_progress(&self) -> bool {
        self.drag
    }
}

// ----------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------

fn applab_context() -> PageContext {
    PageContext {
        app: "applab".to_string(),
        is_project_level: true,
        ..Default::default()
    }
}

fn stored_channel(id: &str, is_owner: bool, migrated: bool) -> Value {
    json!({
        "id": id,
        "name": "Flappy",
        "isOwner": is_owner,
        "frozen": false,
        "hidden": false,
        "migratedToS3": migrated,
        "updatedAt": "2026-08-25T00:00:00Z"
    })
}

fn handler_bundle(handler: &TestHandler) -> SourceBundle {
    SourceBundle {
        source: Some(handler.source.clone()),
        html: handler.html.clone(),
        animations: handler.animations.clone(),
        maker_apis_enabled: handler.maker,
    }
}

async fn coordinator_for(
    stub: &Arc<StubState>,
    handler: TestHandler,
    url: &str,
) -> SaveCoordinator<TestHandler> {
    let base_url = start_stub(stub.clone()).await;
    SaveCoordinator::new(
        Api::new(ApiConfig { base_url }),
        handler,
        applab_context(),
        PageUrl::new(url),
    )
}

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_save_adopts_version_and_latches() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", true, false));

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    assert_eq!(coordinator.load().await.unwrap(), LoadOutcome::Loaded);
    assert!(coordinator.state().is_editing);
    assert_eq!(coordinator.state().save_state(), SaveState::NotSaved);

    let channel = coordinator.save(false).await.unwrap().expect("saved channel");
    assert!(channel.migrated_to_s3);
    assert!(coordinator.state().source_version_id.is_some());
    assert_eq!(coordinator.state().save_state(), SaveState::Saved);
    assert_eq!(stub.source_puts.load(Ordering::SeqCst), 1);
    assert_eq!(stub.channel_updates.load(Ordering::SeqCst), 1);
    // The first write creates a new version rather than overwriting one.
    assert_eq!(*stub.last_put_version.lock().await, None);

    // A second save overwrites the version adopted from the first.
    let version = coordinator.state().source_version_id.clone();
    coordinator.save(false).await.unwrap();
    assert_eq!(*stub.last_put_version.lock().await, version);
}

#[tokio::test]
async fn test_force_new_version_clears_version_id() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", true, false));

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.load().await.unwrap();
    coordinator.save(false).await.unwrap();
    coordinator.save(true).await.unwrap();
    // The forced save must not have sent the stored version.
    assert_eq!(*stub.last_put_version.lock().await, None);
}

#[tokio::test]
async fn test_save_is_noop_for_non_owner() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", false, false));

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/view",
    )
    .await;
    coordinator.load().await.unwrap();

    let saved = coordinator.save(false).await.unwrap();
    assert!(saved.is_none());
    assert_eq!(stub.source_puts.load(Ordering::SeqCst), 0);
    assert_eq!(stub.channel_updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_html_wipe_guard() {
    let stub = Arc::new(StubState::default());
    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.state_mut().adopt_channel(Channel {
        id: Some("abc".to_string()),
        is_owner: Some(true),
        ..Default::default()
    });
    coordinator.state_mut().bundle.html = Some("<div id=\"screen1\"></div>".to_string());

    let wiping = SourceBundle {
        source: Some("x".to_string()),
        html: Some(String::new()),
        ..Default::default()
    };
    let err = coordinator
        .save_with(Some(wiping), false, false)
        .await
        .unwrap_err();
    assert!(matches!(err, SaveError::HtmlWipe));
    assert_eq!(stub.source_puts.load(Ordering::SeqCst), 0);

    // Explicitly clearing the html first circumvents the guard.
    coordinator.clear_html();
    let wiping = SourceBundle {
        source: Some("x".to_string()),
        html: Some(String::new()),
        ..Default::default()
    };
    coordinator.save_with(Some(wiping), false, false).await.unwrap();
    assert_eq!(stub.source_puts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_autosave_skips_identical_content() {
    let stub = Arc::new(StubState::default());
    let handler = TestHandler::default();
    let baseline = handler_bundle(&handler);

    let mut coordinator = coordinator_for(
        &stub,
        handler,
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.state_mut().adopt_channel(Channel {
        id: Some("abc".to_string()),
        is_owner: Some(true),
        ..Default::default()
    });
    coordinator.state_mut().bundle = baseline;
    coordinator.note_project_changed();

    coordinator.autosave().await.unwrap();
    assert_eq!(stub.source_puts.load(Ordering::SeqCst), 0);
    assert!(!coordinator.state().has_changed_since_last_save);
}

#[tokio::test]
async fn test_autosave_saves_changed_content() {
    let stub = Arc::new(StubState::default());
    let handler = TestHandler::default();
    let mut baseline = handler_bundle(&handler);
    baseline.source = Some("var x = 0;".to_string());

    let mut coordinator = coordinator_for(
        &stub,
        handler,
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.state_mut().adopt_channel(Channel {
        id: Some("abc".to_string()),
        is_owner: Some(true),
        ..Default::default()
    });
    coordinator.state_mut().bundle = baseline;
    coordinator.note_project_changed();

    coordinator.autosave().await.unwrap();
    assert_eq!(stub.source_puts.load(Ordering::SeqCst), 1);
    assert!(!coordinator.state().has_changed_since_last_save);
    assert_eq!(
        coordinator.state().bundle.source.as_deref(),
        Some("var x = 1;")
    );
}

#[tokio::test]
async fn test_autosave_requires_baseline_and_no_drag() {
    let stub = Arc::new(StubState::default());
    let mut handler = TestHandler::default();
    handler.drag = true;
    let baseline = handler_bundle(&handler);

    let mut coordinator = coordinator_for(
        &stub,
        handler,
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.state_mut().adopt_channel(Channel {
        id: Some("abc".to_string()),
        is_owner: Some(true),
        ..Default::default()
    });

    // No baseline source yet: skip as success.
    coordinator.note_project_changed();
    coordinator.autosave().await.unwrap();
    assert_eq!(stub.source_puts.load(Ordering::SeqCst), 0);

    // Baseline present but a drag is in progress: still skip.
    coordinator.state_mut().bundle = baseline;
    coordinator.note_project_changed();
    coordinator.autosave().await.unwrap();
    assert_eq!(stub.source_puts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_load_missing_channel_redirects_to_creation_url() {
    let stub = Arc::new(StubState::default());
    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/missing/view",
    )
    .await;
    assert_eq!(
        coordinator.load().await.unwrap(),
        LoadOutcome::Redirect("/projects/applab".to_string())
    );
}

#[tokio::test]
async fn test_load_fetches_source_and_abuse() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", false, true));
    let stored = SourceBundle {
        source: Some("draw();".to_string()),
        html: Some("<div></div>".to_string()),
        animations: Value::Null,
        maker_apis_enabled: false,
    };
    stub.sources
        .lock()
        .await
        .insert("abc".to_string(), stored.pack().unwrap());
    stub.abuse_scores.lock().await.insert("abc".to_string(), 12);

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/view",
    )
    .await;
    assert_eq!(coordinator.load().await.unwrap(), LoadOutcome::Loaded);
    assert_eq!(coordinator.state().bundle, stored);
    assert_eq!(coordinator.state().abuse_score(), 12);
    assert!(!coordinator.state().is_editing);
}

#[tokio::test]
async fn test_load_substitutes_fallback_for_malformed_source() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", false, true));
    stub.sources
        .lock()
        .await
        .insert("abc".to_string(), "not json".to_string());

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/view",
    )
    .await;
    assert_eq!(coordinator.load().await.unwrap(), LoadOutcome::Loaded);
    assert_eq!(coordinator.state().bundle, SourceBundle::fallback());
}

#[tokio::test]
async fn test_load_unmigrated_channel_assumes_empty_source() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", false, false));

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/view",
    )
    .await;
    assert_eq!(coordinator.load().await.unwrap(), LoadOutcome::Loaded);
    assert_eq!(coordinator.state().bundle, SourceBundle::default());
}

#[tokio::test]
async fn test_load_demotes_non_owner_from_edit_to_view() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", false, false));

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.load().await.unwrap();
    assert!(!coordinator.state().is_editing);
    assert!(coordinator.url().href().ends_with("/projects/applab/abc/view"));
}

#[tokio::test]
async fn test_owner_loading_view_page_enters_edit_mode() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", true, false));

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/view",
    )
    .await;
    coordinator.load().await.unwrap();
    assert!(coordinator.state().is_editing);
    assert!(coordinator.url().href().ends_with("/projects/applab/abc/edit"));
}

#[tokio::test]
async fn test_copy_switches_channel_and_copies_assets() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", true, true));
    stub.sources.lock().await.insert(
        "abc".to_string(),
        SourceBundle::fallback().pack().unwrap(),
    );

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.load().await.unwrap();

    let outcome = coordinator.copy("Flappy copy").await.unwrap();
    let new_id = outcome.channel.id.clone().expect("new channel id");
    assert_ne!(new_id, "abc");
    assert_eq!(coordinator.state().name(), Some("Flappy copy"));
    assert_eq!(stub.channel_creates.load(Ordering::SeqCst), 1);
    assert_eq!(stub.asset_copies.load(Ordering::SeqCst), 1);
    // Already editing at an app-scoped URL: soft history push, no reload.
    assert_eq!(
        outcome.navigation,
        Navigation::PushHistory(format!("/projects/applab/{new_id}/edit"))
    );
    // The copy gets its own version history.
    assert!(coordinator.state().source_version_id.is_some());
}

#[tokio::test]
async fn test_remix_names_unnamed_project_and_saves_first() {
    let stub = Arc::new(StubState::default());
    let mut unnamed = stored_channel("abc", true, false);
    unnamed["name"] = json!("");
    stub.channels.lock().await.insert("abc".to_string(), unnamed);

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.load().await.unwrap();

    let navigation = coordinator.server_side_remix().await.unwrap();
    assert_eq!(
        navigation,
        Navigation::HardNavigate("/projects/applab/abc/remix".to_string())
    );
    assert_eq!(coordinator.state().name(), Some("My Project"));
    // Owners save (with a remix snapshot) before the server-side remix.
    assert_eq!(stub.source_puts.load(Ordering::SeqCst), 1);
    assert_eq!(
        coordinator.handler_mut().remix_preps.load(Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn test_rename_saves_new_name() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", true, false));

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.load().await.unwrap();

    let channel = coordinator.rename("Flappy 2").await.unwrap().unwrap();
    assert_eq!(channel.name.as_deref(), Some("Flappy 2"));
    let stored = stub.channels.lock().await.get("abc").cloned().unwrap();
    assert_eq!(stored["name"], "Flappy 2");
}

#[tokio::test]
async fn test_freeze_hides_and_revokes_editing() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", true, false));

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.load().await.unwrap();
    assert!(coordinator.state().is_editing);

    let (saved, decision) = coordinator.freeze().await.unwrap();
    let channel = saved.unwrap();
    assert!(channel.frozen);
    assert!(channel.hidden);
    // Frozen projects are read-only; the guard sends us back to /view.
    match decision {
        studiosync_client::redirect::RedirectDecision::Rewrite {
            url,
            editing,
            readonly_workspace,
        } => {
            assert!(url.ends_with("/projects/applab/abc/view"));
            assert!(!editing);
            assert!(readonly_workspace);
        }
        other => panic!("expected rewrite, got {other:?}"),
    }
    assert!(!coordinator.state().is_editing);
}

#[tokio::test]
async fn test_legacy_share_page_gets_untitled_name() {
    let ctx = PageContext {
        app: "applab".to_string(),
        is_legacy_share: true,
        ..Default::default()
    };
    let mut coordinator = SaveCoordinator::new(
        Api::new(ApiConfig {
            base_url: "http://localhost:9".to_string(),
        }),
        TestHandler::default(),
        ctx,
        PageUrl::new("http://localhost/sh/abc"),
    );
    assert_eq!(
        coordinator.load().await.unwrap(),
        LoadOutcome::NotProjectBacked
    );
    coordinator.seed_editor();
    assert_eq!(coordinator.state().name(), Some("Untitled Project"));
}

#[tokio::test]
async fn test_delete_removes_channel() {
    let stub = Arc::new(StubState::default());
    stub.channels
        .lock()
        .await
        .insert("abc".to_string(), stored_channel("abc", true, false));

    let mut coordinator = coordinator_for(
        &stub,
        TestHandler::default(),
        "http://localhost/projects/applab/abc/edit",
    )
    .await;
    coordinator.load().await.unwrap();
    coordinator.delete().await.unwrap();
    assert!(stub.channels.lock().await.get("abc").is_none());
}
