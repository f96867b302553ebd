//! StudioSync CLI
//!
//! Command-line interface for synchronizing local project files with the
//! channels/sources/assets APIs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use studiosync_client::{
    Api, ApiConfig, AutosaveScheduler, LoadOutcome, Navigation, SaveCoordinator, SourceHandler,
};
use studiosync_core::policy::{exceeds_abuse_threshold, is_editable};
use studiosync_core::route::PageUrl;
use studiosync_core::types::{Channel, PageContext};

const MANIFEST_FILE: &str = "studiosync.json";

#[derive(Parser)]
#[command(name = "studiosync")]
#[command(about = "Channel-backed project synchronization tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new StudioSync project
    Init {
        /// Project name (default: directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// App type, e.g. applab, gamelab, artist
        #[arg(short, long, default_value = "applab")]
        app: String,

        /// Root URL of the remote API
        #[arg(short, long)]
        base_url: String,

        /// Directory to initialize (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Download the remote project into the local files
    Pull {
        /// Pin a specific source version instead of the latest
        #[arg(short, long)]
        version: Option<String>,
    },

    /// Upload the local files, creating the channel on first push
    Push {
        /// Start a fresh version instead of overwriting the current one
        #[arg(long)]
        force_new_version: bool,
    },

    /// Watch the project directory and autosave on changes
    Watch,

    /// Show channel metadata and moderation status
    Status,

    /// Hand the project off to the server-side remix flow
    Remix,

    /// Delete the remote channel
    Delete {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// On-disk project configuration, stored as `studiosync.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectManifest {
    name: String,
    app: String,
    base_url: String,

    /// Assigned by the remote on first push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel_id: Option<String>,

    #[serde(default = "default_source_path")]
    source_path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    html_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    animations_path: Option<PathBuf>,

    #[serde(default)]
    maker_apis_enabled: bool,
}

fn default_source_path() -> PathBuf {
    PathBuf::from("src/main.js")
}

fn load_manifest(dir: &Path) -> Result<ProjectManifest> {
    let path = dir.join(MANIFEST_FILE);
    let raw = std::fs::read_to_string(&path).with_context(|| {
        format!("no {MANIFEST_FILE} in {dir:?}; run `studiosync init` first")
    })?;
    serde_json::from_str(&raw).with_context(|| format!("malformed {MANIFEST_FILE}"))
}

fn save_manifest(dir: &Path, manifest: &ProjectManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(dir.join(MANIFEST_FILE), json)
        .with_context(|| format!("failed to write {MANIFEST_FILE}"))
}

/// Editor seam backed by the local project files.
struct FileSourceHandler {
    root: PathBuf,
    source_path: PathBuf,
    html_path: Option<PathBuf>,
    animations_path: Option<PathBuf>,
    maker_apis_enabled: bool,
}

impl FileSourceHandler {
    fn new(root: PathBuf, manifest: &ProjectManifest) -> Self {
        Self {
            root,
            source_path: manifest.source_path.clone(),
            html_path: manifest.html_path.clone(),
            animations_path: manifest.animations_path.clone(),
            maker_apis_enabled: manifest.maker_apis_enabled,
        }
    }

    fn write(&self, rel: &Path, contents: &str) {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(err) = std::fs::write(&path, contents) {
            tracing::warn!("failed to write {:?}: {}", path, err);
        }
    }
}

impl SourceHandler for FileSourceHandler {
    async fn level_source(&self) -> Result<String> {
        let path = self.root.join(&self.source_path);
        match tokio::fs::read_to_string(&path).await {
            Ok(source) => Ok(source),
            // A missing source file is an empty program, not an error.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err).with_context(|| format!("failed to read {path:?}")),
        }
    }

    fn level_html(&self) -> Option<String> {
        let path = self.root.join(self.html_path.as_ref()?);
        std::fs::read_to_string(path).ok()
    }

    async fn animation_list(&self) -> Result<Value> {
        let Some(rel) = &self.animations_path else {
            return Ok(Value::Null);
        };
        let path = self.root.join(rel);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("malformed animation list in {path:?}")),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Value::Null),
            Err(err) => Err(err).with_context(|| format!("failed to read {path:?}")),
        }
    }

    fn maker_apis_enabled(&self) -> bool {
        self.maker_apis_enabled
    }

    async fn prepare_for_remix(&self) -> Result<()> {
        Ok(())
    }

    fn set_initial_level_source(&mut self, source: &str) {
        self.write(&self.source_path.clone(), source);
    }

    fn set_initial_level_html(&mut self, html: &str) {
        if let Some(rel) = self.html_path.clone() {
            self.write(&rel, html);
        }
    }

    fn set_initial_animation_list(&mut self, animations: &Value) {
        let Some(rel) = self.animations_path.clone() else {
            return;
        };
        match serde_json::to_string_pretty(animations) {
            Ok(json) => self.write(&rel, &json),
            Err(err) => tracing::warn!("failed to serialize animation list: {err}"),
        }
    }

    fn set_maker_apis_enabled(&mut self, enabled: bool) {
        self.maker_apis_enabled = enabled;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("studiosync=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            name,
            app,
            base_url,
            path,
        } => {
            cmd_init(name, app, base_url, path)?;
        }
        Commands::Pull { version } => {
            cmd_pull(version).await?;
        }
        Commands::Push { force_new_version } => {
            cmd_push(force_new_version).await?;
        }
        Commands::Watch => {
            cmd_watch().await?;
        }
        Commands::Status => {
            cmd_status().await?;
        }
        Commands::Remix => {
            cmd_remix().await?;
        }
        Commands::Delete { yes } => {
            cmd_delete(yes).await?;
        }
    }

    Ok(())
}

/// Initialize a new project
fn cmd_init(
    name: Option<String>,
    app: String,
    base_url: String,
    path: Option<PathBuf>,
) -> Result<()> {
    let project_dir = match path {
        Some(path) => path,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let project_name = name.unwrap_or_else(|| {
        project_dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "My Project".to_string())
    });

    tracing::info!("Initializing StudioSync project: {}", project_name);

    let src_dir = project_dir.join("src");
    std::fs::create_dir_all(&src_dir).context("Failed to create src directory")?;

    let manifest = ProjectManifest {
        name: project_name.clone(),
        app: app.clone(),
        base_url,
        channel_id: None,
        source_path: default_source_path(),
        html_path: (app == "applab").then(|| PathBuf::from("src/index.html")),
        animations_path: (app == "gamelab").then(|| PathBuf::from("src/animations.json")),
        maker_apis_enabled: false,
    };
    save_manifest(&project_dir, &manifest)?;

    let gitignore_path = project_dir.join(".gitignore");
    let gitignore_content = "# StudioSync\n.studiosync/\n\n# OS files\n.DS_Store\nThumbs.db\n";
    std::fs::write(&gitignore_path, gitignore_content).context("Failed to write .gitignore")?;

    println!(
        "Initialized StudioSync project '{}' at {:?}",
        project_name, project_dir
    );
    println!("\nProject structure:");
    println!("  studiosync.json   - Project configuration");
    println!("  src/              - Project source files");
    println!("\nNext steps:");
    println!("  1. Put your program source at {:?}", manifest.source_path);
    println!("  2. Run: studiosync push");

    Ok(())
}

fn project_dir() -> Result<PathBuf> {
    std::env::current_dir().context("cannot determine current directory")
}

fn open_coordinator(
    dir: &Path,
    manifest: &ProjectManifest,
    action: &str,
    version: Option<&str>,
) -> Result<SaveCoordinator<FileSourceHandler>> {
    let channel_id = manifest
        .channel_id
        .as_deref()
        .context("project has no channel yet; run `studiosync push` first")?;
    let base = manifest.base_url.trim_end_matches('/');
    let mut href = format!("{base}/projects/{}/{channel_id}/{action}", manifest.app);
    if let Some(version) = version {
        href.push_str("?version=");
        href.push_str(version);
    }
    let ctx = PageContext {
        app: manifest.app.clone(),
        is_project_level: true,
        ..Default::default()
    };
    let handler = FileSourceHandler::new(dir.to_path_buf(), manifest);
    Ok(SaveCoordinator::new(
        Api::new(ApiConfig {
            base_url: manifest.base_url.clone(),
        }),
        handler,
        ctx,
        PageUrl::new(href),
    ))
}

async fn load_remote(coordinator: &mut SaveCoordinator<FileSourceHandler>) -> Result<()> {
    match coordinator.load().await? {
        LoadOutcome::Loaded => Ok(()),
        LoadOutcome::Redirect(url) => {
            bail!("project not found on the server (redirected to {url})")
        }
        LoadOutcome::NotProjectBacked => bail!("this page context is not project-backed"),
    }
}

/// Download the remote project into the local files
async fn cmd_pull(version: Option<String>) -> Result<()> {
    let dir = project_dir()?;
    let manifest = load_manifest(&dir)?;
    let mut coordinator = open_coordinator(&dir, &manifest, "view", version.as_deref())?;
    load_remote(&mut coordinator).await?;
    coordinator.seed_editor();

    println!(
        "Pulled '{}' into {:?}",
        coordinator.state().name().unwrap_or(&manifest.name),
        manifest.source_path
    );
    if let Some(at) = coordinator.state().updated_at() {
        println!("Last saved: {}", at);
    }
    Ok(())
}

/// Upload the local files, creating the channel on first push
async fn cmd_push(force_new_version: bool) -> Result<()> {
    let dir = project_dir()?;
    let mut manifest = load_manifest(&dir)?;

    if manifest.channel_id.is_none() {
        let api = Api::new(ApiConfig {
            base_url: manifest.base_url.clone(),
        });
        let draft = Channel {
            name: Some(manifest.name.clone()),
            ..Default::default()
        };
        let created = api.channels.create(&draft).await?;
        let id = created.id.clone().context("remote returned a channel without an id")?;
        println!("Created channel {}", id);
        manifest.channel_id = Some(id);
        save_manifest(&dir, &manifest)?;
    }

    let mut coordinator = open_coordinator(&dir, &manifest, "edit", None)?;
    load_remote(&mut coordinator).await?;

    match coordinator.save(force_new_version).await? {
        Some(channel) => {
            println!("Pushed '{}'", channel.name.as_deref().unwrap_or(&manifest.name));
            if let Some(at) = channel.updated_at.as_deref() {
                println!("Saved at: {}", at);
            }
        }
        None => println!("Skipped: this project belongs to another user."),
    }
    Ok(())
}

/// Watch the project directory and autosave on changes
async fn cmd_watch() -> Result<()> {
    let dir = project_dir()?;
    let manifest = load_manifest(&dir)?;
    let mut coordinator = open_coordinator(&dir, &manifest, "edit", None)?;
    load_remote(&mut coordinator).await?;
    if coordinator.state().bundle.source.is_none() {
        coordinator.establish_baseline().await?;
    }

    let coordinator = Arc::new(Mutex::new(coordinator));
    tokio::spawn(AutosaveScheduler::default().run(coordinator.clone()));

    let watch_root = dir.clone();
    let watch_coordinator = coordinator.clone();
    tokio::task::spawn_blocking(move || {
        let rt = tokio::runtime::Handle::current();

        let (tx, rx) = std::sync::mpsc::channel();

        let mut watcher = match RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            Config::default().with_poll_interval(Duration::from_millis(500)),
        ) {
            Ok(w) => w,
            Err(e) => {
                tracing::error!("Failed to create watcher: {}", e);
                return;
            }
        };

        if let Err(e) = watcher.watch(&watch_root, RecursiveMode::Recursive) {
            tracing::error!("Failed to watch directory: {}", e);
            return;
        }

        tracing::info!("File watcher active for: {:?}", watch_root);

        loop {
            match rx.recv_timeout(Duration::from_secs(1)) {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) && event.paths.iter().any(|path| {
                        path.file_name().map_or(true, |name| name != MANIFEST_FILE)
                    });
                    if relevant {
                        let coordinator = watch_coordinator.clone();
                        rt.spawn(async move {
                            coordinator.lock().await.note_project_changed();
                        });
                    }
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    // Continue watching
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    tracing::info!("File watcher channel closed");
                    break;
                }
            }
        }
    });

    println!("Watching {:?} for changes. Stop with Ctrl-C.", dir);
    tokio::signal::ctrl_c().await?;

    // One last save so nothing written just before the interrupt is lost.
    if let Err(err) = coordinator.lock().await.autosave().await {
        tracing::error!("final autosave failed: {err}");
    }
    println!("\nStopped.");
    Ok(())
}

/// Show channel metadata and moderation status
async fn cmd_status() -> Result<()> {
    let dir = project_dir()?;
    let manifest = load_manifest(&dir)?;
    let mut coordinator = open_coordinator(&dir, &manifest, "view", None)?;
    load_remote(&mut coordinator).await?;

    let state = coordinator.state();
    println!("Project:  {}", state.name().unwrap_or(&manifest.name));
    println!(
        "Channel:  {}",
        state.channel_id().unwrap_or("<none>")
    );
    if let Some(at) = state.updated_at() {
        println!("Saved at: {}", at);
    }
    println!(
        "Editable: {}",
        if is_editable(state, coordinator.context()) {
            "yes"
        } else {
            "no"
        }
    );
    if state.is_frozen() {
        println!("Frozen:   yes");
    }
    println!("Abuse score: {}", state.abuse_score());
    if exceeds_abuse_threshold(state) {
        println!("Warning: this project is hidden for reported abuse.");
    }
    if state.has_privacy_profanity_violation() {
        println!("Warning: this project is hidden for a policy violation.");
    }
    Ok(())
}

/// Hand the project off to the server-side remix flow
async fn cmd_remix() -> Result<()> {
    let dir = project_dir()?;
    let manifest = load_manifest(&dir)?;
    let mut coordinator = open_coordinator(&dir, &manifest, "edit", None)?;
    load_remote(&mut coordinator).await?;

    let (Navigation::HardNavigate(path) | Navigation::PushHistory(path)) =
        coordinator.server_side_remix().await?;
    println!(
        "Open {}{} in a browser to complete the remix.",
        manifest.base_url.trim_end_matches('/'),
        path
    );
    Ok(())
}

/// Delete the remote channel
async fn cmd_delete(yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to delete without --yes");
    }
    let dir = project_dir()?;
    let mut manifest = load_manifest(&dir)?;
    let mut coordinator = open_coordinator(&dir, &manifest, "edit", None)?;
    load_remote(&mut coordinator).await?;
    coordinator.delete().await?;

    let id = manifest.channel_id.take();
    save_manifest(&dir, &manifest)?;
    println!("Deleted channel {}", id.as_deref().unwrap_or("<unknown>"));
    Ok(())
}
