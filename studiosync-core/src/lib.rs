//! StudioSync Core Library
//!
//! This crate provides the core functionality for StudioSync:
//! - Project route parsing (`/projects/<app>/<channel>/<action>` URLs)
//! - Channel-id obfuscation for no-source embeds
//! - Source bundle packing and unpacking
//! - Channel records and per-session project state
//! - Standalone-app mapping and project URL construction
//! - Visibility policy (editability, abuse and policy-violation hiding)

pub mod app_type;
pub mod cipher;
pub mod policy;
pub mod route;
pub mod types;

// Re-export commonly used types
pub use app_type::{
    app_to_project_url, project_path, AppTypeError, StandaloneApp, NON_REMIXABLE_SKINS,
};
pub use cipher::{decode_channel_id, encode_channel_id, ALPHABET, CIPHER};
pub use policy::{
    exceeds_abuse_threshold, hide_for_abuse, hide_for_policy_violation, is_editable,
    show_despite_moderation, ABUSE_THRESHOLD,
};
pub use route::{creation_url, project_url, PageUrl, ProjectAction, ProjectRoute, Route};
pub use types::{
    AbuseReport, Channel, PackError, PageContext, PrivacyProfanityReport, ProjectState,
    SaveState, SourceBundle, SOURCE_FILE,
};
