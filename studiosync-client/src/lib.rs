//! StudioSync Client
//!
//! The asynchronous synchronization layer between an embedding editor and
//! the channels/sources/assets APIs: load pipeline, debounced autosave,
//! optimistic versioning, copy/remix/freeze/delete operations and the
//! redirect policy that runs before everything else.

pub mod api;
pub mod autosave;
pub mod coordinator;
pub mod editor;
pub mod redirect;

pub use api::{Api, ApiConfig, ApiError, PutSourceResponse};
pub use autosave::{AutosaveScheduler, AUTOSAVE_INTERVAL};
pub use coordinator::{
    CopyOutcome, LoadOutcome, Navigation, SaveCoordinator, SaveError, SaveStatus,
};
pub use editor::SourceHandler;
pub use redirect::{RedirectDecision, RedirectGuard};
