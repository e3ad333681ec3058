//! Section roster synchronization: keeps a local view of a course section's
//! members and addable candidates in step with the section management backend.

pub mod backend;
pub mod controller;
pub mod counts;
pub mod error;
pub mod fragment;
pub mod lookup;
pub mod message;
pub mod panel;
pub mod render;
pub mod view_model;

pub use backend::{HttpRosterBackend, RosterBackend, RosterEndpoints};
pub use controller::{
    AddOutcome, ControllerOptions, RemoveOutcome, RosterEvent, SectionRosterController,
    DEFAULT_SETTLE_DELAY,
};
pub use counts::{plural_suffix, CountDisplay};
pub use error::RosterError;
pub use lookup::{SearchTerm, SearchTermValidator};
pub use message::{FlashMessage, MessageTarget, OperationResult, Severity};
pub use render::RosterView;
pub use view_model::{OverlayState, RosterViewModel, SyncPhase};
