//! # dash-core
//!
//! Core types for the dashboard command engine.
//!
//! The engine keeps one normalized [`DashboardState`] per session. Layouts are
//! trees of sections and items addressed by [`ItemPath`] / [`SectionPath`];
//! every widget carries a stable [`ObjRef`] independent of its position.

mod config;
mod error;
mod path;
mod types;

pub use config::{
    EngineConfig, EventsConfig, LayoutLimits, StoreConfig, UndoConfig, GRID_COLUMNS,
};
pub use error::{DashError, FailureReason, Result};
pub use path::{ItemPath, PathSegment, SectionPath};
pub use types::*;
