//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared,
//! clonable resources handlers need.

use std::sync::Arc;
use therasim_core::Orchestrator;

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}
