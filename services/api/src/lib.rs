//! Therasim API Library Crate
//!
//! This library contains the HTTP transport for the training simulator:
//! configuration, application state, request/response models, handlers, and
//! routing. The `api` binary is a thin wrapper around this library; all
//! dialogue logic lives in `therasim-core`.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
