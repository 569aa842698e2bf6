//! Shared library surface for the trail server and its tests.

pub mod api;
pub mod config;
pub mod state;
