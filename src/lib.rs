//! KILOBOT — Multi-Account KiloEx Mini-Game Automation Engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod accounts;
pub mod api;
pub mod config;
pub mod headers;
pub mod net;
pub mod retry;
pub mod scheduler;
pub mod types;
pub mod workflow;
