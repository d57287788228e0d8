//! Layered dotfile installation engine.
//!
//! A root directory holds a `caravan.layers` manifest naming layers; each
//! layer directory carries a `caravan` directive file declaring links,
//! install scripts and dependencies on other layers.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: manifest and directive file parsing, path expansion
//! - **[`resources`]**: idempotent `check + apply` primitives (symlinks, backups, scripts)
//! - **[`layers`]**: dependency-ordered layer installation
//! - **[`commands`]**: top-level command orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod layers;
pub mod logging;
pub mod resources;
