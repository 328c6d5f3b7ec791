// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables used by the daemon are defined here
//! with typed accessor functions, with the variable names collected in the
//! [`names`] submodule.

use std::path::PathBuf;

/// Environment variable name constants.
pub mod names {
    /// Overrides the state directory (takes precedence over XDG).
    pub const OBX_STATE_DIR: &str = "OBX_STATE_DIR";
    /// XDG base directory for state files.
    pub const XDG_STATE_HOME: &str = "XDG_STATE_HOME";
    /// Standard tracing filter directive.
    pub const RUST_LOG: &str = "RUST_LOG";
}

/// Returns the value of `OBX_STATE_DIR` if set.
pub fn state_dir() -> Option<PathBuf> {
    std::env::var(names::OBX_STATE_DIR).ok().map(PathBuf::from)
}

/// Returns the value of `XDG_STATE_HOME` if set.
pub fn xdg_state_home() -> Option<PathBuf> {
    std::env::var(names::XDG_STATE_HOME).ok().map(PathBuf::from)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
