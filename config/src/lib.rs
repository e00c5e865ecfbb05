//! websh Configuration System
//!
//! YAML configuration for the websh script shell.
//!
//! # Configuration Loading Priority
//!
//! 1. Compiled-in defaults
//! 2. `/etc/websh/websh.yaml` (system-wide)
//! 3. `~/.config/websh/websh.yaml` (user)
//! 4. `./websh.yaml` (project-local)
//! 5. `WEBSH_CONFIG=/path/to/config.yaml` (explicit)
//! 6. Environment variables (highest priority)
//!
//! # Example Configuration
//!
//! ```yaml
//! shell:
//!   prompt: "{user}@localhost:~/ "
//!   workdir: "${HOME}/scripts"
//!   history:
//!     file: "~/.websh_history"
//!
//! engine:
//!   memory_limit_bytes: 67108864
//!
//! logging:
//!   level: debug
//! ```

#![allow(missing_docs)]

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::{expand_path, ConfigLoader};
pub use types::*;

/// Load configuration from default locations.
///
/// Searches for config files in order and merges them.
/// Environment variables override file values.
pub fn load() -> Result<WebshConfig, ConfigError> {
    ConfigLoader::new().load()
}

/// Load configuration from a specific file.
pub fn load_from_file(path: &str) -> Result<WebshConfig, ConfigError> {
    ConfigLoader::new().with_file(path).load()
}
