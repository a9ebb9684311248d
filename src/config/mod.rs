//! Configuration module for Ticket-Sync
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use ticket_sync::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Invocation budget: {}s", config.sync.time_budget_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, JiraConfig, RetryConfig, StorageConfig, SyncConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

/// Hard execution ceiling of the host; the invocation budget must stay below it
pub const HOST_TIME_LIMIT_SECS: u64 = 900;

/// Maximum number of documents accepted by one index submit call
pub const MAX_BATCH_SIZE: usize = 10;
