//! Project configuration.
//!
//! Settings load from a `.flowtrace.toml` found in the working directory or
//! any ancestor, so queries run from a subdirectory still pick up the project
//! file. Every field has a default and a malformed file degrades to the
//! defaults with a warning rather than failing the query.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".flowtrace.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowtraceConfig {
    pub side_effects: SideEffectConfig,
    pub risk: RiskThresholds,
    pub limits: Limits,
}

/// Callee name prefixes treated as externally visible side effects by the
/// impact analysis. Matching is case-insensitive against each dotted segment
/// of the callee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SideEffectConfig {
    pub names: Vec<String>,
}

impl Default for SideEffectConfig {
    fn default() -> Self {
        Self {
            names: [
                "print", "write", "save", "send", "post", "put", "emit", "log", "insert",
                "update", "delete", "execute", "commit", "publish", "flush",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl SideEffectConfig {
    /// Whether a callee name looks like a side effect: any dotted segment
    /// equals or starts with a configured prefix. `db.save_order` matches
    /// `save`; `self.validate` does not.
    pub fn matches(&self, callee: &str) -> bool {
        callee.split('.').any(|segment| {
            let segment = segment.to_ascii_lowercase();
            self.names
                .iter()
                .any(|name| segment == *name || segment.starts_with(name.as_str()))
        })
    }
}

/// Thresholds feeding the impact risk rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// More functions touched than this is high risk.
    pub functions_high: usize,
    /// More exit points than this is high risk.
    pub exits_high: usize,
    /// More exit points than this is at least medium risk.
    pub exits_medium: usize,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            functions_high: 3,
            exits_high: 5,
            exits_medium: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Inter-procedural linking depth; sites past it become truncation
    /// markers.
    pub max_call_depth: usize,
    /// Per-query wall-clock budget in milliseconds. `None` means unbounded.
    pub timeout_ms: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_depth: 8,
            timeout_ms: None,
        }
    }
}

impl FlowtraceConfig {
    /// Load from the nearest `.flowtrace.toml` in `start` or its ancestors,
    /// falling back to defaults when no file exists or the file is invalid.
    pub fn load_from(start: &Path) -> Self {
        let Some(path) = find_config_file(start) else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::debug!("loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "invalid config at {}, using defaults: {e}",
                        path.display()
                    );
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("unreadable config at {}, using defaults: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn load() -> Self {
        match std::env::current_dir() {
            Ok(cwd) => Self::load_from(&cwd),
            Err(_) => Self::default(),
        }
    }
}

fn find_config_file(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        let candidate = dir.join(CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    })
}
