//! Cube configuration
//!
//! Loaded from a JSON file; `CUBE_DEPTH`, `CUBE_TOP_COST_ENTRIES_TO_LOG` and
//! `CUBE_ANSWER_SIZE` override the file when set.

use crate::error::{CubeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub const DEPTH_ENV: &str = "CUBE_DEPTH";
pub const TOP_COST_ENTRIES_ENV: &str = "CUBE_TOP_COST_ENTRIES_TO_LOG";
pub const ANSWER_SIZE_ENV: &str = "CUBE_ANSWER_SIZE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    /// Number of dimensions kept by the automatic order
    pub depth: usize,

    /// Declared hierarchies, e.g. `[["continent", "country"]]`
    pub hierarchies: Vec<Vec<String>>,

    /// Cost entries logged after the one-dimension pass
    pub top_cost_entries_to_log: usize,

    /// Maximum gainers and maximum losers in the report
    pub max_gainer_loser_count: usize,

    /// Nodes picked by the summary, root excluded
    pub answer_size: usize,

    /// Summary levels; 0 means every level of the cube
    pub summary_level_count: usize,

    /// Only pick nodes that moved with the overall change
    pub one_side_error: bool,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            hierarchies: Vec::new(),
            top_cost_entries_to_log: 20,
            max_gainer_loser_count: 5,
            answer_size: 10,
            summary_level_count: 0,
            one_side_error: false,
        }
    }
}

impl CubeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: CubeConfig = serde_json::from_str(&content)
            .map_err(|e| CubeError::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded cube config from {}", path.display());
        Ok(config)
    }

    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(depth) = parse_override(&lookup, DEPTH_ENV)? {
            self.depth = depth;
        }
        if let Some(count) = parse_override(&lookup, TOP_COST_ENTRIES_ENV)? {
            self.top_cost_entries_to_log = count;
        }
        if let Some(size) = parse_override(&lookup, ANSWER_SIZE_ENV)? {
            self.answer_size = size;
        }
        Ok(self)
    }
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CubeError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: CubeConfig =
            serde_json::from_str(r#"{"hierarchies": [["continent", "country"]]}"#).unwrap();
        assert_eq!(config.depth, 3);
        assert_eq!(config.top_cost_entries_to_log, 20);
        assert_eq!(config.answer_size, 10);
        assert!(!config.one_side_error);
        assert_eq!(config.hierarchies, vec![vec!["continent".to_string(), "country".to_string()]]);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [(DEPTH_ENV, "2"), (TOP_COST_ENTRIES_ENV, " 7 "), (ANSWER_SIZE_ENV, "4")].into();
        let config = CubeConfig::default()
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.depth, 2);
        assert_eq!(config.top_cost_entries_to_log, 7);
        assert_eq!(config.answer_size, 4);
        assert_eq!(config.max_gainer_loser_count, 5);
    }

    #[test]
    fn test_invalid_override() {
        let result = CubeConfig::default().apply_overrides(|key| {
            (key == DEPTH_ENV).then(|| "deep".to_string())
        });
        assert!(matches!(result, Err(CubeError::Config(_))));
    }

    #[test]
    fn test_load_reports_bad_json() {
        let path = std::env::temp_dir().join(format!("cube_config_{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();
        let result = CubeConfig::load(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(CubeError::Config(_))));
    }
}
