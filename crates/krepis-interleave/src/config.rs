//! Exploration configuration
//!
//! Plain struct with defaults, optionally overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `KREPIS_INTERLEAVE_MAX_ITERATIONS` | `max_iterations` |
//! | `KREPIS_INTERLEAVE_MAX_DECISIONS` | `max_decisions` |
//! | `KREPIS_INTERLEAVE_CHECKPOINT` | `checkpoint_file` |
//! | `KREPIS_INTERLEAVE_PRINT_TRACE` | `print_trace` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Env override for [`InterleaveConfig::max_iterations`]
pub const ENV_MAX_ITERATIONS: &str = "KREPIS_INTERLEAVE_MAX_ITERATIONS";
/// Env override for [`InterleaveConfig::max_decisions`]
pub const ENV_MAX_DECISIONS: &str = "KREPIS_INTERLEAVE_MAX_DECISIONS";
/// Env override for [`InterleaveConfig::checkpoint_file`]
pub const ENV_CHECKPOINT: &str = "KREPIS_INTERLEAVE_CHECKPOINT";
/// Env override for [`InterleaveConfig::print_trace`]
pub const ENV_PRINT_TRACE: &str = "KREPIS_INTERLEAVE_PRINT_TRACE";

/// Default per-execution decision bound
pub const DEFAULT_MAX_DECISIONS: usize = 10_000;

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleaveConfig {
    /// Stop after this many executions, even if exploration is incomplete
    pub max_iterations: Option<usize>,

    /// Fail an execution that makes more decisions than this
    pub max_decisions: usize,

    /// Where to write the failing execution's trace as JSON
    pub checkpoint_file: Option<PathBuf>,

    /// Print the failing trace to stderr
    pub print_trace: bool,
}

impl Default for InterleaveConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            max_decisions: DEFAULT_MAX_DECISIONS,
            checkpoint_file: None,
            print_trace: true,
        }
    }
}

impl InterleaveConfig {
    /// Defaults overridden by any `KREPIS_INTERLEAVE_*` variables set
    ///
    /// Values that do not parse are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(max) = parse(&lookup, ENV_MAX_ITERATIONS) {
            config.max_iterations = Some(max);
        }
        if let Some(max) = parse(&lookup, ENV_MAX_DECISIONS) {
            config.max_decisions = max;
        }
        if let Some(path) = lookup(ENV_CHECKPOINT).filter(|p| !p.is_empty()) {
            config.checkpoint_file = Some(PathBuf::from(path));
        }
        if let Some(print) = parse(&lookup, ENV_PRINT_TRACE) {
            config.print_trace = print;
        }
        config
    }

    /// Limit the number of executions
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Limit decisions per execution
    pub fn with_max_decisions(mut self, max: usize) -> Self {
        self.max_decisions = max;
        self
    }

    /// Write failing traces to `path`
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_file = Some(path.into());
        self
    }

    /// Enable or disable printing the failing trace
    pub fn with_print_trace(mut self, print: bool) -> Self {
        self.print_trace = print;
        self
    }

    /// Validate configuration
    pub fn is_valid(&self) -> bool {
        self.max_decisions > 0 && self.max_iterations.map_or(true, |max| max > 0)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("⚠️ Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = InterleaveConfig::default();
        assert_eq!(config.max_iterations, None);
        assert_eq!(config.max_decisions, 10_000);
        assert!(config.print_trace);
        assert!(config.is_valid());
    }

    #[test]
    fn test_env_overrides() {
        let config = InterleaveConfig::from_lookup(lookup(&[
            (ENV_MAX_ITERATIONS, "50"),
            (ENV_MAX_DECISIONS, " 200 "),
            (ENV_CHECKPOINT, "/tmp/trace.json"),
            (ENV_PRINT_TRACE, "false"),
        ]));

        assert_eq!(config.max_iterations, Some(50));
        assert_eq!(config.max_decisions, 200);
        assert_eq!(config.checkpoint_file, Some(PathBuf::from("/tmp/trace.json")));
        assert!(!config.print_trace);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let config = InterleaveConfig::from_lookup(lookup(&[
            (ENV_MAX_DECISIONS, "lots"),
            (ENV_PRINT_TRACE, "maybe"),
        ]));
        assert_eq!(config, InterleaveConfig::default());
    }

    #[test]
    fn test_validation() {
        assert!(!InterleaveConfig::default().with_max_decisions(0).is_valid());
        assert!(!InterleaveConfig::default().with_max_iterations(0).is_valid());
        assert!(InterleaveConfig::default().with_max_iterations(3).is_valid());
    }
}
