//! Simulator configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a simulation run. Every field has a default so partial
/// config files deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Hard stop after this many facility evaluations.
    pub max_evaluations: u64,
    /// Log every evaluation at debug level instead of trace.
    pub log_evaluations: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 1_000_000,
            log_evaluations: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.max_evaluations, 1_000_000);
        assert!(!config.log_evaluations);
    }
}
