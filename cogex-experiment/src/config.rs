use cogex_core::KeyPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings shared by every trial of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub display_width: u32,
    pub display_height: u32,
    pub key_policy: KeyPolicy,
    /// Directory relative image references are resolved against
    pub image_dir: Option<PathBuf>,
    pub inter_trial_interval_ms: u64,
    /// Events a single trial may process before it is declared stuck
    pub step_limit: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            display_width: 1280,
            display_height: 720,
            key_policy: KeyPolicy::default(),
            image_dir: None,
            inter_trial_interval_ms: 0,
            step_limit: 100_000,
        }
    }
}
