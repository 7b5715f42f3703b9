//! Tunables for the HTML text node merger (spec.md §4.2, §9's open
//! question resolved in favor of "intended tunables" — see DESIGN.md).

use serde::{Deserialize, Serialize};

fn default_match_threshold() -> f64 {
    0.2
}

fn default_match_distance() -> u32 {
    2500
}

fn default_delete_threshold() -> f64 {
    0.05
}

/// Reference values match the Myers-diff-derived patch matcher spec.md
/// §4.2 describes; callers needing different sensitivity construct this
/// directly rather than going through `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    #[serde(default = "default_match_distance")]
    pub match_distance: u32,
    #[serde(default = "default_delete_threshold")]
    pub delete_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            match_threshold: default_match_threshold(),
            match_distance: default_match_distance(),
            delete_threshold: default_delete_threshold(),
        }
    }
}
