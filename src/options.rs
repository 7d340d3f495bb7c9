//! Explicit configuration structs. Per Design Notes §9 of the distilled
//! spec, these replace any notion of global/environment-driven config —
//! every knob the engine needs is enumerated here and handed to
//! constructors directly; there is no config-file loader in this crate.

use serde::{Deserialize, Serialize};

/// Only `matrix_name` is consumed by this crate; the rest pass through
/// unread to a downstream traceback/formatter stage, per the distilled
/// spec's external-interface contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringOptions {
    pub matrix_name: String,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub reward: i32,
    pub penalty: i32,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        ScoringOptions {
            matrix_name: "BLOSUM62".to_string(),
            gap_open: 11,
            gap_extend: 1,
            reward: 1,
            penalty: -3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LookupOptions {
    pub word_length: usize,
    pub threshold: i32,
    pub use_pssm: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        LookupOptions {
            word_length: 3,
            threshold: 11,
            use_pssm: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InitialWordOptions {
    pub window_size: usize,
    pub x_drop_ungapped_bits: f64,
    pub two_hit: bool,
}

impl Default for InitialWordOptions {
    fn default() -> Self {
        InitialWordOptions {
            window_size: 40,
            x_drop_ungapped_bits: 7.0,
            two_hit: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HitSavingOptions {
    pub hitlist_size: usize,
    pub hsp_num_max: usize,
    pub total_hsp_limit: usize,
    pub e_value_threshold: f64,
}

impl Default for HitSavingOptions {
    fn default() -> Self {
        HitSavingOptions {
            hitlist_size: 500,
            hsp_num_max: 100,
            total_hsp_limit: 0,
            e_value_threshold: 10.0,
        }
    }
}

/// Bundles everything `PreliminaryEngine::new` needs beyond the
/// already-built matrix/table/collector/source (`ScoringOptions` and
/// `LookupOptions` are only needed earlier, at matrix/table construction
/// time, so the engine itself doesn't hold them).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineConfig {
    pub num_workers: usize,
    pub initial_word: InitialWordOptions,
    pub hit_saving: HitSavingOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            num_workers: 1,
            initial_word: InitialWordOptions::default(),
            hit_saving: HitSavingOptions::default(),
        }
    }
}
