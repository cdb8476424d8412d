use bon::Builder;
use thiserror::Error;

/// Hard upper limit on the fan-out of a single node; child lists are stored
/// inline up to this capacity.
pub const MAX_BRANCHING: usize = 16;

/// Hard upper limit on the number of SAH bins per axis.
pub const MAX_BINS: usize = 32;

/// Configuration of one build. Read-only while the build runs.
#[derive(Copy, Clone, Debug, Builder)]
pub struct BuildSettings {
    /// Maximum number of children per internal node.
    #[builder(default = 2)]
    pub branching_factor: usize,

    /// Recursion depth at which all remaining primitives are forced into a
    /// single leaf regardless of leaf size limits.
    #[builder(default = 32)]
    pub max_depth: u32,

    /// Ranges at or below this size always become leaves.
    #[builder(default = 1)]
    pub min_leaf_size: usize,

    /// Largest leaf the builder creates voluntarily (`max_depth` overrides).
    #[builder(default = 8)]
    pub max_leaf_size: usize,

    /// Relative cost of one traversal step in the SAH model.
    #[builder(default = 1.0)]
    pub traversal_cost: f32,

    /// Relative cost of one primitive intersection test in the SAH model.
    #[builder(default = 1.0)]
    pub intersection_cost: f32,

    /// Number of centroid bins evaluated per axis.
    #[builder(default = 16)]
    pub bin_count: usize,

    /// Sub-ranges with at least this many primitives are built on their own
    /// threads. `usize::MAX` forces a fully sequential build.
    #[builder(default = 1024)]
    pub parallel_threshold: usize,
}

impl BuildSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.branching_factor < 2 || self.branching_factor > MAX_BRANCHING {
            return Err(SettingsError::BranchingFactor(self.branching_factor));
        }
        if self.max_depth == 0 {
            return Err(SettingsError::MaxDepth);
        }
        if self.min_leaf_size == 0 || self.min_leaf_size > self.max_leaf_size {
            return Err(SettingsError::LeafSize {
                min: self.min_leaf_size,
                max: self.max_leaf_size,
            });
        }
        if self.bin_count < 2 || self.bin_count > MAX_BINS {
            return Err(SettingsError::BinCount(self.bin_count));
        }
        for cost in [self.traversal_cost, self.intersection_cost] {
            if !(cost.is_finite() && cost > 0.0) {
                return Err(SettingsError::Cost(cost));
            }
        }
        Ok(())
    }
}

impl Default for BuildSettings {
    fn default() -> BuildSettings {
        BuildSettings::builder().build()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum SettingsError {
    #[error("branching factor must be between 2 and {MAX_BRANCHING}, got {0}")]
    BranchingFactor(usize),

    #[error("max depth must be at least 1")]
    MaxDepth,

    #[error("leaf size limits invalid: min {min}, max {max}")]
    LeafSize { min: usize, max: usize },

    #[error("bin count must be between 2 and {MAX_BINS}, got {0}")]
    BinCount(usize),

    #[error("SAH costs must be positive and finite, got {0}")]
    Cost(f32),
}
