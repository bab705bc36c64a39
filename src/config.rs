//! Immutable configuration: database identity, search defaults, and the
//! memory-strategy knobs. Grounded on the `configs` package's
//! `AppConfig`/`CliConfig`, generalized from a single flat struct into the
//! layered `VecturaConfig` / `SearchOptions` / `MemoryStrategy` split — all
//! still validated eagerly at construction rather than lazily at use, the
//! same "fail fast" posture `AbkveInner::new`'s `assert!`s take.

use crate::bm25::Bm25Params;
use crate::error::{Result, VecturaError};

/// Hybrid scoring and ranking defaults, applied when a search call omits
/// the corresponding parameter.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub default_num_results: usize,
    pub min_threshold: Option<f32>,
    /// Blend weight `w` in `[0, 1]`; `w=1` is pure cosine, `w=0` is pure BM25.
    hybrid_weight: f32,
    pub k1: f32,
    pub b: f32,
    pub bm25_normalization_factor: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            default_num_results: 10,
            min_threshold: None,
            hybrid_weight: 0.5,
            k1: 1.2,
            b: 0.75,
            bm25_normalization_factor: 10.0,
        }
    }
}

impl SearchOptions {
    pub fn hybrid_weight(&self) -> f32 {
        self.hybrid_weight
    }

    /// Sets the hybrid weight, clamping silently to `[0, 1]` rather than
    /// erroring (out-of-range inputs are a caller convenience issue, not a
    /// validation failure worth surfacing).
    pub fn set_hybrid_weight(&mut self, w: f32) {
        self.hybrid_weight = w.clamp(0.0, 1.0);
    }

    pub fn with_hybrid_weight(mut self, w: f32) -> Self {
        self.set_hybrid_weight(w);
        self
    }

    pub fn bm25_params(&self) -> Bm25Params {
        Bm25Params {
            k1: self.k1,
            b: self.b,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.default_num_results == 0 {
            return Err(VecturaError::InvalidInput {
                reason: "default_num_results must be > 0".into(),
            });
        }
        if let Some(t) = self.min_threshold {
            if !(-1.0..=1.0).contains(&t) {
                return Err(VecturaError::InvalidInput {
                    reason: format!("min_threshold must be within [-1, 1], got {t}"),
                });
            }
        }
        if self.k1 <= 0.0 || self.b < 0.0 || self.bm25_normalization_factor <= 0.0 {
            return Err(VecturaError::InvalidInput {
                reason: "k1 and bm25_normalization_factor must be > 0, b must be >= 0".into(),
            });
        }
        Ok(())
    }
}

/// Selects between the all-in-memory path and the on-demand "indexed" path.
/// See `memory_strategy.rs` for how each mode resolves at runtime.
#[derive(Debug, Clone)]
pub enum MemoryStrategy {
    Automatic {
        threshold: usize,
        candidate_multiplier: usize,
        batch_size: usize,
        max_concurrent_batches: usize,
    },
    FullMemory,
    Indexed {
        candidate_multiplier: usize,
        batch_size: usize,
        max_concurrent_batches: usize,
    },
}

impl Default for MemoryStrategy {
    fn default() -> Self {
        Self::Automatic {
            threshold: 10_000,
            candidate_multiplier: 10,
            batch_size: 100,
            max_concurrent_batches: 4,
        }
    }
}

impl MemoryStrategy {
    fn validate(&self) -> Result<()> {
        let params: Vec<(&str, usize)> = match self {
            MemoryStrategy::Automatic {
                threshold,
                candidate_multiplier,
                batch_size,
                max_concurrent_batches,
            } => vec![
                ("threshold", *threshold),
                ("candidate_multiplier", *candidate_multiplier),
                ("batch_size", *batch_size),
                ("max_concurrent_batches", *max_concurrent_batches),
            ],
            MemoryStrategy::FullMemory => vec![],
            MemoryStrategy::Indexed {
                candidate_multiplier,
                batch_size,
                max_concurrent_batches,
            } => vec![
                ("candidate_multiplier", *candidate_multiplier),
                ("batch_size", *batch_size),
                ("max_concurrent_batches", *max_concurrent_batches),
            ],
        };
        for (name, value) in params {
            if value == 0 {
                return Err(VecturaError::InvalidInput {
                    reason: format!("MemoryStrategy parameter `{name}` must be > 0"),
                });
            }
        }
        Ok(())
    }
}

/// Top-level, immutable-after-construction configuration for a VecturaKit
/// instance.
#[derive(Debug, Clone)]
pub struct VecturaConfig {
    pub name: String,
    pub directory: Option<std::path::PathBuf>,
    /// Declared dimension; if `None`, it is discovered from the embedder's
    /// `dimension()` at facade construction and frozen from then on.
    pub dimension: Option<usize>,
    pub search: SearchOptions,
    pub memory_strategy: MemoryStrategy,
}

impl VecturaConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory: None,
            dimension: None,
            search: SearchOptions::default(),
            memory_strategy: MemoryStrategy::default(),
        }
    }

    pub fn with_directory(mut self, directory: impl Into<std::path::PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    pub fn with_memory_strategy(mut self, strategy: MemoryStrategy) -> Self {
        self.memory_strategy = strategy;
        self
    }

    /// Validates every numeric parameter. Called once at facade
    /// construction; nothing in this crate mutates a `VecturaConfig` after
    /// that, so a single validation pass is sufficient.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(VecturaError::InvalidInput {
                reason: "database name must not be empty".into(),
            });
        }
        self.search.validate()?;
        self.memory_strategy.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(VecturaConfig::new("docs").validate().is_ok());
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(VecturaConfig::new("").validate().is_err());
    }

    #[test]
    fn zero_num_results_is_rejected() {
        let mut search = SearchOptions::default();
        search.default_num_results = 0;
        let cfg = VecturaConfig::new("docs").with_search(search);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn hybrid_weight_is_clamped_not_rejected() {
        let search = SearchOptions::default().with_hybrid_weight(5.0);
        assert_eq!(search.hybrid_weight(), 1.0);
        let search = SearchOptions::default().with_hybrid_weight(-5.0);
        assert_eq!(search.hybrid_weight(), 0.0);
    }

    #[test]
    fn zero_memory_strategy_param_is_rejected() {
        let cfg = VecturaConfig::new("docs").with_memory_strategy(MemoryStrategy::Indexed {
            candidate_multiplier: 0,
            batch_size: 10,
            max_concurrent_batches: 4,
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let mut search = SearchOptions::default();
        search.min_threshold = Some(2.0);
        let cfg = VecturaConfig::new("docs").with_search(search);
        assert!(cfg.validate().is_err());
    }
}
