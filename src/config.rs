//! Scorer configuration: thread count plus the three parallelism axes.

/// Configuration error, fatal at scorer construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("number_of_threads must be at least 1")]
    ZeroThreads,
    #[error("{scorer} does not support {axis} parallelism")]
    UnsupportedAxis {
        scorer: &'static str,
        axis: &'static str,
    },
}

/// Scheduling choices for one scorer instance.
///
/// The three axes are orthogonal: `parallel_features` splits the feature
/// loop inside a single `score` call, `parallel_documents` dispatches
/// batches across threads, and `parallel_forest` parallelises the final
/// leaf-weight reduction. Not every scorer supports every axis; the
/// combination is checked when the scorer is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Size of the parallel region (>= 1).
    pub n_threads: usize,
    pub parallel_features: bool,
    pub parallel_documents: bool,
    pub parallel_forest: bool,
}

impl Config {
    /// Single-threaded scoring, all axes off.
    pub fn serial() -> Self {
        Self {
            n_threads: 1,
            parallel_features: false,
            parallel_documents: false,
            parallel_forest: false,
        }
    }

    /// Feature-loop parallelism with `n` threads.
    pub fn parallel_features(n: usize) -> Self {
        Self {
            n_threads: n,
            parallel_features: true,
            ..Self::serial()
        }
    }

    /// Batch-level document parallelism with `n` threads.
    pub fn parallel_documents(n: usize) -> Self {
        Self {
            n_threads: n,
            parallel_documents: true,
            ..Self::serial()
        }
    }

    /// Reduction parallelism with `n` threads.
    pub fn parallel_forest(n: usize) -> Self {
        Self {
            n_threads: n,
            parallel_forest: true,
            ..Self::serial()
        }
    }

    /// Check this configuration against a scorer's capabilities.
    pub(crate) fn validate(&self, caps: &Capabilities) -> Result<(), ConfigError> {
        if self.n_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.parallel_features && !caps.features {
            return Err(ConfigError::UnsupportedAxis {
                scorer: caps.scorer,
                axis: "feature",
            });
        }
        if self.parallel_documents && !caps.documents {
            return Err(ConfigError::UnsupportedAxis {
                scorer: caps.scorer,
                axis: "document",
            });
        }
        if self.parallel_forest && !caps.forest {
            return Err(ConfigError::UnsupportedAxis {
                scorer: caps.scorer,
                axis: "forest",
            });
        }
        Ok(())
    }
}

/// Which parallelism axes a scorer variant supports.
pub(crate) struct Capabilities {
    pub scorer: &'static str,
    pub features: bool,
    pub documents: bool,
    pub forest: bool,
}
