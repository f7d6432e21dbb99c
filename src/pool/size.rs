use std::num::NonZeroUsize;

/// Capacity policy for a [`WorkerPool`](super::WorkerPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Size {
    /// Exactly `n` concurrent tasks (`0` is raised to `1`).
    Constant(usize),
    /// One slot per available CPU, as reported by the OS.
    #[default]
    AvailableParallelism,
}

impl Size {
    /// Resolves the policy to a concrete capacity (always ≥ 1).
    pub fn resolve(self) -> usize {
        match self {
            Size::Constant(n) => n.max(1),
            Size::AvailableParallelism => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}
