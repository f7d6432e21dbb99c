//! # Engine configuration.
//!
//! [`Config`] holds the settings an [`Engine`](crate::Engine) is built from.
//!
//! ## Sentinel values
//! - `pool_size = 0` → one slot per available CPU ([`Size::AvailableParallelism`])
//! - `task_timeout = 0s` → no per-task timeout
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use actvisor::{Config, Size};
//!
//! let mut cfg = Config::default();
//! cfg.pool_size = 4;
//! cfg.task_timeout = Duration::from_secs(5);
//!
//! assert_eq!(cfg.pool_capacity(), Size::Constant(4));
//! assert_eq!(cfg.default_timeout(), Some(Duration::from_secs(5)));
//! ```

use std::time::Duration;

use crate::group::DEFAULT_GROUP_NAME;
use crate::pool::Size;

/// Settings for an [`Engine`](crate::Engine).
///
/// All fields are public; prefer the accessors over checking sentinels by hand.
#[derive(Clone, Debug)]
pub struct Config {
    /// Name of the engine's task group (span field and report source).
    pub name: String,

    /// Worker pool capacity.
    ///
    /// - `0` = available parallelism
    /// - `n > 0` = at most `n` pool tasks run simultaneously
    pub pool_size: usize,

    /// Per-task timeout applied by [`Engine::pool`](crate::Engine::pool).
    ///
    /// - `Duration::ZERO` = no timeout
    pub task_timeout: Duration,

    /// Whether [`Engine::serve`](crate::Engine::serve) listens for termination signals.
    pub handle_signals: bool,
}

impl Config {
    /// Returns the pool capacity policy.
    #[inline]
    pub fn pool_capacity(&self) -> Size {
        if self.pool_size == 0 {
            Size::AvailableParallelism
        } else {
            Size::Constant(self.pool_size)
        }
    }

    /// Returns the per-task timeout as an `Option`.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.task_timeout.is_zero() {
            None
        } else {
            Some(self.task_timeout)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `name = "async.run"`
    /// - `pool_size = 0` (available parallelism)
    /// - `task_timeout = 0s` (none)
    /// - `handle_signals = true`
    fn default() -> Self {
        Self {
            name: DEFAULT_GROUP_NAME.to_string(),
            pool_size: 0,
            task_timeout: Duration::ZERO,
            handle_signals: true,
        }
    }
}
