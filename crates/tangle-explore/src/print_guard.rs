//! Logarithmic throttle for iteration progress lines.
//!
//! Every iteration is announced up to 10, every 10th up to 100, every 100th up
//! to 1000, and so on. The guard only ever grows.

/// Decides which iteration headers are printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintGuard {
    guard: u64,
}

impl PrintGuard {
    pub fn new() -> Self {
        Self { guard: 1 }
    }

    /// Current throttle value (a power of ten).
    pub fn value(&self) -> u64 {
        self.guard
    }

    /// Returns true if the header for the 1-based `iteration` should be
    /// printed, raising the guard first when `iteration` has outgrown it.
    pub fn should_print(&mut self, iteration: u64) -> bool {
        if iteration > self.guard.saturating_mul(10) {
            // `iteration` > 10 here, so ilog10 is at least 1.
            self.guard = 10u64.pow(iteration.ilog10());
        }
        iteration % self.guard == 0
    }
}

impl Default for PrintGuard {
    fn default() -> Self {
        Self::new()
    }
}
