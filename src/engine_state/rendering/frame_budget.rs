//! Per-frame time budget for mesh building.

use web_time::{Duration, Instant};

/// Tracks how much of a frame has been spent since [`FrameBudget::start_frame`].
///
/// Mesh building checks the budget before each rebuild and stops starting new
/// ones once it is exhausted, so a frame overruns by at most one rebuild.
#[derive(Debug, Clone)]
pub struct FrameBudget {
    frame_start: Instant,
    budget: Duration,
}

impl FrameBudget {
    pub fn new(budget: Duration) -> Self {
        Self {
            frame_start: Instant::now(),
            budget,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Restarts the clock at the beginning of a frame.
    pub fn start_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn set_budget(&mut self, budget: Duration) {
        self.budget = budget;
    }

    pub fn elapsed(&self) -> Duration {
        self.frame_start.elapsed()
    }

    /// Returns `true` once the elapsed frame time reaches the budget.
    pub fn is_exhausted(&self) -> bool {
        self.elapsed() >= self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_always_exhausted() {
        let mut budget = FrameBudget::new(Duration::ZERO);
        budget.start_frame();
        assert!(budget.is_exhausted());
    }

    #[test]
    fn test_large_budget_is_available() {
        let mut budget = FrameBudget::from_millis(60_000);
        budget.start_frame();
        assert!(!budget.is_exhausted());
        assert!(budget.elapsed() < budget.budget());
    }
}
