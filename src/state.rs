// src/state.rs

use crate::constants::MAX_FAILURES;

/// A bounded count of consecutive ordinary failures.
///
/// The count never exceeds `max`; once it reaches `max` the counter reports
/// itself as exhausted and further failures are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureCounter {
    count: u32,
    max: u32,
}

impl FailureCounter {
    /// Creates a counter with the given budget. A budget of zero is raised to one,
    /// since a session that can never fail would give up before its first command.
    pub fn new(max: u32) -> Self {
        Self {
            count: 0,
            max: max.max(1),
        }
    }

    /// Consecutive failures so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The budget this counter was created with.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Records one ordinary failure and returns the new count.
    pub fn record_failure(&mut self) -> u32 {
        if self.count < self.max {
            self.count += 1;
        }
        self.count
    }

    /// Back to zero after a fully successful iteration.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// `true` once the budget is spent and the session must end.
    pub fn is_exhausted(&self) -> bool {
        self.count >= self.max
    }
}

impl Default for FailureCounter {
    fn default() -> Self {
        Self::new(MAX_FAILURES)
    }
}

/// State that lives for exactly one supervisor session.
#[derive(Debug, Default)]
pub struct Session {
    /// Consecutive ordinary failures.
    pub failures: FailureCounter,
    /// Iterations that went through the execution scope, whatever their outcome.
    pub iterations: u64,
}

impl Session {
    /// A fresh session with the given failure budget.
    pub fn new(max_failures: u32) -> Self {
        Self {
            failures: FailureCounter::new(max_failures),
            iterations: 0,
        }
    }
}
