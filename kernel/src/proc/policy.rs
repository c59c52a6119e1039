//! Scheduling policy: the tagged variant consumed by the ready heap to order processes.

use crate::param::DEFAULT_ALPHA;

/// The two supported scheduling disciplines. Closed and small by design (spec §9): this is not
/// meant to be open to arbitrary user-defined policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Shortest-Job-First, ordered by exponentially averaged predicted next burst.
    Sjf,
    /// Completely-Fair-Scheduler-like, ordered by accumulated execution time since last sleep.
    Cfs,
}

impl Algorithm {
    fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Algorithm::Sjf),
            1 => Some(Algorithm::Cfs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub algorithm: Algorithm,
    pub is_preemptive: bool,
    /// Weight, out of 100, given to the most recent burst in the SJF exponential average.
    /// Meaningless under CFS but kept so `chsched`'s reporting doesn't need a separate path.
    pub a: u32,
}

impl Policy {
    pub const fn default_policy() -> Self {
        Self {
            algorithm: Algorithm::Sjf,
            is_preemptive: false,
            a: DEFAULT_ALPHA,
        }
    }
}

/// `chsched`'s error codes, returned as-is across the syscall boundary (spec §6, §7).
pub const ERR_INVALID_ALGORITHM_OR_PREEMPTIVE: i32 = -2;
pub const ERR_INVALID_A: i32 = -3;

/// Validates raw `chsched(algorithm, is_preemptive, a)` arguments into a [`Policy`].
pub fn validate(algorithm: i32, is_preemptive: i32, a: i32) -> Result<Policy, i32> {
    let algorithm =
        Algorithm::from_raw(algorithm).ok_or(ERR_INVALID_ALGORITHM_OR_PREEMPTIVE)?;
    if is_preemptive < 0 {
        return Err(ERR_INVALID_ALGORITHM_OR_PREEMPTIVE);
    }
    if algorithm == Algorithm::Sjf && !(0..=100).contains(&a) {
        return Err(ERR_INVALID_A);
    }

    Ok(Policy {
        algorithm,
        is_preemptive: is_preemptive != 0,
        a: a.max(0) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_algorithm() {
        assert_eq!(validate(2, 0, 50), Err(ERR_INVALID_ALGORITHM_OR_PREEMPTIVE));
    }

    #[test]
    fn rejects_negative_preemptive() {
        assert_eq!(validate(0, -1, 50), Err(ERR_INVALID_ALGORITHM_OR_PREEMPTIVE));
    }

    #[test]
    fn rejects_out_of_range_a_only_under_sjf() {
        assert_eq!(validate(0, 0, 101), Err(ERR_INVALID_A));
        assert_eq!(validate(0, 0, -1), Err(ERR_INVALID_A));
        // CFS ignores `a`, so an out-of-range value is not rejected.
        assert!(validate(1, 0, 101).is_ok());
    }

    #[test]
    fn accepts_valid_sjf() {
        let p = validate(0, 1, 70).unwrap();
        assert_eq!(p.algorithm, Algorithm::Sjf);
        assert!(p.is_preemptive);
        assert_eq!(p.a, 70);
    }
}
