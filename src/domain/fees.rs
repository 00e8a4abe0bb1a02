//! Priority Fee Escalation Schedule
//!
//! The escalation multiplier and ceiling are first-class values so the
//! termination condition of the landing loop can be tested without a network.

use serde::{Deserialize, Serialize};

/// Geometric priority-fee ladder, in total lamports per transaction.
///
/// An attempt is permitted while its fee is within the ceiling; escalation
/// multiplies the fee and the loop stops before the first fee that would
/// exceed `max_fee`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Fee for the first attempt when the live network estimate is lower
    pub first_fee: u64,
    /// Escalation multiplier, must be > 1
    pub multiplier: f64,
    /// Hard ceiling; a candidate fee above this terminates the loop
    pub max_fee: u64,
}

impl FeeSchedule {
    pub fn new(first_fee: u64, multiplier: f64, max_fee: u64) -> Self {
        Self {
            first_fee,
            multiplier,
            max_fee,
        }
    }

    /// Whether an attempt at this fee is still within the ceiling.
    pub fn within_ceiling(&self, fee: u64) -> bool {
        fee <= self.max_fee
    }

    /// The escalated fee following `current`. Rounds up so a multiplier > 1
    /// always produces a strictly larger fee.
    pub fn next_fee(&self, current: u64) -> u64 {
        let next = (current as f64 * self.multiplier).ceil() as u64;
        next.max(current + 1)
    }

    /// The full ladder of fees that would be attempted starting from `seed`.
    pub fn ladder(&self, seed: u64) -> Vec<u64> {
        let mut fees = Vec::new();
        let mut fee = seed;
        while self.within_ceiling(fee) {
            fees.push(fee);
            fee = self.next_fee(fee);
        }
        fees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_stops_before_ceiling() {
        // 100 -> 200 -> 400 are attempted; 800 exceeds 750 and is never tried
        let schedule = FeeSchedule::new(100, 2.0, 750);
        assert_eq!(schedule.ladder(100), vec![100, 200, 400]);
    }

    #[test]
    fn test_next_fee_strictly_increases() {
        let schedule = FeeSchedule::new(1, 1.0001, u64::MAX);
        assert!(schedule.next_fee(1) > 1);
        assert!(schedule.next_fee(0) > 0);
    }

    #[test]
    fn test_seed_above_ceiling_yields_no_attempts() {
        let schedule = FeeSchedule::new(100, 2.0, 750);
        assert!(schedule.ladder(800).is_empty());
    }

    #[test]
    fn test_ceiling_is_inclusive() {
        let schedule = FeeSchedule::new(100, 2.0, 400);
        assert_eq!(schedule.ladder(100), vec![100, 200, 400]);
    }
}
