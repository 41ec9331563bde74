// ============================================================
// Layer 5: Learning-Rate Schedule
// ============================================================
// The rate used during epoch e (1-based) is a pure function of e:
//
//   e <  10          base rate
//   e == 10          reset to 0.1
//   e >= 18          × 0.9 per epoch, as long as the rate going
//                    into that epoch is still ≥ 0.1 · 0.9⁶
//
// The guard is tested before multiplying, so the last decay
// takes the rate one step below the floor and it stays there.
// rate_at replays the epoch-by-epoch recurrence rather than
// using a closed form, so the float sequence is exactly the
// one a stepwise update produces.

pub const DROP_EPOCH: usize = 10;
pub const RATE_AFTER_DROP: f64 = 0.1;
pub const DECAY_START_EPOCH: usize = 18;
pub const DECAY_FACTOR: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningRateSchedule {
    base: f64,
}

impl LearningRateSchedule {
    pub fn new(base: f64) -> Self {
        Self { base }
    }

    /// Decay continues while the incoming rate is at least this.
    pub fn decay_floor() -> f64 {
        RATE_AFTER_DROP * DECAY_FACTOR.powf(6.0)
    }

    /// Rate in effect during `epoch`. Epoch 0 (before training) is the base rate.
    pub fn rate_at(&self, epoch: usize) -> f64 {
        (1..=epoch).fold(self.base, |rate, e| Self::advance(rate, e))
    }

    fn advance(rate: f64, epoch: usize) -> f64 {
        let rate = if epoch == DROP_EPOCH { RATE_AFTER_DROP } else { rate };
        if epoch >= DECAY_START_EPOCH && rate >= Self::decay_floor() {
            rate * DECAY_FACTOR
        } else {
            rate
        }
    }
}
