//! Backoff schedule for the retry loop.
//!
//! [`Backoff`] is a lazy, finite iterator of `(attempt, wait)` pairs. Each
//! wait grows from the previous one by a factor drawn from `base_range`,
//! clamped to `[min_delay, max_delay]`, and the whole sequence is capped by
//! `max_total`. The scheduler never sleeps; the runner owns the waits.
//! Randomness comes in as raw bits from an injected closure so tests stay
//! deterministic.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Configuration for one retry schedule.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// The per-step growth factor is drawn uniformly from this range,
    /// de-synchronizing many jobs that start retrying together.
    pub base_range: (f64, f64),
    /// Budget on the sum of all waits the schedule will yield.
    pub max_total: Duration,
    /// Whether attempt 1 fires instantly (zero wait) or also waits.
    pub first_instant: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(1800),
            base_range: (1.5, 2.5),
            max_total: Duration::from_secs(21_600),
            first_instant: true,
        }
    }
}

impl BackoffConfig {
    /// Start a schedule with a clock-seeded generator.
    pub fn schedule(&self) -> Backoff<impl FnMut() -> u64> {
        Backoff::with_rng(self.clone(), seeded_rng())
    }
}

/// One slot in the schedule: attempt number (1-based) and the wait to
/// sleep after that attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub number: u32,
    pub wait: Duration,
}

pub struct Backoff<R> {
    cfg: BackoffConfig,
    attempt: u32,
    delay_secs: f64,
    yielded: Duration,
    exhausted: bool,
    rng: R,
}

impl<R: FnMut() -> u64> Backoff<R> {
    pub fn with_rng(cfg: BackoffConfig, rng: R) -> Self {
        let delay_secs = cfg.min_delay.as_secs_f64();
        Self {
            cfg,
            attempt: 0,
            delay_secs,
            yielded: Duration::ZERO,
            exhausted: false,
            rng,
        }
    }
}

impl<R: FnMut() -> u64> Iterator for Backoff<R> {
    type Item = Attempt;

    fn next(&mut self) -> Option<Attempt> {
        if self.exhausted {
            return None;
        }
        self.attempt += 1;

        let wait = if self.attempt == 1 {
            if self.cfg.first_instant {
                Duration::ZERO
            } else {
                self.cfg.min_delay
            }
        } else {
            let (lo, hi) = self.cfg.base_range;
            let base = lo + unit_interval((self.rng)()) * (hi - lo);
            self.delay_secs = (self.delay_secs * base).clamp(
                self.cfg.min_delay.as_secs_f64(),
                self.cfg.max_delay.as_secs_f64(),
            );
            Duration::from_secs_f64(self.delay_secs)
        };

        if self.yielded + wait > self.cfg.max_total {
            self.exhausted = true;
            return None;
        }
        self.yielded += wait;
        Some(Attempt {
            number: self.attempt,
            wait,
        })
    }
}

/// Map raw bits onto `[0, 1)` using the top 53 bits.
fn unit_interval(bits: u64) -> f64 {
    (bits >> 11) as f64 / (1u64 << 53) as f64
}

// xorshift64; seeded from the clock, state never zero.
fn seeded_rng() -> impl FnMut() -> u64 {
    let mut state = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9e37_79b9_7f4a_7c15)
        | 1;
    move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_cfg() -> BackoffConfig {
        BackoffConfig {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            base_range: (2.0, 2.0),
            max_total: Duration::from_secs(20),
            first_instant: true,
        }
    }

    // Any bits map to base 2.0 with a degenerate range.
    fn fixed_rng() -> impl FnMut() -> u64 {
        || 0
    }

    #[test]
    fn first_attempt_is_instant_when_configured() {
        let mut schedule = Backoff::with_rng(fast_cfg(), fixed_rng());
        let first = schedule.next().unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(first.wait, Duration::ZERO);
    }

    #[test]
    fn first_attempt_waits_min_delay_otherwise() {
        let cfg = BackoffConfig {
            first_instant: false,
            ..fast_cfg()
        };
        let mut schedule = Backoff::with_rng(cfg, fixed_rng());
        assert_eq!(schedule.next().unwrap().wait, Duration::from_secs(1));
    }

    #[test]
    fn waits_grow_exponentially_and_clamp_at_max() {
        let schedule = Backoff::with_rng(
            BackoffConfig {
                max_total: Duration::from_secs(1000),
                ..fast_cfg()
            },
            fixed_rng(),
        );
        let waits: Vec<u64> = schedule.take(6).map(|a| a.wait.as_secs()).collect();
        // 0, then 1*2, 2*2, 4*2, clamp at 8, 8.
        assert_eq!(waits, vec![0, 2, 4, 8, 8, 8]);
    }

    #[test]
    fn non_first_waits_stay_within_bounds() {
        let cfg = BackoffConfig {
            base_range: (0.1, 10.0),
            max_total: Duration::from_secs(10_000),
            ..fast_cfg()
        };
        let mut bits: u64 = 7;
        let schedule = Backoff::with_rng(cfg.clone(), move || {
            bits = bits.wrapping_mul(0x5851_f42d_4c95_7f2d).wrapping_add(1);
            bits
        });
        for attempt in schedule.take(50).skip(1) {
            assert!(attempt.wait >= cfg.min_delay, "wait below min: {attempt:?}");
            assert!(attempt.wait <= cfg.max_delay, "wait above max: {attempt:?}");
        }
    }

    #[test]
    fn cumulative_waits_never_exceed_budget() {
        let cfg = fast_cfg();
        let schedule = Backoff::with_rng(cfg.clone(), fixed_rng());
        let total: Duration = schedule.map(|a| a.wait).sum();
        assert!(total <= cfg.max_total);
    }

    #[test]
    fn schedule_is_finite_and_stays_exhausted() {
        let mut schedule = Backoff::with_rng(fast_cfg(), fixed_rng());
        let count = schedule.by_ref().count();
        // 0 + 2 + 4 + 8 = 14 fits; adding another 8 would exceed 20.
        assert_eq!(count, 4);
        assert!(schedule.next().is_none());
    }

    #[test]
    fn attempt_numbers_start_at_one_and_increase() {
        let schedule = Backoff::with_rng(fast_cfg(), fixed_rng());
        let numbers: Vec<u32> = schedule.map(|a| a.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn default_schedule_yields_attempts() {
        let cfg = BackoffConfig::default();
        let mut schedule = cfg.schedule();
        assert_eq!(schedule.next().unwrap().wait, Duration::ZERO);
        let second = schedule.next().unwrap();
        assert!(second.wait >= Duration::from_secs(30));
        assert!(second.wait <= Duration::from_secs(1800));
    }
}
