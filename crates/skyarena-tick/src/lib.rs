//! Fixed-cadence tick clock for Skyarena.
//!
//! Every arena actor owns one [`TickClock`]. The clock decides *when* the
//! arena ticks; what happens during a tick is the arena's business.
//!
//! Arenas tick slowly (once per second by default, the cadence of a
//! countdown display), so the clock favours predictability over precision:
//! a late wake-up never produces a burst of back-to-back ticks unless the
//! caller asks for it with [`MissedTickPolicy::Burst`].
//!
//! # Integration
//!
//! The clock sits inside an arena actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         info = clock.wait_for_tick() => {
//!             scheduler.run_tick(&mut arena, info.dt);
//!             clock.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the clock wakes up after one or more periods were missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissedTickPolicy {
    /// Forget the missed periods and schedule the next tick one period from now.
    #[default]
    Skip,
    /// Fire up to `max_burst` missed ticks back-to-back, then resynchronise.
    Burst {
        /// Hard cap on consecutive catch-up ticks.
        max_burst: u32,
    },
}

/// Configuration for a [`TickClock`].
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Time between two ticks.
    pub period: Duration,
    /// Behaviour after a late wake-up.
    pub policy: MissedTickPolicy,
    /// Upper bound of the random delay added to the *first* tick, so arenas
    /// loaded together do not tick in lockstep.
    pub initial_jitter: Duration,
    /// Fraction of the period (0.0–1.0) a tick may use before a warning is
    /// logged by [`TickClock::record_tick_end`].
    pub budget_warn_ratio: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            policy: MissedTickPolicy::default(),
            initial_jitter: Duration::from_millis(50),
            budget_warn_ratio: 0.5,
        }
    }
}

impl ClockConfig {
    /// Shortest period the clock accepts.
    pub const MIN_PERIOD: Duration = Duration::from_millis(10);

    /// Config ticking once every `period`, other fields defaulted.
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values. Called by [`TickClock::new`].
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_secs_f64() * 1000.0,
                min_ms = Self::MIN_PERIOD.as_secs_f64() * 1000.0,
                "tick period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        if self.initial_jitter > self.period {
            self.initial_jitter = self.period;
        }
        self.budget_warn_ratio = self.budget_warn_ratio.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`TickClock::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Nominal time covered by this tick (always the configured period).
    /// Countdowns subtract this, never wall-clock time.
    pub dt: Duration,
    /// `true` if the clock woke up more than 10% of a period late.
    pub late: bool,
    /// Periods dropped because of the lateness.
    pub skipped: u64,
}

/// Running counters kept by the clock.
#[derive(Debug, Clone, Default)]
pub struct ClockStats {
    /// Ticks fired.
    pub ticks: u64,
    /// Late wake-ups.
    pub late_ticks: u64,
    /// Periods dropped in total.
    pub skipped: u64,
    /// Longest tick body reported through `record_tick_end`.
    pub max_tick_time: Duration,
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Periodic tick source for a single arena.
pub struct TickClock {
    config: ClockConfig,
    tick_count: u64,
    next_tick: TokioInstant,
    /// Pending burst ticks to fire without sleeping.
    burst_left: u64,
    tick_start: Option<Instant>,
    paused: bool,
    stats: ClockStats,
}

impl TickClock {
    /// Create a clock. The first tick fires one period (plus jitter) from now.
    pub fn new(config: ClockConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_us = config.initial_jitter.as_micros() as u64;
            Duration::from_micros(rand::rng().random_range(0..=max_us))
        };

        debug!(
            period_ms = config.period.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "tick clock created"
        );

        Self {
            next_tick: TokioInstant::now() + config.period + jitter,
            config,
            tick_count: 0,
            burst_left: 0,
            tick_start: None,
            paused: false,
            stats: ClockStats::default(),
        }
    }

    /// Clock ticking every `period` with default settings.
    pub fn every(period: Duration) -> Self {
        Self::new(ClockConfig::every(period))
    }

    /// Wait until the next tick is due.
    ///
    /// While paused this future never resolves, so other `select!` branches
    /// keep running.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }

        let period = self.config.period;
        let mut late = false;
        let mut skipped = 0u64;

        if self.burst_left > 0 {
            self.burst_left -= 1;
        } else {
            let due = self.next_tick;
            time::sleep_until(due).await;

            let now = TokioInstant::now();
            let late_by = now.saturating_duration_since(due);
            late = late_by > period / 10;
            let behind = (late_by.as_nanos() / period.as_nanos()) as u64;

            match self.config.policy {
                MissedTickPolicy::Skip => {
                    skipped = behind;
                }
                MissedTickPolicy::Burst { max_burst } => {
                    self.burst_left = behind.min(u64::from(max_burst));
                    skipped = behind - self.burst_left;
                }
            }

            if skipped > 0 {
                warn!(
                    tick = self.tick_count + 1,
                    skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "arena tick fired late, dropping missed periods"
                );
            }
            self.next_tick = now + period;
        }

        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        self.stats.ticks += 1;
        self.stats.skipped += skipped;
        if late {
            self.stats.late_ticks += 1;
        }

        trace!(tick = self.tick_count, late, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt: period,
            late,
            skipped,
        }
    }

    /// Mark the end of the current tick body. Feeds the budget warning and
    /// `max_tick_time`. A call without a preceding tick is ignored.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();

        let ratio = elapsed.as_secs_f64() / self.config.period.as_secs_f64();
        if ratio >= self.config.budget_warn_ratio {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_pct = format!("{:.1}", ratio * 100.0),
                "arena tick is using most of its period"
            );
        }

        if elapsed > self.stats.max_tick_time {
            self.stats.max_tick_time = elapsed;
        }
    }

    /// Stop firing ticks until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.burst_left = 0;
            debug!(tick = self.tick_count, "tick clock paused");
        }
    }

    /// Resume after a pause. The next tick is one full period away.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = TokioInstant::now() + self.config.period;
            debug!(tick = self.tick_count, "tick clock resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    pub fn stats(&self) -> &ClockStats {
        &self.stats
    }
}
