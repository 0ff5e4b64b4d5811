//! Integration tests for the arena tick clock.
//!
//! Uses `start_paused = true` so Tokio auto-advances time and
//! `sleep_until` resolves instantly.

use std::time::Duration;

use skyarena_tick::{ClockConfig, MissedTickPolicy, TickClock};

// =========================================================================
// Helpers
// =========================================================================

fn one_second() -> ClockConfig {
    ClockConfig {
        initial_jitter: Duration::ZERO,
        ..ClockConfig::every(Duration::from_secs(1))
    }
}

// =========================================================================
// ClockConfig
// =========================================================================

#[test]
fn test_default_config_ticks_every_second() {
    let cfg = ClockConfig::default();
    assert_eq!(cfg.period, Duration::from_secs(1));
    assert_eq!(cfg.policy, MissedTickPolicy::Skip);
}

#[test]
fn test_validated_clamps_tiny_period() {
    let cfg = ClockConfig::every(Duration::from_millis(1)).validated();
    assert_eq!(cfg.period, ClockConfig::MIN_PERIOD);
}

#[test]
fn test_validated_caps_jitter_and_ratio() {
    let cfg = ClockConfig {
        period: Duration::from_millis(100),
        initial_jitter: Duration::from_secs(5),
        budget_warn_ratio: 3.0,
        ..ClockConfig::default()
    }
    .validated();
    assert_eq!(cfg.initial_jitter, Duration::from_millis(100));
    assert_eq!(cfg.budget_warn_ratio, 1.0);
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_ticks_are_numbered_from_one() {
    let mut clock = TickClock::new(one_second());

    for expected in 1..=4 {
        let info = clock.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        assert_eq!(info.dt, Duration::from_secs(1));
        assert!(!info.late);
        assert_eq!(info.skipped, 0);
    }
    assert_eq!(clock.tick_count(), 4);
    assert_eq!(clock.stats().ticks, 4);
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_waits_one_period() {
    let mut clock = TickClock::new(one_second());
    let start = tokio::time::Instant::now();

    clock.wait_for_tick().await;

    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_skip_policy_drops_missed_periods() {
    let mut clock = TickClock::new(one_second());
    clock.wait_for_tick().await;

    // Stall for three and a half periods.
    tokio::time::advance(Duration::from_millis(4_500)).await;

    let info = clock.wait_for_tick().await;
    assert!(info.late);
    assert_eq!(info.skipped, 3);
    assert_eq!(clock.stats().skipped, 3);
    assert_eq!(clock.stats().late_ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_burst_policy_replays_capped_ticks() {
    let mut clock = TickClock::new(ClockConfig {
        policy: MissedTickPolicy::Burst { max_burst: 2 },
        ..one_second()
    });
    clock.wait_for_tick().await;

    tokio::time::advance(Duration::from_millis(4_500)).await;

    let late = clock.wait_for_tick().await;
    assert!(late.late);
    assert_eq!(late.skipped, 1, "3 behind, 2 replayed, 1 dropped");

    // The two burst ticks fire without any time passing.
    let before = tokio::time::Instant::now();
    let b1 = clock.wait_for_tick().await;
    let b2 = clock.wait_for_tick().await;
    assert_eq!(before, tokio::time::Instant::now());
    assert_eq!((b1.tick, b2.tick), (3, 4));
}

// =========================================================================
// Pause / resume
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_paused_clock_never_fires() {
    let mut clock = TickClock::new(one_second());
    clock.pause();
    assert!(clock.is_paused());

    let result = tokio::time::timeout(Duration::from_secs(30), clock.wait_for_tick()).await;
    assert!(result.is_err(), "paused clock should pend");
    assert_eq!(clock.tick_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_resume_restarts_a_full_period() {
    let mut clock = TickClock::new(one_second());
    clock.wait_for_tick().await;

    clock.pause();
    tokio::time::advance(Duration::from_secs(10)).await;
    clock.resume();

    let info = clock.wait_for_tick().await;
    assert_eq!(info.tick, 2);
    assert!(!info.late, "time spent paused is not lateness");
}

#[tokio::test]
async fn test_pause_resume_idempotent() {
    let mut clock = TickClock::new(one_second());
    clock.pause();
    clock.pause();
    assert!(clock.is_paused());
    clock.resume();
    clock.resume();
    assert!(!clock.is_paused());
}

// =========================================================================
// Tick body accounting
// =========================================================================

#[test]
fn test_record_tick_end_without_tick_is_noop() {
    let mut clock = TickClock::new(one_second());
    clock.record_tick_end();
    assert_eq!(clock.stats().max_tick_time, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_tracks_max_tick_time() {
    let mut clock = TickClock::new(one_second());
    clock.wait_for_tick().await;
    // record_tick_end measures wall-clock time, not Tokio time.
    std::thread::sleep(Duration::from_micros(50));
    clock.record_tick_end();

    assert!(clock.stats().max_tick_time > Duration::ZERO);
}

// =========================================================================
// select! loop pattern (mirrors the arena actor)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_pattern() {
    let mut clock = TickClock::new(one_second());
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(4);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        tx.send("unload").await.ok();
    });

    let mut ticks = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "unload");
                break;
            }
            info = clock.wait_for_tick() => {
                ticks += 1;
                clock.record_tick_end();
                assert_eq!(info.tick, ticks);
            }
        }
    }

    assert_eq!(ticks, 3);
}
