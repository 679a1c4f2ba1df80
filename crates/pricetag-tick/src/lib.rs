//! Countdown cadence for pricetag rounds.
//!
//! A [`RoundTimer`] produces one tick per period (one second in
//! production) while it is armed, and nothing at all while it is
//! disarmed. It does not know about rounds or scores: the room actor
//! decrements the session's countdown on each tick and decides when to
//! arm or disarm.
//!
//! # Integration
//!
//! The timer sits inside a room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* joins, guesses, ... */ }
//!         _ = timer.wait_for_tick() => {
//!             session.tick()?;
//!             // broadcast, then re-arm or disarm based on the new phase
//!         }
//!     }
//! }
//! ```
//!
//! Re-arming resets the schedule. That is how a round that resolves early
//! (everyone guessed) cancels the tick that was pending for it.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`RoundTimer`].
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Time between ticks. One second for a seconds countdown.
    pub period: Duration,
    /// Random delay (0..max) added to the very first tick a timer ever
    /// schedules, so rooms created together don't tick in lockstep.
    pub initial_jitter: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            initial_jitter: Duration::from_millis(2),
        }
    }
}

impl TimerConfig {
    /// A config with the given period and no jitter.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            initial_jitter: Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a tick, returned by [`RoundTimer::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Ticks since the timer was last armed (starts at 1).
    pub tick: u64,
    /// How late the tick fired compared to its schedule.
    pub late_by: Duration,
    /// Whole periods that passed unnoticed because the tick was late.
    /// They are not replayed: a countdown that stalls should not then
    /// jump several seconds at once.
    pub skipped: u64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// A re-armable periodic timer. One per room.
#[derive(Debug)]
pub struct RoundTimer {
    config: TimerConfig,
    /// When the next tick is due. `None` while disarmed.
    next_tick: Option<Instant>,
    /// Whether the initial jitter has been spent.
    jittered: bool,
    ticks_since_arm: u64,
    total_ticks: u64,
    total_skipped: u64,
}

impl RoundTimer {
    /// Creates a disarmed timer.
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            next_tick: None,
            jittered: false,
            ticks_since_arm: 0,
            total_ticks: 0,
            total_skipped: 0,
        }
    }

    /// Schedules the first tick one period from now, replacing whatever
    /// was scheduled before.
    pub fn arm(&mut self) {
        let mut delay = self.config.period;
        if !self.jittered {
            self.jittered = true;
            let max_us = self.config.initial_jitter.as_micros() as u64;
            if max_us > 0 {
                delay += Duration::from_micros(rand::rng().random_range(0..max_us));
            }
        }
        self.next_tick = Some(Instant::now() + delay);
        self.ticks_since_arm = 0;
        debug!(delay_ms = delay.as_millis() as u64, "round timer armed");
    }

    /// Stops ticking until the next [`arm`](Self::arm). Idempotent.
    pub fn disarm(&mut self) {
        if self.next_tick.take().is_some() {
            debug!(ticks = self.ticks_since_arm, "round timer disarmed");
        }
    }

    /// Waits until the next tick is due.
    ///
    /// While disarmed this future never resolves, which lets it sit in a
    /// `tokio::select!` next to the command channel.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let Some(due) = self.next_tick else {
            std::future::pending::<()>().await;
            unreachable!("pending future resolved");
        };

        time::sleep_until(due).await;

        let now = Instant::now();
        let period = self.config.period;
        let late_by = now.saturating_duration_since(due);
        let mut skipped = 0;
        if late_by > period / 10 {
            skipped = (late_by.as_nanos() / period.as_nanos().max(1)) as u64;
            warn!(
                late_ms = late_by.as_millis() as u64,
                skipped,
                "round timer fired late"
            );
        }

        // Schedule from now, not from the missed deadline.
        self.next_tick = Some(now + period);
        self.ticks_since_arm += 1;
        self.total_ticks += 1;
        self.total_skipped += skipped;
        trace!(tick = self.ticks_since_arm, "round timer tick");

        TickInfo {
            tick: self.ticks_since_arm,
            late_by,
            skipped,
        }
    }

    /// Whether a tick is currently scheduled.
    pub fn is_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Ticks since the last [`arm`](Self::arm).
    pub fn ticks_since_arm(&self) -> u64 {
        self.ticks_since_arm
    }

    /// Ticks over the timer's whole life.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Periods skipped over the timer's whole life.
    pub fn total_skipped(&self) -> u64 {
        self.total_skipped
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }
}

impl Default for RoundTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}
