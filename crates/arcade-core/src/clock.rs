use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Discrete simulation step counter.
pub type Tick = u64;

/// Default nominal tick period.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(50);

/// Lifecycle of the clock. `Stopped` is terminal until `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockState {
    Idle,
    Running,
    Stopped,
}

/// Fixed-period tick source; the sole driver of simulated time.
///
/// The period is nominal: the host may deliver ticks late, but every tick is
/// still counted, so simulated time depends only on the number of ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    period: Duration,
    tick: Tick,
    state: ClockState,
}

impl Clock {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            tick: 0,
            state: ClockState::Idle,
        }
    }

    /// Clock running at `hz` ticks per second.
    pub fn from_rate(hz: f32) -> Self {
        if !hz.is_finite() || hz <= 0.0 {
            return Self::new(DEFAULT_TICK_PERIOD);
        }
        Self::new(Duration::from_nanos((1e9 / f64::from(hz)).round() as u64))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Begin emitting ticks. Has no effect once stopped.
    pub fn start(&mut self) {
        if self.state == ClockState::Idle {
            self.state = ClockState::Running;
        }
    }

    /// Emit the next tick, or `None` when the clock is not running.
    pub fn advance(&mut self) -> Option<Tick> {
        if !self.is_running() {
            return None;
        }
        self.tick += 1;
        Some(self.tick)
    }

    /// Stop permanently (until `reset`).
    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
    }

    pub fn reset(&mut self) {
        self.tick = 0;
        self.state = ClockState::Idle;
    }

    /// Simulated time elapsed since tick zero.
    pub fn elapsed(&self) -> Duration {
        ticks_to_duration(self.period, self.tick)
    }

    /// Number of whole ticks covering `duration` (rounded up).
    pub fn ticks_for(&self, duration: Duration) -> u32 {
        ticks_for(self.period, duration)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_PERIOD)
    }
}

/// Convert a duration into a tick count for the given period, rounding up.
pub fn ticks_for(period: Duration, duration: Duration) -> u32 {
    let period_ns = period.as_nanos().max(1);
    let ticks = duration.as_nanos().div_ceil(period_ns);
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

/// Simulated duration of `ticks` ticks at `period`.
pub fn ticks_to_duration(period: Duration, ticks: Tick) -> Duration {
    let nanos = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX);
    Duration::from_nanos(nanos.saturating_mul(ticks))
}
