use std::time::{Duration, Instant};

use crate::models::{ClockSnapshot, PlayerColor, TimeControl};

/// Countdown clock for one game.
///
/// The clock is a pure function of elapsed time: reads compute the active
/// side's remaining time from `last_tick` without mutating anything, and the
/// mutating methods are only ever called from inside the owning session's
/// serialized step.
#[derive(Debug, Clone)]
pub struct ChessClock {
    white_remaining: Duration,
    black_remaining: Duration,
    increment: Duration,
    active: Option<PlayerColor>,
    last_tick: Option<Instant>,
}

impl ChessClock {
    pub fn new(time_control: TimeControl) -> Self {
        let initial = Duration::from_secs(time_control.initial_time);
        ChessClock {
            white_remaining: initial,
            black_remaining: initial,
            increment: Duration::from_secs(time_control.increment),
            active: None,
            last_tick: None,
        }
    }

    /// The side whose time is currently running, if any.
    pub fn active(&self) -> Option<PlayerColor> {
        self.active
    }

    /// Start counting down for `color`. Idempotent over `last_tick`: the
    /// previous reference point is discarded.
    pub fn start(&mut self, color: PlayerColor, now: Instant) {
        self.active = Some(color);
        self.last_tick = Some(now);
    }

    /// Remaining time for `color` as observed at `now`, without mutating
    /// the clock. For the inactive side this is just the stored time.
    pub fn advance(&self, color: PlayerColor, now: Instant) -> Duration {
        let stored = self.stored(color);
        match (self.active, self.last_tick) {
            (Some(active), Some(last)) if active == color => {
                stored.saturating_sub(now.saturating_duration_since(last))
            }
            _ => stored,
        }
    }

    /// The active side whose remaining time has reached zero at `now`.
    pub fn flagged(&self, now: Instant) -> Option<PlayerColor> {
        self.active
            .filter(|color| self.advance(*color, now).is_zero())
    }

    /// Commit a completed move: deduct the mover's elapsed time, credit the
    /// increment, and hand the clock to the opponent.
    pub fn apply_move(&mut self, mover: PlayerColor, now: Instant) {
        let remaining = self.advance(mover, now) + self.increment;
        self.set_stored(mover, remaining);
        self.active = Some(mover.opponent());
        self.last_tick = Some(now);
    }

    /// Stop the clock permanently, committing the active side's elapsed
    /// time. Called exactly once, on the terminal transition.
    pub fn halt(&mut self, now: Instant) {
        if let Some(active) = self.active {
            let remaining = self.advance(active, now);
            self.set_stored(active, remaining);
        }
        self.active = None;
        self.last_tick = None;
    }

    pub fn snapshot(&self, now: Instant) -> ClockSnapshot {
        ClockSnapshot {
            white_ms: self.advance(PlayerColor::White, now).as_millis() as u64,
            black_ms: self.advance(PlayerColor::Black, now).as_millis() as u64,
            active: self.active,
        }
    }

    fn stored(&self, color: PlayerColor) -> Duration {
        match color {
            PlayerColor::White => self.white_remaining,
            PlayerColor::Black => self.black_remaining,
        }
    }

    fn set_stored(&mut self, color: PlayerColor, remaining: Duration) {
        match color {
            PlayerColor::White => self.white_remaining = remaining,
            PlayerColor::Black => self.black_remaining = remaining,
        }
    }
}
