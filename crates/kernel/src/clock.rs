use std::time::{Duration, Instant};

/// Scaled frame timing.
///
/// `delta` is the wall time between ticks times the multiplier; `elapsed` is
/// unscaled wall time since the first tick. Both are nondecreasing.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    first_tick: Option<Instant>,
    last_adjust: Option<Instant>,
    delta: f32,
    elapsed: f32,
    multiplier: f32,
}

impl FrameClock {
    pub const STEP: f32 = 0.1;
    pub const DEBOUNCE: Duration = Duration::from_millis(16);

    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            last: now,
            first_tick: None,
            last_adjust: None,
            delta: 0.0,
            elapsed: 0.0,
            multiplier: 1.0,
        }
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        let wall = now.saturating_duration_since(self.last);
        self.delta = wall.as_secs_f32() * self.multiplier;
        self.last = now;
        let first = *self.first_tick.get_or_insert(now);
        self.elapsed = now.saturating_duration_since(first).as_secs_f32();
    }

    pub fn speed_up(&mut self) -> bool {
        self.adjust_at(Instant::now(), Self::STEP)
    }

    pub fn slow_down(&mut self) -> bool {
        self.adjust_at(Instant::now(), -Self::STEP)
    }

    /// Nudge the multiplier by `step`. Adjustments closer together than
    /// [`DEBOUNCE`](Self::DEBOUNCE) are dropped; returns whether it applied.
    pub fn adjust_at(&mut self, now: Instant, step: f32) -> bool {
        if let Some(last) = self.last_adjust {
            if now.saturating_duration_since(last) < Self::DEBOUNCE {
                return false;
            }
        }
        self.last_adjust = Some(now);
        self.multiplier = (self.multiplier + step).max(0.0);
        tracing::debug!(multiplier = self.multiplier, "time multiplier changed");
        true
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_scaled_and_elapsed_is_not() {
        let t0 = Instant::now();
        let mut clock = FrameClock::starting_at(t0);
        clock.tick_at(t0);
        assert_eq!(clock.delta(), 0.0);
        assert!(clock.adjust_at(t0, 1.0));
        clock.tick_at(t0 + Duration::from_millis(500));
        assert!((clock.delta() - 1.0).abs() < 1e-4);
        assert!((clock.elapsed() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn adjustments_are_debounced() {
        let t0 = Instant::now();
        let mut clock = FrameClock::starting_at(t0);
        assert!(clock.adjust_at(t0, FrameClock::STEP));
        assert!(!clock.adjust_at(t0 + Duration::from_millis(5), FrameClock::STEP));
        assert!(clock.adjust_at(t0 + Duration::from_millis(20), FrameClock::STEP));
        assert!((clock.multiplier() - 1.2).abs() < 1e-5);
    }

    #[test]
    fn multiplier_never_negative() {
        let t0 = Instant::now();
        let mut clock = FrameClock::starting_at(t0);
        for i in 0..20 {
            clock.adjust_at(t0 + Duration::from_millis(20 * i), -FrameClock::STEP);
        }
        assert_eq!(clock.multiplier(), 0.0);
        clock.tick_at(t0 + Duration::from_secs(1));
        assert_eq!(clock.delta(), 0.0);
        assert!(clock.elapsed() >= 0.0);
    }
}
