use std::time::{Duration, Instant};

/// Monotonic tick clock.
///
/// The first tick reports zero; later ticks report the wall time since the
/// previous one, clamped to `max_delta` so a backgrounded host does not make
/// animations jump.
#[derive(Clone, Debug)]
pub struct FrameClock {
    last: Option<Instant>,
    max_delta: Duration,
}

impl FrameClock {
    pub fn new(max_delta: Duration) -> Self {
        Self {
            last: None,
            max_delta,
        }
    }

    #[inline]
    pub fn max_delta(&self) -> Duration {
        self.max_delta
    }

    /// Seconds since the previous tick.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Same as [`FrameClock::tick`] with an explicit timestamp.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let delta = match self.last {
            Some(prev) => now.saturating_duration_since(prev),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        delta.min(self.max_delta).as_secs_f32()
    }

    /// Clamp an externally supplied delta the same way.
    pub fn clamp(&self, dt: f32) -> f32 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0.0;
        }
        dt.min(self.max_delta.as_secs_f32())
    }
}
