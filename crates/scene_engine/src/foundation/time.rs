//! Frame timing
//!
//! [`FrameTimer`] measures the milliseconds elapsed between ticks and gates
//! rendering to a fixed rate: the host ticks it as often as it likes and only
//! advances animations and renders a frame when [`FrameTimer::ready`] is set.

use std::time::{Duration, Instant};

/// Millisecond frame clock with a render-rate gate
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last_tick: Instant,
    period_ms: f32,
    accumulated_ms: f32,
    delta_ms: f32,
    ready: bool,
    frame_count: u64,
}

impl FrameTimer {
    /// Create a timer that becomes ready `rate_hz` times per second
    ///
    /// A rate of zero is treated as one frame per second.
    pub fn new(rate_hz: u32) -> Self {
        Self {
            last_tick: Instant::now(),
            period_ms: Self::period_for(rate_hz),
            accumulated_ms: 0.0,
            delta_ms: 0.0,
            ready: false,
            frame_count: 0,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn period_for(rate_hz: u32) -> f32 {
        1000.0 / rate_hz.max(1) as f32
    }

    /// Change the render rate
    pub fn set_rate(&mut self, rate_hz: u32) {
        self.period_ms = Self::period_for(rate_hz);
    }

    /// Render period in milliseconds
    pub fn period_ms(&self) -> f32 {
        self.period_ms
    }

    /// Sample the wall clock and advance by the time since the last tick
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.advance(elapsed)
    }

    /// Advance by an explicit duration
    ///
    /// Returns the milliseconds accumulated towards the current frame. When
    /// the accumulated time reaches the render period the timer becomes
    /// ready and [`FrameTimer::take_frame`] hands out the frame delta.
    pub fn advance(&mut self, elapsed: Duration) -> f32 {
        self.accumulated_ms += elapsed.as_secs_f32() * 1000.0;
        self.ready = self.accumulated_ms >= self.period_ms;
        self.accumulated_ms
    }

    /// Whether a frame is due
    pub fn ready(&self) -> bool {
        self.ready
    }

    /// Consume the pending frame, returning its elapsed milliseconds
    ///
    /// Returns `None` when no frame is due.
    pub fn take_frame(&mut self) -> Option<f32> {
        if !self.ready {
            return None;
        }

        self.delta_ms = self.accumulated_ms;
        self.accumulated_ms = 0.0;
        self.ready = false;
        self.frame_count += 1;
        Some(self.delta_ms)
    }

    /// Milliseconds covered by the last consumed frame
    pub fn delta_ms(&self) -> f32 {
        self.delta_ms
    }

    /// Number of frames consumed so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_period_from_rate() {
        assert_relative_eq!(FrameTimer::new(50).period_ms(), 20.0);
        assert_relative_eq!(FrameTimer::new(0).period_ms(), 1000.0);
    }

    #[test]
    fn test_ready_after_period_elapses() {
        let mut timer = FrameTimer::new(50);
        timer.advance(Duration::from_millis(10));
        assert!(!timer.ready());
        assert_eq!(timer.take_frame(), None);

        timer.advance(Duration::from_millis(15));
        assert!(timer.ready());
        let delta = timer.take_frame().unwrap();
        assert_relative_eq!(delta, 25.0, epsilon = 1e-3);
        assert!(!timer.ready());
        assert_eq!(timer.frame_count(), 1);
    }
}
