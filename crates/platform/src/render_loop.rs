//! Frame scheduling state: a `running` flag, a monotonic clock, FPS reporting.

use std::time::{Duration, Instant};

/// Monotonic clock that starts on first read.
#[derive(Debug, Default)]
pub struct Clock {
    start: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the first call.
    pub fn elapsed(&mut self) -> f32 {
        self.start.get_or_insert_with(Instant::now).elapsed().as_secs_f32()
    }
}

/// Per-frame data handed out by [`RenderLoop::begin_frame`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInfo {
    pub index: u64,
    /// Seconds since the first frame. Nothing animates from it yet.
    pub elapsed: f32,
}

#[derive(Debug)]
pub struct RenderLoop {
    running: bool,
    clock: Clock,
    frames: u64,
    show_fps: bool,
    last_report: f32,
    frames_at_report: u64,
}

impl RenderLoop {
    pub fn new(show_fps: bool) -> Self {
        Self {
            running: true,
            clock: Clock::new(),
            frames: 0,
            show_fps,
            last_report: 0.0,
            frames_at_report: 0,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames started so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn stop(&mut self) {
        if self.running {
            log::info!("Render loop stopped after {} frames", self.frames);
        }
        self.running = false;
    }

    /// `None` once stopped.
    pub fn begin_frame(&mut self) -> Option<FrameInfo> {
        if !self.running {
            return None;
        }
        let elapsed = self.clock.elapsed();
        let info = FrameInfo {
            index: self.frames,
            elapsed,
        };
        self.frames += 1;
        self.report_fps(elapsed);
        Some(info)
    }

    fn report_fps(&mut self, elapsed: f32) {
        const PERIOD: Duration = Duration::from_secs(1);
        if !self.show_fps {
            return;
        }
        let window = elapsed - self.last_report;
        if window < PERIOD.as_secs_f32() {
            return;
        }
        let frames = self.frames - self.frames_at_report;
        log::info!(
            "FPS: {:.1} ({} frames, {:.1}s elapsed)",
            frames as f32 / window,
            self.frames,
            elapsed
        );
        self.last_report = elapsed;
        self.frames_at_report = self.frames;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let mut clock = Clock::new();
        let a = clock.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        let b = clock.elapsed();
        assert!(a >= 0.0);
        assert!(b > a);
    }

    #[test]
    fn frames_count_until_stopped() {
        let mut lp = RenderLoop::new(false);
        assert!(lp.is_running());
        let first = lp.begin_frame().expect("running");
        let second = lp.begin_frame().expect("running");
        assert_eq!((first.index, second.index), (0, 1));
        assert!(second.elapsed >= first.elapsed);

        lp.stop();
        assert!(!lp.is_running());
        assert!(lp.begin_frame().is_none());
        assert_eq!(lp.frames(), 2);
    }
}
