use std::time::Instant;

/// Frames per second, averaged over one-second periods.
pub struct FpsTimer {
    fps_period_start_time: Instant,
    fps: u32,
    elapsed_frames: u32,
}

impl Default for FpsTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsTimer {
    pub fn new() -> Self {
        FpsTimer {
            fps_period_start_time: Instant::now(),
            fps: 0,
            elapsed_frames: 0,
        }
    }

    /// Counts one frame and returns the rate of the last completed period.
    pub fn calculate(&mut self) -> u32 {
        self.elapsed_frames += 1;
        let elapsed = self.fps_period_start_time.elapsed().as_millis() as u32;
        if elapsed > 1000 {
            self.fps = self.elapsed_frames;
            self.fps_period_start_time = Instant::now();
            self.elapsed_frames = 0;
        }

        self.fps
    }

    pub fn frame_time_ms(&self) -> f32 {
        if self.fps == 0 {
            0.0
        } else {
            1000.0 / self.fps as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn reports_zero_before_first_period() {
        let mut timer = FpsTimer::new();

        assert_eq!(timer.calculate(), 0);
        assert_eq!(timer.frame_time_ms(), 0.0);
    }

    #[test]
    fn frame_time_follows_the_last_period() {
        let mut timer = FpsTimer::new();
        for _ in 0..49 {
            timer.calculate();
        }
        timer.fps_period_start_time = Instant::now()
            .checked_sub(Duration::from_millis(1500))
            .unwrap();

        assert_eq!(timer.calculate(), 50);
        assert_eq!(timer.frame_time_ms(), 20.0);
    }
}
