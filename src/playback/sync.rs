//! Render clock.
//!
//! Render mode steps a fixed `1/fps` per frame and derives each frame's time
//! from its index. Interactive mode paces to `fps` on the wall clock and
//! integrates the measured frame delta.

use std::thread;
use std::time::{Duration, Instant};

use crate::core::time::{from_frame_index, Seconds};

/// Clock state for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    pub index: u64,
    pub time: Seconds,
    pub dt: Seconds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMode {
    Fixed,
    WallClock,
}

/// Frame clock driving the render loop
#[derive(Debug)]
pub struct FrameClock {
    fps: u32,
    mode: ClockMode,
    current_time: Seconds,
    last_tick: Option<Instant>,
}

impl FrameClock {
    /// Deterministic clock for headless rendering
    pub fn fixed(fps: u32) -> Self {
        Self::new(fps, ClockMode::Fixed)
    }

    /// Real-time clock for interactive preview
    pub fn wall_clock(fps: u32) -> Self {
        Self::new(fps, ClockMode::WallClock)
    }

    fn new(fps: u32, mode: ClockMode) -> Self {
        Self {
            fps: fps.max(1),
            mode,
            current_time: 0.0,
            last_tick: None,
        }
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    pub fn frame_duration(&self) -> Seconds {
        1.0 / self.fps as f64
    }

    /// Advance to `index` and return its time and delta.
    /// The wall clock sleeps until a full frame duration has passed.
    pub fn tick(&mut self, index: u64) -> FrameTick {
        match self.mode {
            ClockMode::Fixed => {
                let time = from_frame_index(index, self.fps);
                self.current_time = time;
                FrameTick {
                    index,
                    time,
                    dt: self.frame_duration(),
                }
            }
            ClockMode::WallClock => {
                let (now, dt) = match self.last_tick {
                    Some(last) => {
                        let budget = Duration::from_secs_f64(self.frame_duration());
                        let elapsed = last.elapsed();
                        if elapsed < budget {
                            thread::sleep(budget - elapsed);
                        }
                        let now = Instant::now();
                        (now, now.duration_since(last).as_secs_f64())
                    }
                    None => (Instant::now(), 0.0),
                };
                self.last_tick = Some(now);
                self.current_time += dt;
                FrameTick {
                    index,
                    time: self.current_time,
                    dt,
                }
            }
        }
    }
}
