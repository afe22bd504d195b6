//! Animation frame clock for Gamebox sessions.
//!
//! Table sessions only need a clock while a piece is gliding somewhere.
//! The [`FrameClock`] fires at a fixed rate while running and pends
//! forever while paused, so the session loop pauses it whenever the table
//! is at rest and costs nothing between moves.
//!
//! # Missed frames
//!
//! A frame that fires late never triggers a burst of catch-up frames. The
//! next deadline is scheduled from now, and the late frame's `dt` covers
//! the whole gap, so animations still finish on time.
//!
//! # Integration
//!
//! The clock sits inside the session loop's `tokio::select!`:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         event = host.poll_event(poll_interval) => { /* handle packets */ }
//!         frame = clock.wait_for_frame() => {
//!             if !table.animate(frame.dt_secs()) {
//!                 clock.pause();
//!             }
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Frame clock settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Frames per second. 0 disables the clock entirely.
    pub rate_hz: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { rate_hz: 60 }
    }
}

impl FrameConfig {
    /// Highest supported frame rate.
    pub const MAX_RATE_HZ: u32 = 240;

    pub fn with_rate(rate_hz: u32) -> Self {
        Self { rate_hz }
    }

    /// Caps `rate_hz` at [`Self::MAX_RATE_HZ`].
    pub fn validated(mut self) -> Self {
        if self.rate_hz > Self::MAX_RATE_HZ {
            debug!(
                rate = self.rate_hz,
                max = Self::MAX_RATE_HZ,
                "frame rate exceeds maximum, clamping"
            );
            self.rate_hz = Self::MAX_RATE_HZ;
        }
        self
    }

    /// Nominal length of one frame, or `None` when disabled.
    pub fn frame_duration(&self) -> Option<Duration> {
        (self.rate_hz > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(self.rate_hz)))
    }
}

// ---------------------------------------------------------------------------
// Frame info
// ---------------------------------------------------------------------------

/// One fired frame, returned by [`FrameClock::wait_for_frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Time this frame accounts for: one frame, plus any frames skipped
    /// because the loop woke late.
    pub dt: Duration,
    /// Whole frames skipped before this one.
    pub skipped: u64,
}

impl FrameInfo {
    /// `dt` in seconds, as the table's animation step expects.
    pub fn dt_secs(&self) -> f32 {
        self.dt.as_secs_f32()
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Fixed-rate frame clock with pause and resume.
pub struct FrameClock {
    config: FrameConfig,
    frame_duration: Option<Duration>,
    frame_count: u64,
    next_frame: Option<Instant>,
    paused: bool,
}

impl FrameClock {
    pub fn new(config: FrameConfig) -> Self {
        let config = config.validated();
        let frame_duration = config.frame_duration();
        let next_frame = frame_duration.map(|d| Instant::now() + d);

        debug!(
            rate_hz = config.rate_hz,
            frame_ms = ?frame_duration.map(|d| d.as_secs_f64() * 1000.0),
            "frame clock created"
        );

        Self {
            config,
            frame_duration,
            frame_count: 0,
            next_frame,
            paused: false,
        }
    }

    pub fn with_rate(rate_hz: u32) -> Self {
        Self::new(FrameConfig::with_rate(rate_hz))
    }

    /// Waits until the next frame is due.
    ///
    /// Pends forever while paused or when the rate is 0, which leaves the
    /// other branches of a `select!` free to run.
    pub async fn wait_for_frame(&mut self) -> FrameInfo {
        let (next, frame) = match (self.next_frame, self.frame_duration) {
            (Some(next), Some(frame)) if !self.paused => (next, frame),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.frame_count += 1;

        let late_by = now.saturating_duration_since(next);
        let skipped = (late_by.as_nanos() / frame.as_nanos()) as u64;
        self.next_frame = Some(now + frame);

        let dt = frame + late_by;
        if skipped > 0 {
            debug!(frame = self.frame_count, skipped, "frame clock woke late");
        }
        trace!(frame = self.frame_count, "frame fired");

        FrameInfo {
            frame: self.frame_count,
            dt,
            skipped,
        }
    }

    /// Stops firing frames until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            trace!(frame = self.frame_count, "frame clock paused");
        }
    }

    /// Starts firing again, one frame from now. Idempotent.
    ///
    /// The time spent paused is never charged to the next frame.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(frame) = self.frame_duration {
                self.next_frame = Some(Instant::now() + frame);
            }
            trace!(frame = self.frame_count, "frame clock resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the rate is 0 and no frame will ever fire.
    pub fn is_disabled(&self) -> bool {
        self.frame_duration.is_none()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn rate_hz(&self) -> u32 {
        self.config.rate_hz
    }

    pub fn frame_duration(&self) -> Option<Duration> {
        self.frame_duration
    }
}
