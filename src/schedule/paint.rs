//! Per-display-frame paint decisions.
//!
//! Regeneration (pixel buffer to bitmap) is expensive and rate limited; redraw (blit
//! the current bitmap) is cheap and happens on the next frame after it is requested.
//! Any command may raise either flag; only the frame loop clears them.

use crate::foundation::error::{PixelwallError, PixelwallResult};

/// Regeneration cadence. `Idle` is the baseline outside playback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenSpeed {
    /// Outside playback.
    #[default]
    Idle,
    /// Playback at normal speed.
    X1,
    /// Playback at double speed.
    X2,
    /// Playback at quadruple speed.
    X4,
}

impl RegenSpeed {
    /// Wire speed code: 1, 2 or 4.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::X1),
            2 => Some(Self::X2),
            4 => Some(Self::X4),
            _ => None,
        }
    }
}

/// Interval lengths in milliseconds. 2x and 4x halve the 1x interval.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegenTiming {
    /// Interval at [`RegenSpeed::Idle`].
    pub idle_ms: f64,
    /// Interval at [`RegenSpeed::X1`].
    pub speed1x_ms: f64,
}

impl Default for RegenTiming {
    fn default() -> Self {
        Self {
            idle_ms: 1000.0,
            speed1x_ms: 1000.0 / 8.0,
        }
    }
}

impl RegenTiming {
    /// Validated timing; both intervals must be positive and finite.
    pub fn new(idle_ms: f64, speed1x_ms: f64) -> PixelwallResult<Self> {
        for (name, v) in [("idle", idle_ms), ("1x", speed1x_ms)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(PixelwallError::validation(format!(
                    "{name} regen interval must be positive, got {v}"
                )));
            }
        }
        Ok(Self {
            idle_ms,
            speed1x_ms,
        })
    }

    /// Interval between regens at `speed`.
    pub fn interval_ms(&self, speed: RegenSpeed) -> f64 {
        match speed {
            RegenSpeed::Idle => self.idle_ms,
            RegenSpeed::X1 => self.speed1x_ms,
            RegenSpeed::X2 => self.speed1x_ms / 2.0,
            RegenSpeed::X4 => self.speed1x_ms / 4.0,
        }
    }
}

/// What the current display frame should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameAction {
    /// Nothing is dirty, or the regen is not due yet.
    Nothing,
    /// Rebuild the bitmap, then draw both canvases.
    Regen,
    /// Draw the existing bitmap.
    Redraw,
}

/// Frame-loop state: dirty flags, regen speed and the timestamp of the last regen.
#[derive(Clone, Debug, Default)]
pub struct PaintScheduler {
    timing: RegenTiming,
    speed: RegenSpeed,
    needs_redraw: bool,
    needs_regen: bool,
    running: bool,
    last_tick: Option<f64>,
}

impl PaintScheduler {
    /// Stopped scheduler at idle speed.
    pub fn new(timing: RegenTiming) -> Self {
        Self {
            timing,
            ..Self::default()
        }
    }

    /// Start the frame loop. The next frame records the baseline.
    pub fn start(&mut self) {
        if !self.running {
            tracing::debug!("frame loop started");
        }
        self.running = true;
    }

    /// Stop the frame loop and forget the baseline.
    pub fn stop(&mut self) {
        self.running = false;
        self.last_tick = None;
    }

    /// Whether the frame loop is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Mark the canvases for a redraw of the current bitmap.
    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Mark the displayed buffer as changed since the last bitmap.
    pub fn request_regen(&mut self) {
        self.needs_regen = true;
    }

    /// Drop a pending regen request; a forced regen will rebuild the bitmap instead.
    pub fn cancel_regen(&mut self) {
        self.needs_regen = false;
    }

    /// A redraw is pending.
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// A regen is pending.
    pub fn needs_regen(&self) -> bool {
        self.needs_regen
    }

    /// Called once a freshly built bitmap has been drawn.
    pub fn bitmap_drawn(&mut self) {
        self.needs_redraw = false;
    }

    /// Current regen speed.
    pub fn speed(&self) -> RegenSpeed {
        self.speed
    }

    /// Change the regen speed; takes effect on the next frame.
    pub fn set_speed(&mut self, speed: RegenSpeed) {
        self.speed = speed;
    }

    /// Current regen interval.
    pub fn interval_ms(&self) -> f64 {
        self.timing.interval_ms(self.speed)
    }

    /// Decide this frame's work. The first frame after start only records the baseline
    /// timestamp. A regen is due when requested and at least one interval has passed
    /// since the previous one; `regen_blocked` defers it while another is in flight.
    pub fn plan_frame(&mut self, now_ms: f64, regen_blocked: bool) -> FrameAction {
        if !self.running {
            return FrameAction::Nothing;
        }
        let Some(last) = self.last_tick else {
            self.last_tick = Some(now_ms);
            return FrameAction::Nothing;
        };

        if self.needs_regen && !regen_blocked && now_ms - last >= self.interval_ms() {
            self.needs_regen = false;
            self.last_tick = Some(now_ms);
            tracing::trace!(now_ms, "regen");
            return FrameAction::Regen;
        }
        if self.needs_redraw {
            self.needs_redraw = false;
            tracing::trace!(now_ms, "redraw");
            return FrameAction::Redraw;
        }
        FrameAction::Nothing
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/paint.rs"]
mod tests;
