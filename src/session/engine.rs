use std::collections::VecDeque;
use std::sync::Arc;

use crate::assets::loader::{ImageLoader, PendingLoad};
use crate::foundation::core::{Delta, MapSize};
use crate::foundation::error::{PixelwallError, PixelwallResult};
use crate::pixels::buffer::PixelBuffer;
use crate::pixels::palette::Palette;
use crate::pixels::store::{DisplaySource, PixelStore};
use crate::protocol::ack::Ack;
use crate::protocol::command::{Command, SnapshotInit};
use crate::render::bitmap::Bitmap;
use crate::render::compositor::{Compositor, CompositorMode};
use crate::render::surface::Surface;
use crate::schedule::paint::{FrameAction, PaintScheduler, RegenSpeed, RegenTiming};
use crate::transform::viewport::{TransUpdate, Viewport};

/// Options controlling an [`Engine`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineOpts {
    /// Fixed minimap surface width.
    pub minimap_width: u32,
    /// Fixed minimap surface height.
    pub minimap_height: u32,
    /// Where bitmap regeneration runs.
    pub compositor: CompositorMode,
    /// Regen interval outside playback.
    pub idle_interval_ms: f64,
    /// Regen interval at playback speed 1x; 2x and 4x halve it.
    pub speed1x_interval_ms: f64,
}

impl Default for EngineOpts {
    fn default() -> Self {
        let timing = RegenTiming::default();
        Self {
            minimap_width: 256,
            minimap_height: 256,
            compositor: CompositorMode::Auto,
            idle_interval_ms: timing.idle_ms,
            speed1x_interval_ms: timing.speed1x_ms,
        }
    }
}

/// Lifecycle of the engine. Playback always returns to `Live`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineState {
    /// No map yet.
    #[default]
    Idle,
    /// Snapshot requested; waiting for the image and then `initLatestColors`.
    Initializing,
    /// Showing the live buffer with the frame loop running.
    Live,
    /// Playback origin requested or loaded, playback not started.
    PlaybackInit,
    /// Showing the playback buffer.
    Playback,
}

#[derive(Clone, Debug, PartialEq)]
enum RegenReason {
    /// Throttled by the frame loop. `tick` is fixed at submit time: only regens of the
    /// playback buffer advance the consumer's timeline.
    Scheduled { tick: bool },
    /// Issued by a command, bypassing the interval; the ack goes out once drawn.
    Forced(Option<Ack>),
}

/// Rendering engine for one map: pixel timelines, viewport, compositor and frame loop.
///
/// The host feeds it decoded commands ([`Engine::dispatch`]) and display refresh
/// timestamps ([`Engine::frame`]) from a single thread, and forwards the
/// acknowledgements collected by [`Engine::drain_acks`].
pub struct Engine {
    opts: EngineOpts,
    state: EngineState,
    store: PixelStore,
    viewport: Viewport,
    main: Box<dyn Surface>,
    minimap: Box<dyn Surface>,
    loader: Arc<dyn ImageLoader>,
    compositor: Compositor,
    scheduler: PaintScheduler,
    bitmap: Option<Bitmap>,

    snapshot_load: Option<(Palette, PendingLoad)>,
    origin_load: Option<PendingLoad>,
    in_flight: Option<RegenReason>,
    forced: VecDeque<Option<Ack>>,
    acks: Vec<Ack>,
}

impl Engine {
    /// Build an engine drawing onto `main` and `minimap` and loading snapshots
    /// through `loader`.
    pub fn new(
        opts: EngineOpts,
        main: Box<dyn Surface>,
        mut minimap: Box<dyn Surface>,
        loader: Arc<dyn ImageLoader>,
    ) -> PixelwallResult<Self> {
        let timing = RegenTiming::new(opts.idle_interval_ms, opts.speed1x_interval_ms)?;
        minimap.configure(&Viewport::fixed(opts.minimap_width, opts.minimap_height));
        let compositor = Compositor::new(opts.compositor)?;
        Ok(Self {
            opts,
            state: EngineState::Idle,
            store: PixelStore::new(),
            viewport: Viewport::default(),
            main,
            minimap,
            loader,
            compositor,
            scheduler: PaintScheduler::new(timing),
            bitmap: None,
            snapshot_load: None,
            origin_load: None,
            in_flight: None,
            forced: VecDeque::new(),
            acks: Vec::new(),
        })
    }

    /// Options the engine was built with.
    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Viewport of the main canvas.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Live buffer, once the snapshot is loaded.
    pub fn live_pixels(&self) -> Option<&PixelBuffer> {
        self.store.live()
    }

    /// Playback buffer, while playback is running.
    pub fn playback_pixels(&self) -> Option<&PixelBuffer> {
        self.store.playback()
    }

    /// Bitmap currently on screen.
    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    /// Current regen speed.
    pub fn regen_speed(&self) -> RegenSpeed {
        self.scheduler.speed()
    }

    /// Current regen interval in milliseconds.
    pub fn regen_interval_ms(&self) -> f64 {
        self.scheduler.interval_ms()
    }

    /// Regenerations started so far.
    pub fn regenerations(&self) -> u64 {
        self.compositor.regenerations()
    }

    /// A redraw is pending.
    pub fn needs_redraw(&self) -> bool {
        self.scheduler.needs_redraw()
    }

    /// A regen is pending.
    pub fn needs_regen(&self) -> bool {
        self.scheduler.needs_regen()
    }

    /// Take the acknowledgements emitted since the last call, oldest first.
    pub fn drain_acks(&mut self) -> Vec<Ack> {
        std::mem::take(&mut self.acks)
    }

    /// Decode and dispatch one wire line. Unknown commands are ignored.
    pub fn dispatch_line(&mut self, line: &str) -> PixelwallResult<()> {
        match Command::decode(line)? {
            Some(cmd) => self.dispatch(cmd),
            None => Ok(()),
        }
    }

    /// Apply one command. Errors leave the engine state unchanged.
    #[tracing::instrument(skip(self, cmd), fields(cmd = cmd.name(), state = ?self.state))]
    pub fn dispatch(&mut self, cmd: Command) -> PixelwallResult<()> {
        match cmd {
            Command::InitMapSnapshot(init) => self.init_map_snapshot(init),
            Command::InitLatestColors(deltas) => self.init_latest_colors(&deltas),
            Command::Trans(update) => self.trans(&update),
            Command::Update(deltas) => self.update(&deltas),
            Command::RedrawMinimap => {
                if let Some(bitmap) = self.bitmap.as_ref() {
                    self.minimap.draw_bitmap(
                        bitmap,
                        f64::from(self.opts.minimap_width),
                        f64::from(self.opts.minimap_height),
                    );
                }
                Ok(())
            }
            Command::PbInit { url } => self.pb_init(url),
            Command::PbStart => self.pb_start(),
            Command::PbPlayAgain => {
                self.require(EngineState::Playback, "pbPlayAgain")?;
                self.store.reset_playback()?;
                self.supersede_scheduled();
                self.force_regen(Some(Ack::Tick))
            }
            Command::PbForward(deltas) => {
                self.require(EngineState::Playback, "pbForward")?;
                self.store.forward(&deltas)?;
                self.scheduler.request_regen();
                Ok(())
            }
            Command::PbRewind(deltas) => {
                self.require(EngineState::Playback, "pbRewind")?;
                self.store.rewind(&deltas)?;
                self.scheduler.request_regen();
                Ok(())
            }
            Command::PbSpeed(code) => {
                match RegenSpeed::from_code(code) {
                    Some(speed) => self.scheduler.set_speed(speed),
                    None => tracing::debug!(code, "ignoring unknown playback speed"),
                }
                Ok(())
            }
            Command::PbEnd => self.pb_end(),
            Command::Reverse(deltas) => {
                let codes = self.store.reverse_codes(&deltas)?;
                self.acks.push(Ack::Reverse(codes));
                Ok(())
            }
        }
    }

    /// One display refresh: collect finished loads and regenerations, then let the
    /// paint scheduler regen or redraw.
    pub fn frame(&mut self, now_ms: f64) -> PixelwallResult<()> {
        self.poll_loads()?;
        self.pump_regen()?;

        let blocked = self.compositor.is_busy() || !self.forced.is_empty();
        match self.scheduler.plan_frame(now_ms, blocked) {
            FrameAction::Regen => {
                self.submit_regen(self.scheduled_regen())?;
                self.pump_regen()
            }
            FrameAction::Redraw => {
                self.redraw();
                Ok(())
            }
            FrameAction::Nothing => Ok(()),
        }
    }

    /// Block until every pending load and regeneration has been applied.
    pub fn settle(&mut self) -> PixelwallResult<()> {
        if let Some((palette, load)) = self.snapshot_load.take() {
            let res = load.wait();
            self.finish_snapshot(palette, res)?;
        }
        if let Some(load) = self.origin_load.take() {
            let res = load.wait();
            self.finish_origin(res)?;
        }
        loop {
            if let Some(res) = self.compositor.wait() {
                self.finish_regen(res)?;
            }
            self.pump_regen()?;
            if !self.compositor.is_busy() && self.forced.is_empty() {
                return Ok(());
            }
        }
    }

    /// Abort in-flight image loads. Their acknowledgements are never emitted.
    pub fn cancel_pending(&mut self) {
        if let Some((_, load)) = self.snapshot_load.take() {
            tracing::debug!(url = load.url(), "cancelling snapshot load");
            load.cancel();
        }
        if let Some(load) = self.origin_load.take() {
            tracing::debug!(url = load.url(), "cancelling playback origin load");
            load.cancel();
        }
    }

    /// Stop the frame loop, cancel loads and stop the compositor worker.
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
        self.cancel_pending();
        self.forced.clear();
        self.in_flight = None;
        self.compositor.shutdown();
    }

    fn init_map_snapshot(&mut self, init: SnapshotInit) -> PixelwallResult<()> {
        let SnapshotInit {
            view,
            size,
            palette,
            url,
        } = init;

        self.cancel_pending();
        self.forced.clear();
        if let Some(reason) = self.in_flight.as_mut() {
            // belongs to the previous map; let it draw but drop its ack
            *reason = RegenReason::Forced(None);
        }
        self.scheduler.stop();
        self.scheduler.set_speed(RegenSpeed::Idle);
        self.apply_viewport(&view)?;
        self.set_state(EngineState::Initializing);

        let load = PendingLoad::spawn(Arc::clone(&self.loader), url, size);
        self.snapshot_load = Some((palette, load));
        Ok(())
    }

    fn init_latest_colors(&mut self, deltas: &[Delta]) -> PixelwallResult<()> {
        self.require(EngineState::Initializing, "initLatestColors")?;
        if self.store.live().is_none() {
            return Err(PixelwallError::state(
                "initLatestColors before the snapshot was loaded",
            ));
        }
        self.store.apply_live(deltas)?;
        self.force_regen(Some(Ack::Inited))
    }

    fn trans(&mut self, update: &TransUpdate) -> PixelwallResult<()> {
        self.apply_viewport(update)?;
        self.scheduler.request_redraw();
        Ok(())
    }

    fn update(&mut self, deltas: &[Delta]) -> PixelwallResult<()> {
        self.store.apply_live(deltas)?;
        if self.store.source() == DisplaySource::Live {
            self.scheduler.request_regen();
        }
        Ok(())
    }

    fn pb_init(&mut self, url: String) -> PixelwallResult<()> {
        let size = self.map_size("pbInit")?;
        match self.state {
            EngineState::Live => self.set_state(EngineState::PlaybackInit),
            EngineState::PlaybackInit | EngineState::Playback => {}
            other => {
                return Err(PixelwallError::state(format!(
                    "pbInit is not allowed in state {other:?}"
                )));
            }
        }

        if let Some(old) = self.origin_load.take() {
            old.cancel();
        }
        let load = if url.is_empty() {
            PendingLoad::ready(url, Ok(PixelBuffer::blank(size)))
        } else {
            PendingLoad::spawn(Arc::clone(&self.loader), url, size)
        };
        self.origin_load = Some(load);
        self.poll_loads()
    }

    fn pb_start(&mut self) -> PixelwallResult<()> {
        if !matches!(
            self.state,
            EngineState::PlaybackInit | EngineState::Playback
        ) {
            return Err(PixelwallError::state(format!(
                "pbStart is not allowed in state {:?}",
                self.state
            )));
        }
        self.store.reset_playback()?;
        if self.scheduler.speed() == RegenSpeed::Idle {
            self.scheduler.set_speed(RegenSpeed::X1);
        }
        self.supersede_scheduled();
        self.set_state(EngineState::Playback);
        self.force_regen(Some(Ack::PbStarted))
    }

    fn pb_end(&mut self) -> PixelwallResult<()> {
        if !matches!(
            self.state,
            EngineState::PlaybackInit | EngineState::Playback
        ) {
            return Err(PixelwallError::state(format!(
                "pbEnd is not allowed in state {:?}",
                self.state
            )));
        }
        self.store.end_playback();
        self.supersede_scheduled();
        self.scheduler.set_speed(RegenSpeed::Idle);
        self.set_state(EngineState::Live);
        self.force_regen(None)
    }

    fn apply_viewport(&mut self, update: &TransUpdate) -> PixelwallResult<()> {
        let next = self.viewport.apply(update)?;
        self.main.configure(&next);
        self.viewport = next;
        Ok(())
    }

    fn poll_loads(&mut self) -> PixelwallResult<()> {
        let snapshot = self
            .snapshot_load
            .as_ref()
            .and_then(|(_, load)| load.try_take());
        if let Some(res) = snapshot
            && let Some((palette, _)) = self.snapshot_load.take()
        {
            self.finish_snapshot(palette, res)?;
        }

        let origin = self.origin_load.as_ref().and_then(PendingLoad::try_take);
        if let Some(res) = origin {
            self.origin_load = None;
            self.finish_origin(res)?;
        }
        Ok(())
    }

    fn finish_snapshot(
        &mut self,
        palette: Palette,
        res: PixelwallResult<PixelBuffer>,
    ) -> PixelwallResult<()> {
        let live = res.inspect_err(|e| tracing::warn!(error = %e, "snapshot load failed"))?;
        self.store.init_live(palette, live);
        self.bitmap = None;
        self.acks.push(Ack::InitedMapSnapshot);
        Ok(())
    }

    fn finish_origin(&mut self, res: PixelwallResult<PixelBuffer>) -> PixelwallResult<()> {
        let origin =
            res.inspect_err(|e| tracing::warn!(error = %e, "playback origin load failed"))?;
        self.store.set_playback_origin(origin)?;
        self.acks.push(Ack::PbInited);
        Ok(())
    }

    fn force_regen(&mut self, ack: Option<Ack>) -> PixelwallResult<()> {
        self.forced.push_back(ack);
        self.pump_regen()
    }

    /// Collect a finished regeneration and start queued forced ones while the
    /// compositor is free. Inline compositing completes within this call.
    fn pump_regen(&mut self) -> PixelwallResult<()> {
        loop {
            if let Some(res) = self.compositor.poll() {
                self.finish_regen(res)?;
            }
            if self.compositor.is_busy() {
                return Ok(());
            }
            match self.forced.pop_front() {
                Some(ack) => self.submit_regen(RegenReason::Forced(ack))?,
                None => return Ok(()),
            }
        }
    }

    fn scheduled_regen(&self) -> RegenReason {
        RegenReason::Scheduled {
            tick: self.state == EngineState::Playback,
        }
    }

    /// A forced regen of a different buffer is about to be queued: the in-flight
    /// scheduled regen (if any) no longer reports a tick and a pending one is dropped.
    fn supersede_scheduled(&mut self) {
        if let Some(RegenReason::Scheduled { tick }) = self.in_flight.as_mut() {
            *tick = false;
        }
        self.scheduler.cancel_regen();
    }

    fn submit_regen(&mut self, reason: RegenReason) -> PixelwallResult<()> {
        let pixels = self
            .store
            .displayed()
            .ok_or_else(|| PixelwallError::state("no pixel buffer to composite"))?;
        self.compositor.submit(pixels)?;
        self.in_flight = Some(reason);
        Ok(())
    }

    fn finish_regen(&mut self, res: PixelwallResult<Bitmap>) -> PixelwallResult<()> {
        let reason = self.in_flight.take();
        self.bitmap = Some(res?);
        self.redraw();
        self.scheduler.bitmap_drawn();

        match reason {
            Some(RegenReason::Scheduled { tick }) => {
                if tick {
                    self.acks.push(Ack::Tick);
                }
            }
            Some(RegenReason::Forced(Some(ack))) => {
                if ack == Ack::Inited {
                    self.set_state(EngineState::Live);
                    self.scheduler.start();
                }
                self.acks.push(ack);
            }
            Some(RegenReason::Forced(None)) | None => {}
        }
        Ok(())
    }

    /// Blit the current bitmap onto both canvases.
    fn redraw(&mut self) {
        let (Some(bitmap), Some(size)) = (self.bitmap.as_ref(), self.store.size()) else {
            return;
        };
        self.main.clear();
        self.main
            .draw_bitmap(bitmap, f64::from(size.width), f64::from(size.height));
        self.minimap.draw_bitmap(
            bitmap,
            f64::from(self.opts.minimap_width),
            f64::from(self.opts.minimap_height),
        );
    }

    fn map_size(&self, what: &str) -> PixelwallResult<MapSize> {
        self.store
            .size()
            .ok_or_else(|| PixelwallError::state(format!("{what} before the map was loaded")))
    }

    fn require(&self, state: EngineState, what: &str) -> PixelwallResult<()> {
        if self.state != state {
            return Err(PixelwallError::state(format!(
                "{what} needs state {state:?}, engine is {:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn set_state(&mut self, next: EngineState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "state transition");
            self.state = next;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/engine.rs"]
mod tests;
