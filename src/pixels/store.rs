//! Live and playback pixel timelines.
//!
//! The live buffer is the realtime truth. A playback session copies the playback
//! origin into a separate buffer and moves it forward and backward through history;
//! the display source flag decides which of the two feeds the bitmap.

use crate::foundation::core::{ColorCode, Delta, MapSize, Rgb};
use crate::foundation::error::{PixelwallError, PixelwallResult};
use crate::pixels::buffer::PixelBuffer;
use crate::pixels::palette::Palette;

/// Which buffer drives the displayed bitmap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplaySource {
    /// The live buffer, fed by `update`.
    #[default]
    Live,
    /// The playback buffer, fed by `pbForward` / `pbRewind`.
    Playback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct JournalEntry {
    delta: Delta,
    prior: Rgb,
}

/// Owner of the live, playback-origin and playback buffers and the palette they
/// share.
///
/// The live buffer only ever changes through `update` style deltas; playback steps
/// never touch it.
#[derive(Clone, Debug, Default)]
pub struct PixelStore {
    palette: Option<Palette>,
    live: Option<PixelBuffer>,
    playback_origin: Option<PixelBuffer>,
    playback: Option<PixelBuffer>,
    journal: Vec<JournalEntry>,
    source: DisplaySource,
}

impl PixelStore {
    /// Empty store; nothing is displayable until [`init_live`](Self::init_live).
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the palette and the decoded live snapshot. Any previous playback state
    /// belongs to the old map and is dropped.
    pub fn init_live(&mut self, palette: Palette, live: PixelBuffer) {
        self.palette = Some(palette);
        self.live = Some(live);
        self.playback_origin = None;
        self.playback = None;
        self.journal.clear();
        self.source = DisplaySource::Live;
    }

    /// Palette installed with the live snapshot.
    pub fn palette(&self) -> PixelwallResult<&Palette> {
        self.palette
            .as_ref()
            .ok_or_else(|| PixelwallError::state("palette is not initialised"))
    }

    /// Map size, once the live snapshot is installed.
    pub fn size(&self) -> Option<MapSize> {
        self.live.as_ref().map(PixelBuffer::size)
    }

    /// Live buffer.
    pub fn live(&self) -> Option<&PixelBuffer> {
        self.live.as_ref()
    }

    /// Playback buffer, present between `pbStart` and `pbEnd`.
    pub fn playback(&self) -> Option<&PixelBuffer> {
        self.playback.as_ref()
    }

    /// Snapshot playback starts from.
    pub fn playback_origin(&self) -> Option<&PixelBuffer> {
        self.playback_origin.as_ref()
    }

    /// Buffer currently driving the display.
    pub fn source(&self) -> DisplaySource {
        self.source
    }

    /// Buffer currently feeding the bitmap.
    pub fn displayed(&self) -> Option<&PixelBuffer> {
        match self.source {
            DisplaySource::Live => self.live.as_ref(),
            DisplaySource::Playback => self.playback.as_ref(),
        }
    }

    /// Forward deltas that can still be rewound.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Apply deltas to the live buffer. Nothing is written if any delta is invalid.
    pub fn apply_live(&mut self, deltas: &[Delta]) -> PixelwallResult<()> {
        let palette = self
            .palette
            .as_ref()
            .ok_or_else(|| PixelwallError::state("palette is not initialised"))?;
        let live = self
            .live
            .as_mut()
            .ok_or_else(|| PixelwallError::state("live map is not initialised"))?;
        live.apply_deltas(deltas, palette)
    }

    /// Install the rewind origin for playback. It must match the live map size.
    pub fn set_playback_origin(&mut self, origin: PixelBuffer) -> PixelwallResult<()> {
        let size = self
            .size()
            .ok_or_else(|| PixelwallError::state("playback origin needs an initialised map"))?;
        if origin.size() != size {
            return Err(PixelwallError::validation(format!(
                "playback origin is {}x{}, map is {}x{}",
                origin.size().width,
                origin.size().height,
                size.width,
                size.height
            )));
        }
        self.playback_origin = Some(origin);
        Ok(())
    }

    /// Put the playback cursor at the origin and display the playback buffer.
    pub fn reset_playback(&mut self) -> PixelwallResult<()> {
        let origin = self
            .playback_origin
            .as_ref()
            .ok_or_else(|| PixelwallError::state("playback origin is not loaded"))?;
        match self.playback.as_mut() {
            Some(pb) => pb.copy_from(origin)?,
            None => self.playback = Some(origin.clone()),
        }
        self.journal.clear();
        self.source = DisplaySource::Playback;
        Ok(())
    }

    /// Discard the playback buffer and journal; the live buffer drives display again.
    /// The origin is kept so that `reverse` keeps working.
    pub fn end_playback(&mut self) {
        self.playback = None;
        self.journal.clear();
        self.source = DisplaySource::Live;
    }

    /// Apply forward deltas to the playback buffer, recording what each overwrote.
    pub fn forward(&mut self, deltas: &[Delta]) -> PixelwallResult<()> {
        let (palette, playback) = self.playback_parts()?;
        let prior = playback.swap_deltas(deltas, palette)?;
        self.journal.extend(
            deltas
                .iter()
                .zip(prior)
                .map(|(&delta, prior)| JournalEntry { delta, prior }),
        );
        Ok(())
    }

    /// Undo forward deltas. `deltas` is the list that was sent forward; it is walked
    /// last-first and each pair must match the journal top.
    pub fn rewind(&mut self, deltas: &[Delta]) -> PixelwallResult<()> {
        let playback = self
            .playback
            .as_mut()
            .ok_or_else(|| PixelwallError::state("playback has not started"))?;
        let journal_len = self.journal.len();
        if deltas.len() > journal_len {
            return Err(PixelwallError::protocol(format!(
                "rewind of {} deltas but only {} were played forward",
                deltas.len(),
                journal_len
            )));
        }
        let played = &self.journal[journal_len - deltas.len()..];
        for (d, entry) in deltas.iter().zip(played) {
            if entry.delta != *d {
                return Err(PixelwallError::protocol(format!(
                    "rewind pair ({},{}) does not match played pair ({},{})",
                    d.index, d.code, entry.delta.index, entry.delta.code
                )));
            }
        }

        for entry in self.journal.drain(journal_len - deltas.len()..).rev() {
            playback.set_pixel(entry.delta.index, entry.prior);
        }
        Ok(())
    }

    /// For each delta replayed over a scratch copy of the origin, the code of the colour
    /// it replaced.
    pub fn reverse_codes(&self, deltas: &[Delta]) -> PixelwallResult<Vec<ColorCode>> {
        let palette = self.palette()?;
        let mut scratch = self
            .playback_origin
            .clone()
            .ok_or_else(|| PixelwallError::state("reverse needs a loaded playback origin"))?;
        scratch
            .swap_deltas(deltas, palette)?
            .into_iter()
            .map(|rgb| {
                palette.reverse_of(rgb).ok_or_else(|| {
                    PixelwallError::validation(format!("colour {rgb} is not in the palette"))
                })
            })
            .collect()
    }

    fn playback_parts(&mut self) -> PixelwallResult<(&Palette, &mut PixelBuffer)> {
        let palette = self
            .palette
            .as_ref()
            .ok_or_else(|| PixelwallError::state("palette is not initialised"))?;
        let playback = self
            .playback
            .as_mut()
            .ok_or_else(|| PixelwallError::state("playback has not started"))?;
        Ok((palette, playback))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pixels/store.rs"]
mod tests;
