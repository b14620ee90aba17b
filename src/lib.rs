//! pixelwall renders a collaborative pixel-art map and replays its history.
//!
//! The engine keeps a raw RGBA buffer of the map in sync with a stream of sparse
//! colour changes and paints it onto a main canvas and a minimap without tearing.
//! A playback mode scrubs a separate buffer forward and backward through history.
//!
//! # Pipeline overview
//!
//! 1. **Command**: a wire line is decoded once into a [`Command`].
//! 2. **Mutate**: the [`Engine`] updates its [`PixelStore`] or [`Viewport`] and raises
//!    dirty flags on the [`PaintScheduler`].
//! 3. **Regen**: on a display frame, at most once per regen interval, the
//!    [`Compositor`] turns the displayed buffer into an immutable [`Bitmap`].
//! 4. **Redraw**: the bitmap is blitted onto both [`Surface`]s.
//! 5. **Ack**: progress is reported back as [`Ack`] values.
//!
//! Everything runs on the host's thread except image decoding and, in worker mode,
//! bitmap encoding; their results are picked up on later frames.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod assets;
mod foundation;
mod pixels;
mod protocol;
mod render;
mod schedule;
mod session;
mod transform;

pub use assets::decode::{decode_snapshot, fit_snapshot};
pub use assets::loader::{FsImageLoader, ImageLoader, MemoryImageLoader, PendingLoad};
pub use foundation::core::{Affine, ColorCode, Delta, MapSize, Rgb, Vec2};
pub use foundation::error::{PixelwallError, PixelwallResult};
pub use pixels::buffer::PixelBuffer;
pub use pixels::palette::{MAX_PALETTE_LEN, Palette};
pub use pixels::store::{DisplaySource, PixelStore};
pub use protocol::ack::Ack;
pub use protocol::command::{Command, SnapshotInit, decode_deltas};
pub use render::bitmap::Bitmap;
pub use render::compositor::{Compositor, CompositorMode};
pub use render::surface::{RasterSurface, Surface};
pub use schedule::paint::{FrameAction, PaintScheduler, RegenSpeed, RegenTiming};
pub use session::engine::{Engine, EngineOpts, EngineState};
pub use transform::viewport::{TransUpdate, Viewport};
