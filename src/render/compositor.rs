//! Pixel buffer to bitmap conversion.
//!
//! At most one regeneration is in flight. The caller submits a job, keeps painting
//! with the previous bitmap and collects the new one with [`Compositor::poll`] on a
//! later frame. In inline mode the job completes during `submit` and is handed out by
//! the next `poll`; in worker mode a dedicated thread builds the bitmap.

use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::foundation::core::MapSize;
use crate::foundation::error::{PixelwallError, PixelwallResult};
use crate::pixels::buffer::PixelBuffer;
use crate::render::bitmap::Bitmap;

/// Where bitmap encoding runs. `Auto` is resolved once when the compositor is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositorMode {
    /// Build on the caller's thread during `submit`.
    Inline,
    /// Build on a dedicated thread.
    Worker,
    /// Worker when more than one CPU is available, inline otherwise.
    #[default]
    Auto,
}

impl CompositorMode {
    /// Replace `Auto` with the concrete mode for this machine.
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto => {
                let cores = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1);
                if cores > 1 { Self::Worker } else { Self::Inline }
            }
            other => other,
        }
    }
}

struct Job {
    size: MapSize,
    rgba: Vec<u8>,
    generation: u64,
}

struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    results: mpsc::Receiver<PixelwallResult<Bitmap>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn() -> PixelwallResult<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (res_tx, res_rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("pixelwall-compositor".into())
            .spawn(move || {
                for job in job_rx {
                    if res_tx.send(build_bitmap(job)).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| PixelwallError::Other(anyhow::anyhow!("spawn compositor thread: {e}")))?;
        Ok(Self {
            jobs: Some(job_tx),
            results: res_rx,
            handle: Some(handle),
        })
    }

    fn shutdown(&mut self) {
        self.jobs = None;
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("compositor thread panicked");
        }
    }
}

/// Turns pixel buffers into [`Bitmap`]s, one at a time.
pub struct Compositor {
    mode: CompositorMode,
    worker: Option<Worker>,
    inline_result: Option<PixelwallResult<Bitmap>>,
    busy: bool,
    submitted: u64,
}

impl Compositor {
    /// Resolve `mode` and start the worker thread if needed.
    pub fn new(mode: CompositorMode) -> PixelwallResult<Self> {
        let mode = mode.resolve();
        let worker = match mode {
            CompositorMode::Worker => Some(Worker::spawn()?),
            _ => None,
        };
        tracing::debug!(?mode, "compositor ready");
        Ok(Self {
            mode,
            worker,
            inline_result: None,
            busy: false,
            submitted: 0,
        })
    }

    /// Resolved mode.
    pub fn mode(&self) -> CompositorMode {
        self.mode
    }

    /// A job was submitted and its bitmap not collected yet.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Number of regenerations started so far.
    pub fn regenerations(&self) -> u64 {
        self.submitted
    }

    /// Start building a bitmap from a copy of `pixels`.
    #[tracing::instrument(skip(self, pixels), fields(mode = ?self.mode))]
    pub fn submit(&mut self, pixels: &PixelBuffer) -> PixelwallResult<()> {
        if self.busy {
            return Err(PixelwallError::state("a regeneration is already in flight"));
        }
        self.submitted += 1;
        let job = Job {
            size: pixels.size(),
            rgba: pixels.as_bytes().to_vec(),
            generation: self.submitted,
        };

        match self.worker.as_ref().and_then(|w| w.jobs.as_ref()) {
            Some(jobs) => jobs.send(job).map_err(|_| {
                PixelwallError::Other(anyhow::anyhow!("compositor thread is not accepting jobs"))
            })?,
            None => self.inline_result = Some(build_bitmap(job)),
        }
        self.busy = true;
        Ok(())
    }

    /// Finished bitmap, if the in-flight job is done.
    pub fn poll(&mut self) -> Option<PixelwallResult<Bitmap>> {
        if !self.busy {
            return None;
        }
        let res = match &self.worker {
            None => self.inline_result.take(),
            Some(w) => match w.results.try_recv() {
                Ok(res) => Some(res),
                Err(mpsc::TryRecvError::Empty) => None,
                Err(mpsc::TryRecvError::Disconnected) => Some(Err(PixelwallError::Other(
                    anyhow::anyhow!("compositor thread exited"),
                ))),
            },
        };
        if res.is_some() {
            self.busy = false;
        }
        res
    }

    /// Block until the in-flight job is done. `None` when nothing is in flight.
    pub fn wait(&mut self) -> Option<PixelwallResult<Bitmap>> {
        if !self.busy {
            return None;
        }
        let res = match &self.worker {
            None => self.inline_result.take(),
            Some(w) => Some(w.results.recv().unwrap_or_else(|_| {
                Err(PixelwallError::Other(anyhow::anyhow!(
                    "compositor thread exited"
                )))
            })),
        };
        self.busy = false;
        res
    }

    /// Stop the worker thread. Pending results are dropped.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.as_mut() {
            worker.shutdown();
        }
        self.worker = None;
        self.inline_result = None;
        self.busy = false;
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_bitmap(job: Job) -> PixelwallResult<Bitmap> {
    let image = image::RgbaImage::from_raw(job.size.width, job.size.height, job.rgba)
        .ok_or_else(|| PixelwallError::validation("pixel buffer does not match its size"))?;
    Ok(Bitmap::new(image, job.generation))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
