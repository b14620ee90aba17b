//! Snapshot image sources and the background load task.
//!
//! A load resolves a URL to encoded bytes, decodes them and fits the result to the map
//! size on a background thread. The engine picks the result up on a later frame, so a
//! slow or stuck load only delays its acknowledgement.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};

use anyhow::Context;

use crate::assets::decode::decode_snapshot;
use crate::foundation::core::MapSize;
use crate::foundation::error::{PixelwallError, PixelwallResult};
use crate::pixels::buffer::PixelBuffer;

/// Resolves a snapshot URL to encoded image bytes.
pub trait ImageLoader: Send + Sync {
    /// Encoded image bytes for `url`.
    fn fetch(&self, url: &str) -> PixelwallResult<Vec<u8>>;
}

/// Loads `file://` URLs and plain paths, relative paths resolved against `root`.
#[derive(Clone, Debug)]
pub struct FsImageLoader {
    root: PathBuf,
}

impl FsImageLoader {
    /// Loader resolving relative URLs against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let raw = url.strip_prefix("file://").unwrap_or(url);
        let p = Path::new(raw);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }
}

impl ImageLoader for FsImageLoader {
    fn fetch(&self, url: &str) -> PixelwallResult<Vec<u8>> {
        if url.contains("://") && !url.starts_with("file://") {
            return Err(PixelwallError::asset(format!(
                "unsupported snapshot url scheme: '{url}'"
            )));
        }
        let path = self.resolve(url);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read snapshot '{}'", path.display()))?;
        Ok(bytes)
    }
}

/// Serves pre-registered encoded images by URL.
#[derive(Clone, Debug, Default)]
pub struct MemoryImageLoader {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryImageLoader {
    /// Empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the bytes served for `url`.
    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(url.into(), bytes);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl ImageLoader for MemoryImageLoader {
    fn fetch(&self, url: &str) -> PixelwallResult<Vec<u8>> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| PixelwallError::asset(format!("no image registered for '{url}'")))
    }
}

/// In-flight snapshot load. Dropping it without taking the result abandons the load.
#[derive(Debug)]
pub struct PendingLoad {
    url: String,
    rx: mpsc::Receiver<PixelwallResult<PixelBuffer>>,
    cancelled: Arc<AtomicBool>,
}

impl PendingLoad {
    /// Fetch and decode `url` on a background thread.
    pub fn spawn(loader: Arc<dyn ImageLoader>, url: impl Into<String>, size: MapSize) -> Self {
        let url = url.into();
        let (tx, rx) = mpsc::sync_channel(1);
        let cancelled = Arc::new(AtomicBool::new(false));

        let thread_url = url.clone();
        let thread_cancelled = Arc::clone(&cancelled);
        std::thread::spawn(move || {
            let res = loader
                .fetch(&thread_url)
                .and_then(|bytes| {
                    if thread_cancelled.load(Ordering::Acquire) {
                        return Err(PixelwallError::asset("load cancelled"));
                    }
                    decode_snapshot(&bytes, size)
                });
            if thread_cancelled.load(Ordering::Acquire) {
                tracing::debug!(url = %thread_url, "dropping result of cancelled load");
                return;
            }
            // the receiver is gone when the engine was torn down
            let _ = tx.send(res);
        });

        Self { url, rx, cancelled }
    }

    /// Already-resolved load, used for snapshots that need no fetch.
    pub fn ready(url: impl Into<String>, res: PixelwallResult<PixelBuffer>) -> Self {
        let (tx, rx) = mpsc::sync_channel(1);
        let _ = tx.send(res);
        Self {
            url: url.into(),
            rx,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// URL this load was started for.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Non-blocking: `None` while the load is still running.
    pub fn try_take(&self) -> Option<PixelwallResult<PixelBuffer>> {
        match self.rx.try_recv() {
            Ok(res) => Some(res),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(self.disconnected())),
        }
    }

    /// Block until the load resolves.
    pub fn wait(&self) -> PixelwallResult<PixelBuffer> {
        self.rx.recv().map_err(|_| self.disconnected())?
    }

    /// Ask the background thread to drop its result. Safe to call more than once.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn disconnected(&self) -> PixelwallError {
        PixelwallError::asset(format!("load of '{}' ended without a result", self.url))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
