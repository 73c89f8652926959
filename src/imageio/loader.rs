use std::{
    future::Future,
    io::{Read, Seek, SeekFrom},
    path::Path,
    pin::Pin,
    sync::Arc,
};

use crate::{
    foundation::{
        core::Vec2i,
        error::{IngestError, IngestResult},
        selector::ChannelSelector,
    },
    imageio::{
        empty_loader::EmptyImageLoader, exr_loader::ExrImageLoader, pfm_loader::PfmImageLoader,
        raster_loader::RasterImageLoader,
    },
    model::data::ImageData,
    pool::{priority::Priority, thread_pool::PoolHandle},
};

/// Seekable byte source a loader decodes from.
pub trait ImageStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> ImageStream for T {}

/// Boxed future returned by [`ImageLoader::load`].
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = IngestResult<Vec<ImageData>>> + Send + 'a>>;

/// A decoder for one family of file formats.
pub trait ImageLoader: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Cheap format sniff. Must leave the stream where it found it.
    fn can_load_file(&self, stream: &mut dyn ImageStream) -> bool;

    /// Decode the stream into one [`ImageData`] per logical part.
    ///
    /// Loaders may use `pool` for parallel conversion at `priority`. Results
    /// are not yet validated.
    fn load<'a>(
        &'a self,
        stream: &'a mut dyn ImageStream,
        path: &'a Path,
        selector: &'a ChannelSelector,
        pool: &'a PoolHandle,
        priority: Priority,
    ) -> LoadFuture<'a>;
}

/// Ordered set of loaders.
///
/// Loaders are tried in registration order; the last one is always attempted
/// when none of the earlier ones claims the file.
#[derive(Clone)]
pub struct LoaderRegistry {
    loaders: Vec<Arc<dyn ImageLoader>>,
}

impl LoaderRegistry {
    /// Registry with no loaders.
    pub fn empty() -> Self {
        Self { loaders: Vec::new() }
    }

    /// Append a loader; it becomes the fallback until another is added.
    pub fn register(&mut self, loader: impl ImageLoader + 'static) -> &mut Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    /// Registered loaders in try order.
    pub fn loaders(&self) -> &[Arc<dyn ImageLoader>] {
        &self.loaders
    }

    /// Pick the loader for `stream` and rewind the stream to its start.
    ///
    /// Returns `None` only for an empty registry.
    pub fn select(&self, stream: &mut dyn ImageStream) -> IngestResult<Option<Arc<dyn ImageLoader>>> {
        let last = self.loaders.len().saturating_sub(1);
        let mut chosen = None;
        for (index, loader) in self.loaders.iter().enumerate() {
            if index == last || loader.can_load_file(stream) {
                chosen = Some(Arc::clone(loader));
                break;
            }
        }
        stream.seek(SeekFrom::Start(0))?;
        Ok(chosen)
    }
}

impl Default for LoaderRegistry {
    /// EXR, PFM, placeholder and raster loaders, raster being the fallback.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(ExrImageLoader)
            .register(PfmImageLoader)
            .register(EmptyImageLoader)
            .register(RasterImageLoader);
        registry
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.loaders.iter().map(|l| l.name())).finish()
    }
}

/// Conventional names for `n` interleaved channels.
pub(crate) fn interleaved_channel_names(n: usize) -> IngestResult<&'static [&'static str]> {
    match n {
        1 => Ok(&["L"]),
        2 => Ok(&["L", "A"]),
        3 => Ok(&["R", "G", "B"]),
        4 => Ok(&["R", "G", "B", "A"]),
        _ => Err(IngestError::decode(format!("unsupported channel count {n}"))),
    }
}

/// Upper bound on the samples a single decoded image may hold (16 GiB of `f32`).
pub(crate) const MAX_SAMPLES: usize = 1 << 32;

/// Total samples for `channels` planes of `size`, rejecting headers that
/// would overflow or exceed [`MAX_SAMPLES`].
pub(crate) fn checked_sample_count(size: Vec2i, channels: usize) -> IngestResult<usize> {
    size.area()
        .checked_mul(channels)
        .filter(|&n| n <= MAX_SAMPLES)
        .ok_or_else(|| {
            IngestError::decode(format!("image dimensions too large: {size} x {channels} channels"))
        })
}

/// Read up to `N` leading bytes and restore the stream position.
///
/// Returns `None` if fewer than `N` bytes are available or the stream fails.
pub(crate) fn peek_bytes<const N: usize>(stream: &mut dyn ImageStream) -> Option<[u8; N]> {
    let start = stream.stream_position().ok()?;
    let mut buf = [0u8; N];
    let read = stream.read_exact(&mut buf);
    stream.seek(SeekFrom::Start(start)).ok()?;
    read.ok().map(|()| buf)
}

/// Read the remainder of the stream into memory.
pub(crate) fn read_all(stream: &mut dyn ImageStream) -> IngestResult<Vec<u8>> {
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/imageio/loader.rs"]
mod tests;
