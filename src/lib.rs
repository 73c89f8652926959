//! `hdr-ingest` turns HDR image files into validated, premultiplied, channel-grouped images.
//!
//! Loading is fully asynchronous and runs on a fixed, priority-ordered worker pool:
//!
//! 1. **Sniff**: the [`LoaderRegistry`] picks a format loader (OpenEXR, PFM, placeholder, or
//!    anything the `image` crate reads as fallback).
//! 2. **Decode**: the loader produces one [`ImageData`] per file part, converting samples to
//!    `f32` planes in parallel.
//! 3. **Validate**: [`ImageData::ensure_valid`] checks windows and channel sizes, applies the
//!    [`ChannelSelector`], derives layers and premultiplies alpha.
//! 4. **Group**: [`Image`] derives display [`ChannelGroup`]s per layer.
//!
//! [`BackgroundImagesLoader`] runs many such requests concurrently, newest first, and
//! publishes their results strictly in request order.
//!
//! Pool work is scheduled with a [`Priority`]; futures run on the pool via
//! [`ThreadPool::spawn`] and join parallel loops through [`Task`]. `unsafe` is forbidden in
//! this crate, and a panic inside pool work aborts the process.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod foundation;
mod imageio;
mod ingest;
mod model;
mod pool;

pub use foundation::config::IngestConfig;
pub use foundation::core::{Rect, Vec2i};
pub use foundation::error::{IngestError, IngestResult};
pub use foundation::selector::{ChannelSelector, SelectorMode, matches_fuzzy};
pub use imageio::empty_loader::EmptyImageLoader;
pub use imageio::exr_loader::ExrImageLoader;
pub use imageio::loader::{ImageLoader, ImageStream, LoadFuture, LoaderRegistry};
pub use imageio::pfm_loader::PfmImageLoader;
pub use imageio::raster_loader::RasterImageLoader;
pub use ingest::background::{BackgroundImagesLoader, ImageAddition};
pub use ingest::load::{load_from_stream, load_image, try_load_image};
pub use model::channel::Channel;
pub use model::data::ImageData;
pub use model::groups::{ChannelGroup, group_channels};
pub use model::image::Image;
pub use pool::priority::Priority;
pub use pool::task::Task;
pub use pool::thread_pool::{PoolHandle, Schedule, ThreadPool};
