use std::{io::Cursor, path::Path, sync::Arc};

use crate::{
    foundation::{
        core::{Rect, Vec2i},
        error::{IngestError, IngestResult},
        selector::ChannelSelector,
    },
    imageio::loader::{ImageLoader, ImageStream, LoadFuture, interleaved_channel_names, read_all},
    model::{channel::Channel, data::ImageData},
    pool::{priority::Priority, slots::BlockSlots, thread_pool::PoolHandle},
};

/// Everything the `image` crate can decode (PNG, JPEG, Radiance HDR, ...).
///
/// Registered last, so it is also the loader of last resort. Samples are
/// normalized to `0..=1` for integer formats; no transfer curve is applied.
/// Alpha is straight.
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterImageLoader;

impl ImageLoader for RasterImageLoader {
    fn name(&self) -> &'static str {
        "image"
    }

    fn can_load_file(&self, stream: &mut dyn ImageStream) -> bool {
        let mut head = [0u8; 64];
        let Ok(start) = stream.stream_position() else {
            return false;
        };
        let read = read_prefix(stream, &mut head);
        if stream.seek(std::io::SeekFrom::Start(start)).is_err() {
            return false;
        }
        read.is_some_and(|n| image::guess_format(&head[..n]).is_ok())
    }

    fn load<'a>(
        &'a self,
        stream: &'a mut dyn ImageStream,
        _path: &'a Path,
        _selector: &'a ChannelSelector,
        pool: &'a PoolHandle,
        priority: Priority,
    ) -> LoadFuture<'a> {
        Box::pin(async move {
            let bytes = read_all(stream)?;
            let decoded = image::ImageReader::new(Cursor::new(bytes))
                .with_guessed_format()?
                .decode()
                .map_err(|e| IngestError::decode(format!("image decoder: {e}")))?;

            let size = Vec2i::new(
                i32::try_from(decoded.width()).map_err(|_| IngestError::decode("image too wide"))?,
                i32::try_from(decoded.height()).map_err(|_| IngestError::decode("image too tall"))?,
            );
            if size.area() == 0 {
                return Err(IngestError::decode("image has zero pixels"));
            }

            let color = decoded.color();
            let (num_channels, samples) = match (color.has_color(), color.has_alpha()) {
                (false, false) => (1, decoded.to_luma32f().into_raw()),
                (false, true) => (2, decoded.to_luma_alpha32f().into_raw()),
                (true, false) => (3, decoded.to_rgb32f().into_raw()),
                (true, true) => (4, decoded.to_rgba32f().into_raw()),
            };
            drop(decoded);

            let channels = deinterleave(samples, num_channels, size, pool, priority).await?;
            Ok(vec![ImageData {
                channels,
                layers: vec![String::new()],
                data_window: Rect::from_size(size),
                display_window: Rect::from_size(size),
                has_premultiplied_alpha: false,
                part_name: None,
            }])
        })
    }
}

fn read_prefix(stream: &mut dyn ImageStream, buf: &mut [u8]) -> Option<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(_) => return None,
        }
    }
    Some(filled)
}

/// Split interleaved samples into one channel per component on the pool.
async fn deinterleave(
    samples: Vec<f32>,
    num_channels: usize,
    size: Vec2i,
    pool: &PoolHandle,
    priority: Priority,
) -> IngestResult<Vec<Channel>> {
    let names = interleaved_channel_names(num_channels)?;
    let samples = Arc::new(samples);
    let planes = Arc::new(BlockSlots::new(num_channels));

    let out = Arc::clone(&planes);
    pool.parallel_for(0, num_channels, priority, move |c| {
        out.put(c, samples.iter().skip(c).step_by(num_channels).copied().collect());
        Ok(())
    })
    .await?;

    names
        .iter()
        .enumerate()
        .map(|(c, name)| Channel::from_data(*name, size, planes.take(c)))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/imageio/raster_loader.rs"]
mod tests;
