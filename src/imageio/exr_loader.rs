use std::{io::Cursor, path::Path, sync::Arc};

use exr::prelude::{AnyChannel, FlatSamples, ReadChannels as _, ReadLayers as _};

use crate::{
    foundation::{
        core::{Rect, Vec2i},
        error::{IngestError, IngestResult},
        selector::ChannelSelector,
    },
    imageio::loader::{ImageLoader, ImageStream, LoadFuture, peek_bytes, read_all},
    model::{channel::Channel, data::ImageData},
    pool::{priority::Priority, slots::BlockSlots, thread_pool::PoolHandle},
};

const EXR_MAGIC: [u8; 4] = [0x76, 0x2f, 0x31, 0x01];

/// OpenEXR files, single- or multi-part.
///
/// Only the first part containing a channel accepted by the selector is
/// decoded, at its largest resolution level. Half, float and uint samples are
/// widened to `f32`; subsampled channels are upsampled by pixel replication.
/// EXR stores premultiplied alpha.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExrImageLoader;

impl ImageLoader for ExrImageLoader {
    fn name(&self) -> &'static str {
        "OpenEXR"
    }

    fn can_load_file(&self, stream: &mut dyn ImageStream) -> bool {
        peek_bytes::<4>(stream) == Some(EXR_MAGIC)
    }

    fn load<'a>(
        &'a self,
        stream: &'a mut dyn ImageStream,
        path: &'a Path,
        selector: &'a ChannelSelector,
        pool: &'a PoolHandle,
        priority: Priority,
    ) -> LoadFuture<'a> {
        Box::pin(async move {
            let bytes = read_all(stream)?;
            let image = exr::prelude::read()
                .no_deep_data()
                .largest_resolution_level()
                .all_channels()
                .all_layers()
                .all_attributes()
                .non_parallel()
                .from_buffered(Cursor::new(bytes))
                .map_err(|e| IngestError::decode(format!("{}: {e}", path.display())))?;

            let multi_part = image.layer_data.len() > 1;
            let display = image.attributes.display_window;

            let mut layers = image.layer_data.into_iter();
            let Some(first) = layers.next() else {
                return Err(IngestError::decode("EXR image does not contain any parts"));
            };
            let has_match = |layer: &exr::prelude::Layer<exr::prelude::AnyChannels<FlatSamples>>| {
                layer
                    .channel_data
                    .list
                    .iter()
                    .any(|c| selector.matches(&c.name.to_string()))
            };
            let layer = if has_match(&first) {
                first
            } else {
                layers.find(|l| has_match(l)).unwrap_or(first)
            };
            drop(layers);

            let size = Vec2i::new(to_i32(layer.size.0)?, to_i32(layer.size.1)?);
            if size.area() == 0 {
                return Err(IngestError::decode("EXR image has zero pixels"));
            }
            let position = Vec2i::new(layer.attributes.layer_position.0, layer.attributes.layer_position.1);
            let data_window = Rect::from_inclusive(position, Vec2i::new(position.x + size.x - 1, position.y + size.y - 1));

            let display_min = Vec2i::new(display.position.0, display.position.1);
            let display_size = Vec2i::new(to_i32(display.size.0)?, to_i32(display.size.1)?);
            let display_window = Rect::from_inclusive(
                display_min,
                Vec2i::new(display_min.x + display_size.x - 1, display_min.y + display_size.y - 1),
            );
            if !data_window.is_valid() {
                return Err(IngestError::invalid_window(format!("EXR data window {data_window}")));
            }
            if !display_window.is_valid() {
                return Err(IngestError::invalid_window(format!("EXR display window {display_window}")));
            }

            let part_name = layer
                .attributes
                .layer_name
                .as_ref()
                .filter(|_| multi_part)
                .map(|name| name.to_string());

            let mut matches: Vec<(usize, usize, AnyChannel<FlatSamples>)> = layer
                .channel_data
                .list
                .into_iter()
                .enumerate()
                .filter_map(|(index, c)| {
                    selector
                        .match_rank(&c.name.to_string())
                        .map(|rank| (rank, index, c))
                })
                .collect();
            if matches.is_empty() {
                return Err(IngestError::NoMatchingChannels(selector.pattern().to_owned()));
            }
            matches.sort_by_key(|(rank, index, _)| (*rank, *index));

            let raw: Arc<Vec<AnyChannel<FlatSamples>>> = Arc::new(matches.into_iter().map(|(_, _, c)| c).collect());
            let planes = Arc::new(BlockSlots::new(raw.len()));

            let (src, out) = (Arc::clone(&raw), Arc::clone(&planes));
            pool.parallel_for(0, raw.len(), priority, move |i| {
                out.put(i, upsample(&src[i], size));
                Ok(())
            })
            .await?;

            let channels = raw
                .iter()
                .enumerate()
                .map(|(i, c)| Channel::from_data(c.name.to_string(), size, planes.take(i)))
                .collect::<IngestResult<Vec<_>>>()?;

            Ok(vec![ImageData {
                channels,
                layers: Vec::new(),
                data_window,
                display_window,
                has_premultiplied_alpha: true,
                part_name,
            }])
        })
    }
}

fn to_i32(v: usize) -> IngestResult<i32> {
    i32::try_from(v).map_err(|_| IngestError::decode(format!("EXR dimension {v} out of range")))
}

fn sample_at(samples: &FlatSamples, index: usize) -> f32 {
    match samples {
        FlatSamples::F16(v) => v.get(index).map_or(0.0, |s| s.to_f32()),
        FlatSamples::F32(v) => v.get(index).copied().unwrap_or(0.0),
        FlatSamples::U32(v) => v.get(index).map_or(0.0, |&s| s as f32),
    }
}

/// Full-resolution `f32` plane for one channel.
fn upsample(channel: &AnyChannel<FlatSamples>, size: Vec2i) -> Vec<f32> {
    let (w, h) = (size.x as usize, size.y as usize);
    let (sx, sy) = (channel.sampling.0.max(1), channel.sampling.1.max(1));
    if sx == 1 && sy == 1 {
        return (0..w * h).map(|i| sample_at(&channel.sample_data, i)).collect();
    }

    let sub_w = w / sx;
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            out.push(sample_at(&channel.sample_data, x / sx + (y / sy) * sub_w));
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/imageio/exr_loader.rs"]
mod tests;
