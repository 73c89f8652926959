use std::{path::Path, sync::Arc};

use crate::{
    foundation::{
        core::{Rect, Vec2i},
        error::{IngestError, IngestResult},
        selector::ChannelSelector,
    },
    imageio::{
        header::HeaderReader,
        loader::{
            ImageLoader, ImageStream, LoadFuture, checked_sample_count, interleaved_channel_names, peek_bytes, read_all,
        },
    },
    model::{channel::Channel, data::ImageData},
    pool::{priority::Priority, slots::BlockSlots, thread_pool::PoolHandle},
};

/// Portable float maps (`Pf` gray, `PF` RGB, `PF4` RGBA).
///
/// Rows are stored bottom to top; a negative scale marks little-endian samples.
#[derive(Clone, Copy, Debug, Default)]
pub struct PfmImageLoader;

impl ImageLoader for PfmImageLoader {
    fn name(&self) -> &'static str {
        "PFM"
    }

    fn can_load_file(&self, stream: &mut dyn ImageStream) -> bool {
        matches!(peek_bytes::<2>(stream), Some([b'P', b'F' | b'f']))
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
            let data = decode_pfm(&bytes, pool, priority).await?;
            Ok(vec![data])
        })
    }
}

async fn decode_pfm(bytes: &[u8], pool: &PoolHandle, priority: Priority) -> IngestResult<ImageData> {
    let mut header = HeaderReader::new(bytes);
    let magic = header.token()?;
    let num_channels = match magic {
        "Pf" => 1,
        "PF" => 3,
        "PF4" => 4,
        other => return Err(IngestError::decode(format!("invalid PFM magic '{other}'"))),
    };
    let width: i32 = header.parse("PFM width")?;
    let height: i32 = header.parse("PFM height")?;
    let scale: f32 = header.parse("PFM scale")?;

    if !scale.is_finite() || scale == 0.0 {
        return Err(IngestError::decode(format!("invalid PFM scale {scale}")));
    }
    let little_endian = scale < 0.0;
    let scale = scale.abs();

    let size = Vec2i::new(width, height);
    if size.area() == 0 {
        return Err(IngestError::decode("image has zero pixels"));
    }
    header.skip_line();

    let row_len = size.x as usize * num_channels;
    let byte_len = checked_sample_count(size, num_channels)
        .ok()
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| IngestError::decode("PFM dimensions too large"))?;
    let payload = header.take(byte_len)?;
    let payload: Arc<[u8]> = Arc::from(payload);

    let rows = size.y as usize;
    let planes: Arc<Vec<BlockSlots<f32>>> = Arc::new((0..num_channels).map(|_| BlockSlots::new(rows)).collect());

    let out = Arc::clone(&planes);
    pool.parallel_for(0, rows, priority, move |y| {
        let src = &payload[y * row_len * 4..(y + 1) * row_len * 4];
        let values: Vec<f32> = src
            .chunks_exact(4)
            .map(|b| {
                let raw = [b[0], b[1], b[2], b[3]];
                let v = if little_endian {
                    f32::from_le_bytes(raw)
                } else {
                    f32::from_be_bytes(raw)
                };
                scale * v
            })
            .collect();

        let dst_row = rows - 1 - y;
        for (c, plane) in out.iter().enumerate() {
            plane.put(dst_row, values.iter().skip(c).step_by(num_channels).copied().collect());
        }
        Ok(())
    })
    .await?;

    let names = interleaved_channel_names(num_channels)?;
    let channels = names
        .iter()
        .zip(planes.iter())
        .map(|(name, plane)| Channel::from_data(*name, size, plane.take_flat()))
        .collect::<IngestResult<Vec<_>>>()?;

    Ok(ImageData {
        channels,
        layers: vec![String::new()],
        data_window: Rect::from_size(size),
        display_window: Rect::from_size(size),
        has_premultiplied_alpha: false,
        part_name: None,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/imageio/pfm_loader.rs"]
mod tests;
