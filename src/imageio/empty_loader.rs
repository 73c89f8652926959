use std::{collections::BTreeSet, path::Path};

use crate::{
    foundation::{
        core::{Rect, Vec2i},
        error::{IngestError, IngestResult},
        selector::ChannelSelector,
    },
    imageio::{
        header::HeaderReader,
        loader::{ImageLoader, ImageStream, LoadFuture, checked_sample_count, peek_bytes, read_all},
    },
    model::{channel::Channel, data::ImageData},
    pool::{priority::Priority, thread_pool::PoolHandle},
};

/// Zero-filled placeholder images announced by external tools.
///
/// The stream is `empty <width> <height> <count>` followed by `count` channel
/// names, each written as its byte length immediately followed by the name,
/// e.g. `empty 64 32 2 1R8normal.X`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyImageLoader;

impl ImageLoader for EmptyImageLoader {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn can_load_file(&self, stream: &mut dyn ImageStream) -> bool {
        peek_bytes::<5>(stream).is_some_and(|magic| &magic == b"empty")
    }

    fn load<'a>(
        &'a self,
        stream: &'a mut dyn ImageStream,
        _path: &'a Path,
        _selector: &'a ChannelSelector,
        _pool: &'a PoolHandle,
        _priority: Priority,
    ) -> LoadFuture<'a> {
        Box::pin(async move {
            let bytes = read_all(stream)?;
            Ok(vec![parse_empty(&bytes)?])
        })
    }
}

fn parse_empty(bytes: &[u8]) -> IngestResult<ImageData> {
    let mut header = HeaderReader::new(bytes);
    let magic = header.token()?;
    if magic != "empty" {
        return Err(IngestError::decode(format!("invalid magic '{magic}'")));
    }
    let width: i32 = header.parse("width")?;
    let height: i32 = header.parse("height")?;
    let count: usize = header.parse("channel count")?;

    let size = Vec2i::new(width, height);
    if size.area() == 0 {
        return Err(IngestError::decode("image has zero pixels"));
    }

    checked_sample_count(size, count)?;

    let mut channels = Vec::new();
    let mut layers = BTreeSet::new();
    for _ in 0..count {
        let len = header.digits("channel name length")?;
        let name = std::str::from_utf8(header.take(len)?)
            .map_err(|_| IngestError::decode("channel name is not valid UTF-8"))?;
        layers.insert(Channel::head(name).to_owned());
        channels.push(Channel::new(name, size));
    }

    Ok(ImageData {
        channels,
        layers: layers.into_iter().collect(),
        data_window: Rect::from_size(size),
        display_window: Rect::from_size(size),
        has_premultiplied_alpha: true,
        part_name: None,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/imageio/empty_loader.rs"]
mod tests;
