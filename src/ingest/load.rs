use std::{
    fs::File,
    io::BufReader,
    path::Path,
    sync::Arc,
    time::Instant,
};

use crate::{
    foundation::{
        error::{IngestError, IngestResult},
        selector::ChannelSelector,
    },
    imageio::loader::{ImageStream, LoaderRegistry},
    model::image::Image,
    pool::{priority::Priority, thread_pool::PoolHandle},
};

/// Load every image in the file at `path`, logging instead of failing.
///
/// This is the error boundary of a load request: any decode or validation
/// failure is logged once, naming the file and selector, and turns into an
/// empty list.
#[tracing::instrument(skip(pool, registry, selector), fields(selector = %selector))]
pub async fn try_load_image(
    pool: &PoolHandle,
    registry: &LoaderRegistry,
    path: &Path,
    selector: &ChannelSelector,
    priority: Priority,
) -> Vec<Arc<Image>> {
    match load_image(pool, registry, path, selector, priority).await {
        Ok(images) => images,
        Err(err) => {
            if selector.is_empty() {
                tracing::error!("could not load '{}': {err}", path.display());
            } else {
                tracing::error!("could not load '{}:{selector}': {err}", path.display());
            }
            Vec::new()
        }
    }
}

/// Open `path` and load it through [`load_from_stream`].
pub async fn load_image(
    pool: &PoolHandle,
    registry: &LoaderRegistry,
    path: &Path,
    selector: &ChannelSelector,
    priority: Priority,
) -> IngestResult<Vec<Arc<Image>>> {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let file = File::open(&path)?;
    let mut stream = BufReader::new(file);
    load_from_stream(pool, registry, &mut stream, &path, selector, priority).await
}

/// Decode and validate every part of `stream` into images.
///
/// The first loader claiming the stream (or the registry's fallback) decodes
/// it; each part is validated against `selector` before being wrapped.
pub async fn load_from_stream(
    pool: &PoolHandle,
    registry: &LoaderRegistry,
    stream: &mut dyn ImageStream,
    path: &Path,
    selector: &ChannelSelector,
    priority: Priority,
) -> IngestResult<Vec<Arc<Image>>> {
    let start = Instant::now();

    let Some(loader) = registry.select(stream)? else {
        return Err(IngestError::decode("no suitable image loader found"));
    };
    let decoded = loader.load(stream, path, selector, pool, priority).await?;

    let mut images = Vec::with_capacity(decoded.len());
    for mut data in decoded {
        data.ensure_valid(selector, pool, priority).await?;
        let part_selector = selector_with_part(selector.pattern(), data.part_name.as_deref());
        images.push(Arc::new(Image::new(path, data, part_selector)));
    }

    tracing::info!(
        loader = loader.name(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        "loaded '{}'",
        path.display()
    );
    Ok(images)
}

/// Selector text recorded on an image decoded from a named part.
///
/// The part name is prepended unless it already is one of the comma-separated
/// selector terms.
pub(crate) fn selector_with_part(selector: &str, part: Option<&str>) -> String {
    let Some(part) = part.filter(|p| !p.is_empty()) else {
        return selector.to_owned();
    };
    if selector.is_empty() {
        part.to_owned()
    } else if selector.split(',').any(|term| term == part) {
        selector.to_owned()
    } else {
        format!("{part},{selector}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ingest/load.rs"]
mod tests;
