use std::{
    fmt,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    foundation::core::{Rect, Vec2i},
    model::{
        channel::Channel,
        data::{ImageData, alpha_channel_name},
        groups::{ChannelGroup, group_channels},
    },
};

static NEXT_DRAW_ID: AtomicU64 = AtomicU64::new(0);

/// A validated image, ready to be handed to a consumer.
///
/// Every image gets a draw-order id at construction; later images have larger
/// ids. Channel groups for all layers are derived once and never change.
#[derive(Debug)]
pub struct Image {
    id: u64,
    path: PathBuf,
    channel_selector: String,
    name: String,
    data: ImageData,
    groups: Vec<ChannelGroup>,
}

impl Image {
    /// Take the next draw-order id.
    pub fn next_draw_id() -> u64 {
        NEXT_DRAW_ID.fetch_add(1, Ordering::Relaxed)
    }

    /// Wrap validated data loaded from `path` with the selector text that picked it.
    pub fn new(path: impl Into<PathBuf>, data: ImageData, channel_selector: impl Into<String>) -> Self {
        let path = path.into();
        let channel_selector = channel_selector.into();
        let name = if channel_selector.is_empty() {
            path.display().to_string()
        } else {
            format!("{}:{channel_selector}", path.display())
        };

        let groups = data
            .layers
            .iter()
            .flat_map(|layer| group_channels(&data, layer))
            .collect();

        Self {
            id: Self::next_draw_id(),
            path,
            channel_selector,
            name,
            data,
            groups,
        }
    }

    /// Draw-order id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Move this image to the front of the draw order.
    pub fn bump_id(&mut self) {
        self.id = Self::next_draw_id();
    }

    /// File the image was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Selector text, including any part name.
    pub fn channel_selector(&self) -> &str {
        &self.channel_selector
    }

    /// `path`, or `path:selector` when a selector is set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name without directories or selector.
    pub fn short_name(&self) -> &str {
        let name = match self.name.rfind(['/', '\\']) {
            Some(slash) => &self.name[slash + 1..],
            None => &self.name,
        };
        match name.rfind(':') {
            Some(colon) => &name[..colon],
            None => name,
        }
    }

    /// Underlying pixel data.
    pub fn data(&self) -> &ImageData {
        &self.data
    }

    /// Size of the data window.
    pub fn size(&self) -> Vec2i {
        self.data.size()
    }

    /// Region covered by samples.
    pub fn data_window(&self) -> Rect {
        self.data.data_window
    }

    /// Region intended for display.
    pub fn display_window(&self) -> Rect {
        self.data.display_window
    }

    /// Layer names.
    pub fn layers(&self) -> &[String] {
        &self.data.layers
    }

    /// Channel with the given full name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.data.channel(name)
    }

    /// All channel groups, layer by layer.
    pub fn channel_groups(&self) -> &[ChannelGroup] {
        &self.groups
    }

    /// Members of the named group; empty if there is no such group.
    pub fn channels_in_group(&self, group_name: &str) -> Vec<String> {
        self.groups
            .iter()
            .find(|g| g.name == group_name)
            .map(|g| g.channels.to_vec())
            .unwrap_or_default()
    }

    /// Channels of `layer` in group order, with the alpha channel listed once.
    pub fn sorted_channels(&self, layer: &str) -> Vec<String> {
        let alpha = alpha_channel_name(layer);
        let mut alpha_seen = false;
        let mut out = Vec::new();
        for group in group_channels(&self.data, layer) {
            for name in group.channels {
                if name == alpha {
                    if alpha_seen {
                        continue;
                    }
                    alpha_seen = true;
                }
                out.push(name);
            }
        }
        out
    }

    /// Overwrite a rectangle of the named channel with row-major `values`.
    ///
    /// Unknown channels and rectangles that do not fit are logged and ignored.
    pub fn update_channel(&mut self, name: &str, x: i32, y: i32, width: i32, height: i32, values: &[f32]) {
        match self.data.channel_mut(name) {
            Some(channel) => channel.update_tile(x, y, width, height, values),
            None => {
                tracing::warn!(image = %self.name, channel = name, "channel does not exist; update skipped");
            }
        }
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Path: {}", self.name)?;
        writeln!(f)?;
        writeln!(f, "Resolution: {}", self.size())?;

        let display = self.display_window();
        let data = self.data_window();
        if display != data || display.min != Vec2i::ZERO {
            writeln!(f, "Display window: {}{}", display.min, display.max)?;
            writeln!(f, "Data window: {}{}", data.min, data.max)?;
        }

        writeln!(f)?;
        write!(f, "Channels:")?;
        for layer in &self.data.layers {
            let tails: Vec<&str> = self
                .data
                .channels
                .iter()
                .filter(|c| Channel::head(c.name()) == layer)
                .map(|c| Channel::tail(c.name()))
                .collect();
            let label = if layer.is_empty() { "<root>" } else { layer.as_str() };
            write!(f, "\n{label}: {}", tails.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/image.rs"]
mod tests;
