use std::collections::{BTreeMap, BTreeSet};

use crate::{
    foundation::{
        core::{Rect, Vec2i},
        error::{IngestError, IngestResult},
        selector::ChannelSelector,
    },
    model::channel::{self, Channel},
    pool::{priority::Priority, thread_pool::PoolHandle},
};

/// Decoded pixel data of one image part, as produced by a loader.
///
/// Loaders fill in what they know; [`ImageData::ensure_valid`] then checks the
/// invariants, applies the channel selector, derives missing layers and brings
/// the data into the premultiplied-alpha representation everything downstream
/// assumes.
#[derive(Clone, Debug, Default)]
pub struct ImageData {
    /// Channels in significant order.
    pub channels: Vec<Channel>,
    /// Layer names; derived from the channel names when left empty.
    pub layers: Vec<String>,
    /// Region covered by the samples.
    pub data_window: Rect,
    /// Region intended for display.
    pub display_window: Rect,
    /// Whether color channels are already scaled by their layer's alpha.
    pub has_premultiplied_alpha: bool,
    /// Name of the file part this data came from, if the format has parts.
    pub part_name: Option<String>,
}

impl ImageData {
    /// Size of the data window.
    pub fn size(&self) -> Vec2i {
        self.data_window.size()
    }

    /// Number of pixels in the data window.
    pub fn pixel_count(&self) -> usize {
        self.size().area()
    }

    /// Names of the channels belonging directly to `layer`, in channel order.
    pub fn channels_in_layer(&self, layer: &str) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| Channel::head(c.name()) == layer)
            .map(|c| c.name().to_owned())
            .collect()
    }

    /// Channel with the given full name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name() == name)
    }

    /// Mutable channel with the given full name.
    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.name() == name)
    }

    /// Whether a channel with the given full name exists.
    pub fn has_channel(&self, name: &str) -> bool {
        self.channel(name).is_some()
    }

    /// Scale every non-alpha channel by its layer's `A` channel.
    ///
    /// Fails with [`IngestError::DoubleMultiply`] if the data is already
    /// premultiplied.
    pub async fn multiply_alpha(&mut self, pool: &PoolHandle, priority: Priority) -> IngestResult<()> {
        if self.has_premultiplied_alpha {
            return Err(IngestError::DoubleMultiply);
        }
        self.alpha_operation(pool, priority, AlphaOp::Multiply).await?;
        self.has_premultiplied_alpha = true;
        Ok(())
    }

    /// Undo [`ImageData::multiply_alpha`]; zero alpha yields zero color.
    ///
    /// Fails with [`IngestError::DoubleDivide`] if the data is not premultiplied.
    pub async fn unmultiply_alpha(&mut self, pool: &PoolHandle, priority: Priority) -> IngestResult<()> {
        if !self.has_premultiplied_alpha {
            return Err(IngestError::DoubleDivide);
        }
        self.alpha_operation(pool, priority, AlphaOp::Divide).await?;
        self.has_premultiplied_alpha = false;
        Ok(())
    }

    async fn alpha_operation(&mut self, pool: &PoolHandle, priority: Priority, op: AlphaOp) -> IngestResult<()> {
        // Alpha planes are cloned up front; the clone shares storage with the original.
        let alphas: BTreeMap<String, Channel> = self
            .layers
            .iter()
            .filter_map(|layer| {
                let name = alpha_channel_name(layer);
                self.channel(&name).map(|alpha| (layer.clone(), alpha.clone()))
            })
            .collect();
        if alphas.is_empty() {
            return Ok(());
        }

        let mut pending = Vec::new();
        for target in &mut self.channels {
            let (layer, tail) = Channel::split(target.name());
            if tail == "A" {
                continue;
            }
            let Some(alpha) = alphas.get(layer) else {
                continue;
            };
            let kernel = match op {
                AlphaOp::Multiply => channel::multiply,
                AlphaOp::Divide => channel::divide_or_zero,
            };
            pending.push(target.elementwise(alpha, pool, priority, kernel));
        }

        let mut first_error = None;
        for op in pending {
            if let Err(err) = op.await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Check and normalize freshly decoded data.
    ///
    /// In order: reject empty data, default invalid windows to the first
    /// channel's size, require every channel to match the data window, filter
    /// and reorder channels by `selector` (failing if nothing survives), derive
    /// layers if none were given, and premultiply alpha if needed.
    pub async fn ensure_valid(
        &mut self,
        selector: &ChannelSelector,
        pool: &PoolHandle,
        priority: Priority,
    ) -> IngestResult<()> {
        let Some(first) = self.channels.first() else {
            return Err(IngestError::EmptyImage);
        };
        let first_size = first.size();

        if !self.data_window.is_valid() {
            self.data_window = Rect::from_size(first_size);
        }
        if !self.display_window.is_valid() {
            self.display_window = Rect::from_size(first_size);
        }

        let expected = self.size();
        if let Some(bad) = self.channels.iter().find(|c| c.size() != expected) {
            return Err(IngestError::SizeMismatch {
                channel: bad.name().to_owned(),
                actual: bad.size(),
                expected,
            });
        }

        if !selector.is_empty() {
            self.apply_selector(selector);
            if self.channels.is_empty() {
                return Err(IngestError::NoMatchingChannels(selector.pattern().to_owned()));
            }
        }

        if self.layers.is_empty() {
            let heads: BTreeSet<&str> = self.channels.iter().map(|c| Channel::head(c.name())).collect();
            self.layers = heads.into_iter().map(str::to_owned).collect();
        }

        if !self.has_premultiplied_alpha {
            self.multiply_alpha(pool, priority).await?;
        }

        assert!(
            self.has_premultiplied_alpha,
            "image data must be premultiplied after validation"
        );
        Ok(())
    }

    fn apply_selector(&mut self, selector: &ChannelSelector) {
        let mut matches: Vec<(usize, usize)> = self
            .channels
            .iter()
            .enumerate()
            .filter_map(|(index, c)| selector.match_rank(c.name()).map(|rank| (rank, index)))
            .collect();
        matches.sort_unstable();

        let mut slots: Vec<Option<Channel>> = std::mem::take(&mut self.channels).into_iter().map(Some).collect();
        self.channels = matches
            .into_iter()
            .filter_map(|(_, index)| slots[index].take())
            .collect();
        tracing::debug!(selector = %selector, kept = self.channels.len(), "applied channel selector");
    }
}

#[derive(Clone, Copy)]
enum AlphaOp {
    Multiply,
    Divide,
}

pub(crate) fn alpha_channel_name(layer: &str) -> String {
    if layer.is_empty() {
        "A".to_owned()
    } else {
        format!("{layer}.A")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/data.rs"]
mod tests;
