use smallvec::{SmallVec, smallvec};

use crate::model::{
    channel::Channel,
    data::{ImageData, alpha_channel_name},
};

/// Canonical channel tuples, tried in order when grouping a layer.
const CANONICAL_TUPLES: &[&[&str]] = &[
    &["R", "G", "B"],
    &["r", "g", "b"],
    &["X", "Y", "Z"],
    &["x", "y", "z"],
    &["U", "V"],
    &["u", "v"],
    &["Z"],
    &["z"],
];

/// Up to four channels displayed together as one RGBA-like unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelGroup {
    /// Display name, e.g. `R,G,B,A` or `diffuse.(R,G,B)`.
    pub name: String,
    /// Full channel names; a name may repeat (grayscale shown as RGB).
    pub channels: SmallVec<[String; 4]>,
}

impl ChannelGroup {
    fn new(layer: &str, channels: SmallVec<[String; 4]>) -> Self {
        assert!(!channels.is_empty(), "a channel group needs at least one channel");

        let mut tails: Vec<&str> = channels.iter().map(|c| Channel::tail(c)).collect();
        tails.dedup();
        let joined = tails.join(",");

        let name = if layer.is_empty() {
            joined
        } else if tails.len() == 1 {
            format!("{layer}.{joined}")
        } else {
            format!("{layer}.({joined})")
        };
        Self { name, channels }
    }
}

/// Split the channels of `layer` into display groups.
///
/// Canonical tuples claim their present members first; leftovers become
/// grayscale groups. The layer's `A` channel is appended to every group.
///
/// # Panics
/// If the layer has no channels at all.
pub fn group_channels(data: &ImageData, layer: &str) -> Vec<ChannelGroup> {
    let prefix = if layer.is_empty() { String::new() } else { format!("{layer}.") };
    let alpha = alpha_channel_name(layer);

    let mut remaining = data.channels_in_layer(layer);
    let has_alpha = match remaining.iter().position(|c| *c == alpha) {
        Some(index) => {
            remaining.remove(index);
            true
        }
        None => false,
    };

    let finish = |mut members: SmallVec<[String; 4]>| {
        if members.len() == 1 {
            let only = members[0].clone();
            members.push(only.clone());
            members.push(only);
        }
        if has_alpha {
            members.push(alpha.clone());
        }
        ChannelGroup::new(layer, members)
    };

    let mut groups = Vec::new();
    for tuple in CANONICAL_TUPLES {
        let mut members: SmallVec<[String; 4]> = SmallVec::new();
        for tail in *tuple {
            let name = format!("{prefix}{tail}");
            if let Some(index) = remaining.iter().position(|c| *c == name) {
                members.push(remaining.remove(index));
            }
        }
        if !members.is_empty() {
            groups.push(finish(members));
        }
    }

    for name in remaining {
        groups.push(finish(smallvec![name]));
    }

    if has_alpha && groups.is_empty() {
        groups.push(ChannelGroup::new(layer, smallvec![alpha.clone(), alpha.clone(), alpha]));
    }

    assert!(!groups.is_empty(), "layer '{layer}' produced no channel groups");
    groups
}

#[cfg(test)]
#[path = "../../tests/unit/model/groups.rs"]
mod tests;
