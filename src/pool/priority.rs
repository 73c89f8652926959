use std::fmt;

/// Scheduling rank for pool work; higher values are dequeued first.
///
/// Foreground work (the image being looked at) uses the image's draw-order id,
/// so more recent images win. Background prefetch is offset by `i64::MIN`, which
/// keeps every background value below every foreground value while still
/// preferring newer requests among themselves.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Priority(pub i64);

impl Priority {
    /// Above everything else; used for work a caller is blocking on.
    pub const IMMEDIATE: Self = Self(i64::MAX);

    /// Priority of work for the image with draw-order id `draw_id`.
    pub fn foreground(draw_id: u64) -> Self {
        Self(clamp_id(draw_id))
    }

    /// Priority of prefetch work; always lower than any foreground priority.
    pub fn background(draw_id: u64) -> Self {
        Self(i64::MIN + clamp_id(draw_id))
    }

    /// Whether this value lies in the background band.
    pub fn is_background(self) -> bool {
        self.0 < 0
    }
}

fn clamp_id(draw_id: u64) -> i64 {
    i64::try_from(draw_id).unwrap_or(i64::MAX - 1).min(i64::MAX - 1)
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pool/priority.rs"]
mod tests;
