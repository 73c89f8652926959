use std::{future::Future, sync::Arc};

use crate::{
    foundation::{
        core::Vec2i,
        error::{IngestError, IngestResult},
    },
    pool::{priority::Priority, slots::BlockSlots, thread_pool::PoolHandle},
};

/// Elements handled by one `parallel_for` iteration of an elementwise op.
const BLOCK_LEN: usize = 4096;

/// A single named plane of `f32` samples, stored row-major.
///
/// Names are dot-delimited: `"diffuse.R"` lives in layer `"diffuse"` with tail
/// `"R"`, while `"R"` lives in the root layer `""`.
///
/// Sample storage is reference counted, so cloning a channel is cheap and a
/// copy-on-write happens on the first mutation of a shared buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    name: String,
    size: Vec2i,
    data: Arc<Vec<f32>>,
}

impl Channel {
    /// Zero-filled channel of the given size.
    pub fn new(name: impl Into<String>, size: Vec2i) -> Self {
        Self {
            name: name.into(),
            size,
            data: Arc::new(vec![0.0; size.area()]),
        }
    }

    /// Channel over existing row-major samples.
    pub fn from_data(name: impl Into<String>, size: Vec2i, data: Vec<f32>) -> IngestResult<Self> {
        let name = name.into();
        if data.len() != size.area() {
            return Err(IngestError::decode(format!(
                "channel '{name}' has {} samples, expected {} for size {size}",
                data.len(),
                size.area()
            )));
        }
        Ok(Self {
            name,
            size,
            data: Arc::new(data),
        })
    }

    /// Full channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width and height in pixels.
    pub fn size(&self) -> Vec2i {
        self.size
    }

    /// Number of samples.
    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// Row-major samples.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable row-major samples.
    pub fn data_mut(&mut self) -> &mut [f32] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Sample at linear `index`, or 0 when out of range.
    pub fn eval_index(&self, index: usize) -> f32 {
        self.data.get(index).copied().unwrap_or(0.0)
    }

    /// Sample at pixel `(x, y)`, or 0 when outside the channel.
    pub fn eval(&self, x: i32, y: i32) -> f32 {
        match self.linear_index(x, y) {
            Some(i) => self.data[i],
            None => 0.0,
        }
    }

    /// Sample at pixel `(x, y)`.
    ///
    /// # Panics
    /// If `(x, y)` lies outside the channel.
    pub fn at(&self, x: i32, y: i32) -> f32 {
        let index = self.checked_index(x, y);
        self.data[index]
    }

    /// Mutable sample at pixel `(x, y)`.
    ///
    /// # Panics
    /// If `(x, y)` lies outside the channel.
    pub fn at_mut(&mut self, x: i32, y: i32) -> &mut f32 {
        let index = self.checked_index(x, y);
        &mut self.data_mut()[index]
    }

    /// Reset every sample to 0.
    pub fn set_zero(&mut self) {
        self.data_mut().fill(0.0);
    }

    /// Overwrite the `width`x`height` rectangle at `(x, y)` with row-major `values`.
    ///
    /// Rectangles that do not fit inside the channel, or patches with the wrong
    /// number of values, are logged and ignored.
    pub fn update_tile(&mut self, x: i32, y: i32, width: i32, height: i32, values: &[f32]) {
        let fits = x >= 0
            && y >= 0
            && width >= 0
            && height >= 0
            && x.checked_add(width).is_some_and(|r| r <= self.size.x)
            && y.checked_add(height).is_some_and(|b| b <= self.size.y);
        if !fits {
            tracing::warn!(
                channel = %self.name,
                x, y, width, height,
                size = %self.size,
                "tile does not fit into the channel; update skipped"
            );
            return;
        }

        let (w, h) = (width as usize, height as usize);
        if values.len() < w * h {
            tracing::warn!(
                channel = %self.name,
                expected = w * h,
                actual = values.len(),
                "tile data too short; update skipped"
            );
            return;
        }

        let stride = self.size.x as usize;
        let (x, y) = (x as usize, y as usize);
        let data = self.data_mut();
        for row in 0..h {
            let dst = (y + row) * stride + x;
            data[dst..dst + w].copy_from_slice(&values[row * w..(row + 1) * w]);
        }
    }

    /// Split a channel name at its last dot into `(layer, tail)`.
    pub fn split(name: &str) -> (&str, &str) {
        match name.rfind('.') {
            Some(dot) => (&name[..dot], &name[dot + 1..]),
            None => ("", name),
        }
    }

    /// Layer part of a channel name (`""` for the root layer).
    pub fn head(name: &str) -> &str {
        Self::split(name).0
    }

    /// Last dot-separated component of a channel name.
    pub fn tail(name: &str) -> &str {
        Self::split(name).1
    }

    /// Whether the name belongs to the root layer.
    pub fn is_topmost(name: &str) -> bool {
        !name.contains('.')
    }

    /// Multiply every sample by the matching sample of `other` on the pool.
    ///
    /// The work is queued immediately; the returned future joins it and stores
    /// the result. Both channels must have the same size.
    pub fn multiply_with<'a>(
        &'a mut self,
        other: &Channel,
        pool: &PoolHandle,
        priority: Priority,
    ) -> impl Future<Output = IngestResult<()>> + Send + use<'a> {
        self.elementwise(other, pool, priority, multiply)
    }

    /// Divide every sample by the matching sample of `other` on the pool.
    ///
    /// Division by exactly zero yields zero. Same launch and size rules as
    /// [`Channel::multiply_with`].
    pub fn divide_by<'a>(
        &'a mut self,
        other: &Channel,
        pool: &PoolHandle,
        priority: Priority,
    ) -> impl Future<Output = IngestResult<()>> + Send + use<'a> {
        self.elementwise(other, pool, priority, divide_or_zero)
    }

    pub(crate) fn elementwise<'a>(
        &'a mut self,
        other: &Channel,
        pool: &PoolHandle,
        priority: Priority,
        op: fn(f32, f32) -> f32,
    ) -> impl Future<Output = IngestResult<()>> + Send + use<'a> {
        debug_assert_eq!(self.size, other.size, "elementwise op on channels of different size");

        let lhs = Arc::clone(&self.data);
        let rhs = Arc::clone(&other.data);
        let len = lhs.len().min(rhs.len());
        let slots = Arc::new(BlockSlots::new(len.div_ceil(BLOCK_LEN)));

        let out = Arc::clone(&slots);
        let task = pool.parallel_for(0, len.div_ceil(BLOCK_LEN), priority, move |block| {
            let start = block * BLOCK_LEN;
            let end = (start + BLOCK_LEN).min(len);
            let values = lhs[start..end]
                .iter()
                .zip(&rhs[start..end])
                .map(|(&a, &b)| op(a, b))
                .collect();
            out.put(block, values);
            Ok(())
        });

        async move {
            task.await?;
            let result = slots.take_flat();
            self.data_mut()[..result.len()].copy_from_slice(&result);
            Ok(())
        }
    }

    fn linear_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.size.x || y >= self.size.y {
            return None;
        }
        Some(x as usize + y as usize * self.size.x as usize)
    }

    fn checked_index(&self, x: i32, y: i32) -> usize {
        match self.linear_index(x, y) {
            Some(i) => i,
            None => panic!("pixel ({x}, {y}) outside channel '{}' of size {}", self.name, self.size),
        }
    }
}

pub(crate) fn multiply(a: f32, b: f32) -> f32 {
    a * b
}

pub(crate) fn divide_or_zero(a: f32, b: f32) -> f32 {
    if b == 0.0 { 0.0 } else { a / b }
}

#[cfg(test)]
#[path = "../../tests/unit/model/channel.rs"]
mod tests;
