use std::num::NonZeroUsize;

use ndarray::{ArrayView2, Axis, s};

/// Yields borrowed, order preserving batches of rows. The last batch may be shorter.
#[derive(Debug, Clone)]
pub struct DataLoader<'a> {
    rows: ArrayView2<'a, f32>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> DataLoader<'a> {
    pub fn new(rows: ArrayView2<'a, f32>, batch_size: NonZeroUsize) -> Self {
        Self {
            rows,
            batch_size: batch_size.get(),
            cursor: 0,
        }
    }

    /// Total amount of batches, including the ones already yielded.
    pub fn num_batches(&self) -> usize {
        self.rows.len_of(Axis(0)).div_ceil(self.batch_size)
    }

    #[inline]
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Returns the next batch, or `None` if exhausted.
    pub fn next_batch(&mut self) -> Option<ArrayView2<'a, f32>> {
        let total = self.rows.nrows();
        if self.cursor >= total {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(total);
        let batch = self.rows.slice_move(s![self.cursor..end, ..]);

        self.cursor = end;
        Some(batch)
    }
}

impl<'a> Iterator for DataLoader<'a> {
    type Item = ArrayView2<'a, f32>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}
